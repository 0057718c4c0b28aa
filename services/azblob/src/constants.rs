use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Headers used in the blob storage api.
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_VERSION: &str = "x-ms-version";
pub const X_MS_BLOB_TYPE: &str = "x-ms-blob-type";

/// Storage service version sent with every signed request.
pub const STORAGE_SERVICE_VERSION: &str = "2019-12-12";

/// Encode set for azure query values.
///
/// Only alphanumerics and `-._~` survive unencoded.
pub const QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');
