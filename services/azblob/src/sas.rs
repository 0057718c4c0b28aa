use stowage_core::hash::{base64_decode, base64_hmac_sha256};
use stowage_core::time::{format_rfc3339, DateTime};
use stowage_core::Result;

const SERVICE_SAS_VERSION: &str = "2018-11-09";
const RESOURCE_BLOB: &str = "b";
const PERMISSION_READ: &str = "r";

/// A read-only shared access signature scoped to a single blob.
///
/// The token grants anonymous read access to exactly one blob until the
/// expiry time. Minting one requires the account key, so only the
/// shared-key strategy can produce these.
pub struct BlobSharedAccessSignature {
    key: String,
    canonicalized_resource: String,
    expiry: DateTime,
    start: Option<DateTime>,
}

impl BlobSharedAccessSignature {
    /// Create a signature over the given canonicalized resource, in the
    /// form `/blob/{account}/{container}/{blob}`. The account name is
    /// part of the resource string.
    pub fn new(key: String, canonicalized_resource: String, expiry: DateTime) -> Self {
        Self {
            key,
            canonicalized_resource,
            expiry,
            start: None,
        }
    }

    /// Set the time the signature becomes valid.
    pub fn with_start(mut self, start: DateTime) -> Self {
        self.start = Some(start);
        self
    }

    fn signature(&self) -> Result<String> {
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}",
            PERMISSION_READ,
            self.start.map(format_rfc3339).unwrap_or_default(),
            format_rfc3339(self.expiry),
            self.canonicalized_resource,
            "", // signed identifier
            "", // ip range
            "", // protocol
            SERVICE_SAS_VERSION,
            RESOURCE_BLOB,
            "", // snapshot time
            "", // cache-control
            "", // content-disposition
            "", // content-encoding
            "", // content-language
            "", // content-type
        );

        Ok(base64_hmac_sha256(
            &base64_decode(&self.key)?,
            string_to_sign.as_bytes(),
        ))
    }

    /// Generate the SAS query pairs, ready to append to the blob url.
    pub fn token(&self) -> Result<Vec<(String, String)>> {
        let mut elements = vec![
            ("sv".to_string(), SERVICE_SAS_VERSION.to_string()),
            ("sp".to_string(), PERMISSION_READ.to_string()),
            ("sr".to_string(), RESOURCE_BLOB.to_string()),
        ];
        if let Some(start) = self.start {
            elements.push(("st".to_string(), urlencode(&format_rfc3339(start))));
        }
        elements.push(("se".to_string(), urlencode(&format_rfc3339(self.expiry))));
        elements.push(("sig".to_string(), urlencode(&self.signature()?)));

        Ok(elements)
    }
}

fn urlencode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use stowage_core::hash::base64_encode;

    fn test_sas() -> BlobSharedAccessSignature {
        BlobSharedAccessSignature::new(
            base64_encode(b"account-key"),
            "/blob/deployacct/deployments/artifact.zip".to_string(),
            DateTime::from_str("2022-03-01T09:12:34Z").unwrap(),
        )
        .with_start(DateTime::from_str("2022-03-01T08:12:34Z").unwrap())
    }

    #[test]
    fn test_token_parameters() {
        let token = test_sas().token().unwrap();
        let keys: Vec<&str> = token.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["sv", "sp", "sr", "st", "se", "sig"]);

        let get = |name: &str| {
            token
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("sv"), SERVICE_SAS_VERSION);
        assert_eq!(get("sp"), "r");
        assert_eq!(get("sr"), "b");
        assert_eq!(get("se"), "2022-03-01T09%3A12%3A34Z");
        assert!(!get("sig").is_empty());
    }

    #[test]
    fn test_signature_deterministic() {
        let a = test_sas().signature().unwrap();
        let b = test_sas().signature().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_signature_varies_with_resource() {
        let a = test_sas().signature().unwrap();

        let mut other = test_sas();
        other.canonicalized_resource = "/blob/deployacct/deployments/other.zip".to_string();
        let b = other.signature().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_signature_rejects_invalid_key() {
        let mut sas = test_sas();
        sas.key = "not base64!!!".to_string();
        assert!(sas.signature().is_err());
    }
}
