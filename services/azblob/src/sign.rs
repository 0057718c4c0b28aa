use std::fmt::Write;

use http::header::{self, HeaderName, HeaderValue};
use log::debug;
use percent_encoding::percent_encode;
use stowage_core::hash::{base64_decode, base64_hmac_sha256};
use stowage_core::time::{format_http_date, now, DateTime};
use stowage_core::{Result, SigningRequest};

use crate::constants::{QUERY_ENCODE_SET, STORAGE_SERVICE_VERSION, X_MS_DATE, X_MS_VERSION};
use crate::credential::Credential;

/// Signs requests against the blob storage data plane.
///
/// Shared-key credentials produce a `SharedKey` authorization header
/// computed over the canonicalized request; token credentials attach a
/// bearer header. Both paths stamp `x-ms-date` and `x-ms-version`.
#[derive(Clone, Debug, Default)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the signing time instead of using the current time.
    #[cfg(test)]
    pub(crate) fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Sign the request parts in place with the given credential.
    pub fn sign(&self, parts: &mut http::request::Parts, cred: &Credential) -> Result<()> {
        let mut ctx = SigningRequest::build(parts)?;

        let signing_time = self.time.unwrap_or_else(now);
        ctx.headers.insert(
            HeaderName::from_static(X_MS_VERSION),
            HeaderValue::from_static(STORAGE_SERVICE_VERSION),
        );
        ctx.headers.insert(
            HeaderName::from_static(X_MS_DATE),
            format_http_date(signing_time).parse()?,
        );

        match cred {
            Credential::Token { token } => {
                let mut value: HeaderValue = format!("Bearer {token}").parse()?;
                value.set_sensitive(true);
                ctx.headers.insert(header::AUTHORIZATION, value);
            }
            Credential::SharedKey {
                account_name,
                account_key,
            } => {
                let string_to_sign = string_to_sign(&ctx, account_name)?;
                let signature =
                    base64_hmac_sha256(&base64_decode(account_key)?, string_to_sign.as_bytes());

                let mut value: HeaderValue =
                    format!("SharedKey {account_name}:{signature}").parse()?;
                value.set_sensitive(true);
                ctx.headers.insert(header::AUTHORIZATION, value);
            }
        }

        // Percent-encode the query values before applying the parts back.
        for (_, value) in ctx.query.iter_mut() {
            *value = percent_encode(value.as_bytes(), &QUERY_ENCODE_SET).to_string();
        }

        ctx.apply(parts)
    }
}

/// Construct the shared-key string to sign.
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
fn string_to_sign(ctx: &SigningRequest, account_name: &str) -> Result<String> {
    let mut s = String::with_capacity(128);

    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::CONTENT_ENCODING)?
    )?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?
    )?;
    writeln!(&mut s, "{}", {
        // Azure wants an empty string here rather than a literal "0".
        let content_length = ctx.header_get_or_default(&header::CONTENT_LENGTH)?;
        if content_length == "0" {
            ""
        } else {
            content_length
        }
    })?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&HeaderName::from_static("content-md5"))?
    )?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::CONTENT_TYPE)?
    )?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::DATE)?)?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::IF_MODIFIED_SINCE)?
    )?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MATCH)?)?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::IF_NONE_MATCH)?
    )?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::IF_UNMODIFIED_SINCE)?
    )?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::RANGE)?)?;
    writeln!(&mut s, "{}", canonicalize_header(ctx))?;
    write!(&mut s, "{}", canonicalize_resource(ctx, account_name))?;

    debug!("string to sign: {}", &s);

    Ok(s)
}

/// All `x-ms-` headers, lowercased, sorted and joined with newlines.
fn canonicalize_header(ctx: &SigningRequest) -> String {
    SigningRequest::header_to_string(ctx.header_to_vec_with_prefix("x-ms-"), ":", "\n")
}

/// `/{account}{path}` followed by the sorted, percent-decoded query.
fn canonicalize_resource(ctx: &SigningRequest, account_name: &str) -> String {
    if ctx.query.is_empty() {
        return format!("/{}{}", account_name, ctx.path);
    }

    format!(
        "/{}{}\n{}",
        account_name,
        ctx.path,
        SigningRequest::query_to_percent_decoded_string(ctx.query.clone(), ":", "\n")
    )
}
