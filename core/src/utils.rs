//! Small helpers shared across the workspace.

use std::fmt::{self, Debug, Formatter};

/// Debug wrapper that keeps account keys and access tokens out of log
/// output.
///
/// Secrets of 12 characters or more keep their first and last three
/// characters so two different credentials stay distinguishable in a
/// debug dump; shorter secrets are masked entirely. The empty string
/// prints as `EMPTY` so a missing secret is visible as such.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            0 => f.write_str("EMPTY"),
            1..=11 => f.write_str("***"),
            n => write!(f, "{}***{}", &self.0[..3], &self.0[n - 3..]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_redact_masks_short_secrets() {
        assert_eq!(format!("{:?}", Redact::from("")), "EMPTY");
        assert_eq!(format!("{:?}", Redact::from("hunter2")), "***");
        assert_eq!(format!("{:?}", Redact::from("elevenchars")), "***");
    }

    #[test]
    fn test_redact_keeps_edges_of_long_secrets() {
        let key = "storage-account-key-0001";
        assert_eq!(format!("{:?}", Redact::from(key)), "sto***001");

        let token = String::from("eyJhbGciOiJSUzI1NiJ9.payload.sig");
        assert_eq!(format!("{:?}", Redact::from(&token)), "eyJ***sig");
    }
}
