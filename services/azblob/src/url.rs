use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use stowage_core::{Error, Result};

/// Encode set for blob paths. `/` stays as the path separator.
const PATH_ENCODE_SET: AsciiSet = CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn percent_encode_path(path: &str) -> String {
    utf8_percent_encode(path, &PATH_ENCODE_SET).to_string()
}

/// Handle on the blob service of one storage account.
///
/// Validates names as it descends: a handle that exists always carries a
/// well-formed url, so every bad name is rejected before any request is
/// built.
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    account: String,
    endpoint: String,
}

impl ServiceHandle {
    /// Create a handle for the given account and endpoint.
    pub fn new(account: &str, endpoint: &str) -> Result<Self> {
        if account.is_empty() || account.contains('/') {
            return Err(Error::config_invalid(format!(
                "invalid storage account name: {account:?}"
            )));
        }

        Ok(Self {
            account: account.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// The storage account name.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The service url.
    pub fn url(&self) -> &str {
        &self.endpoint
    }

    /// Descend into a container.
    ///
    /// The name is lowercased first; container names are
    /// case-insensitive and the store only accepts lowercase. After
    /// folding, only `a-z`, `0-9` and `-` are accepted.
    pub fn container(&self, name: &str) -> Result<ContainerHandle> {
        let name = name.to_lowercase();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::name_invalid(format!(
                "invalid container name: {name:?}"
            )));
        }

        Ok(ContainerHandle {
            account: self.account.clone(),
            endpoint: self.endpoint.clone(),
            name,
        })
    }
}

/// Handle on one container.
#[derive(Clone, Debug)]
pub struct ContainerHandle {
    account: String,
    endpoint: String,
    name: String,
}

impl ContainerHandle {
    /// The container name, lowercased.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The container url.
    pub fn url(&self) -> String {
        format!("{}/{}", self.endpoint, self.name)
    }

    /// Descend into a blob. Paths may contain `/` but must not start
    /// with one.
    pub fn blob(&self, path: &str) -> Result<BlobHandle> {
        if path.is_empty() || path.starts_with('/') {
            return Err(Error::name_invalid(format!("invalid blob path: {path:?}")));
        }

        Ok(BlobHandle {
            account: self.account.clone(),
            endpoint: self.endpoint.clone(),
            container: self.name.clone(),
            path: path.to_string(),
        })
    }
}

/// Handle on one blob.
#[derive(Clone, Debug)]
pub struct BlobHandle {
    account: String,
    endpoint: String,
    container: String,
    path: String,
}

impl BlobHandle {
    /// The blob path within its container.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The blob url, with the path percent-encoded.
    pub fn url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint,
            self.container,
            percent_encode_path(&self.path)
        )
    }

    /// The canonicalized resource string used when signing SAS tokens.
    pub fn canonicalized_resource(&self) -> String {
        format!("/blob/{}/{}/{}", self.account, self.container, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stowage_core::ErrorKind;
    use test_case::test_case;

    fn service() -> ServiceHandle {
        ServiceHandle::new("deployacct", "https://deployacct.blob.core.windows.net").unwrap()
    }

    #[test]
    fn test_service_handle_rejects_bad_account() {
        assert!(ServiceHandle::new("", "https://x").is_err());
        assert!(ServiceHandle::new("a/b", "https://x").is_err());
    }

    #[test_case("deployments", "deployments"; "plain")]
    #[test_case("DEPLOYMENTS", "deployments"; "uppercase folds")]
    #[test_case("My-Container-7", "my-container-7"; "mixed case with digits")]
    fn test_container_name_folding(input: &str, expected: &str) {
        assert_eq!(service().container(input).unwrap().name(), expected);
    }

    #[test_case(""; "empty")]
    #[test_case("has space"; "space")]
    #[test_case("under_score"; "underscore")]
    #[test_case("slash/y"; "slash")]
    fn test_container_name_rejected(input: &str) {
        let err = service().container(input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameInvalid);
    }

    #[test]
    fn test_blob_url() {
        let blob = service()
            .container("deployments")
            .unwrap()
            .blob("releases/artifact v2.zip")
            .unwrap();
        assert_eq!(
            blob.url(),
            "https://deployacct.blob.core.windows.net/deployments/releases/artifact%20v2.zip"
        );
        assert_eq!(
            blob.canonicalized_resource(),
            "/blob/deployacct/deployments/releases/artifact v2.zip"
        );
    }

    #[test]
    fn test_blob_path_rejected() {
        let container = service().container("deployments").unwrap();
        assert!(container.blob("").is_err());
        assert!(container.blob("/leading").is_err());
    }
}
