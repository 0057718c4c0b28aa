//! Wire types for the list apis.
//!
//! Listing responses come back as XML `EnumerationResults` documents
//! with PascalCase element names.

use serde::Deserialize;
use stowage_core::{Error, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListContainersOutput {
    pub containers: Containers,
    pub next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Containers {
    pub container: Vec<ContainerItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContainerItem {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListBlobsOutput {
    pub blobs: Blobs,
    pub next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Blobs {
    pub blob: Vec<Blob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Blob {
    pub name: String,
    pub properties: BlobProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BlobProperties {
    #[serde(rename = "Content-Length")]
    pub content_length: u64,
}

pub fn parse_list_containers(bs: &[u8]) -> Result<ListContainersOutput> {
    quick_xml::de::from_reader(bs)
        .map_err(|e| Error::unexpected("invalid container listing response").with_source(e))
}

pub fn parse_list_blobs(bs: &[u8]) -> Result<ListBlobsOutput> {
    quick_xml::de::from_reader(bs)
        .map_err(|e| Error::unexpected("invalid blob listing response").with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_containers() {
        let bs = br#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://deployacct.blob.core.windows.net/">
  <Containers>
    <Container>
      <Name>deployments</Name>
      <Properties>
        <Last-Modified>Tue, 01 Mar 2022 08:12:34 GMT</Last-Modified>
      </Properties>
    </Container>
    <Container>
      <Name>logs</Name>
    </Container>
  </Containers>
  <NextMarker />
</EnumerationResults>"#;

        let out = parse_list_containers(bs).unwrap();
        let names: Vec<&str> = out
            .containers
            .container
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["deployments", "logs"]);
        assert!(out.next_marker.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_parse_list_blobs() {
        let bs = br#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ContainerName="deployments">
  <Blobs>
    <Blob>
      <Name>releases/artifact.zip</Name>
      <Properties>
        <Content-Length>10485760</Content-Length>
        <Content-Type>application/zip</Content-Type>
      </Properties>
    </Blob>
    <Blob>
      <Name>readme.txt</Name>
      <Properties>
        <Content-Length>12</Content-Length>
      </Properties>
    </Blob>
  </Blobs>
  <NextMarker>marker-2</NextMarker>
</EnumerationResults>"#;

        let out = parse_list_blobs(bs).unwrap();
        assert_eq!(out.blobs.blob.len(), 2);
        assert_eq!(out.blobs.blob[0].name, "releases/artifact.zip");
        assert_eq!(out.blobs.blob[0].properties.content_length, 10485760);
        assert_eq!(out.next_marker.as_deref(), Some("marker-2"));
    }

    #[test]
    fn test_parse_empty_listing() {
        let bs = br#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ContainerName="deployments">
  <Blobs />
  <NextMarker />
</EnumerationResults>"#;

        let out = parse_list_blobs(bs).unwrap();
        assert!(out.blobs.blob.is_empty());
    }
}
