//! XML payloads exchanged with the blob service.

use azblob_core::{Error, Result};
use serde::Deserialize;

/// One page of a List Blobs call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBlobsPage {
    /// Blobs in service order.
    pub blobs: Vec<BlobItem>,
    /// Where the next page begins, `None` on the last page.
    pub next_marker: Option<String>,
}

/// A blob as described by a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Blob name.
    pub name: String,
    /// Blob size in bytes.
    pub content_length: u64,
    /// Entity tag, if the service sent one.
    pub etag: Option<String>,
    /// Content type, if the blob has one.
    pub content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBlobsResponse {
    #[serde(default)]
    next_marker: Option<String>,
    #[serde(default)]
    blobs: Blobs,
}

#[derive(Debug, Default, Deserialize)]
struct Blobs {
    #[serde(rename = "Blob", default)]
    blobs: Vec<Blob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Blob {
    name: String,
    properties: BlobProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobProperties {
    #[serde(rename = "Content-Length")]
    content_length: u64,
    #[serde(default)]
    etag: Option<String>,
    #[serde(rename = "Content-Type", default)]
    content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StorageErrorResponse {
    code: String,
}

/// Empty elements like `<NextMarker />` carry no information.
fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|v| !v.is_empty())
}

/// The service may prefix XML bodies with a UTF-8 byte order mark.
fn xml_str(body: &[u8]) -> Result<&str> {
    let s = std::str::from_utf8(body)
        .map_err(|e| Error::unexpected("response body is not valid utf-8").with_source(e))?;
    Ok(s.trim_start_matches('\u{feff}'))
}

impl ListBlobsPage {
    /// Parse the `EnumerationResults` document of a List Blobs response.
    pub fn from_xml(body: &[u8]) -> Result<Self> {
        let resp: ListBlobsResponse = quick_xml::de::from_str(xml_str(body)?)
            .map_err(|e| Error::unexpected("failed to parse list blobs response").with_source(e))?;

        Ok(Self {
            blobs: resp
                .blobs
                .blobs
                .into_iter()
                .map(|b| BlobItem {
                    name: b.name,
                    content_length: b.properties.content_length,
                    etag: non_empty(b.properties.etag),
                    content_type: non_empty(b.properties.content_type),
                })
                .collect(),
            next_marker: non_empty(resp.next_marker),
        })
    }
}

/// Extract `<Error><Code>` out of an error response body.
pub(crate) fn parse_error_code(body: &[u8]) -> Option<String> {
    let resp: StorageErrorResponse = quick_xml::de::from_str(xml_str(body).ok()?).ok()?;
    non_empty(Some(resp.code))
}

/// The body of a Put Block List request committing `block_ids` in order.
pub(crate) fn block_list_xml(block_ids: &[String]) -> String {
    let mut s = String::with_capacity(64 + block_ids.len() * 32);
    s.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList>\n");
    for id in block_ids {
        s.push_str("\t<Latest>");
        s.push_str(id);
        s.push_str("</Latest>\n");
    }
    s.push_str("</BlockList>");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_list_blobs() {
        const S: &str = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>
<EnumerationResults ServiceEndpoint=\"https://myaccount.blob.core.windows.net/\" ContainerName=\"mycontainer\">
    <MaxResults>2</MaxResults>
    <Blobs>
        <Blob>
            <Name>hello.txt</Name>
            <Properties>
                <Creation-Time>Thu, 01 Jul 2021 10:44:59 GMT</Creation-Time>
                <Last-Modified>Thu, 01 Jul 2021 10:44:59 GMT</Last-Modified>
                <Etag>0x8D93C7D4629C8E7</Etag>
                <Content-Length>26</Content-Length>
                <Content-Type>text/plain</Content-Type>
                <Content-Encoding />
                <BlobType>BlockBlob</BlobType>
            </Properties>
            <OrMetadata />
        </Blob>
        <Blob>
            <Name>dir/empty.bin</Name>
            <Properties>
                <Content-Length>0</Content-Length>
                <Content-Type />
            </Properties>
        </Blob>
    </Blobs>
    <NextMarker>2!84!MDAwMDE3IWRpci9lbXB0eS5iaW4hMDAwMDI4ITk5OTktMTItMzFUMjM6NTk6NTkuOTk5OTk5OVoh</NextMarker>
</EnumerationResults>";

        let page = ListBlobsPage::from_xml(S.as_bytes()).unwrap();

        assert_eq!(
            page.blobs,
            vec![
                BlobItem {
                    name: "hello.txt".to_string(),
                    content_length: 26,
                    etag: Some("0x8D93C7D4629C8E7".to_string()),
                    content_type: Some("text/plain".to_string()),
                },
                BlobItem {
                    name: "dir/empty.bin".to_string(),
                    content_length: 0,
                    etag: None,
                    content_type: None,
                },
            ]
        );
        assert_eq!(
            page.next_marker.as_deref(),
            Some("2!84!MDAwMDE3IWRpci9lbXB0eS5iaW4hMDAwMDI4ITk5OTktMTItMzFUMjM6NTk6NTkuOTk5OTk5OVoh")
        );
    }

    #[test]
    fn test_parse_empty_listing() {
        const S: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>
<EnumerationResults ServiceEndpoint=\"http://127.0.0.1:10000/devstoreaccount1\" ContainerName=\"empty\">
    <Prefix/>
    <Marker/>
    <MaxResults>5000</MaxResults>
    <Delimiter/>
    <Blobs/>
    <NextMarker/>
</EnumerationResults>";

        let page = ListBlobsPage::from_xml(S.as_bytes()).unwrap();
        assert_eq!(page, ListBlobsPage::default());
    }

    #[test]
    fn test_parse_error_code() {
        let body = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>ContainerAlreadyExists</Code><Message>The specified container already exists.\nRequestId:0e2a\nTime:2022-03-01T08:12:34.0000000Z</Message></Error>";

        assert_eq!(
            parse_error_code(body.as_bytes()).as_deref(),
            Some("ContainerAlreadyExists")
        );
        assert_eq!(parse_error_code(b""), None);
        assert_eq!(parse_error_code(b"<html>bad gateway</html>"), None);
    }

    #[test]
    fn test_block_list_xml() {
        let ids = vec!["MDAwMDAwMDA=".to_string(), "MDAwMDAwMDE=".to_string()];

        assert_eq!(
            block_list_xml(&ids),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>
<BlockList>
\t<Latest>MDAwMDAwMDA=</Latest>
\t<Latest>MDAwMDAwMDE=</Latest>
</BlockList>"
        );
    }
}
