use std::path::Path;
use std::sync::Arc;

use azblob_core::{Context, Error, Result, Signer};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Request, Response, Uri};
use log::debug;
use percent_encoding::utf8_percent_encode;

use crate::config::UploadOptions;
use crate::constants::*;
use crate::error::parse_error;
use crate::model::block_list_xml;
use crate::upload::UploadSource;
use crate::{
    BlobRef, Config, ContainerRef, Credential, ListBlobsPage, RequestSigner,
    StaticCredentialProvider,
};

/// BlobStoreClient talks to the blob service of one storage account.
///
/// Every request is signed with the account's Shared Key. The client is cheap
/// to clone, clones share the same context and signer.
///
/// ```no_run
/// use azblob_core::{Context, OsEnv};
/// use azblob_file_read_tokio::TokioFileRead;
/// use azblob_http_send_reqwest::ReqwestHttpSend;
/// use azblob_storage::{BlobStoreClient, Config};
///
/// # async fn example() -> azblob_core::Result<()> {
/// let ctx = Context::new()
///     .with_file_read(TokioFileRead)
///     .with_http_send(ReqwestHttpSend::default())
///     .with_env(OsEnv);
/// let config = Config::from_env(&ctx)?;
/// let client = BlobStoreClient::new(ctx, config)?;
///
/// client.upload_file("mycontainer", "hello.txt").await?;
/// for name in client.list_blobs("mycontainer").await? {
///     println!("{name}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BlobStoreClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    ctx: Context,
    signer: Signer<Credential>,
    account_name: String,
    endpoint: String,
    upload: UploadOptions,
}

impl BlobStoreClient {
    /// Create a client out of `config`.
    ///
    /// Fails with `ConfigInvalid` if the account name or key is missing, or the
    /// endpoint is not an absolute URL. No request is sent here.
    pub fn new(ctx: Context, config: Config) -> Result<Self> {
        let credential = config.credential()?;
        config.upload.validate()?;

        let endpoint = config.endpoint_or_default(&credential.account_name);
        let uri: Uri = endpoint.parse().map_err(|e| {
            Error::config_invalid(format!("invalid storage endpoint: {endpoint}")).with_source(e)
        })?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(Error::config_invalid(format!(
                "storage endpoint must be an absolute url: {endpoint}"
            )));
        }

        let signer = Signer::new(
            ctx.clone(),
            StaticCredentialProvider::new_shared_key(
                &credential.account_name,
                &credential.account_key,
            ),
            RequestSigner::new(),
        );

        debug!(
            "blob client for account {} at {endpoint}",
            credential.account_name
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                ctx,
                signer,
                account_name: credential.account_name,
                endpoint,
                upload: config.upload,
            }),
        })
    }

    /// Storage account this client talks to.
    pub fn account_name(&self) -> &str {
        &self.inner.account_name
    }

    /// Blob service endpoint, without trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Address the container `name` in this account.
    pub fn container(&self, name: &str) -> ContainerRef {
        ContainerRef::new(&self.inner.account_name, name)
    }

    pub(crate) fn context(&self) -> &Context {
        &self.inner.ctx
    }

    pub(crate) fn upload_options(&self) -> &UploadOptions {
        &self.inner.upload
    }

    /// Upload the local file at `path` into `container`.
    ///
    /// The blob is named after the file's base name. Fails with
    /// `FileNotFound` if the file does not exist.
    pub async fn upload_file(&self, container: &str, path: impl AsRef<Path>) -> Result<BlobRef> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|v| v.to_str())
            .ok_or_else(|| {
                Error::request_invalid(format!(
                    "cannot derive a blob name from {}",
                    path.display()
                ))
            })?;
        let blob = self.container(container).blob(name);

        let len = self.inner.ctx.file_len(path).await?;
        self.upload(&blob, UploadSource::file(path, len)).await?;

        Ok(blob)
    }

    /// Upload `data` as the content of `blob`, replacing any existing content.
    pub async fn upload_bytes(&self, blob: &BlobRef, data: Bytes) -> Result<()> {
        self.upload(blob, UploadSource::Memory(data)).await
    }

    /// Create the container `name`.
    ///
    /// Fails with `AlreadyExists` if the account already has it.
    pub async fn create_container(&self, name: &str) -> Result<ContainerRef> {
        let container = self.container(name);
        let url = format!("{}?restype=container", self.container_url(&container)?);

        let req = Request::put(url)
            .header(CONTENT_LENGTH, 0)
            .body(Bytes::new())?;
        self.send(req, &format!("container {name}")).await?;

        Ok(container)
    }

    /// Delete the container `name` with every blob inside it.
    pub async fn delete_container(&self, name: &str) -> Result<()> {
        let container = self.container(name);
        let url = format!("{}?restype=container", self.container_url(&container)?);

        let req = Request::delete(url).body(Bytes::new())?;
        self.send(req, &format!("container {name}")).await?;

        Ok(())
    }

    /// List the names of all blobs in `container`, following continuation
    /// markers until the last page.
    pub async fn list_blobs(&self, container: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .list_blobs_page(container, marker.as_deref(), None)
                .await?;
            names.extend(page.blobs.into_iter().map(|b| b.name));

            match page.next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }

    /// Fetch one page of blobs in `container`, starting at `marker`.
    ///
    /// `max_results` caps the page size; the service default applies if unset.
    pub async fn list_blobs_page(
        &self,
        container: &str,
        marker: Option<&str>,
        max_results: Option<usize>,
    ) -> Result<ListBlobsPage> {
        let container = self.container(container);
        let mut url = format!(
            "{}?restype=container&comp=list",
            self.container_url(&container)?
        );
        if let Some(marker) = marker.filter(|v| !v.is_empty()) {
            url.push_str("&marker=");
            url.push_str(&encode_query(marker));
        }
        if let Some(max_results) = max_results {
            url.push_str(&format!("&maxresults={max_results}"));
        }

        let req = Request::get(url).body(Bytes::new())?;
        let resp = self
            .send(req, &format!("container {}", container.name()))
            .await?;

        ListBlobsPage::from_xml(resp.body())
    }

    /// Download the whole content of `blob`.
    pub async fn download_blob(&self, blob: &BlobRef) -> Result<Bytes> {
        let req = Request::get(self.blob_url(blob)?).body(Bytes::new())?;
        let resp = self.send(req, &blob_target(blob)).await?;

        Ok(resp.into_body())
    }

    /// Delete `blob`.
    ///
    /// Fails with `NotFound` if the blob does not exist.
    pub async fn delete_blob(&self, blob: &BlobRef) -> Result<()> {
        let req = Request::delete(self.blob_url(blob)?).body(Bytes::new())?;
        self.send(req, &blob_target(blob)).await?;

        Ok(())
    }

    /// Single shot Put Blob.
    pub(crate) async fn put_blob(&self, blob: &BlobRef, data: Bytes) -> Result<()> {
        let req = Request::put(self.blob_url(blob)?)
            .header(CONTENT_LENGTH, data.len())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(X_MS_BLOB_TYPE, HeaderValue::from_static(BLOCK_BLOB))
            .body(data)?;
        self.send(req, &blob_target(blob)).await?;

        Ok(())
    }

    /// Stage one block of `blob` under `block_id`.
    pub(crate) async fn put_block(&self, blob: &BlobRef, block_id: &str, data: Bytes) -> Result<()> {
        let url = format!(
            "{}?comp=block&blockid={}",
            self.blob_url(blob)?,
            encode_query(block_id)
        );

        let req = Request::put(url)
            .header(CONTENT_LENGTH, data.len())
            .body(data)?;
        self.send(req, &format!("block {block_id} of {}", blob_target(blob)))
            .await?;

        Ok(())
    }

    /// Commit the staged `block_ids`, in order, as the content of `blob`.
    pub(crate) async fn put_block_list(&self, blob: &BlobRef, block_ids: &[String]) -> Result<()> {
        let url = format!("{}?comp=blocklist", self.blob_url(blob)?);
        let body = Bytes::from(block_list_xml(block_ids));

        let req = Request::put(url)
            .header(CONTENT_LENGTH, body.len())
            .header(CONTENT_TYPE, "application/xml")
            .body(body)?;
        self.send(req, &blob_target(blob)).await?;

        Ok(())
    }

    /// Sign and send `req`, translating failure responses into errors.
    async fn send(&self, req: Request<Bytes>, target: &str) -> Result<Response<Bytes>> {
        self.inner.ctx.check_cancelled()?;

        let (mut parts, body) = req.into_parts();
        self.inner.signer.sign(&mut parts).await?;
        let req = Request::from_parts(parts, body);

        debug!("sending request: {} {}", req.method(), req.uri());
        let method = req.method().clone();
        let resp = self.inner.ctx.http_send(req).await?;
        debug!("got response for {method} {target}: {}", resp.status());

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(parse_error(&resp, target))
        }
    }

    fn check_account(&self, container: &ContainerRef) -> Result<()> {
        if container.account_name() != self.inner.account_name {
            return Err(Error::request_invalid(format!(
                "{container} does not belong to account {}",
                self.inner.account_name
            )));
        }
        Ok(())
    }

    fn container_url(&self, container: &ContainerRef) -> Result<String> {
        self.check_account(container)?;
        if container.name().is_empty() {
            return Err(Error::request_invalid("container name must not be empty"));
        }

        Ok(format!(
            "{}/{}",
            self.inner.endpoint,
            utf8_percent_encode(container.name(), &AZURE_QUERY_ENCODE_SET)
        ))
    }

    fn blob_url(&self, blob: &BlobRef) -> Result<String> {
        if blob.name().is_empty() {
            return Err(Error::request_invalid("blob name must not be empty"));
        }

        Ok(format!(
            "{}/{}",
            self.container_url(blob.container())?,
            utf8_percent_encode(blob.name(), &AZURE_PATH_ENCODE_SET)
        ))
    }
}

fn blob_target(blob: &BlobRef) -> String {
    format!("blob {}/{}", blob.container().name(), blob.name())
}

fn encode_query(v: &str) -> String {
    utf8_percent_encode(v, &AZURE_QUERY_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryBlobService;
    use azblob_core::{CancellationToken, ErrorKind, StaticEnv};
    use azblob_file_read_tokio::TokioFileRead;
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const ACCOUNT: &str = "devstoreaccount1";
    const KEY: &str =
        "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

    fn config() -> Config {
        Config {
            account_name: Some(ACCOUNT.to_string()),
            account_key: Some(KEY.to_string()),
            ..Default::default()
        }
    }

    fn client_with(service: &MemoryBlobService, config: Config) -> BlobStoreClient {
        let ctx = Context::new()
            .with_file_read(TokioFileRead)
            .with_http_send(service.clone());
        BlobStoreClient::new(ctx, config).unwrap()
    }

    fn client(service: &MemoryBlobService) -> BlobStoreClient {
        client_with(service, config())
    }

    fn small_blocks() -> Config {
        Config {
            upload: UploadOptions {
                block_size: 4,
                max_single_put_size: 8,
                parallelism: 2,
            },
            ..config()
        }
    }

    #[test]
    fn test_new_requires_account() {
        let service = MemoryBlobService::new(ACCOUNT);
        let ctx = Context::new()
            .with_env(StaticEnv::default())
            .with_http_send(service.clone());

        let config = Config::from_env(&ctx).unwrap();
        let err = BlobStoreClient::new(ctx, config).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(service.requests().is_empty());
    }

    #[test]
    fn test_new_rejects_relative_endpoint() {
        let config = Config {
            endpoint: Some("not a url".to_string()),
            ..config()
        };

        let err = BlobStoreClient::new(Context::new(), config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_new_rejects_zero_block_size() {
        let mut config = config();
        config.upload.block_size = 0;

        let err = BlobStoreClient::new(Context::new(), config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_urls() {
        let client = client(&MemoryBlobService::new(ACCOUNT));
        let blob = client.container("my container").blob("dir/a+b.txt");

        assert_eq!(
            client.endpoint(),
            "https://devstoreaccount1.blob.core.windows.net"
        );
        assert_eq!(
            client.blob_url(&blob).unwrap(),
            "https://devstoreaccount1.blob.core.windows.net/my%20container/dir/a%2Bb.txt"
        );

        let foreign = ContainerRef::new("other", "mycontainer").blob("a.txt");
        let err = client.blob_url(&foreign).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }

    #[tokio::test]
    async fn test_create_container_twice() {
        let _ = env_logger::builder().is_test(true).try_init();

        let service = MemoryBlobService::new(ACCOUNT);
        let client = client(&service);

        let container = client.create_container("newbucket").await.unwrap();
        assert_eq!(container, ContainerRef::new(ACCOUNT, "newbucket"));
        assert!(service.has_container("newbucket"));

        let err = client.create_container("newbucket").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.service_code(), Some("ContainerAlreadyExists"));
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    }

    #[tokio::test]
    async fn test_upload_file_then_list() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("temp");
        let client = client(&service);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"Hello temporary blob here!\n")
            .unwrap();

        let blob = client.upload_file("temp", &path).await.unwrap();
        assert_eq!(blob.name(), "hello.txt");
        assert_eq!(service.count("PutBlob"), 1);

        let names = client.list_blobs("temp").await.unwrap();
        assert_eq!(names, vec!["hello.txt".to_string()]);
        assert_eq!(
            service.blob("temp", "hello.txt").unwrap(),
            Bytes::from_static(b"Hello temporary blob here!\n")
        );
    }

    #[tokio::test]
    async fn test_upload_same_file_twice_lists_once() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("temp");
        let client = client(&service);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, b"first").unwrap();
        client.upload_file("temp", &path).await.unwrap();

        std::fs::write(&path, b"second").unwrap();
        client.upload_file("temp", &path).await.unwrap();

        let names = client.list_blobs("temp").await.unwrap();
        assert_eq!(names, vec!["report.pdf".to_string()]);
        assert_eq!(
            service.blob("temp", "report.pdf").unwrap(),
            Bytes::from_static(b"second")
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_too_many_blocks() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("c");
        let config = Config {
            upload: UploadOptions {
                block_size: 1,
                max_single_put_size: 8,
                parallelism: 4,
            },
            ..config()
        };
        let client = client_with(&service, config);
        let blob = client.container("c").blob("huge.bin");

        let err = client
            .upload_bytes(&blob, Bytes::from(vec![0u8; 50_001]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
        assert!(service.requests().is_empty());
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("temp");
        let client = client(&service);
        let dir = tempfile::tempdir().unwrap();

        let err = client
            .upload_file("temp", dir.path().join("missing.txt"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert!(service.requests().is_empty());
    }

    #[tokio::test]
    async fn test_list_empty_container() {
        let service = MemoryBlobService::new(ACCOUNT);
        let client = client(&service);

        client.create_container("empty").await.unwrap();
        assert!(client.list_blobs("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_follows_markers() {
        let service = MemoryBlobService::new(ACCOUNT)
            .with_container("paged")
            .with_page_size(2);
        let client = client(&service);
        let container = client.container("paged");

        for name in ["e", "a", "d", "b", "c"] {
            client
                .upload_bytes(&container.blob(name), Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let names = client.list_blobs("paged").await.unwrap();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(service.count("ListBlobs"), 3);

        let page = client.list_blobs_page("paged", None, Some(1)).await.unwrap();
        assert_eq!(page.blobs.len(), 1);
        assert_eq!(page.blobs[0].content_length, 1);
        assert_eq!(page.next_marker.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_round_trip_single_put() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("c");
        let client = client_with(&service, small_blocks());
        let blob = client.container("c").blob("small.bin");

        client
            .upload_bytes(&blob, Bytes::from_static(b"12345678"))
            .await
            .unwrap();

        assert_eq!(
            client.download_blob(&blob).await.unwrap(),
            Bytes::from_static(b"12345678")
        );
        assert_eq!(service.count("PutBlob"), 1);
        assert_eq!(service.count("PutBlock"), 0);
    }

    #[tokio::test]
    async fn test_round_trip_staged() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("c");
        let client = client_with(&service, small_blocks());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let content: Vec<u8> = (0..=254u8).collect();
        std::fs::write(&path, &content).unwrap();

        let blob = client.upload_file("c", &path).await.unwrap();

        assert_eq!(client.download_blob(&blob).await.unwrap(), content);
        assert_eq!(service.count("PutBlob"), 0);
        assert_eq!(service.count("PutBlock"), 64);
        assert_eq!(service.count("PutBlockList"), 1);
    }

    #[tokio::test]
    async fn test_staged_upload_stops_on_failure() {
        let service = MemoryBlobService::new(ACCOUNT)
            .with_container("c")
            .with_fault("PutBlock", StatusCode::SERVICE_UNAVAILABLE);
        let client = client_with(&service, small_blocks());
        let blob = client.container("c").blob("big.bin");

        let err = client
            .upload_bytes(&blob, Bytes::from(vec![7u8; 64]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Service);
        assert!(err.is_retryable());
        assert_eq!(service.count("PutBlockList"), 0);
        assert!(service.count("PutBlock") < 16);
        assert!(service.blob("c", "big.bin").is_none());
    }

    #[tokio::test]
    async fn test_download_missing_blob() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("c");
        let client = client(&service);

        let err = client
            .download_blob(&client.container("c").blob("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_blob() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("c");
        let client = client(&service);
        let blob = client.container("c").blob("hello.txt");

        client
            .upload_bytes(&blob, Bytes::from_static(b"hello"))
            .await
            .unwrap();
        client.delete_blob(&blob).await.unwrap();
        assert!(client.list_blobs("c").await.unwrap().is_empty());

        let err = client.delete_blob(&blob).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.service_code(), Some("BlobNotFound"));
    }

    #[tokio::test]
    async fn test_delete_container() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("c");
        let client = client(&service);

        client.delete_container("c").await.unwrap();
        assert!(!service.has_container("c"));

        let err = client.delete_container("c").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let service = MemoryBlobService::new(ACCOUNT).with_container("c");
        let token = CancellationToken::new();
        let ctx = Context::new()
            .with_http_send(service.clone())
            .with_cancellation(token.clone());
        let client = BlobStoreClient::new(ctx, config()).unwrap();

        token.cancel();
        let err = client.list_blobs("c").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(service.requests().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let service = MemoryBlobService::new("someoneelse").with_container("c");
        let client = client(&service);

        let err = client.list_blobs("c").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Service);
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(err.service_code(), Some("AuthenticationFailed"));
        assert!(!err.is_retryable());
    }
}
