//! An in-memory blob service for tests.
//!
//! [`MemoryBlobService`] implements [`HttpSend`] and answers the subset of the
//! blob REST API the client uses, so client code can be exercised without a
//! storage account.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use azblob_core::{HttpSend, Result};
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;

use crate::constants::{BLOCK_BLOB, X_MS_BLOB_TYPE, X_MS_DATE, X_MS_ERROR_CODE, X_MS_VERSION};

/// A request as seen by [`MemoryBlobService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// REST operation, like `PutBlob` or `ListBlobs`.
    pub operation: &'static str,
    /// Container addressed.
    pub container: String,
    /// Blob addressed, empty for container operations.
    pub blob: String,
}

/// In-memory stand-in for the blob service of one account.
///
/// Clones share state, keep one to inspect what the client did.
#[derive(Debug, Clone)]
pub struct MemoryBlobService {
    account_name: String,
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    containers: HashMap<String, Container>,
    page_size: Option<usize>,
    faults: HashMap<&'static str, StatusCode>,
    requests: Vec<RecordedRequest>,
}

#[derive(Debug, Default)]
struct Container {
    blobs: BTreeMap<String, Bytes>,
    blocks: HashMap<String, HashMap<String, Bytes>>,
}

impl MemoryBlobService {
    /// Create an empty service for `account_name`.
    pub fn new(account_name: &str) -> Self {
        Self {
            account_name: account_name.to_string(),
            state: Arc::default(),
        }
    }

    /// Cap every listing page at `size` blobs.
    pub fn with_page_size(self, size: usize) -> Self {
        self.lock().page_size = Some(size);
        self
    }

    /// Start with an empty container `name`.
    pub fn with_container(self, name: &str) -> Self {
        self.lock()
            .containers
            .insert(name.to_string(), Container::default());
        self
    }

    /// Answer every `operation` request with `status`.
    pub fn with_fault(self, operation: &'static str, status: StatusCode) -> Self {
        self.lock().faults.insert(operation, status);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Number of requests received for `operation`.
    pub fn count(&self, operation: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.operation == operation)
            .count()
    }

    /// Committed content of `container/blob`.
    pub fn blob(&self, container: &str, blob: &str) -> Option<Bytes> {
        self.lock()
            .containers
            .get(container)
            .and_then(|c| c.blobs.get(blob).cloned())
    }

    /// Whether `container` exists.
    pub fn has_container(&self, container: &str) -> bool {
        self.lock().containers.contains_key(container)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("lock poisoned")
    }

    fn handle(&self, req: Request<Bytes>) -> Response<Bytes> {
        let authorized = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(&format!("SharedKey {}:", self.account_name)))
            && req.headers().contains_key(X_MS_DATE)
            && req.headers().contains_key(X_MS_VERSION);
        if !authorized {
            return error(StatusCode::FORBIDDEN, "AuthenticationFailed");
        }

        let path = req.uri().path().trim_start_matches('/');
        let (container, blob) = path.split_once('/').unwrap_or((path, ""));
        let container = decode(container);
        let blob = decode(blob);
        let query: HashMap<String, String> = req
            .uri()
            .query()
            .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let operation = operation(req.method(), &query, blob.is_empty());
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            operation,
            container: container.clone(),
            blob: blob.clone(),
        });
        if let Some(status) = state.faults.get(operation) {
            return error(*status, "InjectedFault");
        }

        match operation {
            "CreateContainer" => {
                if state.containers.contains_key(&container) {
                    return error(StatusCode::CONFLICT, "ContainerAlreadyExists");
                }
                state.containers.insert(container, Container::default());
                empty(StatusCode::CREATED)
            }
            "DeleteContainer" => match state.containers.remove(&container) {
                Some(_) => empty(StatusCode::ACCEPTED),
                None => error(StatusCode::NOT_FOUND, "ContainerNotFound"),
            },
            "ListBlobs" => {
                let page_size = state.page_size;
                let Some(c) = state.containers.get(&container) else {
                    return error(StatusCode::NOT_FOUND, "ContainerNotFound");
                };
                let max_results = query
                    .get("maxresults")
                    .and_then(|v| v.parse::<usize>().ok())
                    .into_iter()
                    .chain(page_size)
                    .min()
                    .unwrap_or(5000);
                list_blobs(c, query.get("marker").map(String::as_str), max_results)
            }
            _ => {
                let Some(c) = state.containers.get_mut(&container) else {
                    return error(StatusCode::NOT_FOUND, "ContainerNotFound");
                };
                handle_blob(c, operation, &blob, &query, req)
            }
        }
    }
}

#[async_trait]
impl HttpSend for MemoryBlobService {
    async fn http_send(&self, req: Request<Bytes>) -> Result<Response<Bytes>> {
        Ok(self.handle(req))
    }
}

fn operation(method: &Method, query: &HashMap<String, String>, is_container: bool) -> &'static str {
    let comp = query.get("comp").map(String::as_str);
    match (method.as_str(), is_container, comp) {
        ("PUT", true, _) => "CreateContainer",
        ("DELETE", true, _) => "DeleteContainer",
        ("GET", true, Some("list")) => "ListBlobs",
        ("PUT", false, Some("block")) => "PutBlock",
        ("PUT", false, Some("blocklist")) => "PutBlockList",
        ("PUT", false, None) => "PutBlob",
        ("GET", false, None) => "GetBlob",
        ("DELETE", false, None) => "DeleteBlob",
        _ => "Unsupported",
    }
}

fn handle_blob(
    c: &mut Container,
    operation: &str,
    blob: &str,
    query: &HashMap<String, String>,
    req: Request<Bytes>,
) -> Response<Bytes> {
    match operation {
        "PutBlob" => {
            if req.headers().get(X_MS_BLOB_TYPE).map(|v| v.as_bytes()) != Some(BLOCK_BLOB.as_bytes()) {
                return error(StatusCode::BAD_REQUEST, "MissingRequiredHeader");
            }
            c.blobs.insert(blob.to_string(), req.into_body());
            empty(StatusCode::CREATED)
        }
        "PutBlock" => {
            let Some(id) = query.get("blockid") else {
                return error(StatusCode::BAD_REQUEST, "InvalidQueryParameterValue");
            };
            c.blocks
                .entry(blob.to_string())
                .or_default()
                .insert(id.clone(), req.into_body());
            empty(StatusCode::CREATED)
        }
        "PutBlockList" => {
            let body = String::from_utf8_lossy(req.body()).into_owned();
            let staged = c.blocks.remove(blob).unwrap_or_default();

            let mut content = Vec::new();
            for id in body
                .split("<Latest>")
                .skip(1)
                .filter_map(|v| v.split_once("</Latest>").map(|(id, _)| id))
            {
                match staged.get(id) {
                    Some(data) => content.extend_from_slice(data),
                    None => return error(StatusCode::BAD_REQUEST, "InvalidBlockList"),
                }
            }
            c.blobs.insert(blob.to_string(), Bytes::from(content));
            empty(StatusCode::CREATED)
        }
        "GetBlob" => match c.blobs.get(blob) {
            Some(data) => Response::builder()
                .status(StatusCode::OK)
                .body(data.clone())
                .unwrap_or_default(),
            None => error(StatusCode::NOT_FOUND, "BlobNotFound"),
        },
        "DeleteBlob" => match c.blobs.remove(blob) {
            Some(_) => empty(StatusCode::ACCEPTED),
            None => error(StatusCode::NOT_FOUND, "BlobNotFound"),
        },
        _ => error(StatusCode::BAD_REQUEST, "UnsupportedHttpVerb"),
    }
}

fn list_blobs(c: &Container, marker: Option<&str>, max_results: usize) -> Response<Bytes> {
    let mut names = c
        .blobs
        .iter()
        .filter(|(name, _)| marker.map_or(true, |m| name.as_str() >= m));
    let page: Vec<_> = names.by_ref().take(max_results).collect();
    let next_marker = names.next().map(|(name, _)| name.as_str()).unwrap_or("");

    let mut s = String::from(
        "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults><Blobs>",
    );
    for (name, data) in page {
        let _ = write!(
            s,
            "<Blob><Name>{}</Name><Properties><Content-Length>{}</Content-Length><Content-Type>application/octet-stream</Content-Type></Properties></Blob>",
            escape(name),
            data.len()
        );
    }
    let _ = write!(s, "</Blobs><NextMarker>{}</NextMarker></EnumerationResults>", escape(next_marker));

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/xml")
        .body(Bytes::from(s))
        .unwrap_or_default()
}

fn decode(v: &str) -> String {
    percent_decode_str(v).decode_utf8_lossy().into_owned()
}

fn escape(v: &str) -> String {
    v.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn empty(status: StatusCode) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .body(Bytes::new())
        .unwrap_or_default()
}

fn error(status: StatusCode, code: &str) -> Response<Bytes> {
    Response::builder()
        .status(status)
        .header(X_MS_ERROR_CODE, code)
        .body(Bytes::from(format!(
            "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>{code}</Code><Message>{code}</Message></Error>"
        )))
        .unwrap_or_default()
}
