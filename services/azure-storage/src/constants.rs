use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Headers used in azure services.
pub const X_MS_DATE: &str = "x-ms-date";
pub const X_MS_VERSION: &str = "x-ms-version";
pub const X_MS_BLOB_TYPE: &str = "x-ms-blob-type";
pub const X_MS_ERROR_CODE: &str = "x-ms-error-code";
pub const CONTENT_MD5: &str = "content-md5";

/// Service version sent with every request.
pub const AZURE_VERSION: &str = "2023-11-03";

pub const BLOCK_BLOB: &str = "BlockBlob";

// Env values used to configure the client.
pub const STORAGE_ACCOUNT_NAME: &str = "STORAGE_ACCOUNT_NAME";
pub const STORAGE_ACCOUNT_KEY: &str = "STORAGE_ACCOUNT_KEY";
pub const STORAGE_ENDPOINT: &str = "STORAGE_ENDPOINT";
pub const STORAGE_CONNECTION_STRING: &str = "STORAGE_CONNECTION_STRING";
pub const AZURE_STORAGE_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
pub const AZURE_STORAGE_ACCESS_KEY: &str = "AZURE_STORAGE_ACCESS_KEY";

// Upload defaults.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;
pub const DEFAULT_MAX_SINGLE_PUT_SIZE: u64 = 256 * 1024 * 1024;
pub const DEFAULT_PARALLELISM: usize = 16;
/// A block blob holds at most this many committed blocks.
pub const MAX_BLOCKS: u64 = 50_000;

/// Characters left untouched in query values, per RFC 3986 unreserved set.
pub static AZURE_QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Same as the query set, but `/` separates virtual directories in blob names.
pub static AZURE_PATH_ENCODE_SET: AsciiSet = AZURE_QUERY_ENCODE_SET.remove(b'/');
