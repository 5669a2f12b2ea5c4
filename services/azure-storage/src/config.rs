use std::fmt::{Debug, Formatter};

use azblob_core::utils::Redact;
use azblob_core::{Context, Error, Result};

use crate::connection_string;
use crate::constants::*;
use crate::Credential;

/// Config carries all the configuration for the blob storage client.
#[derive(Clone, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct Config {
    /// `account_name` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`STORAGE_ACCOUNT_NAME`], then `AZURE_STORAGE_ACCOUNT`
    /// - `AccountName` of `STORAGE_CONNECTION_STRING`
    pub account_name: Option<String>,
    /// `account_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: [`STORAGE_ACCOUNT_KEY`], then `AZURE_STORAGE_ACCESS_KEY`
    /// - `AccountKey` of `STORAGE_CONNECTION_STRING`
    pub account_key: Option<String>,
    /// Blob service endpoint, like `https://myaccount.blob.core.windows.net`.
    ///
    /// Defaults to the public cloud endpoint of `account_name` when unset.
    pub endpoint: Option<String>,
    /// Tuning for blob uploads.
    pub upload: UploadOptions,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_name", &self.account_name)
            .field("account_key", &Redact::from(&self.account_key))
            .field("endpoint", &self.endpoint)
            .field("upload", &self.upload)
            .finish()
    }
}

/// UploadOptions decides how a payload is sent to the service.
///
/// Payloads up to `max_single_put_size` bytes go out in a single Put Blob.
/// Bigger ones are staged as `block_size` blocks, at most `parallelism` in
/// flight, then committed with Put Block List.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOptions {
    /// Size of every staged block but the last one.
    pub block_size: usize,
    /// Largest payload sent with a single request.
    pub max_single_put_size: u64,
    /// Maximum number of blocks in flight.
    pub parallelism: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            max_single_put_size: DEFAULT_MAX_SINGLE_PUT_SIZE,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl UploadOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::config_invalid("upload block size must not be zero"));
        }
        if self.parallelism == 0 {
            return Err(Error::config_invalid("upload parallelism must not be zero"));
        }
        Ok(())
    }
}

impl Config {
    /// Load config from env.
    ///
    /// `STORAGE_CONNECTION_STRING` is parsed first, then every explicit
    /// variable that is set overrides the value it carried.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let mut config = match ctx.env_var(STORAGE_CONNECTION_STRING) {
            Some(v) if !v.trim().is_empty() => Config::try_from_connection_string(&v)?,
            _ => Config::default(),
        };

        if let Some(v) = ctx
            .env_var(STORAGE_ACCOUNT_NAME)
            .or_else(|| ctx.env_var(AZURE_STORAGE_ACCOUNT))
        {
            config.account_name = Some(v);
        }

        if let Some(v) = ctx
            .env_var(STORAGE_ACCOUNT_KEY)
            .or_else(|| ctx.env_var(AZURE_STORAGE_ACCESS_KEY))
        {
            config.account_key = Some(v);
        }

        if let Some(v) = ctx.env_var(STORAGE_ENDPOINT) {
            config.endpoint = Some(v);
        }

        Ok(config)
    }

    /// Parses an [Azure connection string][1] into a configuration object.
    ///
    /// The connection string doesn't have to specify all required parameters
    /// because the user is still allowed to set them later directly on the object.
    ///
    /// An example of a connection string looks like:
    ///
    /// ```txt
    /// AccountName=mystorageaccount;
    /// AccountKey=Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==;
    /// BlobEndpoint=https://mystorageaccount.blob.core.windows.net
    /// ```
    ///
    /// [1]: https://learn.microsoft.com/en-us/azure/storage/common/storage-configure-connection-string
    pub fn try_from_connection_string(conn_str: &str) -> Result<Self> {
        connection_string::parse(conn_str)
    }

    /// Build the Shared Key credential out of this config.
    ///
    /// Fails with `ConfigInvalid` if the account name or key is missing or empty.
    pub fn credential(&self) -> Result<Credential> {
        let account_name = match self.account_name.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => {
                return Err(Error::config_invalid(format!(
                    "storage account name is missing, set {STORAGE_ACCOUNT_NAME}"
                )))
            }
        };
        let account_key = match self.account_key.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => {
                return Err(Error::config_invalid(format!(
                    "storage account key is missing, set {STORAGE_ACCOUNT_KEY}"
                )))
            }
        };

        Ok(Credential::with_shared_key(account_name, account_key))
    }

    /// The blob service endpoint without trailing slash.
    pub fn endpoint_or_default(&self, account_name: &str) -> String {
        match self.endpoint.as_deref() {
            Some(v) if !v.is_empty() => v.trim_end_matches('/').to_string(),
            _ => format!("https://{account_name}.blob.core.windows.net"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azblob_core::{ErrorKind, StaticEnv};
    use pretty_assertions::assert_eq;

    fn ctx(pairs: &[(&str, &str)]) -> Context {
        Context::new().with_env(StaticEnv::from_pairs(pairs.iter().copied()))
    }

    #[test]
    fn test_from_env() {
        let config = Config::from_env(&ctx(&[
            (STORAGE_ACCOUNT_NAME, "myaccount"),
            (STORAGE_ACCOUNT_KEY, "bXlrZXk="),
            (STORAGE_ENDPOINT, "http://127.0.0.1:10000/myaccount"),
        ]))
        .unwrap();

        assert_eq!(config.account_name.as_deref(), Some("myaccount"));
        assert_eq!(config.account_key.as_deref(), Some("bXlrZXk="));
        assert_eq!(
            config.endpoint.as_deref(),
            Some("http://127.0.0.1:10000/myaccount")
        );
        assert_eq!(config.upload, UploadOptions::default());
    }

    #[test]
    fn test_try_from_connection_string() {
        let config = Config::try_from_connection_string(
            "DefaultEndpointsProtocol=https;AccountName=myaccount;AccountKey=bXlrZXk=;EndpointSuffix=core.chinacloudapi.cn",
        )
        .unwrap();

        assert_eq!(config.account_name.as_deref(), Some("myaccount"));
        assert_eq!(config.account_key.as_deref(), Some("bXlrZXk="));
        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://myaccount.blob.core.chinacloudapi.cn")
        );

        let err = Config::try_from_connection_string("AccountName").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_from_env_legacy_names() {
        let config = Config::from_env(&ctx(&[
            (AZURE_STORAGE_ACCOUNT, "legacy"),
            (AZURE_STORAGE_ACCESS_KEY, "bGVnYWN5"),
        ]))
        .unwrap();

        assert_eq!(config.account_name.as_deref(), Some("legacy"));
        assert_eq!(config.account_key.as_deref(), Some("bGVnYWN5"));
    }

    #[test]
    fn test_from_env_explicit_overrides_connection_string() {
        let config = Config::from_env(&ctx(&[
            (
                STORAGE_CONNECTION_STRING,
                "AccountName=fromconn;AccountKey=a2V5;EndpointSuffix=core.windows.net",
            ),
            (STORAGE_ACCOUNT_NAME, "explicit"),
        ]))
        .unwrap();

        assert_eq!(config.account_name.as_deref(), Some("explicit"));
        assert_eq!(config.account_key.as_deref(), Some("a2V5"));
        assert_eq!(
            config.endpoint.as_deref(),
            Some("https://fromconn.blob.core.windows.net")
        );
    }

    #[test]
    fn test_credential_missing() {
        let cases = vec![
            ("empty", Config::default()),
            (
                "no key",
                Config {
                    account_name: Some("myaccount".to_string()),
                    ..Default::default()
                },
            ),
            (
                "empty name",
                Config {
                    account_name: Some("".to_string()),
                    account_key: Some("a2V5".to_string()),
                    ..Default::default()
                },
            ),
        ];

        for (name, config) in cases {
            let err = config.credential().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "failed on {name}");
        }
    }

    #[test]
    fn test_endpoint_or_default() {
        let mut config = Config::default();
        assert_eq!(
            config.endpoint_or_default("myaccount"),
            "https://myaccount.blob.core.windows.net"
        );

        config.endpoint = Some("http://127.0.0.1:10000/devstoreaccount1/".to_string());
        assert_eq!(
            config.endpoint_or_default("devstoreaccount1"),
            "http://127.0.0.1:10000/devstoreaccount1"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = Config {
            account_name: Some("myaccount".to_string()),
            account_key: Some("myaccountkey".to_string()),
            ..Default::default()
        };

        let out = format!("{config:?}");
        assert!(out.contains("mya***key"));
        assert!(!out.contains("myaccountkey"));
    }
}
