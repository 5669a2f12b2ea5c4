use async_trait::async_trait;
use azblob_core::{Context, ProvideCredential, Result};

use crate::credential::Credential;
use crate::Config;

/// StaticCredentialProvider hands out the same Shared Key credential on every call.
#[derive(Clone, Debug)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a provider for the given account name and key.
    pub fn new_shared_key(account_name: &str, account_key: &str) -> Self {
        Self {
            credential: Credential::with_shared_key(account_name, account_key),
        }
    }

    /// Create a provider out of the account settings of `config`.
    ///
    /// Fails with `ConfigInvalid` if the account name or key is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            credential: config.credential()?,
        })
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _ctx: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(self.credential.clone()))
    }
}
