//! Azure Blob Storage client
//!
//! This crate provides a small client for the blob service of an Azure
//! storage account:
//! - Shared Key request signing
//! - Container create, list and delete
//! - Block blob upload (single shot or staged blocks), download and delete
//!
//! # Example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use azblob_core::{Context, OsEnv};
//! use azblob_file_read_tokio::TokioFileRead;
//! use azblob_http_send_reqwest::ReqwestHttpSend;
//! use azblob_storage::{BlobStoreClient, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Create context with proper FileRead and HttpSend implementations
//!     let ctx = Context::new()
//!         .with_file_read(TokioFileRead)
//!         .with_http_send(ReqwestHttpSend::default())
//!         .with_env(OsEnv);
//!
//!     // Read STORAGE_ACCOUNT_NAME, STORAGE_ACCOUNT_KEY and friends
//!     let config = Config::from_env(&ctx)?;
//!     let client = BlobStoreClient::new(ctx, config)?;
//!
//!     let container = client.create_container("mycontainer").await?;
//!     let blob = client.upload_file(container.name(), "hello.txt").await?;
//!     println!("uploaded {blob}");
//!
//!     Ok(())
//! }
//! ```

mod constants;
pub use constants::AZURE_VERSION;

mod config;
pub use config::{Config, UploadOptions};

mod connection_string;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::StaticCredentialProvider;

mod sign_request;
pub use sign_request::RequestSigner;

mod reference;
pub use reference::{BlobRef, ContainerRef};

mod model;
pub use model::{BlobItem, ListBlobsPage};

mod error;

mod client;
pub use client::BlobStoreClient;

mod upload;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
