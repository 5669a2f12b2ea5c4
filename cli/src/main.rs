//! Quickstart for the blob storage client.
//!
//! Uploads a local file to an existing container, creates a container and
//! fills it with a temporary blob, lists both, then cleans up after a
//! confirmation.

mod confirm;
mod demo;
mod settings;

use std::process::ExitCode;

use anyhow::Result;
use azblob_core::{Context, OsEnv};
use azblob_file_read_tokio::TokioFileRead;
use azblob_http_send_reqwest::ReqwestHttpSend;
use azblob_storage::{BlobStoreClient, Config};
use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use settings::Settings;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine, the environment may be set already.
    let _ = dotenv::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match Settings::try_parse() {
        Ok(settings) => settings,
        Err(err) if matches!(
            err.kind(),
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
        ) =>
        {
            err.exit()
        }
        Err(err) => {
            error!("invalid settings: {err}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling outstanding requests");
                cancel.cancel();
            }
        }
    });

    match run(settings, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let retryable = err
                .downcast_ref::<azblob_core::Error>()
                .is_some_and(|e| e.is_retryable());
            error!("quickstart failed: {err:#} (retryable: {retryable})");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings, cancel: CancellationToken) -> Result<()> {
    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
        .with_cancellation(cancel.clone());

    let config = Config::from_env(&ctx)?;
    let client = BlobStoreClient::new(ctx, config)?;
    info!(
        "connected to account {} at {}",
        client.account_name(),
        client.endpoint()
    );

    let confirm = confirm::for_mode(settings.yes);
    let report = demo::run(&client, &settings, confirm.as_ref(), &cancel).await?;

    info!(
        "done: removed {} ({} blob(s) listed) and {} ({} blob(s) listed)",
        report.uploaded,
        report.temp_container_blobs.len(),
        report.temp_blob,
        report.new_container_blobs.len(),
    );
    Ok(())
}
