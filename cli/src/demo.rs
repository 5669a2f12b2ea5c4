use std::io::Write;

use anyhow::{Context as _, Result};
use azblob_core::ErrorKind;
use azblob_storage::{BlobRef, BlobStoreClient};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::confirm::Confirm;
use crate::settings::Settings;

const TEMP_BLOB_CONTENT: &[u8] = b"Hello temporary blob here!\n";
const CLEANUP_PROMPT: &str =
    "Press <ENTER> to proceed with cleanup: Delete newContainer and testContainer testBlob.";

/// What the demo touched, for the caller to print.
#[derive(Debug)]
pub struct Report {
    /// Blob uploaded to the temporary container, deleted during cleanup.
    pub uploaded: BlobRef,
    /// Blob uploaded to the new container.
    pub temp_blob: BlobRef,
    /// Blobs of the temporary container before cleanup.
    pub temp_container_blobs: Vec<String>,
    /// Blobs of the new container before cleanup.
    pub new_container_blobs: Vec<String>,
}

/// Run the fixed demo sequence against `client`.
pub async fn run(
    client: &BlobStoreClient,
    settings: &Settings,
    confirm: &dyn Confirm,
    cancel: &CancellationToken,
) -> Result<Report> {
    info!(
        "using containers {} (temporary) and {} (permanent)",
        settings.temp_container, settings.perm_container
    );

    info!(
        "uploading {} to container {}",
        settings.upload_path.display(),
        settings.temp_container
    );
    let uploaded = client
        .upload_file(&settings.temp_container, &settings.upload_path)
        .await
        .with_context(|| format!("failed to upload {}", settings.upload_path.display()))?;

    info!("creating container {}", settings.new_container);
    match client.create_container(&settings.new_container).await {
        Ok(container) => info!("created container {container}"),
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            warn!("container {} already exists, reusing it", settings.new_container)
        }
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to create container {}", settings.new_container)
            })
        }
    }

    let mut temp_file = tempfile::Builder::new()
        .prefix("temp")
        .tempfile()
        .context("failed to create temporary file")?;
    temp_file
        .write_all(TEMP_BLOB_CONTENT)
        .context("failed to write temporary file")?;
    temp_file.flush()?;

    info!("uploading temporary file to container {}", settings.new_container);
    let temp_blob = client
        .upload_file(&settings.new_container, temp_file.path())
        .await
        .context("failed to upload temporary file")?;

    let temp_container_blobs = client
        .list_blobs(&settings.temp_container)
        .await
        .with_context(|| format!("failed to list container {}", settings.temp_container))?;
    let new_container_blobs = client
        .list_blobs(&settings.new_container)
        .await
        .with_context(|| format!("failed to list container {}", settings.new_container))?;
    println!("tempContainerBlobs: {temp_container_blobs:?}");
    println!("newContainerBlobs: {new_container_blobs:?}");

    tokio::select! {
        biased;

        _ = cancel.cancelled() => anyhow::bail!("interrupted before cleanup"),
        res = confirm.confirm(CLEANUP_PROMPT) => res?,
    }

    info!("deleting container {}", settings.new_container);
    client
        .delete_container(&settings.new_container)
        .await
        .with_context(|| format!("failed to delete container {}", settings.new_container))?;

    info!("deleting {uploaded}");
    client
        .delete_blob(&uploaded)
        .await
        .with_context(|| format!("failed to delete {uploaded}"))?;

    Ok(Report {
        uploaded,
        temp_blob,
        temp_container_blobs,
        new_container_blobs,
    })
}
