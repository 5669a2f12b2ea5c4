use std::path::{Path, PathBuf};
use std::sync::Arc;

use azblob_core::hash::base64_encode;
use azblob_core::{Context, Error, Result};
use bytes::Bytes;
use log::debug;
use tokio::task::JoinSet;

use crate::constants::MAX_BLOCKS;
use crate::{BlobRef, BlobStoreClient};

/// Where the payload of an upload comes from.
#[derive(Debug, Clone)]
pub(crate) enum UploadSource {
    Memory(Bytes),
    File { path: Arc<PathBuf>, len: u64 },
}

impl UploadSource {
    pub(crate) fn file(path: &Path, len: u64) -> Self {
        UploadSource::File {
            path: Arc::new(path.to_path_buf()),
            len,
        }
    }

    fn len(&self) -> u64 {
        match self {
            UploadSource::Memory(data) => data.len() as u64,
            UploadSource::File { len, .. } => *len,
        }
    }

    async fn read(&self, ctx: &Context, offset: u64, len: usize) -> Result<Bytes> {
        match self {
            UploadSource::Memory(data) => {
                let start = offset as usize;
                Ok(data.slice(start..start + len))
            }
            UploadSource::File { path, .. } => {
                Ok(Bytes::from(ctx.file_read_range(path, offset, len).await?))
            }
        }
    }
}

/// Block ids of one blob must all have the same length.
pub(crate) fn block_id(index: usize) -> String {
    base64_encode(format!("{index:08}").as_bytes())
}

impl BlobStoreClient {
    /// Upload `source` as `blob`, single shot or staged depending on its size.
    pub(crate) async fn upload(&self, blob: &BlobRef, source: UploadSource) -> Result<()> {
        let len = source.len();
        let options = self.upload_options();

        if len <= options.max_single_put_size {
            debug!("uploading {blob} in a single request of {len} bytes");
            let data = source.read(self.context(), 0, len as usize).await?;
            return self.put_blob(blob, data).await;
        }

        self.upload_blocks(blob, source).await
    }

    /// Stage `source` as fixed size blocks, at most `parallelism` in flight,
    /// then commit them in order.
    ///
    /// The first failing block aborts the blocks still in flight. Blocks
    /// already staged are left to expire on the service side.
    async fn upload_blocks(&self, blob: &BlobRef, source: UploadSource) -> Result<()> {
        let len = source.len();
        let block_size = self.upload_options().block_size as u64;
        let parallelism = self.upload_options().parallelism;

        let block_count = len.div_ceil(block_size);
        if block_count > MAX_BLOCKS {
            return Err(Error::request_invalid(format!(
                "{blob} needs {block_count} blocks of {block_size} bytes, more than the {MAX_BLOCKS} a blob can hold"
            )));
        }
        debug!("uploading {blob} as {block_count} blocks of up to {block_size} bytes");

        let mut tasks = JoinSet::new();
        let mut block_ids = Vec::with_capacity(block_count as usize);

        for index in 0..block_count as usize {
            while tasks.len() >= parallelism {
                join_block(&mut tasks).await?;
            }
            self.context().check_cancelled()?;

            let offset = index as u64 * block_size;
            let size = block_size.min(len - offset) as usize;
            let id = block_id(index);
            block_ids.push(id.clone());

            let client = self.clone();
            let blob = blob.clone();
            let source = source.clone();
            tasks.spawn(async move {
                let data = source.read(client.context(), offset, size).await?;
                client.put_block(&blob, &id, data).await
            });
        }

        while !tasks.is_empty() {
            join_block(&mut tasks).await?;
        }

        self.put_block_list(blob, &block_ids).await
    }
}

/// Wait for the next block task, surfacing its failure.
async fn join_block(tasks: &mut JoinSet<Result<()>>) -> Result<()> {
    match tasks.join_next().await {
        Some(Ok(res)) => res,
        Some(Err(e)) => Err(Error::unexpected("block upload task failed").with_source(e)),
        None => Ok(()),
    }
}
