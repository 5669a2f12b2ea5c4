use anyhow::Result;
use azblob_core::{Context, OsEnv};
use azblob_file_read_tokio::TokioFileRead;
use azblob_http_send_reqwest::ReqwestHttpSend;
use azblob_storage::{BlobStoreClient, Config};

/// Print every blob of the container named by the first argument.
///
/// ```shell
/// STORAGE_CONNECTION_STRING="UseDevelopmentStorage=true" cargo run --example list_blobs -- mycontainer
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let _ = env_logger::builder().try_init();
    let _ = dotenv::dotenv();

    let container = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: list_blobs <container>"))?;

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let config = Config::from_env(&ctx)?;
    let client = BlobStoreClient::new(ctx, config)?;

    let mut marker: Option<String> = None;
    loop {
        let page = client
            .list_blobs_page(&container, marker.as_deref(), Some(100))
            .await?;
        for blob in page.blobs {
            println!(
                "{}\t{}\t{}",
                blob.name,
                blob.content_length,
                blob.content_type.as_deref().unwrap_or("-")
            );
        }

        match page.next_marker {
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    Ok(())
}
