use std::io::{BufRead, BufReader, Read};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use log::info;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;

/// Confirm pauses the demo until the user agrees to go on.
#[async_trait]
pub trait Confirm: Send + Sync {
    /// Show `prompt` and return once the user confirmed.
    async fn confirm(&self, prompt: &str) -> Result<()>;
}

/// Waits for a newline on stdin.
#[derive(Debug, Default)]
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, prompt: &str) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;

        read_line_detached(std::io::stdin())
            .await
            .context("stdin reader stopped before answering")?
            .context("failed to read confirmation from stdin")?;
        Ok(())
    }
}

/// Read one line from `reader` on a dedicated thread.
///
/// The thread is not owned by the runtime, so dropping the receiver and
/// shutting the runtime down never waits for the pending read.
fn read_line_detached<R>(reader: R) -> oneshot::Receiver<std::io::Result<String>>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let res = BufReader::new(reader).read_line(&mut line).map(|_| line);
        let _ = tx.send(res);
    });
    rx
}

/// Confirms right away, for unattended runs.
#[derive(Debug, Default)]
pub struct AutoConfirm;

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, prompt: &str) -> Result<()> {
        info!("{prompt} (confirmed automatically)");
        Ok(())
    }
}

/// Pick the confirmation matching `non_interactive`.
pub fn for_mode(non_interactive: bool) -> Box<dyn Confirm> {
    if non_interactive {
        Box::new(AutoConfirm)
    } else {
        Box::new(StdinConfirm)
    }
}
