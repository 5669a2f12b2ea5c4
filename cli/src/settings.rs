use std::path::PathBuf;

use clap::Parser;

/// Walk through the blob storage client against a real storage account.
///
/// Account settings come from `STORAGE_CONNECTION_STRING` or
/// `STORAGE_ACCOUNT_NAME` / `STORAGE_ACCOUNT_KEY`, a `.env` file included.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    /// Local file uploaded to the temporary container
    #[arg(env = "UPLOAD_FILE_PATH")]
    pub upload_path: PathBuf,

    /// Existing container receiving the uploaded file
    #[arg(long, env = "EXISTING_TEMP_CONTAINER_NAME")]
    pub temp_container: String,

    /// Existing container that is never modified
    #[arg(long, env = "EXISTING_PERM_CONTAINER_NAME")]
    pub perm_container: String,

    /// Container created, filled and deleted again
    #[arg(long, env = "NEW_CONTAINER_NAME", default_value = "newbucket")]
    pub new_container: String,

    /// Do not wait for <ENTER> before cleaning up
    #[arg(short, long, env = "AZBLOB_NON_INTERACTIVE")]
    pub yes: bool,
}
