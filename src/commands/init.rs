use crate::commands::Out;
use crate::model::Username;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory and an initial `config.json` file.
///
/// # Arguments
/// - `finwatch_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/finwatch`
/// - `base_url` - The address of the finance service, e.g. `http://localhost:8000`
/// - `username` - The user the dashboard shows data for
///
/// # Errors
/// - Returns an error if the config already exists or if any file operations fail.
pub async fn init(finwatch_home: &Path, base_url: &str, username: &Username) -> Result<Out<()>> {
    let config = Config::create(finwatch_home, base_url, username.clone())
        .await
        .context("Unable to create the data directory and config")?;
    Ok(format!(
        "Successfully created the finwatch config at {}",
        config.config_path().display()
    )
    .into())
}
