use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::utils::path::app_dir;

/// Environment variable holding the tracing filter directives.
pub const LOG_ENV: &str = "GEMINIWEB_LOG";
const DEFAULT_DIRECTIVES: &str = "warn";

pub fn default_log_path() -> PathBuf {
    app_dir().join("geminiweb.log")
}

/// Filter from `GEMINIWEB_LOG`, or `warn` when unset or unparsable.
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. The terminal belongs to the UI, so events go to a file.
pub fn init_tracing(log_file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file = open_log_file(log_file)?;
    let directives = std::env::var(LOG_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(directives.as_deref()))
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| format!("cannot initialise logging: {err}"))?;
    Ok(())
}
