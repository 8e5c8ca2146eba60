use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Name of the per-user data directory under the home directory.
pub const APP_DIR_NAME: &str = ".geminiweb";

pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

/// `~/.geminiweb`, or a relative `.geminiweb` when no home can be resolved.
pub fn app_dir() -> PathBuf {
    home_dir()
        .map(|home| home.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(APP_DIR_NAME))
}

/// Expand a leading `~` or `~/` to the home directory.
pub fn expand_tilde(input: &str) -> PathBuf {
    expand_tilde_with(input, home_dir().as_deref())
}

pub(crate) fn expand_tilde_with(input: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(input);
    };
    if input == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = input
        .strip_prefix("~/")
        .or_else(|| input.strip_prefix("~\\"))
    {
        return home.join(rest);
    }
    PathBuf::from(input)
}

/// Resolve `input` against the current directory after tilde expansion.
pub fn absolutize(input: &str) -> std::io::Result<PathBuf> {
    let expanded = expand_tilde(input);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(std::env::current_dir()?.join(expanded))
    }
}

/// Display a path with the home directory abbreviated to `~`.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = home_dir() {
            if let Ok(relative) = path.strip_prefix(&home) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
