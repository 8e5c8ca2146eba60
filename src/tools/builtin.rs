//! Tools shipped with the client.

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::{Tool, ToolArgs};
use crate::utils::path::expand_tilde;

fn string_arg<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str, String> {
    match args.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.as_str()),
        Some(_) => Err(format!("argument '{key}' must be a non-empty string")),
        None => Err(format!("missing argument '{key}'")),
    }
}

pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file"
    }

    fn usage(&self) -> &str {
        "{\"path\": string}"
    }

    fn requires_confirmation(&self, _args: &ToolArgs) -> bool {
        false
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, String> {
        let path = expand_tilde(string_arg(args, "path")?);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))
    }
}

pub struct ListDirectory;

#[async_trait]
impl Tool for ListDirectory {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List entries of a directory; directories end with /"
    }

    fn usage(&self) -> &str {
        "{\"path\": string}"
    }

    fn requires_confirmation(&self, _args: &ToolArgs) -> bool {
        false
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, String> {
        let path = expand_tilde(string_arg(args, "path").unwrap_or("."));
        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| e.to_string())? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        Ok(names.join("\n"))
    }
}

pub struct WriteFile;

#[async_trait]
impl Tool for WriteFile {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a text file"
    }

    fn usage(&self) -> &str {
        "{\"path\": string, \"content\": string}"
    }

    fn requires_confirmation(&self, _args: &ToolArgs) -> bool {
        true
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, String> {
        let path = expand_tilde(string_arg(args, "path")?);
        let content = match args.get("content") {
            Some(Value::String(content)) => content.as_str(),
            _ => return Err("missing argument 'content'".to_string()),
        };
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| format!("{}: {e}", path.display()))?;
        Ok(format!("wrote {} bytes to {}", content.len(), path.display()))
    }
}

pub struct RunCommand;

#[async_trait]
impl Tool for RunCommand {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command and return its combined output"
    }

    fn usage(&self) -> &str {
        "{\"command\": string}"
    }

    fn requires_confirmation(&self, _args: &ToolArgs) -> bool {
        true
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, String> {
        let command = string_arg(args, "command")?;
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to spawn: {e}"))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&stderr);
        }

        if output.status.success() {
            Ok(text)
        } else {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            Err(format!("exit status {code}: {}", text.trim()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(pairs: &[(&str, &str)]) -> ToolArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn write_then_read_and_list() {
        let dir = tempdir().expect("tempdir");
        let file = dir.path().join("note.txt");
        let file_str = file.display().to_string();
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");

        let wrote = WriteFile
            .execute(&args(&[("path", file_str.as_str()), ("content", "hello")]))
            .await
            .expect("write");
        assert!(wrote.starts_with("wrote 5 bytes"));

        let read = ReadFile
            .execute(&args(&[("path", file_str.as_str())]))
            .await
            .expect("read");
        assert_eq!(read, "hello");

        let dir_str = dir.path().display().to_string();
        let listing = ListDirectory
            .execute(&args(&[("path", dir_str.as_str())]))
            .await
            .expect("list");
        assert_eq!(listing, "note.txt\nsub/");
    }

    #[tokio::test]
    async fn missing_arguments_are_reported() {
        let err = ReadFile.execute(&ToolArgs::new()).await.expect_err("missing");
        assert_eq!(err, "missing argument 'path'");
    }

    #[test]
    fn mutating_tools_require_confirmation() {
        let empty = ToolArgs::new();
        assert!(!ReadFile.requires_confirmation(&empty));
        assert!(!ListDirectory.requires_confirmation(&empty));
        assert!(WriteFile.requires_confirmation(&empty));
        assert!(RunCommand.requires_confirmation(&empty));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_command_reports_exit_status() {
        let ok = RunCommand
            .execute(&args(&[("command", "echo hi")]))
            .await
            .expect("run");
        assert_eq!(ok, "hi\n");

        let err = RunCommand
            .execute(&args(&[("command", "echo nope >&2; exit 3")]))
            .await
            .expect_err("fails");
        assert_eq!(err, "exit status 3: nope");
    }
}
