pub mod data;
pub mod io;

pub use data::{Config, PersonaConfig, RemoteConfig, ToolsConfig};
pub use io::ConfigError;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = Config::load_from_path(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.model(), data::DEFAULT_MODEL);
        assert!(config.markdown_enabled());
        assert!(!config.auto_approve());
        assert!(config.tools_enabled());
    }

    #[test]
    fn parses_sections_and_personas() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_model = "gemini-2.5-pro"
download_dir = "/tmp/downloads"
auto_approve_tools = true

[remote]
base_url = "https://relay.example"
timeout_secs = 5

[tools]
max_output_bytes = 64

[[personas]]
name = "coder"
description = "Writes code"
system_prompt = "You write Rust."
"#,
        )
        .expect("write");

        let config = Config::load_from_path(&path).expect("load");
        assert_eq!(config.model(), "gemini-2.5-pro");
        assert!(config.auto_approve());
        assert_eq!(config.base_url(), "https://relay.example");
        assert_eq!(config.remote_timeout().as_secs(), 5);
        assert_eq!(config.tool_output_limit(), 64);
        assert_eq!(
            config.persona_dir(),
            std::path::PathBuf::from("/tmp/downloads/personas")
        );
        assert_eq!(config.personas.len(), 1);
        assert_eq!(config.personas[0].system_prompt, "You write Rust.");
    }

    #[test]
    fn invalid_toml_reports_parse_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = [").expect("write");
        let err = Config::load_from_path(&path).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("Failed to parse config at"));
    }
}
