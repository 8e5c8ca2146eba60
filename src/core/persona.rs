use crate::core::config::{Config, PersonaConfig};
use crate::core::error::ChatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const FRONT_MATTER_FENCE: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
}

impl From<&PersonaConfig> for Persona {
    fn from(config: &PersonaConfig) -> Self {
        Persona {
            name: config.name.clone(),
            description: config.description.clone(),
            system_prompt: config.system_prompt.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FrontMatter {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug)]
pub enum PersonaError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    FrontMatter {
        path: PathBuf,
        message: String,
    },
    Unknown {
        name: String,
        available: Vec<String>,
    },
    NoneActive,
}

impl fmt::Display for PersonaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaError::Io { path, source } => {
                write!(f, "persona file {}: {}", path.display(), source)
            }
            PersonaError::FrontMatter { path, message } => {
                write!(f, "invalid persona file {}: {}", path.display(), message)
            }
            PersonaError::Unknown { name, available } if available.is_empty() => {
                write!(f, "persona '{name}' not found; no personas are defined")
            }
            PersonaError::Unknown { name, available } => write!(
                f,
                "persona '{name}' not found. Available personas: {}",
                available.join(", ")
            ),
            PersonaError::NoneActive => write!(f, "no persona is active"),
        }
    }
}

impl std::error::Error for PersonaError {}

impl From<PersonaError> for ChatError {
    fn from(err: PersonaError) -> Self {
        match err {
            PersonaError::Io { .. } => {
                ChatError::new(crate::core::error::ErrorKind::Persistence, err.to_string())
            }
            PersonaError::Unknown { .. } => ChatError::not_found(err.to_string()),
            _ => ChatError::validation(err.to_string()),
        }
    }
}

/// Personas from the config file merged with `<dir>/<name>.md` files.
///
/// File personas override config personas with the same name.
pub struct PersonaStore {
    dir: PathBuf,
    personas: Vec<Persona>,
    active: Option<Persona>,
}

impl PersonaStore {
    pub fn load(config: &Config) -> Self {
        Self::load_from(config.personas.iter().map(Persona::from).collect(), config.persona_dir())
    }

    pub fn load_from(mut personas: Vec<Persona>, dir: PathBuf) -> Self {
        if let Ok(entries) = fs::read_dir(&dir) {
            let mut paths: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
                .collect();
            paths.sort();
            for path in paths {
                match read_persona_file(&path) {
                    Ok(persona) => {
                        personas.retain(|existing| existing.name != persona.name);
                        personas.push(persona);
                    }
                    Err(err) => warn!(error = %err, "Skipping persona file"),
                }
            }
        }
        personas.sort_by(|a, b| a.name.cmp(&b.name));

        PersonaStore {
            dir,
            personas,
            active: None,
        }
    }

    pub fn list(&self) -> &[Persona] {
        &self.personas
    }

    pub fn find(&self, name: &str) -> Option<&Persona> {
        self.personas
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn activate(&mut self, name: &str) -> Result<&Persona, PersonaError> {
        match self.find(name).cloned() {
            Some(persona) => Ok(self.active.insert(persona)),
            None => Err(PersonaError::Unknown {
                name: name.to_string(),
                available: self.personas.iter().map(|p| p.name.clone()).collect(),
            }),
        }
    }

    pub fn clear(&mut self) {
        self.active = None;
    }

    pub fn active(&self) -> Option<&Persona> {
        self.active.as_ref()
    }

    /// Prompt actually sent for `text` given the active persona.
    pub fn wire_prompt(&self, text: &str) -> String {
        match self
            .active
            .as_ref()
            .filter(|p| !p.system_prompt.trim().is_empty())
        {
            Some(persona) => format_persona_prompt(&persona.system_prompt, text),
            None => text.to_string(),
        }
    }

    /// Write the active persona to `<dir>/<name>.md`.
    pub fn export_active(&self) -> Result<PathBuf, PersonaError> {
        let persona = self.active.as_ref().ok_or(PersonaError::NoneActive)?;
        fs::create_dir_all(&self.dir).map_err(|source| PersonaError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self
            .dir
            .join(format!("{}.md", crate::core::export::sanitize_filename(&persona.name)));
        fs::write(&path, render_persona_file(persona)?).map_err(|source| PersonaError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

pub fn format_persona_prompt(system_prompt: &str, text: &str) -> String {
    format!("[System Instructions]\n{system_prompt}\n\n[User Message]\n{text}")
}

fn read_persona_file(path: &Path) -> Result<Persona, PersonaError> {
    let contents = fs::read_to_string(path).map_err(|source| PersonaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_persona_file(&contents).map_err(|message| PersonaError::FrontMatter {
        path: path.to_path_buf(),
        message,
    })
}

fn parse_persona_file(contents: &str) -> Result<Persona, String> {
    let rest = contents
        .strip_prefix(FRONT_MATTER_FENCE)
        .ok_or_else(|| "missing front matter".to_string())?;
    let rest = rest.trim_start_matches(['\r', '\n']);
    let end = rest
        .find(&format!("\n{FRONT_MATTER_FENCE}"))
        .ok_or_else(|| "unterminated front matter".to_string())?;
    let yaml = &rest[..end];
    let body = rest[end + 1 + FRONT_MATTER_FENCE.len()..].trim();

    let front: FrontMatter = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
    if front.name.trim().is_empty() {
        return Err("persona name is empty".to_string());
    }
    Ok(Persona {
        name: front.name,
        description: front.description,
        system_prompt: body.to_string(),
    })
}

fn render_persona_file(persona: &Persona) -> Result<String, PersonaError> {
    let front = FrontMatter {
        name: persona.name.clone(),
        description: persona.description.clone(),
    };
    let yaml = serde_yaml::to_string(&front).map_err(|e| PersonaError::FrontMatter {
        path: PathBuf::from(&persona.name),
        message: e.to_string(),
    })?;
    Ok(format!(
        "{FRONT_MATTER_FENCE}\n{}\n{FRONT_MATTER_FENCE}\n\n{}\n",
        yaml.trim_end(),
        persona.system_prompt.trim()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn persona(name: &str, prompt: &str) -> Persona {
        Persona {
            name: name.into(),
            description: String::new(),
            system_prompt: prompt.into(),
        }
    }

    #[test]
    fn wire_prompt_wraps_system_instructions() {
        let dir = tempdir().expect("tempdir");
        let mut store =
            PersonaStore::load_from(vec![persona("pirate", "Talk like a pirate.")], dir.path().into());
        assert_eq!(store.wire_prompt("hi"), "hi");

        store.activate("Pirate").expect("activate");
        assert_eq!(
            store.wire_prompt("hi"),
            "[System Instructions]\nTalk like a pirate.\n\n[User Message]\nhi"
        );

        store.clear();
        assert_eq!(store.wire_prompt("hi"), "hi");
    }

    #[test]
    fn unknown_persona_lists_available() {
        let dir = tempdir().expect("tempdir");
        let mut store = PersonaStore::load_from(vec![persona("a", "x")], dir.path().into());
        let err = store.activate("zzz").expect_err("unknown");
        assert_eq!(err.to_string(), "persona 'zzz' not found. Available personas: a");
    }

    #[test]
    fn file_personas_override_config_ones() {
        let dir = tempdir().expect("tempdir");
        fs::write(
            dir.path().join("coder.md"),
            "---\nname: coder\ndescription: Writes code\n---\n\nYou write Rust.\n",
        )
        .expect("write");
        fs::write(dir.path().join("broken.md"), "no front matter").expect("write");

        let store = PersonaStore::load_from(vec![persona("coder", "old")], dir.path().into());
        assert_eq!(store.list().len(), 1);
        let coder = store.find("coder").expect("coder");
        assert_eq!(coder.system_prompt, "You write Rust.");
        assert_eq!(coder.description, "Writes code");
    }

    #[test]
    fn export_writes_parseable_file() {
        let dir = tempdir().expect("tempdir");
        let mut store = PersonaStore::load_from(
            vec![Persona {
                name: "reviewer".into(),
                description: "Strict".into(),
                system_prompt: "Review carefully.".into(),
            }],
            dir.path().join("personas"),
        );
        assert!(matches!(store.export_active(), Err(PersonaError::NoneActive)));

        store.activate("reviewer").expect("activate");
        let path = store.export_active().expect("export");
        assert!(path.ends_with("personas/reviewer.md"));

        let reloaded = PersonaStore::load_from(Vec::new(), dir.path().join("personas"));
        assert_eq!(reloaded.find("reviewer"), store.active());
    }
}
