// File-backed credential store
use crate::application::session::CredentialStore;
use crate::domain::session::Credential;
use anyhow::Context;
use std::io::ErrorKind;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> anyhow::Result<Option<Credential>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        let credential = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(credential))
    }

    fn save(&self, credential: Option<&Credential>) -> anyhow::Result<()> {
        let Some(credential) = credential else {
            return match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e)
                    .with_context(|| format!("Failed to remove {}", self.path.display())),
                _ => Ok(()),
            };
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(credential)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::UserRecord;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("pulse-console-{}-{}", std::process::id(), name))
            .join("credentials.json")
    }

    #[test]
    fn test_missing_file_is_signed_out() {
        let store = FileCredentialStore::new(scratch_path("missing"));
        assert_eq!(store.load().unwrap(), None);
        store.save(None).unwrap();
    }

    #[test]
    fn test_save_load_forget() {
        let path = scratch_path("cycle");
        let store = FileCredentialStore::new(&path);
        let credential = Credential {
            token: "tok".to_string(),
            user: Some(UserRecord {
                email: Some("a@b.c".to_string()),
                ..Default::default()
            }),
        };

        store.save(Some(&credential)).unwrap();
        assert_eq!(store.load().unwrap(), Some(credential));

        store.save(None).unwrap();
        assert!(!path.exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = scratch_path("corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(FileCredentialStore::new(&path).load().is_err());
    }
}
