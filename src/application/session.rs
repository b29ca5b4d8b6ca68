// Session - Process-wide bearer credential with explicit load and persist points
use crate::domain::session::Credential;
use std::sync::{Arc, RwLock};

/// Durable key/value home of the credential.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<Credential>>;

    /// Persist `credential`, or forget the stored one when `None`.
    fn save(&self, credential: Option<&Credential>) -> anyhow::Result<()>;
}

/// Read once at startup, written on every change.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    current: RwLock<Option<Credential>>,
}

impl Session {
    pub fn restore(store: Arc<dyn CredentialStore>) -> Self {
        let current = match store.load() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored credential, starting signed out");
                None
            }
        };
        if current.is_some() {
            tracing::info!("restored stored credential");
        }

        Self {
            store,
            current: RwLock::new(current),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    pub fn bearer(&self) -> Option<String> {
        self.current
            .read()
            .ok()
            .and_then(|c| c.as_ref().map(Credential::bearer))
    }

    pub fn replace(&self, credential: Option<Credential>) {
        if let Err(e) = self.store.save(credential.as_ref()) {
            tracing::warn!(error = %e, "could not persist credential");
        }
        if let Ok(mut current) = self.current.write() {
            *current = credential;
        }
    }
}
