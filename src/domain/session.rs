// Session domain models - Opaque bearer credential and the minimal user record
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserRecord>,
}

impl Credential {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
