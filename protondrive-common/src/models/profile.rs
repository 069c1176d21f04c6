use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Login material as it is handed to the configuration store.
///
/// `obscured_secret` is always the tool-obscured form, never the password
/// the user typed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCredentials {
    pub user: String,
    pub obscured_secret: String,
    pub second_factor: Option<String>,
}

impl fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("user", &self.user)
            .field("obscured_secret", &"***")
            .field("second_factor", &self.second_factor.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProfile {
    pub name: String,
    pub backend_type: String,
    pub credentials: RemoteCredentials,
}

impl RemoteProfile {
    pub fn new(name: impl Into<String>, backend_type: impl Into<String>, credentials: RemoteCredentials) -> Self {
        Self {
            name: name.into(),
            backend_type: backend_type.into(),
            credentials,
        }
    }

    /// The `key=value` fields passed to `config create`.
    pub fn config_fields(&self, two_factor_field: &str) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("user".to_string(), self.credentials.user.clone());
        fields.insert("pass".to_string(), self.credentials.obscured_secret.clone());
        if let Some(code) = &self.credentials.second_factor {
            fields.insert(two_factor_field.to_string(), code.clone());
        }
        fields
    }

    pub fn remote_root(&self) -> String {
        remote_root(&self.name)
    }
}

/// `name:`, the root of a configured remote.
pub fn remote_root(name: &str) -> String {
    format!("{}:", name)
}

/// `name:sub/path`; an empty or `/` subpath is the remote root.
pub fn remote_path(name: &str, subpath: &str) -> String {
    let sub = subpath.trim().trim_matches('/');
    if sub.is_empty() {
        remote_root(name)
    } else {
        format!("{}:{}", name, sub)
    }
}
