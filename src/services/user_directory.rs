use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;

use super::AuthorizeService;
use crate::error::ServiceError;
use crate::types::UserIdentity;

/// File-backed authorize service.
///
/// Reads a YAML list of identities once at boot:
///
/// ```yaml
/// - id: 1
///   name: Ada
///   uniqueIdentifier: ada-1
/// ```
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    users: HashMap<String, UserIdentity>,
}

impl UserDirectory {
    pub fn new(users: impl IntoIterator<Item = UserIdentity>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.unique_identifier.clone(), user))
            .collect();
        Self { users }
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let users: Vec<UserIdentity> = serde_yaml::from_str(raw).context("invalid users document")?;
        Ok(Self::new(users))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read users file {}", path.display()))?;
        let directory = Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to load users file {}", path.display()))?;
        tracing::info!(users = directory.len(), path = %path.display(), "user directory loaded");
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl AuthorizeService for UserDirectory {
    async fn authorize(&self, unique_identifier: &str) -> Result<Option<UserIdentity>, ServiceError> {
        Ok(self.users.get(unique_identifier).cloned())
    }
}
