//! Tenant lookup
//!
//! The core only reads tenant records. Registration and settings updates
//! happen elsewhere and land as JSON files in the tenants directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::TenantConfig;
use crate::Result;

/// Read-only access to tenant configuration
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Look up a tenant by id
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantConfig>>;

    /// All known tenants
    async fn list(&self) -> Result<Vec<TenantConfig>>;

    /// Tenant whose MyOperator `phone_number_id` (or phone number) matches
    async fn find_by_phone_number_id(&self, phone_number_id: &str) -> Result<Option<TenantConfig>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|t| t.whatsapp.matches_phone_number_id(phone_number_id)))
    }

    /// Tenant whose WhatsApp business number matches a Twilio `To` value
    async fn find_by_business_phone(&self, phone: &str) -> Result<Option<TenantConfig>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|t| t.whatsapp.matches_business_phone(phone)))
    }
}

/// Tenants stored as `<dir>/<tenant_id>.json`
#[derive(Debug, Clone)]
pub struct FileTenantDirectory {
    dir: PathBuf,
}

impl FileTenantDirectory {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn tenant_path(&self, tenant_id: &str) -> Option<PathBuf> {
        // Tenant ids come from URLs; refuse anything that could escape the directory.
        if tenant_id.is_empty()
            || !tenant_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return None;
        }
        Some(self.dir.join(format!("{}.json", tenant_id)))
    }

    async fn read_tenant(path: &Path) -> Result<TenantConfig> {
        let content = tokio::fs::read_to_string(path).await?;
        let tenant = serde_json::from_str(&content)?;
        Ok(tenant)
    }
}

#[async_trait]
impl TenantDirectory for FileTenantDirectory {
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantConfig>> {
        let Some(path) = self.tenant_path(tenant_id) else {
            debug!(tenant = %tenant_id, "Rejected malformed tenant id");
            return Ok(None);
        };

        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }

        Self::read_tenant(&path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<TenantConfig>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut tenants = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match Self::read_tenant(&path).await {
                Ok(tenant) => tenants.push(tenant),
                Err(e) => warn!("Skipping unreadable tenant file {}: {}", path.display(), e),
            }
        }

        tenants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tenants)
    }
}

/// In-memory tenant directory, for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryTenantDirectory {
    tenants: RwLock<HashMap<String, TenantConfig>>,
}

impl InMemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenants(tenants: impl IntoIterator<Item = TenantConfig>) -> Self {
        let map = tenants.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tenants: RwLock::new(map),
        }
    }

    /// Insert or replace a tenant
    pub async fn insert(&self, tenant: TenantConfig) {
        self.tenants.write().await.insert(tenant.id.clone(), tenant);
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn get(&self, tenant_id: &str) -> Result<Option<TenantConfig>> {
        Ok(self.tenants.read().await.get(tenant_id).cloned())
    }

    async fn list(&self) -> Result<Vec<TenantConfig>> {
        let mut tenants: Vec<_> = self.tenants.read().await.values().cloned().collect();
        tenants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tenants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::ProviderKind;

    fn write_tenant(dir: &Path, id: &str, body: &str) {
        std::fs::write(dir.join(format!("{}.json", id)), body).unwrap();
    }

    #[tokio::test]
    async fn test_file_directory_get_and_list() {
        let dir = tempfile::tempdir().unwrap();
        write_tenant(
            dir.path(),
            "sunset",
            r#"{"id": "sunset", "whatsapp": {"provider": "myoperator", "phoneNumberId": "411835805357155"}}"#,
        );
        write_tenant(dir.path(), "lagoon", r#"{"id": "lagoon"}"#);
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let directory = FileTenantDirectory::new(dir.path());

        let tenant = directory.get("sunset").await.unwrap().unwrap();
        assert_eq!(tenant.whatsapp.provider, ProviderKind::MyOperator);
        assert!(directory.get("missing").await.unwrap().is_none());

        let all = directory.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "lagoon");

        let found = directory
            .find_by_phone_number_id("411835805357155")
            .await
            .unwrap();
        assert_eq!(found.map(|t| t.id), Some("sunset".to_string()));
    }

    #[tokio::test]
    async fn test_file_directory_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FileTenantDirectory::new(dir.path());
        assert!(directory.get("../etc/passwd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_directory_lists_nothing() {
        let directory = FileTenantDirectory::new("/nonexistent/tenants");
        assert!(directory.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_business_phone_lookup() {
        let mut tenant = TenantConfig::new("harbor");
        tenant.whatsapp.phone_number = Some("+14155238886".into());
        let directory = InMemoryTenantDirectory::with_tenants([tenant]);

        let found = directory
            .find_by_business_phone("whatsapp:+14155238886")
            .await
            .unwrap();
        assert!(found.is_some());
        assert!(directory.find_by_business_phone("+1999").await.unwrap().is_none());
    }
}
