use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{CareProvider, DirectoryError};

/// Read access to the external provider store.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn get(&self, staff_id: Uuid) -> Result<Option<CareProvider>, DirectoryError>;

    async fn list_active_in_group(&self, specialty_group: &str) -> Result<Vec<CareProvider>, DirectoryError>;
}

#[derive(Default)]
pub struct InMemoryProviderDirectory {
    providers: RwLock<HashMap<Uuid, CareProvider>>,
}

impl InMemoryProviderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_providers(providers: impl IntoIterator<Item = CareProvider>) -> Self {
        let providers = providers.into_iter().map(|p| (p.staff_id, p)).collect();
        Self {
            providers: RwLock::new(providers),
        }
    }

    pub async fn upsert(&self, provider: CareProvider) {
        self.providers.write().await.insert(provider.staff_id, provider);
    }

    pub async fn set_active(&self, staff_id: Uuid, active: bool) {
        if let Some(provider) = self.providers.write().await.get_mut(&staff_id) {
            provider.active = active;
        }
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryProviderDirectory {
    async fn get(&self, staff_id: Uuid) -> Result<Option<CareProvider>, DirectoryError> {
        Ok(self.providers.read().await.get(&staff_id).cloned())
    }

    async fn list_active_in_group(&self, specialty_group: &str) -> Result<Vec<CareProvider>, DirectoryError> {
        let providers = self.providers.read().await;
        Ok(providers
            .values()
            .filter(|p| p.active && p.in_group(specialty_group))
            .cloned()
            .collect())
    }
}

/// Providers read from the `care_providers` table.
pub struct SupabaseProviderDirectory {
    supabase: SupabaseClient,
}

impl SupabaseProviderDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn from_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<CareProvider>, DirectoryError> {
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| DirectoryError::Backend(format!("Failed to parse provider: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl ProviderDirectory for SupabaseProviderDirectory {
    async fn get(&self, staff_id: Uuid) -> Result<Option<CareProvider>, DirectoryError> {
        debug!("Fetching provider: {}", staff_id);

        let path = format!("/rest/v1/care_providers?staff_id=eq.{}", staff_id);
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::Backend(e.to_string()))?;

        Ok(Self::parse_rows(rows)?.into_iter().next())
    }

    async fn list_active_in_group(&self, specialty_group: &str) -> Result<Vec<CareProvider>, DirectoryError> {
        debug!("Listing active providers in group: {}", specialty_group);

        let group = specialty_group.trim().to_lowercase();
        let path = format!(
            "/rest/v1/care_providers?specialty_group=eq.{}&active=eq.true&order=display_name.asc",
            urlencoding::encode(&group)
        );
        let rows: Vec<Value> = self.supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DirectoryError::Backend(e.to_string()))?;

        Self::parse_rows(rows)
    }
}
