use crate::domain::imex_id::ImexId;
use crate::domain::ports::{PublicationRegistry, RegistryRecord, RegistryStatus};
use crate::utils::error::{DxError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

fn not_registered(identifier: &str) -> DxError {
    DxError::RegistryError {
        publication: identifier.to_string(),
        message: "publication is not registered".to_string(),
    }
}

/// Registry kept in memory; allocates IMEx numbers from a counter.
pub struct InMemoryRegistry {
    records: Mutex<HashMap<String, RegistryRecord>>,
    next_number: Mutex<u64>,
}

impl InMemoryRegistry {
    pub fn new(first_number: u64) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_number: Mutex::new(first_number),
        }
    }

    pub async fn insert(&self, record: RegistryRecord) {
        self.records
            .lock()
            .await
            .insert(record.identifier.clone(), record);
    }

    async fn modify<F>(&self, identifier: &str, f: F) -> Result<RegistryRecord>
    where
        F: FnOnce(&mut RegistryRecord) + Send,
    {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(identifier)
            .ok_or_else(|| not_registered(identifier))?;
        f(record);
        Ok(record.clone())
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl PublicationRegistry for InMemoryRegistry {
    async fn get(&self, identifier: &str) -> Result<Option<RegistryRecord>> {
        Ok(self.records.lock().await.get(identifier).cloned())
    }

    async fn register(&self, identifier: &str) -> Result<RegistryRecord> {
        let mut records = self.records.lock().await;
        let record = records
            .entry(identifier.to_string())
            .or_insert_with(|| RegistryRecord {
                identifier: identifier.to_string(),
                imex_id: None,
                status: RegistryStatus::New,
                admin_groups: Vec::new(),
                admin_users: Vec::new(),
            });
        Ok(record.clone())
    }

    async fn assign_imex_id(&self, identifier: &str) -> Result<RegistryRecord> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(identifier)
            .ok_or_else(|| not_registered(identifier))?;
        if record.imex_id.is_none() {
            let mut next = self.next_number.lock().await;
            record.imex_id = Some(ImexId::publication(*next).to_string());
            *next += 1;
        }
        Ok(record.clone())
    }

    async fn update_status(&self, identifier: &str, status: RegistryStatus) -> Result<RegistryRecord> {
        self.modify(identifier, |r| r.status = status).await
    }

    async fn add_admin_group(&self, identifier: &str, group: &str) -> Result<RegistryRecord> {
        let group = group.to_string();
        self.modify(identifier, move |r| {
            if !r.admin_groups.contains(&group) {
                r.admin_groups.push(group);
            }
        })
        .await
    }

    async fn add_admin_user(&self, identifier: &str, user: &str) -> Result<RegistryRecord> {
        let user = user.to_string();
        self.modify(identifier, move |r| {
            if !r.admin_users.contains(&user) {
                r.admin_users.push(user);
            }
        })
        .await
    }
}

#[derive(Serialize)]
struct IdentifierBody<'a> {
    identifier: &'a str,
}

#[derive(Serialize)]
struct StatusBody {
    status: RegistryStatus,
}

#[derive(Serialize)]
struct NameBody<'a> {
    name: &'a str,
}

/// JSON-over-HTTP registry client.
pub struct HttpRegistry {
    client: Client,
    base: Url,
    credentials: Option<(String, String)>,
}

impl HttpRegistry {
    pub fn new(endpoint: &str, timeout: Duration, credentials: Option<(String, String)>) -> Result<Self> {
        let base = Url::parse(endpoint).map_err(|e| DxError::InvalidConfigValueError {
            field: "registry.endpoint".to_string(),
            value: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    fn url(&self, identifier: Option<&str>, tail: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| DxError::ConfigError {
                message: format!("registry endpoint {} cannot be a base URL", self.base),
            })?;
            segments.pop_if_empty().push("publications");
            if let Some(identifier) = identifier {
                segments.push(identifier);
            }
            segments.extend(tail);
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    /// Sends the request; a 404 means the registry has no such publication.
    async fn send(&self, identifier: &str, request: reqwest::RequestBuilder) -> Result<Option<RegistryRecord>> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        tracing::debug!("Registry responded {} for {}", status, identifier);
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DxError::RegistryError {
                publication: identifier.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }
        Ok(Some(response.json().await?))
    }

    async fn send_existing(&self, identifier: &str, request: reqwest::RequestBuilder) -> Result<RegistryRecord> {
        self.send(identifier, request)
            .await?
            .ok_or_else(|| not_registered(identifier))
    }
}

#[async_trait]
impl PublicationRegistry for HttpRegistry {
    async fn get(&self, identifier: &str) -> Result<Option<RegistryRecord>> {
        let url = self.url(Some(identifier), &[])?;
        self.send(identifier, self.client.get(url)).await
    }

    async fn register(&self, identifier: &str) -> Result<RegistryRecord> {
        let url = self.url(None, &[])?;
        let request = self.client.post(url).json(&IdentifierBody { identifier });
        self.send_existing(identifier, request).await
    }

    async fn assign_imex_id(&self, identifier: &str) -> Result<RegistryRecord> {
        let url = self.url(Some(identifier), &["imex"])?;
        self.send_existing(identifier, self.client.post(url)).await
    }

    async fn update_status(&self, identifier: &str, status: RegistryStatus) -> Result<RegistryRecord> {
        let url = self.url(Some(identifier), &["status"])?;
        let request = self.client.put(url).json(&StatusBody { status });
        self.send_existing(identifier, request).await
    }

    async fn add_admin_group(&self, identifier: &str, group: &str) -> Result<RegistryRecord> {
        let url = self.url(Some(identifier), &["admin-groups"])?;
        let request = self.client.post(url).json(&NameBody { name: group });
        self.send_existing(identifier, request).await
    }

    async fn add_admin_user(&self, identifier: &str, user: &str) -> Result<RegistryRecord> {
        let url = self.url(Some(identifier), &["admin-users"])?;
        let request = self.client.post(url).json(&NameBody { name: user });
        self.send_existing(identifier, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_assign_is_idempotent() {
        let registry = InMemoryRegistry::new(100);
        registry.register("12345").await.unwrap();
        let first = registry.assign_imex_id("12345").await.unwrap();
        let second = registry.assign_imex_id("12345").await.unwrap();
        assert_eq!(first.imex_id.as_deref(), Some("IM-100"));
        assert_eq!(second.imex_id, first.imex_id);

        registry.register("67890").await.unwrap();
        let other = registry.assign_imex_id("67890").await.unwrap();
        assert_eq!(other.imex_id.as_deref(), Some("IM-101"));
    }

    #[tokio::test]
    async fn test_in_memory_requires_registration() {
        let registry = InMemoryRegistry::default();
        assert!(registry.assign_imex_id("12345").await.is_err());
        assert!(registry.get("12345").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_group_added_once() {
        let registry = InMemoryRegistry::default();
        registry.register("1").await.unwrap();
        registry.add_admin_group("1", "INTACT").await.unwrap();
        let record = registry.add_admin_group("1", "INTACT").await.unwrap();
        assert_eq!(record.admin_groups, vec!["INTACT".to_string()]);
    }

    #[test]
    fn test_url_escapes_doi() {
        let registry =
            HttpRegistry::new("http://localhost:1234/api/", Duration::from_secs(1), None).unwrap();
        let url = registry.url(Some("10.1000/xyz"), &["status"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1234/api/publications/10.1000%2Fxyz/status"
        );
    }
}
