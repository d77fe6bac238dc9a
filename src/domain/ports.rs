use crate::domain::model::{BinaryInteraction, Experiment, Interaction, Publication};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}

/// Query and persistence access to the curated interaction database.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn interactions(&self) -> Result<Vec<Interaction>>;
    async fn interaction(&self, ac: &str) -> Result<Option<Interaction>>;
    /// Interactions whose participants contain both UniProt accessions (or only `a` when equal).
    async fn interactions_with_pair(&self, a: &str, b: &str) -> Result<Vec<Interaction>>;
    async fn experiment(&self, ac: &str) -> Result<Option<Experiment>>;
    async fn publication(&self, ac: &str) -> Result<Option<Publication>>;
    async fn publications(&self) -> Result<Vec<Publication>>;
    async fn interactions_of_publication(&self, publication_ac: &str) -> Result<Vec<Interaction>>;
    async fn save_publication(&self, publication: &Publication) -> Result<()>;
    async fn save_experiment(&self, experiment: &Experiment) -> Result<()>;
    async fn save_interaction(&self, interaction: &Interaction) -> Result<()>;
}

/// Registry-side lifecycle status of a publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegistryStatus {
    New,
    Incomplete,
    Processed,
    Accepted,
    Released,
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub identifier: String,
    #[serde(default)]
    pub imex_id: Option<String>,
    pub status: RegistryStatus,
    #[serde(default)]
    pub admin_groups: Vec<String>,
    #[serde(default)]
    pub admin_users: Vec<String>,
}

/// Remote publication registry that owns IMEx identifiers.
#[async_trait]
pub trait PublicationRegistry: Send + Sync {
    async fn get(&self, identifier: &str) -> Result<Option<RegistryRecord>>;
    async fn register(&self, identifier: &str) -> Result<RegistryRecord>;
    /// Returns the record with an IMEx id, allocating one if it has none.
    async fn assign_imex_id(&self, identifier: &str) -> Result<RegistryRecord>;
    async fn update_status(&self, identifier: &str, status: RegistryStatus) -> Result<RegistryRecord>;
    async fn add_admin_group(&self, identifier: &str, group: &str) -> Result<RegistryRecord>;
    async fn add_admin_user(&self, identifier: &str, user: &str) -> Result<RegistryRecord>;
}

/// Scores a cluster of binary evidences for the same protein pair.
pub trait MiScoreCalculator: Send + Sync {
    fn score(&self, evidences: &[BinaryInteraction]) -> f64;
}
