use crate::domain::model::{Experiment, Interaction, Publication};
use crate::domain::ports::InteractionStore;
use crate::utils::error::{DxError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Snapshot of the curated database as exchanged between tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub experiments: Vec<Experiment>,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// `InteractionStore` over a JSON dataset held in memory.
pub struct JsonStore {
    data: RwLock<Dataset>,
    path: Option<PathBuf>,
}

impl JsonStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
            path: None,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(&path)?;
        let dataset: Dataset = serde_json::from_slice(&bytes)?;
        tracing::info!(
            "📂 Loaded dataset {} ({} publications, {} experiments, {} interactions)",
            path.as_ref().display(),
            dataset.publications.len(),
            dataset.experiments.len(),
            dataset.interactions.len()
        );
        Ok(Self {
            data: RwLock::new(dataset),
            path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// Writes the current state back to the file it was loaded from.
    pub async fn flush(&self) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| DxError::ConfigError {
            message: "store was not loaded from a file".to_string(),
        })?;
        let data = self.data.read().await;
        let json = serde_json::to_vec_pretty(&*data)?;
        tokio::fs::write(path, json).await?;
        tracing::debug!("Dataset written to {}", path.display());
        Ok(())
    }

    pub async fn snapshot(&self) -> Dataset {
        self.data.read().await.clone()
    }
}

fn upsert<T: Clone>(items: &mut Vec<T>, item: &T, same: impl Fn(&T) -> bool) {
    match items.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = item.clone(),
        None => items.push(item.clone()),
    }
}

#[async_trait]
impl InteractionStore for JsonStore {
    async fn interactions(&self) -> Result<Vec<Interaction>> {
        Ok(self.data.read().await.interactions.clone())
    }

    async fn interaction(&self, ac: &str) -> Result<Option<Interaction>> {
        let data = self.data.read().await;
        Ok(data.interactions.iter().find(|i| i.ac == ac).cloned())
    }

    async fn interactions_with_pair(&self, a: &str, b: &str) -> Result<Vec<Interaction>> {
        let data = self.data.read().await;
        Ok(data
            .interactions
            .iter()
            .filter(|i| {
                let acs = i.uniprot_acs();
                acs.contains(&Some(a)) && acs.contains(&Some(b))
            })
            .cloned()
            .collect())
    }

    async fn experiment(&self, ac: &str) -> Result<Option<Experiment>> {
        let data = self.data.read().await;
        Ok(data.experiments.iter().find(|e| e.ac == ac).cloned())
    }

    async fn publication(&self, ac: &str) -> Result<Option<Publication>> {
        let data = self.data.read().await;
        Ok(data.publications.iter().find(|p| p.ac == ac).cloned())
    }

    async fn publications(&self) -> Result<Vec<Publication>> {
        Ok(self.data.read().await.publications.clone())
    }

    async fn interactions_of_publication(&self, publication_ac: &str) -> Result<Vec<Interaction>> {
        let data = self.data.read().await;
        let experiment_acs: Vec<&str> = data
            .experiments
            .iter()
            .filter(|e| e.publication_ac == publication_ac)
            .map(|e| e.ac.as_str())
            .collect();
        Ok(data
            .interactions
            .iter()
            .filter(|i| i.experiment_acs.iter().any(|ac| experiment_acs.contains(&ac.as_str())))
            .cloned()
            .collect())
    }

    async fn save_publication(&self, publication: &Publication) -> Result<()> {
        let mut data = self.data.write().await;
        upsert(&mut data.publications, publication, |p| p.ac == publication.ac);
        Ok(())
    }

    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        let mut data = self.data.write().await;
        upsert(&mut data.experiments, experiment, |e| e.ac == experiment.ac);
        Ok(())
    }

    async fn save_interaction(&self, interaction: &Interaction) -> Result<()> {
        let mut data = self.data.write().await;
        upsert(&mut data.interactions, interaction, |i| i.ac == interaction.ac);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::fixtures::*;
    use crate::domain::model::CurationStatus;
    use tempfile::TempDir;

    fn dataset() -> Dataset {
        Dataset {
            publications: vec![publication("EBI-P1", "1001", CurationStatus::Released)],
            experiments: vec![
                experiment("EBI-E1", "MI:0018", "EBI-P1"),
                experiment("EBI-E2", "MI:0018", "EBI-P2"),
            ],
            interactions: vec![
                pair("EBI-I1", "EBI-E1", "P1", "P2"),
                pair("EBI-I2", "EBI-E2", "P2", "P1"),
                pair("EBI-I3", "EBI-E1", "P1", "P3"),
            ],
        }
    }

    #[tokio::test]
    async fn test_interactions_with_pair_ignores_order() {
        let store = JsonStore::new(dataset());
        let found = store.interactions_with_pair("P2", "P1").await.unwrap();
        let acs: Vec<&str> = found.iter().map(|i| i.ac.as_str()).collect();
        assert_eq!(acs, vec!["EBI-I1", "EBI-I2"]);
    }

    #[tokio::test]
    async fn test_interactions_of_publication() {
        let store = JsonStore::new(dataset());
        let found = store.interactions_of_publication("EBI-P1").await.unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_save_and_flush_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dataset.json");
        std::fs::write(&path, serde_json::to_vec(&dataset()).unwrap()).unwrap();

        let store = JsonStore::load(&path).unwrap();
        let mut publication = store.publication("EBI-P1").await.unwrap().unwrap();
        publication.curator = Some("someone".to_string());
        store.save_publication(&publication).await.unwrap();
        store.flush().await.unwrap();

        let reloaded = JsonStore::load(&path).unwrap();
        let publication = reloaded.publication("EBI-P1").await.unwrap().unwrap();
        assert_eq!(publication.curator.as_deref(), Some("someone"));
        assert_eq!(reloaded.snapshot().await.publications.len(), 1);
    }
}
