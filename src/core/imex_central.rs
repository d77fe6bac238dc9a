//! Keeps local IMEx state and the remote registry in agreement.

use crate::core::imex_assigner::{check_eligibility, Assignment, ImexAssigner};
use crate::domain::model::{CurationStatus, Publication, Referenced};
use crate::domain::ports::{InteractionStore, PublicationRegistry, RegistryRecord, RegistryStatus};
use crate::utils::error::{DxError, Result};
use serde::Serialize;

pub fn registry_status(status: CurationStatus) -> RegistryStatus {
    match status {
        CurationStatus::Released => RegistryStatus::Released,
        CurationStatus::Accepted => RegistryStatus::Accepted,
        _ => RegistryStatus::New,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub publication_ac: String,
    pub imex_id: Option<String>,
    pub registered: bool,
    pub imported_id: bool,
    pub status_updated: bool,
    pub group_added: bool,
    pub user_added: bool,
    pub interactions_assigned: usize,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.registered
            || self.imported_id
            || self.status_updated
            || self.group_added
            || self.user_added
            || self.interactions_assigned > 0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub synchronized: Vec<SyncReport>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct ImexCentralManager<'a, S: InteractionStore, R: PublicationRegistry> {
    store: &'a S,
    registry: &'a R,
    assigner: ImexAssigner<'a, S, R>,
}

impl<'a, S: InteractionStore, R: PublicationRegistry> ImexCentralManager<'a, S, R> {
    pub fn new(store: &'a S, registry: &'a R) -> Self {
        Self {
            store,
            registry,
            assigner: ImexAssigner::new(store, registry),
        }
    }

    async fn load_publication(&self, publication_ac: &str) -> Result<Publication> {
        self.store
            .publication(publication_ac)
            .await?
            .ok_or_else(|| DxError::NotFound {
                kind: "Publication",
                ac: publication_ac.to_string(),
            })
    }

    /// Brings the registry record in line with the local publication.
    pub async fn sync_publication(&self, publication_ac: &str) -> Result<SyncReport> {
        let mut publication = self.load_publication(publication_ac).await?;
        let identifier = publication
            .identifier()
            .ok_or_else(|| DxError::ValidationError {
                message: format!("{} has no PubMed or DOI identifier", publication_ac),
            })?
            .to_string();

        let mut report = SyncReport {
            publication_ac: publication_ac.to_string(),
            ..SyncReport::default()
        };

        let mut record = match self.registry.get(&identifier).await? {
            Some(record) => record,
            None => {
                if let Some(local) = publication.imex_id() {
                    return Err(DxError::RegistryError {
                        publication: identifier,
                        message: format!("local IMEx id {} is unknown to the registry", local),
                    });
                }
                report.registered = true;
                self.registry.register(&identifier).await?
            }
        };

        record = self.reconcile_ids(&mut publication, record, &mut report).await?;
        report.imex_id = publication.imex_id().map(str::to_string);

        let wanted = registry_status(publication.status);
        if record.status != wanted {
            tracing::debug!("{}: status {:?} -> {:?}", identifier, record.status, wanted);
            record = self.registry.update_status(&identifier, wanted).await?;
            report.status_updated = true;
        }

        if let Some(group) = publication.institution.as_deref() {
            if !record.admin_groups.iter().any(|g| g.eq_ignore_ascii_case(group)) {
                record = self.registry.add_admin_group(&identifier, group).await?;
                report.group_added = true;
            }
        }

        if let Some(user) = publication.curator.as_deref() {
            if !record.admin_users.iter().any(|u| u == user) {
                self.registry.add_admin_user(&identifier, user).await?;
                report.user_added = true;
            }
        }

        if report.changed() {
            tracing::info!("🔄 {} synchronized with registry ({:?})", publication_ac, report);
        } else {
            tracing::debug!("{} already in sync", publication_ac);
        }
        Ok(report)
    }

    async fn reconcile_ids(
        &self,
        publication: &mut Publication,
        record: RegistryRecord,
        report: &mut SyncReport,
    ) -> Result<RegistryRecord> {
        let local = publication.imex_id().map(str::to_string);
        let remote = record.imex_id.clone();
        match (local.as_deref(), remote.as_deref()) {
            (Some(local), Some(remote)) if local != remote => Err(DxError::ImexConflict {
                ac: publication.ac.clone(),
                local: local.to_string(),
                remote: remote.to_string(),
            }),
            (Some(local), None) => Err(DxError::RegistryError {
                publication: record.identifier.clone(),
                message: format!("registry has no IMEx id but {} carries {}", publication.ac, local),
            }),
            (None, Some(remote)) => {
                let id = remote.parse()?;
                tracing::info!("Importing registry IMEx id {} for {}", remote, publication.ac);
                publication.set_imex_id(remote);
                self.store.save_publication(publication).await?;
                self.assigner.propagate_to_experiments(publication, id).await?;
                report.imported_id = true;
                Ok(record)
            }
            _ => Ok(record),
        }
    }

    /// Assigns ids locally, then synchronizes the registry.
    pub async fn assign_and_sync(&self, publication_ac: &str) -> Result<SyncReport> {
        let assignment: Assignment = self.assigner.assign(publication_ac).await?;
        let mut report = self.sync_publication(publication_ac).await?;
        report.interactions_assigned = assignment.interactions_assigned.len();
        Ok(report)
    }

    /// Assigns each publication in turn, synchronizing unless `sync` is false.
    /// A failing publication is recorded and the rest still run.
    pub async fn assign_each(&self, publication_acs: &[String], sync: bool) -> BatchReport {
        let mut batch = BatchReport::default();
        for ac in publication_acs {
            let outcome = if sync {
                self.assign_and_sync(ac).await
            } else {
                self.assigner.assign(ac).await.map(|assignment| SyncReport {
                    publication_ac: assignment.publication_ac,
                    imex_id: Some(assignment.imex_id),
                    interactions_assigned: assignment.interactions_assigned.len(),
                    ..SyncReport::default()
                })
            };
            match outcome {
                Ok(report) => batch.synchronized.push(report),
                Err(e) => {
                    tracing::error!("❌ {} failed: {}", ac, e);
                    batch.failed.push((ac.clone(), e.to_string()));
                }
            }
        }
        batch
    }

    /// Synchronizes every publication carrying an IMEx id; eligible publications without one
    /// are assigned first when `assign_missing` is set. Failures are collected, not fatal.
    pub async fn update_all(&self, assign_missing: bool) -> Result<BatchReport> {
        let mut batch = BatchReport::default();
        for publication in self.store.publications().await? {
            match self.update_one(&publication, assign_missing).await {
                Ok(Some(report)) => batch.synchronized.push(report),
                Ok(None) => batch.skipped.push(publication.ac.clone()),
                Err(e) => {
                    tracing::error!("❌ {} failed: {}", publication.ac, e);
                    batch.failed.push((publication.ac.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "IMEx update finished: {} synchronized, {} skipped, {} failed",
            batch.synchronized.len(),
            batch.skipped.len(),
            batch.failed.len()
        );
        Ok(batch)
    }

    /// `None` when the publication is left alone.
    async fn update_one(&self, publication: &Publication, assign_missing: bool) -> Result<Option<SyncReport>> {
        if publication.imex_id().is_none() {
            if !assign_missing {
                return Ok(None);
            }
            let interactions = self.store.interactions_of_publication(&publication.ac).await?;
            if let Err(reason) = check_eligibility(publication, &interactions) {
                tracing::debug!("Skipping {}: {:?}", publication.ac, reason);
                return Ok(None);
            }
        }
        self.assign_and_sync(&publication.ac).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::registry::InMemoryRegistry;
    use crate::adapters::store::{Dataset, JsonStore};
    use crate::domain::model::fixtures::*;
    use crate::domain::model::{
        Annotation, Experiment, Interaction, CURATION_DEPTH_TOPIC, IMEX_CURATION,
    };

    fn dataset(status: CurationStatus) -> Dataset {
        let mut publication = publication("EBI-P1", "1001", status);
        publication.experiment_acs = vec!["EBI-E1".to_string()];
        publication
            .annotations
            .push(Annotation::new(CURATION_DEPTH_TOPIC, Some(IMEX_CURATION)));
        let mut plain = publication.clone();
        plain.ac = "EBI-P2".to_string();
        plain.pubmed_id = Some("2002".to_string());
        plain.annotations.clear();
        plain.experiment_acs = vec!["EBI-E2".to_string()];
        Dataset {
            publications: vec![publication, plain],
            experiments: vec![
                experiment("EBI-E1", "MI:0018", "EBI-P1"),
                experiment("EBI-E2", "MI:0018", "EBI-P2"),
            ],
            interactions: vec![
                pair("EBI-I1", "EBI-E1", "P1", "P2"),
                pair("EBI-I2", "EBI-E2", "P1", "P2"),
            ],
        }
    }

    #[tokio::test]
    async fn test_assign_and_sync_then_nothing_changes() {
        let store = JsonStore::new(dataset(CurationStatus::Released));
        let registry = InMemoryRegistry::new(5);
        let manager = ImexCentralManager::new(&store, &registry);

        let report = manager.assign_and_sync("EBI-P1").await.unwrap();
        assert_eq!(report.imex_id.as_deref(), Some("IM-5"));
        assert!(report.status_updated);
        assert!(report.group_added);
        assert!(report.user_added);
        assert_eq!(report.interactions_assigned, 1);

        let record = registry.get("1001").await.unwrap().unwrap();
        assert_eq!(record.status, RegistryStatus::Released);
        assert_eq!(record.admin_groups, vec!["IntAct".to_string()]);

        let again = manager.assign_and_sync("EBI-P1").await.unwrap();
        assert!(!again.changed(), "{:?}", again);
    }

    #[tokio::test]
    async fn test_registry_id_is_imported() {
        let store = JsonStore::new(dataset(CurationStatus::Accepted));
        let registry = InMemoryRegistry::default();
        registry
            .insert(RegistryRecord {
                identifier: "1001".to_string(),
                imex_id: Some("IM-77".to_string()),
                status: RegistryStatus::New,
                admin_groups: vec![],
                admin_users: vec![],
            })
            .await;

        let report = ImexCentralManager::new(&store, &registry)
            .sync_publication("EBI-P1")
            .await
            .unwrap();
        assert!(report.imported_id);
        assert_eq!(report.imex_id.as_deref(), Some("IM-77"));

        let experiment = store.experiment("EBI-E1").await.unwrap().unwrap();
        assert_eq!(experiment.imex_id(), Some("IM-77"));
        let record = registry.get("1001").await.unwrap().unwrap();
        assert_eq!(record.status, RegistryStatus::Accepted);
    }

    #[tokio::test]
    async fn test_differing_ids_conflict() {
        let mut data = dataset(CurationStatus::Released);
        data.publications[0].set_imex_id("IM-1");
        let store = JsonStore::new(data);
        let registry = InMemoryRegistry::default();
        registry
            .insert(RegistryRecord {
                identifier: "1001".to_string(),
                imex_id: Some("IM-2".to_string()),
                status: RegistryStatus::Released,
                admin_groups: vec![],
                admin_users: vec![],
            })
            .await;

        let err = ImexCentralManager::new(&store, &registry)
            .sync_publication("EBI-P1")
            .await
            .unwrap_err();
        assert!(matches!(err, DxError::ImexConflict { .. }));
    }

    #[tokio::test]
    async fn test_local_id_unknown_to_registry_fails() {
        let mut data = dataset(CurationStatus::Released);
        data.publications[0].set_imex_id("IM-1");
        let store = JsonStore::new(data);
        let registry = InMemoryRegistry::default();

        let err = ImexCentralManager::new(&store, &registry)
            .sync_publication("EBI-P1")
            .await
            .unwrap_err();
        assert!(matches!(err, DxError::RegistryError { .. }));
    }

    #[tokio::test]
    async fn test_update_all_skips_ineligible() {
        let store = JsonStore::new(dataset(CurationStatus::Released));
        let registry = InMemoryRegistry::default();
        let batch = ImexCentralManager::new(&store, &registry)
            .update_all(true)
            .await
            .unwrap();
        assert_eq!(batch.synchronized.len(), 1);
        assert_eq!(batch.skipped, vec!["EBI-P2".to_string()]);
        assert!(batch.failed.is_empty());
    }

    #[tokio::test]
    async fn test_update_all_continues_after_conflict() {
        let mut data = dataset(CurationStatus::Released);
        let mut conflicting = publication("EBI-P3", "3003", CurationStatus::Released);
        conflicting.experiment_acs = vec!["EBI-E3".to_string()];
        conflicting.set_imex_id("IM-9");
        data.publications.insert(0, conflicting);
        data.experiments.push(experiment("EBI-E3", "MI:0018", "EBI-P3"));
        data.interactions.push(pair("EBI-I3", "EBI-E3", "P3", "P4"));

        let store = JsonStore::new(data);
        let registry = InMemoryRegistry::default();
        registry
            .insert(RegistryRecord {
                identifier: "3003".to_string(),
                imex_id: Some("IM-2".to_string()),
                status: RegistryStatus::Released,
                admin_groups: vec![],
                admin_users: vec![],
            })
            .await;

        let batch = ImexCentralManager::new(&store, &registry)
            .update_all(true)
            .await
            .unwrap();
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].0, "EBI-P3");
        assert_eq!(batch.synchronized.len(), 1);
        assert_eq!(batch.synchronized[0].publication_ac, "EBI-P1");
        assert_eq!(batch.skipped, vec!["EBI-P2".to_string()]);
    }

    /// Delegates to a `JsonStore` but cannot list the interactions of one publication.
    struct BrokenStore {
        inner: JsonStore,
        broken: &'static str,
    }

    #[async_trait::async_trait]
    impl InteractionStore for BrokenStore {
        async fn interactions(&self) -> Result<Vec<Interaction>> {
            self.inner.interactions().await
        }
        async fn interaction(&self, ac: &str) -> Result<Option<Interaction>> {
            self.inner.interaction(ac).await
        }
        async fn interactions_with_pair(&self, a: &str, b: &str) -> Result<Vec<Interaction>> {
            self.inner.interactions_with_pair(a, b).await
        }
        async fn experiment(&self, ac: &str) -> Result<Option<Experiment>> {
            self.inner.experiment(ac).await
        }
        async fn publication(&self, ac: &str) -> Result<Option<Publication>> {
            self.inner.publication(ac).await
        }
        async fn publications(&self) -> Result<Vec<Publication>> {
            self.inner.publications().await
        }
        async fn interactions_of_publication(&self, publication_ac: &str) -> Result<Vec<Interaction>> {
            if publication_ac == self.broken {
                return Err(DxError::ProcessingError {
                    message: format!("cannot read interactions of {}", publication_ac),
                });
            }
            self.inner.interactions_of_publication(publication_ac).await
        }
        async fn save_publication(&self, publication: &Publication) -> Result<()> {
            self.inner.save_publication(publication).await
        }
        async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
            self.inner.save_experiment(experiment).await
        }
        async fn save_interaction(&self, interaction: &Interaction) -> Result<()> {
            self.inner.save_interaction(interaction).await
        }
    }

    #[tokio::test]
    async fn test_update_all_records_store_failure() {
        let store = BrokenStore {
            inner: JsonStore::new(dataset(CurationStatus::Released)),
            broken: "EBI-P2",
        };
        let registry = InMemoryRegistry::default();
        let batch = ImexCentralManager::new(&store, &registry)
            .update_all(true)
            .await
            .unwrap();
        assert_eq!(batch.synchronized.len(), 1);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].0, "EBI-P2");
        assert!(batch.skipped.is_empty());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(registry_status(CurationStatus::Released), RegistryStatus::Released);
        assert_eq!(registry_status(CurationStatus::Accepted), RegistryStatus::Accepted);
        assert_eq!(registry_status(CurationStatus::Curation), RegistryStatus::New);
    }
}
