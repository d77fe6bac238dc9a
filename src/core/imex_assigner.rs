//! IMEx identifier assignment for publications, their experiments and interactions.

use crate::domain::imex_id::ImexId;
use crate::domain::model::{
    Annotated, CurationStatus, Interaction, Publication, Referenced, FULL_COVERAGE_TOPIC,
    IMEX_CURATION_TOPIC,
};
use crate::domain::ports::{InteractionStore, PublicationRegistry};
use crate::utils::error::{DxError, Result};

/// Why a publication cannot receive an IMEx id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    NoIdentifier,
    NotImexCurated,
    NotAccepted,
    NoProteinInteraction,
}

pub fn check_eligibility(publication: &Publication, interactions: &[Interaction]) -> std::result::Result<(), Ineligible> {
    if publication.identifier().is_none() {
        return Err(Ineligible::NoIdentifier);
    }
    if !publication.is_imex_curated() {
        return Err(Ineligible::NotImexCurated);
    }
    if !matches!(publication.status, CurationStatus::Accepted | CurationStatus::Released) {
        return Err(Ineligible::NotAccepted);
    }
    if !interactions.iter().any(Interaction::is_ppi) {
        return Err(Ineligible::NoProteinInteraction);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    pub publication_ac: String,
    pub imex_id: String,
    /// True when the publication id was newly obtained from the registry.
    pub new_publication_id: bool,
    pub experiments_updated: Vec<String>,
    pub interactions_assigned: Vec<(String, String)>,
}

pub struct ImexAssigner<'a, S: InteractionStore, R: PublicationRegistry> {
    store: &'a S,
    registry: &'a R,
}

impl<'a, S: InteractionStore, R: PublicationRegistry> ImexAssigner<'a, S, R> {
    pub fn new(store: &'a S, registry: &'a R) -> Self {
        Self { store, registry }
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

    /// Assigns ids to the publication and everything under it. Safe to re-run.
    pub async fn assign(&self, publication_ac: &str) -> Result<Assignment> {
        let mut publication = self.load_publication(publication_ac).await?;
        let interactions = self.store.interactions_of_publication(publication_ac).await?;
        if publication.imex_id().is_none() {
            if let Err(reason) = check_eligibility(&publication, &interactions) {
                return Err(DxError::ValidationError {
                    message: format!("{} is not eligible for IMEx: {:?}", publication_ac, reason),
                });
            }
        }

        let had_id = publication.imex_id().is_some();
        let imex = self.assign_publication_id(&mut publication).await?;
        let experiments_updated = self.propagate_to_experiments(&publication, imex).await?;
        let interactions_assigned = self.assign_interaction_ids(imex, interactions).await?;

        tracing::info!(
            "🏷️ {} -> {} ({} experiments, {} interactions updated)",
            publication_ac,
            imex,
            experiments_updated.len(),
            interactions_assigned.len()
        );

        Ok(Assignment {
            publication_ac: publication_ac.to_string(),
            imex_id: imex.to_string(),
            new_publication_id: !had_id,
            experiments_updated,
            interactions_assigned: interactions_assigned
                .into_iter()
                .map(|(ac, id)| (ac, id.to_string()))
                .collect(),
        })
    }

    /// Returns the publication's IMEx id, requesting one from the registry when absent.
    pub async fn assign_publication_id(&self, publication: &mut Publication) -> Result<ImexId> {
        if let Some(existing) = publication.imex_id() {
            let id: ImexId = existing.parse()?;
            if !id.is_publication() {
                return Err(DxError::InvalidImexId {
                    value: existing.to_string(),
                });
            }
            self.add_curation_annotations(publication).await?;
            return Ok(id);
        }

        let identifier = publication
            .identifier()
            .ok_or_else(|| DxError::ValidationError {
                message: format!("{} has no PubMed or DOI identifier", publication.ac),
            })?
            .to_string();

        if self.registry.get(&identifier).await?.is_none() {
            tracing::debug!("Registering {} in the registry", identifier);
            self.registry.register(&identifier).await?;
        }
        let record = self.registry.assign_imex_id(&identifier).await?;
        let raw = record.imex_id.ok_or_else(|| DxError::RegistryError {
            publication: identifier.clone(),
            message: "registry returned no IMEx id".to_string(),
        })?;
        let id: ImexId = raw.parse()?;

        publication.set_imex_id(&id.to_string());
        publication.add_annotation_once(IMEX_CURATION_TOPIC, None);
        publication.add_annotation_once(FULL_COVERAGE_TOPIC, Some("Only protein-protein interactions"));
        self.store.save_publication(publication).await?;
        Ok(id)
    }

    async fn add_curation_annotations(&self, publication: &mut Publication) -> Result<()> {
        let added = publication.add_annotation_once(IMEX_CURATION_TOPIC, None)
            | publication.add_annotation_once(FULL_COVERAGE_TOPIC, Some("Only protein-protein interactions"));
        if added {
            self.store.save_publication(publication).await?;
        }
        Ok(())
    }

    /// Copies the publication id onto its experiments; returns the updated experiment ACs.
    pub async fn propagate_to_experiments(&self, publication: &Publication, imex: ImexId) -> Result<Vec<String>> {
        let id = imex.to_string();
        let mut updated = Vec::new();
        let mut experiment_acs = publication.experiment_acs.clone();
        experiment_acs.sort();

        for ac in experiment_acs {
            let Some(mut experiment) = self.store.experiment(&ac).await? else {
                tracing::warn!("Experiment {} of {} not found", ac, publication.ac);
                continue;
            };
            match experiment.imex_id() {
                Some(existing) if existing == id => continue,
                Some(existing) => {
                    return Err(DxError::ImexConflict {
                        ac: experiment.ac.clone(),
                        local: existing.to_string(),
                        remote: id,
                    })
                }
                None => {
                    experiment.set_imex_id(&id);
                    self.store.save_experiment(&experiment).await?;
                    updated.push(experiment.ac);
                }
            }
        }
        Ok(updated)
    }

    /// Gives `IM-n-m` ids to interactions lacking one, in AC order, continuing after the
    /// highest sequence already used under the publication.
    pub async fn assign_interaction_ids(
        &self,
        imex: ImexId,
        mut interactions: Vec<Interaction>,
    ) -> Result<Vec<(String, ImexId)>> {
        interactions.sort_by(|a, b| a.ac.cmp(&b.ac));

        let mut next = 1;
        for interaction in &interactions {
            if let Some(existing) = interaction.imex_id() {
                let id: ImexId = existing.parse()?;
                if id.publication_id() != imex || id.is_publication() {
                    return Err(DxError::ImexConflict {
                        ac: interaction.ac.clone(),
                        local: existing.to_string(),
                        remote: imex.to_string(),
                    });
                }
                next = next.max(id.sequence().unwrap_or(0) + 1);
            }
        }

        let mut assigned = Vec::new();
        for mut interaction in interactions {
            if interaction.imex_id().is_some() {
                continue;
            }
            let id = imex.interaction(next);
            next += 1;
            interaction.set_imex_id(&id.to_string());
            self.store.save_interaction(&interaction).await?;
            tracing::debug!("{} -> {}", interaction.ac, id);
            assigned.push((interaction.ac, id));
        }
        Ok(assigned)
    }
}
