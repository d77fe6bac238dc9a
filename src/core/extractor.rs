//! Collects the interactions eligible for MI scoring from the store.

use crate::core::eligibility::{evaluate, uniprot_pairs, Decision, EligibilityContext, ExportRules};
use crate::domain::model::{Experiment, Interaction, Publication};
use crate::domain::ports::InteractionStore;
use crate::utils::error::Result;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Candidates that passed the rules, plus everything looked up to judge them.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub accepted: Vec<Interaction>,
    pub experiments: HashMap<String, Experiment>,
    pub publications: HashMap<String, Publication>,
    pub rejected: BTreeMap<&'static str, usize>,
    pub candidates: usize,
}

impl Extraction {
    /// Sorted, de-duplicated ACs of the accepted interactions.
    pub fn accepted_acs(&self) -> Vec<String> {
        self.accepted
            .iter()
            .map(|i| i.ac.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

pub struct InteractionExtractor<'a, S: InteractionStore> {
    store: &'a S,
    rules: ExportRules,
}

impl<'a, S: InteractionStore> InteractionExtractor<'a, S> {
    pub fn new(store: &'a S, rules: ExportRules) -> Self {
        Self { store, rules }
    }

    pub async fn extract(&self) -> Result<Extraction> {
        let candidates = self.store.interactions().await?;
        tracing::info!("Evaluating {} candidate interactions", candidates.len());
        self.extract_from(candidates).await
    }

    pub async fn extract_from(&self, candidates: Vec<Interaction>) -> Result<Extraction> {
        let mut extraction = Extraction {
            candidates: candidates.len(),
            ..Extraction::default()
        };
        let mut pair_cache: HashMap<(String, String), Vec<Interaction>> = HashMap::new();

        for interaction in candidates {
            self.load_context(&interaction, &mut extraction).await?;

            let mut corroborating: BTreeMap<String, Interaction> = BTreeMap::new();
            corroborating.insert(interaction.ac.clone(), interaction.clone());
            for pair in uniprot_pairs(&interaction) {
                if !pair_cache.contains_key(&pair) {
                    let found = self.store.interactions_with_pair(&pair.0, &pair.1).await?;
                    pair_cache.insert(pair.clone(), found);
                }
                for other in pair_cache.get(&pair).into_iter().flatten() {
                    corroborating
                        .entry(other.ac.clone())
                        .or_insert_with(|| other.clone());
                }
            }
            let corroborating: Vec<Interaction> = corroborating.into_values().collect();
            for other in &corroborating {
                self.load_context(other, &mut extraction).await?;
            }

            let ctx = EligibilityContext {
                experiments: &extraction.experiments,
                publications: &extraction.publications,
                corroborating: &corroborating,
            };
            match evaluate(&interaction, &ctx, &self.rules) {
                Decision::Accept(reason) => {
                    tracing::debug!("✅ {} accepted ({})", interaction.ac, reason);
                    extraction.accepted.push(interaction);
                }
                Decision::Reject(reason) => {
                    tracing::debug!("⏭️ {} rejected ({})", interaction.ac, reason);
                    *extraction.rejected.entry(reason.key()).or_insert(0) += 1;
                }
            }
        }

        tracing::info!(
            "Accepted {} of {} interactions ({} rejected)",
            extraction.accepted.len(),
            extraction.candidates,
            extraction.rejected_total()
        );
        Ok(extraction)
    }

    async fn load_context(&self, interaction: &Interaction, extraction: &mut Extraction) -> Result<()> {
        for ac in &interaction.experiment_acs {
            if extraction.experiments.contains_key(ac) {
                continue;
            }
            let Some(experiment) = self.store.experiment(ac).await? else {
                tracing::warn!("Experiment {} of {} not found", ac, interaction.ac);
                continue;
            };
            if !extraction.publications.contains_key(&experiment.publication_ac) {
                match self.store.publication(&experiment.publication_ac).await? {
                    Some(publication) => {
                        extraction
                            .publications
                            .insert(publication.ac.clone(), publication);
                    }
                    None => tracing::warn!(
                        "Publication {} of experiment {} not found",
                        experiment.publication_ac,
                        experiment.ac
                    ),
                }
            }
            extraction.experiments.insert(ac.clone(), experiment);
        }
        Ok(())
    }
}
