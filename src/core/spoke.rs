//! Spoke expansion of n-ary interactions into binary evidences.

use crate::domain::model::{
    BinaryInteraction, BinaryParticipant, CvTerm, Experiment, Interaction, Participant,
    Publication, Referenced, Xref, IMEX_DB,
};
use std::collections::HashMap;

pub const SPOKE_EXPANSION_MI: &str = "MI:1060";

/// Experiment and publication data copied onto every binary record.
#[derive(Debug, Clone, Default)]
pub struct ExpansionContext<'a> {
    pub experiments: Vec<&'a Experiment>,
    pub publication: Option<&'a Publication>,
}

#[derive(Debug, Clone, Default)]
pub struct SpokeExpander;

impl SpokeExpander {
    pub fn new() -> Self {
        Self
    }

    /// Expands one interaction. Binary and self interactions give a single record with
    /// `expanded = false`; larger ones are expanded around the bait (or the participant
    /// with the lowest interactor AC when no bait is annotated).
    pub fn expand(&self, interaction: &Interaction, ctx: &ExpansionContext<'_>) -> Vec<BinaryInteraction> {
        let mut participants: Vec<&Participant> = interaction.participants.iter().collect();
        if participants.is_empty() {
            return Vec::new();
        }

        if participants.len() <= 2 {
            let a = participants[0];
            let b = participants.get(1).copied();
            return vec![self.binary(interaction, ctx, a, b, false)];
        }

        participants.sort_by(|x, y| x.interactor.ac.cmp(&y.interactor.ac));
        let hub_idx = participants.iter().position(|p| p.is_bait()).unwrap_or(0);
        let hub = participants.remove(hub_idx);

        tracing::debug!(
            "Spoke expanding {} around {} ({} spokes)",
            interaction.ac,
            hub.interactor.ac,
            participants.len()
        );

        participants
            .into_iter()
            .map(|spoke| self.binary(interaction, ctx, hub, Some(spoke), true))
            .collect()
    }

    /// Expands each interaction with its experiments and their publication looked up by AC.
    pub fn expand_all<'a>(
        &self,
        interactions: impl IntoIterator<Item = &'a Interaction>,
        experiments: &HashMap<String, Experiment>,
        publications: &HashMap<String, Publication>,
    ) -> Vec<BinaryInteraction> {
        interactions
            .into_iter()
            .flat_map(|interaction| {
                let experiments: Vec<&Experiment> = interaction
                    .experiment_acs
                    .iter()
                    .filter_map(|ac| experiments.get(ac))
                    .collect();
                let publication = experiments
                    .first()
                    .and_then(|e| publications.get(&e.publication_ac));
                let ctx = ExpansionContext {
                    experiments,
                    publication,
                };
                self.expand(interaction, &ctx)
            })
            .collect()
    }

    fn binary(
        &self,
        interaction: &Interaction,
        ctx: &ExpansionContext<'_>,
        a: &Participant,
        b: Option<&Participant>,
        expanded: bool,
    ) -> BinaryInteraction {
        let mut publication_ids = Vec::new();
        let mut first_author = None;
        if let Some(publication) = ctx.publication {
            publication_ids.extend(publication.identifier_xref());
            if let Some(imex) = publication.imex_id() {
                publication_ids.push(Xref::new(IMEX_DB, imex, None));
            }
            first_author = publication.first_author_label();
        }

        let mut detection_methods: Vec<CvTerm> = Vec::new();
        for experiment in &ctx.experiments {
            if !detection_methods.contains(&experiment.detection_method) {
                detection_methods.push(experiment.detection_method.clone());
            }
        }

        BinaryInteraction {
            source_ac: interaction.ac.clone(),
            a: BinaryParticipant::from(a),
            b: b.map(BinaryParticipant::from),
            interaction_type: interaction.interaction_type.clone(),
            expanded,
            expansion_method: expanded.then(|| CvTerm::new(SPOKE_EXPANSION_MI, "spoke expansion")),
            detection_methods,
            publication_ids,
            first_author,
            host_taxid: ctx.experiments.iter().find_map(|e| e.host_taxid),
            imex_id: interaction.imex_id().map(str::to_string),
            confidences: interaction.confidences.clone(),
            negative: interaction.negative,
        }
    }
}
