//! Export eligibility rules for UniProt DR/CC lines.
//!
//! An interaction is exportable when it passes the structural checks and at least one of
//! its experiments allows it. Each experiment is judged by the first rule that applies:
//! the experiment's own `uniprot-dr-export` annotation, the one inherited from its
//! publication, the rule configured for its detection method, then the publication's
//! provenance. An annotation on the interaction itself overrides all of that.

use crate::core::spoke::SpokeExpander;
use crate::domain::model::{
    Annotated, CurationStatus, Experiment, Interaction, Publication, DR_EXPORT_TOPIC,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Parsed value of a `uniprot-dr-export` annotation or method rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DrExport {
    Yes,
    No,
    /// Needs at least this many distinct experiments with the same detection method.
    Conditional(u32),
}

impl DrExport {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("yes") {
            Some(DrExport::Yes)
        } else if text.eq_ignore_ascii_case("no") {
            Some(DrExport::No)
        } else {
            match text.parse::<u32>() {
                Ok(0) => Some(DrExport::Yes),
                Ok(n) => Some(DrExport::Conditional(n)),
                Err(_) => None,
            }
        }
    }
}

impl TryFrom<String> for DrExport {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DrExport::parse(&value).ok_or_else(|| format!("invalid dr-export value '{}'", value))
    }
}

impl From<DrExport> for String {
    fn from(value: DrExport) -> Self {
        match value {
            DrExport::Yes => "yes".to_string(),
            DrExport::No => "no".to_string(),
            DrExport::Conditional(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRules {
    /// Rules keyed by detection method MI id.
    #[serde(default)]
    pub method_rules: HashMap<String, DrExport>,
    /// Whether experiments with no applicable rule are exported on provenance alone.
    #[serde(default = "default_true")]
    pub default_export: bool,
    #[serde(default)]
    pub require_imex_curation: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExportRules {
    fn default() -> Self {
        Self {
            method_rules: HashMap::new(),
            default_export: true,
            require_imex_curation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Reason {
    Negative,
    NotUniprot,
    NoExperiment,
    InteractionAnnotation,
    ExperimentAnnotation,
    PublicationAnnotation,
    MethodRule,
    Corroborated { required: u32, found: u32 },
    NotCorroborated { required: u32, found: u32 },
    Provenance,
    NoPublicationId,
    NotReleased,
    NotImexCurated,
    DefaultExcluded,
}

impl Reason {
    /// Stable key used for rejection statistics.
    pub fn key(&self) -> &'static str {
        match self {
            Reason::Negative => "negative",
            Reason::NotUniprot => "not-uniprot",
            Reason::NoExperiment => "no-experiment",
            Reason::InteractionAnnotation => "interaction-annotation",
            Reason::ExperimentAnnotation => "experiment-annotation",
            Reason::PublicationAnnotation => "publication-annotation",
            Reason::MethodRule => "method-rule",
            Reason::Corroborated { .. } => "corroborated",
            Reason::NotCorroborated { .. } => "not-corroborated",
            Reason::Provenance => "provenance",
            Reason::NoPublicationId => "no-publication-id",
            Reason::NotReleased => "not-released",
            Reason::NotImexCurated => "not-imex-curated",
            Reason::DefaultExcluded => "default-excluded",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Corroborated { required, found } | Reason::NotCorroborated { required, found } => {
                write!(f, "{} ({}/{} experiments)", self.key(), found, required)
            }
            _ => f.write_str(self.key()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept(Reason),
    Reject(Reason),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }

    pub fn reason(&self) -> &Reason {
        match self {
            Decision::Accept(r) | Decision::Reject(r) => r,
        }
    }
}

/// Records looked up from the store for one candidate.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityContext<'a> {
    pub experiments: &'a HashMap<String, Experiment>,
    pub publications: &'a HashMap<String, Publication>,
    /// Interactions sharing at least one UniProt pair with the candidate, candidate included.
    pub corroborating: &'a [Interaction],
}

/// UniProt pairs the interaction contributes after spoke expansion.
pub fn uniprot_pairs(interaction: &Interaction) -> BTreeSet<(String, String)> {
    SpokeExpander::new()
        .expand(interaction, &Default::default())
        .iter()
        .filter_map(|b| b.uniprot_pair())
        .collect()
}

/// True when the interaction itself yields `pair`; a heterodimer never supports a self pair.
fn contains_pair(interaction: &Interaction, pair: &(String, String)) -> bool {
    uniprot_pairs(interaction).contains(pair)
}

pub fn evaluate(interaction: &Interaction, ctx: &EligibilityContext<'_>, rules: &ExportRules) -> Decision {
    if interaction.negative {
        return Decision::Reject(Reason::Negative);
    }
    if interaction.participants.is_empty() || interaction.uniprot_acs().iter().any(Option::is_none) {
        return Decision::Reject(Reason::NotUniprot);
    }

    if let Some(value) = interaction.annotation_text(DR_EXPORT_TOPIC).and_then(DrExport::parse) {
        match value {
            DrExport::Yes => return Decision::Accept(Reason::InteractionAnnotation),
            DrExport::No => return Decision::Reject(Reason::InteractionAnnotation),
            DrExport::Conditional(_) => {
                tracing::debug!("Ignoring conditional dr-export on interaction {}", interaction.ac);
            }
        }
    }

    let mut experiments: Vec<&Experiment> = interaction
        .experiment_acs
        .iter()
        .filter_map(|ac| ctx.experiments.get(ac))
        .collect();
    experiments.sort_by(|a, b| a.ac.cmp(&b.ac));
    if experiments.is_empty() {
        return Decision::Reject(Reason::NoExperiment);
    }

    let mut first_rejection = None;
    for experiment in experiments {
        let decision = evaluate_experiment(interaction, experiment, ctx, rules);
        tracing::debug!(
            "{} via {}: {:?}",
            interaction.ac,
            experiment.ac,
            decision
        );
        match decision {
            Decision::Accept(_) => return decision,
            Decision::Reject(_) => {
                first_rejection.get_or_insert(decision);
            }
        }
    }

    first_rejection.unwrap_or(Decision::Reject(Reason::NoExperiment))
}

fn evaluate_experiment(
    interaction: &Interaction,
    experiment: &Experiment,
    ctx: &EligibilityContext<'_>,
    rules: &ExportRules,
) -> Decision {
    let publication = ctx.publications.get(&experiment.publication_ac);

    let explicit = experiment
        .annotation_text(DR_EXPORT_TOPIC)
        .and_then(DrExport::parse)
        .map(|v| (v, Reason::ExperimentAnnotation))
        .or_else(|| {
            publication
                .and_then(|p| p.annotation_text(DR_EXPORT_TOPIC))
                .and_then(DrExport::parse)
                .map(|v| (v, Reason::PublicationAnnotation))
        })
        .or_else(|| {
            rules
                .method_rules
                .get(&experiment.detection_method.mi)
                .map(|v| (*v, Reason::MethodRule))
        });

    match explicit {
        Some((DrExport::Yes, reason)) => Decision::Accept(reason),
        Some((DrExport::No, reason)) => Decision::Reject(reason),
        Some((DrExport::Conditional(required), _)) => {
            let found = corroboration(interaction, experiment, ctx);
            if found >= required {
                Decision::Accept(Reason::Corroborated { required, found })
            } else {
                Decision::Reject(Reason::NotCorroborated { required, found })
            }
        }
        None => provenance(publication, rules),
    }
}

/// Highest number of distinct experiments, using the experiment's detection method,
/// that support any single pair of the interaction.
fn corroboration(interaction: &Interaction, experiment: &Experiment, ctx: &EligibilityContext<'_>) -> u32 {
    let method = &experiment.detection_method.mi;
    uniprot_pairs(interaction)
        .iter()
        .map(|pair| {
            ctx.corroborating
                .iter()
                .filter(|other| !other.negative && contains_pair(other, pair))
                .flat_map(|other| other.experiment_acs.iter())
                .filter(|ac| {
                    ctx.experiments
                        .get(*ac)
                        .map(|e| &e.detection_method.mi == method)
                        .unwrap_or(false)
                })
                .collect::<BTreeSet<_>>()
                .len() as u32
        })
        .max()
        .unwrap_or(0)
}

fn provenance(publication: Option<&Publication>, rules: &ExportRules) -> Decision {
    if !rules.default_export {
        return Decision::Reject(Reason::DefaultExcluded);
    }
    let Some(publication) = publication else {
        return Decision::Reject(Reason::NoPublicationId);
    };
    if publication.identifier().is_none() {
        return Decision::Reject(Reason::NoPublicationId);
    }
    if publication.status != CurationStatus::Released {
        return Decision::Reject(Reason::NotReleased);
    }
    if rules.require_imex_curation && !publication.is_imex_curated() {
        return Decision::Reject(Reason::NotImexCurated);
    }
    Decision::Accept(Reason::Provenance)
}
