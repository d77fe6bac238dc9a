//! MI score clustering and the UniProt export threshold filter.

use crate::core::extractor::Extraction;
use crate::core::spoke::SpokeExpander;
use crate::domain::model::BinaryInteraction;
use crate::domain::ports::MiScoreCalculator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const DEFAULT_EXPORT_THRESHOLD: f64 = 0.43;

const UNKNOWN_SCORE: f64 = 0.05;

/// Category score of common PSI-MI detection methods.
const METHOD_SCORES: &[(&str, f64)] = &[
    // biophysical
    ("MI:0013", 1.0),
    ("MI:0114", 1.0),
    ("MI:0077", 1.0),
    ("MI:0107", 1.0),
    ("MI:0065", 1.0),
    ("MI:0055", 1.0),
    ("MI:0012", 1.0),
    // biochemical
    ("MI:0401", 1.0),
    ("MI:0400", 1.0),
    ("MI:0004", 1.0),
    ("MI:0006", 1.0),
    ("MI:0007", 1.0),
    ("MI:0019", 1.0),
    ("MI:0096", 1.0),
    ("MI:0676", 1.0),
    ("MI:0415", 1.0),
    ("MI:0424", 1.0),
    // protein complementation assay
    ("MI:0090", 0.66),
    ("MI:0018", 0.66),
    ("MI:0397", 0.66),
    ("MI:0398", 0.66),
    ("MI:0399", 0.66),
    ("MI:0809", 0.66),
    ("MI:0111", 0.66),
    // genetic interference
    ("MI:0254", 0.66),
    // post transcriptional interference
    ("MI:0255", 0.33),
    // imaging
    ("MI:0428", 0.33),
    ("MI:0416", 0.33),
    ("MI:0663", 0.33),
];

/// Category score of interaction types.
const TYPE_SCORES: &[(&str, f64)] = &[
    ("MI:0407", 1.0),
    ("MI:0414", 1.0),
    ("MI:0217", 1.0),
    ("MI:0570", 1.0),
    ("MI:0194", 1.0),
    ("MI:0915", 0.66),
    ("MI:0914", 0.33),
    ("MI:0403", 0.33),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiScoreSettings {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_true")]
    pub exclude_spoke_expanded: bool,
    #[serde(default = "default_weight")]
    pub method_weight: f64,
    #[serde(default = "default_weight")]
    pub type_weight: f64,
    #[serde(default = "default_weight")]
    pub publication_weight: f64,
    /// Extra or replacement method scores keyed by MI id.
    #[serde(default)]
    pub method_scores: HashMap<String, f64>,
    #[serde(default)]
    pub type_scores: HashMap<String, f64>,
}

fn default_threshold() -> f64 {
    DEFAULT_EXPORT_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

impl Default for MiScoreSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_EXPORT_THRESHOLD,
            exclude_spoke_expanded: true,
            method_weight: 1.0,
            type_weight: 1.0,
            publication_weight: 1.0,
            method_scores: HashMap::new(),
            type_scores: HashMap::new(),
        }
    }
}

/// Weighted log-normalised combination of method, type and publication evidence.
#[derive(Debug, Clone)]
pub struct WeightedMiScore {
    method_scores: HashMap<String, f64>,
    type_scores: HashMap<String, f64>,
    method_weight: f64,
    type_weight: f64,
    publication_weight: f64,
}

impl WeightedMiScore {
    const METHOD_NORM: f64 = 7.5;
    const TYPE_NORM: f64 = 10.0;
    const PUBLICATION_NORM: f64 = 7.0;

    pub fn new(settings: &MiScoreSettings) -> Self {
        let mut method_scores: HashMap<String, f64> = METHOD_SCORES
            .iter()
            .map(|(mi, s)| (mi.to_string(), *s))
            .collect();
        method_scores.extend(settings.method_scores.clone());
        let mut type_scores: HashMap<String, f64> = TYPE_SCORES
            .iter()
            .map(|(mi, s)| (mi.to_string(), *s))
            .collect();
        type_scores.extend(settings.type_scores.clone());

        Self {
            method_scores,
            type_scores,
            method_weight: settings.method_weight,
            type_weight: settings.type_weight,
            publication_weight: settings.publication_weight,
        }
    }

    /// `log(a+1) / log(a+b+1)`: approaches 1 as the evidence sum `a` grows past `b`.
    fn normalised(a: f64, norm: f64) -> f64 {
        (a + 1.0).ln() / (a + norm + 1.0).ln()
    }
}

impl Default for WeightedMiScore {
    fn default() -> Self {
        Self::new(&MiScoreSettings::default())
    }
}

impl MiScoreCalculator for WeightedMiScore {
    fn score(&self, evidences: &[BinaryInteraction]) -> f64 {
        if evidences.is_empty() {
            return 0.0;
        }

        let lookup = |table: &HashMap<String, f64>, mi: &str| table.get(mi).copied().unwrap_or(UNKNOWN_SCORE);

        let method_sum: f64 = evidences
            .iter()
            .map(|e| {
                e.detection_methods
                    .iter()
                    .map(|m| lookup(&self.method_scores, &m.mi))
                    .fold(UNKNOWN_SCORE, f64::max)
            })
            .sum();
        let type_sum: f64 = evidences
            .iter()
            .map(|e| lookup(&self.type_scores, &e.interaction_type.mi))
            .sum();
        let publications: BTreeSet<&str> = evidences
            .iter()
            .flat_map(|e| e.publication_ids.iter().take(1))
            .map(|x| x.id.as_str())
            .collect();
        let publication_count = publications.len().max(1) as f64;

        let total_weight = self.method_weight + self.type_weight + self.publication_weight;
        if total_weight <= 0.0 {
            return 0.0;
        }
        let score = (self.method_weight * Self::normalised(method_sum, Self::METHOD_NORM)
            + self.type_weight * Self::normalised(type_sum, Self::TYPE_NORM)
            + self.publication_weight * Self::normalised(publication_count, Self::PUBLICATION_NORM))
            / total_weight;
        score.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredPair {
    pub a: String,
    pub b: String,
    pub score: f64,
    pub evidence_acs: Vec<String>,
    pub has_true_binary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PairRejection {
    BelowThreshold,
    SpokeExpandedOnly,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub accepted_acs: Vec<String>,
    pub accepted_pairs: Vec<ScoredPair>,
    pub rejected_pairs: Vec<(ScoredPair, PairRejection)>,
    pub binaries: Vec<BinaryInteraction>,
}

pub struct MiScoreFilter<C: MiScoreCalculator> {
    calculator: C,
    threshold: f64,
    exclude_spoke_expanded: bool,
}

impl<C: MiScoreCalculator> MiScoreFilter<C> {
    pub fn new(calculator: C, threshold: f64, exclude_spoke_expanded: bool) -> Self {
        Self {
            calculator,
            threshold,
            exclude_spoke_expanded,
        }
    }

    /// Spoke-expands the extracted interactions with their experiment and publication data.
    pub fn expand(&self, extraction: &Extraction) -> Vec<BinaryInteraction> {
        SpokeExpander::new().expand_all(
            &extraction.accepted,
            &extraction.experiments,
            &extraction.publications,
        )
    }

    pub fn filter(&self, extraction: &Extraction) -> FilterOutcome {
        self.filter_binaries(self.expand(extraction))
    }

    pub fn filter_binaries(&self, binaries: Vec<BinaryInteraction>) -> FilterOutcome {
        let mut clusters: BTreeMap<(String, String), Vec<BinaryInteraction>> = BTreeMap::new();
        for binary in binaries {
            match binary.uniprot_pair() {
                Some(pair) => clusters.entry(pair).or_default().push(binary),
                None => tracing::warn!("Skipping {} without UniProt pair", binary.source_ac),
            }
        }

        let mut outcome = FilterOutcome::default();
        let mut accepted_acs = BTreeSet::new();
        for ((a, b), evidences) in clusters {
            let score = self.calculator.score(&evidences);
            let scored = ScoredPair {
                a,
                b,
                score,
                evidence_acs: evidences
                    .iter()
                    .map(|e| e.source_ac.clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                has_true_binary: evidences.iter().any(|e| !e.expanded),
            };

            let rejection = if score < self.threshold {
                Some(PairRejection::BelowThreshold)
            } else if self.exclude_spoke_expanded && !scored.has_true_binary {
                Some(PairRejection::SpokeExpandedOnly)
            } else {
                None
            };

            match rejection {
                Some(reason) => {
                    tracing::debug!(
                        "Pair {}-{} rejected ({:?}, score {:.3})",
                        scored.a,
                        scored.b,
                        reason,
                        score
                    );
                    outcome.rejected_pairs.push((scored, reason));
                }
                None => {
                    accepted_acs.extend(scored.evidence_acs.iter().cloned());
                    outcome.accepted_pairs.push(scored);
                    outcome.binaries.extend(evidences);
                }
            }
        }

        outcome.accepted_acs = accepted_acs.into_iter().collect();
        tracing::info!(
            "MI score filter kept {} pairs ({} interactions), rejected {} pairs",
            outcome.accepted_pairs.len(),
            outcome.accepted_acs.len(),
            outcome.rejected_pairs.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::fixtures::*;
    use crate::domain::model::{CvTerm, Xref, PUBMED_DB};

    fn evidence(source: &str, a: &str, b: &str, method: &str, type_mi: &str, pmid: &str, expanded: bool) -> BinaryInteraction {
        let interaction = pair(source, "EBI-E1", a, b);
        BinaryInteraction {
            source_ac: source.to_string(),
            a: (&interaction.participants[0]).into(),
            b: Some((&interaction.participants[1]).into()),
            interaction_type: CvTerm::new(type_mi, type_mi),
            expanded,
            expansion_method: None,
            detection_methods: vec![CvTerm::new(method, method)],
            publication_ids: vec![Xref::new(PUBMED_DB, pmid, None)],
            first_author: None,
            host_taxid: None,
            imex_id: None,
            confidences: vec![],
            negative: false,
        }
    }

    #[test]
    fn test_single_two_hybrid_scores_below_threshold() {
        let score = WeightedMiScore::default().score(&[evidence(
            "EBI-I1", "P1", "P2", "MI:0018", "MI:0915", "1", false,
        )]);
        assert!(score > 0.2 && score < DEFAULT_EXPORT_THRESHOLD, "score {}", score);
    }

    #[test]
    fn test_more_evidence_increases_score() {
        let calculator = WeightedMiScore::default();
        let one = calculator.score(&[evidence("EBI-I1", "P1", "P2", "MI:0114", "MI:0407", "1", false)]);
        let two = calculator.score(&[
            evidence("EBI-I1", "P1", "P2", "MI:0114", "MI:0407", "1", false),
            evidence("EBI-I2", "P1", "P2", "MI:0114", "MI:0407", "2", false),
        ]);
        assert!(two > one);
        assert!(two >= DEFAULT_EXPORT_THRESHOLD, "score {}", two);
        assert!(two <= 1.0);
    }

    #[test]
    fn test_single_evidence_matches_log_ratio() {
        let score = WeightedMiScore::default().score(&[evidence(
            "EBI-I1", "P1", "P2", "MI:0114", "MI:0407", "1", false,
        )]);
        let category = |b: f64| 2f64.ln() / (2.0 + b).ln();
        let expected = (category(7.5) + category(10.0) + category(7.0)) / 3.0;
        assert!((score - expected).abs() < 1e-9, "score {} expected {}", score, expected);
        assert!((score - 0.3008).abs() < 1e-3);
    }

    #[test]
    fn test_category_never_saturates() {
        let many: Vec<_> = (0..20)
            .map(|i| evidence(&format!("EBI-I{}", i), "P1", "P2", "MI:0114", "MI:0407", &i.to_string(), false))
            .collect();
        let score = WeightedMiScore::default().score(&many);
        assert!(score > 0.7 && score < 1.0, "score {}", score);
    }

    #[test]
    fn test_empty_cluster_scores_zero() {
        assert_eq!(WeightedMiScore::default().score(&[]), 0.0);
    }

    #[test]
    fn test_unknown_method_uses_floor_score() {
        let calculator = WeightedMiScore::default();
        let unknown = calculator.score(&[evidence("EBI-I1", "P1", "P2", "MI:9999", "MI:9999", "1", false)]);
        let known = calculator.score(&[evidence("EBI-I1", "P1", "P2", "MI:0114", "MI:0407", "1", false)]);
        assert!(unknown < known);
    }

    struct FixedScore(f64);

    impl MiScoreCalculator for FixedScore {
        fn score(&self, _evidences: &[BinaryInteraction]) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let filter = MiScoreFilter::new(FixedScore(0.43), DEFAULT_EXPORT_THRESHOLD, true);
        let outcome = filter.filter_binaries(vec![evidence("EBI-I1", "P1", "P2", "MI:0018", "MI:0915", "1", false)]);
        assert_eq!(outcome.accepted_acs, vec!["EBI-I1".to_string()]);

        let filter = MiScoreFilter::new(FixedScore(0.42), DEFAULT_EXPORT_THRESHOLD, true);
        let outcome = filter.filter_binaries(vec![evidence("EBI-I1", "P1", "P2", "MI:0018", "MI:0915", "1", false)]);
        assert!(outcome.accepted_acs.is_empty());
        assert_eq!(outcome.rejected_pairs[0].1, PairRejection::BelowThreshold);
    }

    #[test]
    fn test_spoke_expanded_only_pairs_are_excluded() {
        let binaries = vec![
            evidence("EBI-I1", "P1", "P2", "MI:0006", "MI:0915", "1", true),
            evidence("EBI-I2", "P1", "P3", "MI:0006", "MI:0915", "1", true),
            evidence("EBI-I3", "P3", "P1", "MI:0018", "MI:0915", "2", false),
        ];
        let filter = MiScoreFilter::new(FixedScore(0.9), DEFAULT_EXPORT_THRESHOLD, true);
        let outcome = filter.filter_binaries(binaries.clone());
        assert_eq!(outcome.accepted_pairs.len(), 1);
        assert_eq!(outcome.accepted_pairs[0].b, "P3");
        assert_eq!(outcome.accepted_acs, vec!["EBI-I2".to_string(), "EBI-I3".to_string()]);
        assert_eq!(outcome.rejected_pairs[0].1, PairRejection::SpokeExpandedOnly);

        let keep_all = MiScoreFilter::new(FixedScore(0.9), DEFAULT_EXPORT_THRESHOLD, false);
        assert_eq!(keep_all.filter_binaries(binaries).accepted_pairs.len(), 2);
    }

    #[test]
    fn test_settings_override_method_scores() {
        let mut settings = MiScoreSettings::default();
        settings.method_scores.insert("MI:9999".to_string(), 1.0);
        settings.type_scores.insert("MI:9999".to_string(), 1.0);
        let calculator = WeightedMiScore::new(&settings);
        let custom = calculator.score(&[evidence("EBI-I1", "P1", "P2", "MI:9999", "MI:9999", "1", false)]);
        let xray = calculator.score(&[evidence("EBI-I1", "P1", "P2", "MI:0114", "MI:0407", "1", false)]);
        assert!((custom - xray).abs() < 1e-9);
    }
}
