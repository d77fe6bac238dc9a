use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNIPROT_DB: &str = "uniprotkb";
pub const IMEX_DB: &str = "imex";
pub const PUBMED_DB: &str = "pubmed";
pub const DOI_DB: &str = "doi";

pub const IDENTITY: &str = "identity";
pub const IMEX_PRIMARY: &str = "imex-primary";
pub const PRIMARY_REFERENCE: &str = "primary-reference";

pub const DR_EXPORT_TOPIC: &str = "uniprot-dr-export";
pub const CURATION_DEPTH_TOPIC: &str = "curation depth";
pub const IMEX_CURATION: &str = "imex curation";
pub const IMEX_CURATION_TOPIC: &str = "imex-curation";
pub const FULL_COVERAGE_TOPIC: &str = "full-coverage";

pub const BAIT_MI: &str = "MI:0496";
pub const PROTEIN_MI: &str = "MI:0326";
pub const PHYSICAL_ASSOCIATION_MI: &str = "MI:0915";

/// A controlled-vocabulary term, identified by its PSI-MI id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CvTerm {
    pub mi: String,
    pub short_label: String,
}

impl CvTerm {
    pub fn new(mi: &str, short_label: &str) -> Self {
        Self {
            mi: mi.to_string(),
            short_label: short_label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xref {
    pub database: String,
    pub id: String,
    #[serde(default)]
    pub qualifier: Option<String>,
}

impl Xref {
    pub fn new(database: &str, id: &str, qualifier: Option<&str>) -> Self {
        Self {
            database: database.to_string(),
            id: id.to_string(),
            qualifier: qualifier.map(str::to_string),
        }
    }

    pub fn imex_primary(id: &str) -> Self {
        Self::new(IMEX_DB, id, Some(IMEX_PRIMARY))
    }

    fn is_imex_primary(&self) -> bool {
        self.database == IMEX_DB && self.qualifier.as_deref() == Some(IMEX_PRIMARY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub topic: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl Annotation {
    pub fn new(topic: &str, text: Option<&str>) -> Self {
        Self {
            topic: topic.to_string(),
            text: text.map(str::to_string),
        }
    }
}

/// Anything that carries annotations.
pub trait Annotated {
    fn annotations(&self) -> &[Annotation];
    fn annotations_mut(&mut self) -> &mut Vec<Annotation>;

    fn annotation_text(&self, topic: &str) -> Option<&str> {
        self.annotations()
            .iter()
            .find(|a| a.topic.eq_ignore_ascii_case(topic))
            .map(|a| a.text.as_deref().unwrap_or(""))
    }

    fn has_annotation(&self, topic: &str) -> bool {
        self.annotation_text(topic).is_some()
    }

    /// Adds the annotation unless one with the same topic exists; returns true when added.
    fn add_annotation_once(&mut self, topic: &str, text: Option<&str>) -> bool {
        if self.has_annotation(topic) {
            return false;
        }
        self.annotations_mut().push(Annotation::new(topic, text));
        true
    }
}

/// Anything that carries cross references.
pub trait Referenced {
    fn xrefs(&self) -> &[Xref];
    fn xrefs_mut(&mut self) -> &mut Vec<Xref>;

    fn imex_id(&self) -> Option<&str> {
        self.xrefs()
            .iter()
            .find(|x| x.is_imex_primary())
            .map(|x| x.id.as_str())
    }

    fn set_imex_id(&mut self, id: &str) {
        self.xrefs_mut().retain(|x| !x.is_imex_primary());
        self.xrefs_mut().push(Xref::imex_primary(id));
    }
}

macro_rules! impl_holders {
    ($($ty:ty),*) => {
        $(
            impl Annotated for $ty {
                fn annotations(&self) -> &[Annotation] {
                    &self.annotations
                }
                fn annotations_mut(&mut self) -> &mut Vec<Annotation> {
                    &mut self.annotations
                }
            }

            impl Referenced for $ty {
                fn xrefs(&self) -> &[Xref] {
                    &self.xrefs
                }
                fn xrefs_mut(&mut self) -> &mut Vec<Xref> {
                    &mut self.xrefs
                }
            }
        )*
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interactor {
    pub ac: String,
    pub short_label: String,
    pub interactor_type: CvTerm,
    #[serde(default)]
    pub taxid: Option<i32>,
    #[serde(default)]
    pub xrefs: Vec<Xref>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Interactor {
    /// UniProtKB accession from the identity cross reference.
    pub fn uniprot_ac(&self) -> Option<&str> {
        self.xrefs
            .iter()
            .find(|x| x.database == UNIPROT_DB && x.qualifier.as_deref() == Some(IDENTITY))
            .map(|x| x.id.as_str())
    }

    pub fn is_protein(&self) -> bool {
        self.interactor_type.mi == PROTEIN_MI
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub interactor: Interactor,
    pub experimental_role: CvTerm,
    pub biological_role: CvTerm,
}

impl Participant {
    pub fn is_bait(&self) -> bool {
        self.experimental_role.mi == BAIT_MI
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub ac: String,
    pub short_label: String,
    pub detection_method: CvTerm,
    #[serde(default)]
    pub participant_detection: Option<CvTerm>,
    #[serde(default)]
    pub host_taxid: Option<i32>,
    pub publication_ac: String,
    #[serde(default)]
    pub xrefs: Vec<Xref>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub score_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub ac: String,
    pub short_label: String,
    pub interaction_type: CvTerm,
    pub experiment_acs: Vec<String>,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub negative: bool,
    #[serde(default)]
    pub confidences: Vec<Confidence>,
    #[serde(default)]
    pub xrefs: Vec<Xref>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl Interaction {
    pub fn uniprot_acs(&self) -> Vec<Option<&str>> {
        self.participants
            .iter()
            .map(|p| p.interactor.uniprot_ac())
            .collect()
    }

    /// True for protein-protein interactions: every participant is a protein.
    pub fn is_ppi(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.interactor.is_protein())
    }

    pub fn is_binary(&self) -> bool {
        self.participants.len() <= 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurationStatus {
    #[default]
    New,
    Curation,
    Ready,
    Accepted,
    Released,
}

impl CurationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurationStatus::New => "new",
            CurationStatus::Curation => "curation",
            CurationStatus::Ready => "ready",
            CurationStatus::Accepted => "accepted",
            CurationStatus::Released => "released",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "new" => Some(CurationStatus::New),
            "curation" | "curation in progress" => Some(CurationStatus::Curation),
            "ready" | "ready for checking" => Some(CurationStatus::Ready),
            "accepted" => Some(CurationStatus::Accepted),
            "released" => Some(CurationStatus::Released),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub ac: String,
    #[serde(default)]
    pub pubmed_id: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub status: CurationStatus,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub curator: Option<String>,
    #[serde(default)]
    pub experiment_acs: Vec<String>,
    #[serde(default)]
    pub xrefs: Vec<Xref>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl Publication {
    /// PubMed id if present, otherwise DOI. This is the key used by the registry.
    pub fn identifier(&self) -> Option<&str> {
        self.pubmed_id.as_deref().or(self.doi.as_deref())
    }

    pub fn identifier_xref(&self) -> Option<Xref> {
        if let Some(pmid) = &self.pubmed_id {
            Some(Xref::new(PUBMED_DB, pmid, Some(PRIMARY_REFERENCE)))
        } else {
            self.doi
                .as_ref()
                .map(|doi| Xref::new(DOI_DB, doi, Some(PRIMARY_REFERENCE)))
        }
    }

    pub fn is_imex_curated(&self) -> bool {
        self.annotation_text(CURATION_DEPTH_TOPIC)
            .map(|t| t.eq_ignore_ascii_case(IMEX_CURATION))
            .unwrap_or(false)
            || self.has_annotation(IMEX_CURATION_TOPIC)
    }

    /// "Surname et al. (year)" as used in MITAB column 7.
    pub fn first_author_label(&self) -> Option<String> {
        let first = self.authors.first()?;
        let surname = first.split_whitespace().next().unwrap_or(first);
        let mut label = format!("{} et al.", surname);
        if let Some(year) = self.year {
            label.push_str(&format!(" ({})", year));
        }
        Some(label)
    }
}

impl_holders!(Interactor, Experiment, Interaction, Publication);

/// One side of a binary interaction after spoke expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryParticipant {
    pub interactor: Interactor,
    pub experimental_role: CvTerm,
    pub biological_role: CvTerm,
}

impl From<&Participant> for BinaryParticipant {
    fn from(p: &Participant) -> Self {
        Self {
            interactor: p.interactor.clone(),
            experimental_role: p.experimental_role.clone(),
            biological_role: p.biological_role.clone(),
        }
    }
}

/// Pairwise evidence derived from an interaction. `b` is `None` for self interactions
/// with a single participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryInteraction {
    pub source_ac: String,
    pub a: BinaryParticipant,
    pub b: Option<BinaryParticipant>,
    pub interaction_type: CvTerm,
    pub expanded: bool,
    #[serde(default)]
    pub expansion_method: Option<CvTerm>,
    #[serde(default)]
    pub detection_methods: Vec<CvTerm>,
    #[serde(default)]
    pub publication_ids: Vec<Xref>,
    #[serde(default)]
    pub first_author: Option<String>,
    #[serde(default)]
    pub host_taxid: Option<i32>,
    #[serde(default)]
    pub imex_id: Option<String>,
    #[serde(default)]
    pub confidences: Vec<Confidence>,
    #[serde(default)]
    pub negative: bool,
}

impl BinaryInteraction {
    /// Unordered UniProt pair key, `None` when either side lacks a UniProt AC.
    pub fn uniprot_pair(&self) -> Option<(String, String)> {
        let a = self.a.interactor.uniprot_ac()?;
        let b = match &self.b {
            Some(b) => b.interactor.uniprot_ac()?,
            None => a,
        };
        Some(ordered_pair(a, b))
    }
}

pub fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn protein(ac: &str, uniprot: &str) -> Interactor {
        Interactor {
            ac: ac.to_string(),
            short_label: uniprot.to_lowercase(),
            interactor_type: CvTerm::new(PROTEIN_MI, "protein"),
            taxid: Some(9606),
            xrefs: vec![Xref::new(UNIPROT_DB, uniprot, Some(IDENTITY))],
            annotations: vec![],
        }
    }

    pub fn participant(interactor: Interactor, role_mi: &str) -> Participant {
        let label = match role_mi {
            BAIT_MI => "bait",
            "MI:0498" => "prey",
            _ => "unspecified role",
        };
        Participant {
            interactor,
            experimental_role: CvTerm::new(role_mi, label),
            biological_role: CvTerm::new("MI:0499", "unspecified role"),
        }
    }

    pub fn interaction(ac: &str, experiment_acs: &[&str], participants: Vec<Participant>) -> Interaction {
        Interaction {
            ac: ac.to_string(),
            short_label: ac.to_lowercase(),
            interaction_type: CvTerm::new(PHYSICAL_ASSOCIATION_MI, "physical association"),
            experiment_acs: experiment_acs.iter().map(|s| s.to_string()).collect(),
            participants,
            negative: false,
            confidences: vec![],
            xrefs: vec![],
            annotations: vec![],
            created: None,
        }
    }

    pub fn pair(ac: &str, experiment_ac: &str, a: &str, b: &str) -> Interaction {
        interaction(
            ac,
            &[experiment_ac],
            vec![
                participant(protein(&format!("EBI-{}", a), a), BAIT_MI),
                participant(protein(&format!("EBI-{}", b), b), "MI:0498"),
            ],
        )
    }

    pub fn experiment(ac: &str, method_mi: &str, publication_ac: &str) -> Experiment {
        Experiment {
            ac: ac.to_string(),
            short_label: ac.to_lowercase(),
            detection_method: CvTerm::new(method_mi, method_mi),
            participant_detection: None,
            host_taxid: None,
            publication_ac: publication_ac.to_string(),
            xrefs: vec![],
            annotations: vec![],
        }
    }

    pub fn publication(ac: &str, pubmed: &str, status: CurationStatus) -> Publication {
        Publication {
            ac: ac.to_string(),
            pubmed_id: Some(pubmed.to_string()),
            doi: None,
            title: Some(format!("Paper {}", pubmed)),
            authors: vec!["Smith J".to_string(), "Doe A".to_string()],
            year: Some(2010),
            status,
            institution: Some("IntAct".to_string()),
            curator: Some("curator1".to_string()),
            experiment_acs: vec![],
            xrefs: vec![],
            annotations: vec![],
        }
    }
}
