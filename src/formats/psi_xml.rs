//! PSI-MI XML 2.5 export and import, compact form (participants point at `interactorRef`).
//!
//! One `<entry>` is written per publication. The publication travels as the `<bibref>` of
//! each of its experiments; the curating institution is the entry `<source>`.

use crate::domain::model::{
    Annotation, Confidence, CurationStatus, CvTerm, Experiment, Interaction, Interactor,
    Participant, Publication, Referenced, Xref, DOI_DB, PRIMARY_REFERENCE, PUBMED_DB,
};
use crate::domain::ports::InteractionStore;
use crate::utils::error::{DxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PSI_MI_NAMESPACE: &str = "net:sf:psidev:mi";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

const INTACT_DB: &str = "intact";
const INTACT_AC_REF: &str = "intact-ac";
const PSI_MI_DB: &str = "psi-mi";
const IDENTITY_REF: &str = "identity";

const AUTHOR_LIST: &str = "author-list";
const PUBLICATION_YEAR: &str = "publication year";
const PUBLICATION_TITLE: &str = "publication title";
const CURATION_STATUS: &str = "curation status";
const CURATOR: &str = "curator";

#[derive(Debug, Serialize, Deserialize)]
struct EntrySet {
    #[serde(rename = "@xmlns", default)]
    xmlns: Option<String>,
    #[serde(rename = "@level", default)]
    level: Option<u32>,
    #[serde(rename = "@version", default)]
    version: Option<u32>,
    #[serde(rename = "@minorVersion", default)]
    minor_version: Option<u32>,
    #[serde(rename = "entry", default)]
    entries: Vec<EntryXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryXml {
    source: SourceXml,
    #[serde(rename = "experimentList", default, skip_serializing_if = "Option::is_none")]
    experiments: Option<ExperimentList>,
    #[serde(rename = "interactorList", default, skip_serializing_if = "Option::is_none")]
    interactors: Option<InteractorList>,
    #[serde(rename = "interactionList", default, skip_serializing_if = "Option::is_none")]
    interactions: Option<InteractionList>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SourceXml {
    names: Names,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Names {
    #[serde(rename = "shortLabel")]
    short_label: String,
    #[serde(rename = "fullName", default, skip_serializing_if = "Option::is_none")]
    full_name: Option<String>,
}

impl Names {
    fn short(label: &str) -> Self {
        Self {
            short_label: label.to_string(),
            full_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbRef {
    #[serde(rename = "@db")]
    db: String,
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@refType", default, skip_serializing_if = "Option::is_none")]
    ref_type: Option<String>,
}

impl From<&Xref> for DbRef {
    fn from(xref: &Xref) -> Self {
        Self {
            db: xref.database.clone(),
            id: xref.id.clone(),
            ref_type: xref.qualifier.clone(),
        }
    }
}

impl From<DbRef> for Xref {
    fn from(r: DbRef) -> Self {
        Xref {
            database: r.db,
            id: r.id,
            qualifier: r.ref_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct XrefXml {
    #[serde(rename = "primaryRef")]
    primary: DbRef,
    #[serde(rename = "secondaryRef", default)]
    secondary: Vec<DbRef>,
}

impl XrefXml {
    fn from_refs(refs: Vec<DbRef>) -> Option<Self> {
        let mut refs = refs.into_iter();
        let primary = refs.next()?;
        Some(Self {
            primary,
            secondary: refs.collect(),
        })
    }

    fn into_xrefs(xref: Option<XrefXml>) -> Vec<Xref> {
        match xref {
            Some(x) => std::iter::once(x.primary)
                .chain(x.secondary)
                .map(Xref::from)
                .collect(),
            None => Vec::new(),
        }
    }
}

fn ac_ref(ac: &str) -> DbRef {
    DbRef {
        db: INTACT_DB.to_string(),
        id: ac.to_string(),
        ref_type: Some(INTACT_AC_REF.to_string()),
    }
}

/// Removes the database accession reference and returns its id.
fn take_ac(xrefs: &mut Vec<Xref>) -> Option<String> {
    let pos = xrefs
        .iter()
        .position(|x| x.database == INTACT_DB && x.qualifier.as_deref() == Some(INTACT_AC_REF))?;
    Some(xrefs.remove(pos).id)
}

fn record_xref(ac: &str, xrefs: &[Xref], primary_first: Option<&Xref>) -> Option<XrefXml> {
    let mut refs: Vec<DbRef> = Vec::new();
    if let Some(primary) = primary_first {
        refs.push(primary.into());
    }
    refs.push(ac_ref(ac));
    refs.extend(
        xrefs
            .iter()
            .filter(|x| Some(*x) != primary_first)
            .map(DbRef::from),
    );
    XrefXml::from_refs(refs)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CvXml {
    names: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xref: Option<XrefXml>,
}

impl From<&CvTerm> for CvXml {
    fn from(term: &CvTerm) -> Self {
        Self {
            names: Names::short(&term.short_label),
            xref: Some(XrefXml {
                primary: DbRef {
                    db: PSI_MI_DB.to_string(),
                    id: term.mi.clone(),
                    ref_type: Some(IDENTITY_REF.to_string()),
                },
                secondary: Vec::new(),
            }),
        }
    }
}

impl From<CvXml> for CvTerm {
    fn from(cv: CvXml) -> Self {
        let mi = cv
            .xref
            .map(|x| x.primary.id)
            .unwrap_or_else(|| cv.names.short_label.clone());
        CvTerm {
            mi,
            short_label: cv.names.short_label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttributeXml {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "$text", default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AttributeList {
    #[serde(rename = "attribute", default)]
    attributes: Vec<AttributeXml>,
}

impl AttributeList {
    fn from_annotations(annotations: &[Annotation]) -> Option<Self> {
        let attributes: Vec<AttributeXml> = annotations
            .iter()
            .map(|a| AttributeXml {
                name: a.topic.clone(),
                text: a.text.clone(),
            })
            .collect();
        (!attributes.is_empty()).then_some(Self { attributes })
    }

    fn into_annotations(list: Option<AttributeList>) -> Vec<Annotation> {
        list.map(|l| l.attributes)
            .unwrap_or_default()
            .into_iter()
            .map(|a| Annotation {
                topic: a.name,
                text: a.text,
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Organism {
    #[serde(rename = "@ncbiTaxId")]
    taxid: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct HostOrganismList {
    #[serde(rename = "hostOrganism", default)]
    organisms: Vec<Organism>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Bibref {
    xref: XrefXml,
    #[serde(rename = "attributeList", default, skip_serializing_if = "Option::is_none")]
    attributes: Option<AttributeList>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ExperimentList {
    #[serde(rename = "experimentDescription", default)]
    experiments: Vec<ExperimentXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExperimentXml {
    #[serde(rename = "@id")]
    id: u32,
    names: Names,
    bibref: Bibref,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xref: Option<XrefXml>,
    #[serde(rename = "hostOrganismList", default, skip_serializing_if = "Option::is_none")]
    hosts: Option<HostOrganismList>,
    #[serde(rename = "interactionDetectionMethod")]
    detection_method: CvXml,
    #[serde(rename = "participantIdentificationMethod", default, skip_serializing_if = "Option::is_none")]
    participant_detection: Option<CvXml>,
    #[serde(rename = "attributeList", default, skip_serializing_if = "Option::is_none")]
    attributes: Option<AttributeList>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InteractorList {
    #[serde(rename = "interactor", default)]
    interactors: Vec<InteractorXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InteractorXml {
    #[serde(rename = "@id")]
    id: u32,
    names: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xref: Option<XrefXml>,
    #[serde(rename = "interactorType")]
    interactor_type: CvXml,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    organism: Option<Organism>,
    #[serde(rename = "attributeList", default, skip_serializing_if = "Option::is_none")]
    attributes: Option<AttributeList>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct InteractionList {
    #[serde(rename = "interaction", default)]
    interactions: Vec<InteractionXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ExperimentRefList {
    #[serde(rename = "experimentRef", default)]
    refs: Vec<u32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ParticipantList {
    #[serde(rename = "participant", default)]
    participants: Vec<ParticipantXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ParticipantXml {
    #[serde(rename = "@id")]
    id: u32,
    #[serde(rename = "interactorRef", default, skip_serializing_if = "Option::is_none")]
    interactor_ref: Option<u32>,
    #[serde(rename = "biologicalRole", default, skip_serializing_if = "Option::is_none")]
    biological_role: Option<CvXml>,
    #[serde(rename = "experimentalRoleList", default, skip_serializing_if = "Option::is_none")]
    experimental_roles: Option<ExperimentalRoleList>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExperimentalRoleList {
    #[serde(rename = "experimentalRole", default)]
    roles: Vec<CvXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfidenceXml {
    unit: CvXml,
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfidenceList {
    #[serde(rename = "confidence", default)]
    confidences: Vec<ConfidenceXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct InteractionXml {
    #[serde(rename = "@id")]
    id: u32,
    #[serde(rename = "@imexId", default, skip_serializing_if = "Option::is_none")]
    imex_id: Option<String>,
    names: Names,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xref: Option<XrefXml>,
    #[serde(rename = "experimentList", default)]
    experiments: ExperimentRefList,
    #[serde(rename = "participantList", default)]
    participants: ParticipantList,
    #[serde(rename = "interactionType", default)]
    interaction_types: Vec<CvXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    negative: Option<bool>,
    #[serde(rename = "confidenceList", default, skip_serializing_if = "Option::is_none")]
    confidences: Option<ConfidenceList>,
    #[serde(rename = "attributeList", default, skip_serializing_if = "Option::is_none")]
    attributes: Option<AttributeList>,
}

/// A publication with the experiments and interactions curated from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicationEntry {
    pub publication: Publication,
    pub experiments: Vec<Experiment>,
    pub interactions: Vec<Interaction>,
}

impl PublicationEntry {
    pub async fn from_store<S: InteractionStore>(store: &S, publication_ac: &str) -> Result<Self> {
        let publication = store
            .publication(publication_ac)
            .await?
            .ok_or_else(|| DxError::NotFound {
                kind: "Publication",
                ac: publication_ac.to_string(),
            })?;
        let mut experiments = Vec::new();
        for ac in &publication.experiment_acs {
            match store.experiment(ac).await? {
                Some(experiment) => experiments.push(experiment),
                None => tracing::warn!("⚠️ Experiment {} of {} not found", ac, publication_ac),
            }
        }
        let interactions = store.interactions_of_publication(publication_ac).await?;
        Ok(Self {
            publication,
            experiments,
            interactions,
        })
    }
}

struct IdSequence(u32);

impl IdSequence {
    fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct PsiXmlWriter {
    source: String,
    indent: usize,
}

impl Default for PsiXmlWriter {
    fn default() -> Self {
        Self {
            source: "IntAct".to_string(),
            indent: 2,
        }
    }
}

impl PsiXmlWriter {
    /// `source` labels entries whose publication has no institution.
    pub fn new(source: &str, indent: usize) -> Self {
        Self {
            source: source.to_string(),
            indent,
        }
    }

    pub fn to_xml(&self, entries: &[PublicationEntry]) -> Result<String> {
        let mut ids = IdSequence(0);
        let set = EntrySet {
            xmlns: Some(PSI_MI_NAMESPACE.to_string()),
            level: Some(2),
            version: Some(5),
            minor_version: Some(4),
            entries: entries
                .iter()
                .map(|entry| self.entry(entry, &mut ids))
                .collect::<Result<_>>()?,
        };

        let mut body = String::new();
        let mut serializer = quick_xml::se::Serializer::with_root(&mut body, Some("entrySet"))?;
        if self.indent > 0 {
            serializer.indent(' ', self.indent);
        }
        set.serialize(serializer)?;
        tracing::debug!("Serialized {} PSI-MI XML entries", entries.len());
        Ok(format!("{}{}\n", XML_DECLARATION, body))
    }

    fn entry(&self, entry: &PublicationEntry, ids: &mut IdSequence) -> Result<EntryXml> {
        let publication = &entry.publication;
        let source = publication.institution.as_deref().unwrap_or(&self.source);

        let mut experiment_ids: HashMap<&str, u32> = HashMap::new();
        let mut experiments = Vec::with_capacity(entry.experiments.len());
        for experiment in &entry.experiments {
            let id = ids.next();
            experiment_ids.insert(&experiment.ac, id);
            experiments.push(ExperimentXml {
                id,
                names: Names::short(&experiment.short_label),
                bibref: bibref(publication),
                xref: record_xref(&experiment.ac, &experiment.xrefs, None),
                hosts: experiment.host_taxid.map(|taxid| HostOrganismList {
                    organisms: vec![Organism { taxid }],
                }),
                detection_method: (&experiment.detection_method).into(),
                participant_detection: experiment.participant_detection.as_ref().map(CvXml::from),
                attributes: AttributeList::from_annotations(&experiment.annotations),
            });
        }

        let mut interactor_ids: HashMap<&str, u32> = HashMap::new();
        let mut interactors = Vec::new();
        let mut interactions = Vec::with_capacity(entry.interactions.len());
        for interaction in &entry.interactions {
            let refs = interaction
                .experiment_acs
                .iter()
                .map(|ac| {
                    experiment_ids.get(ac.as_str()).copied().ok_or_else(|| DxError::ConversionError {
                        message: format!(
                            "{} refers to experiment {} outside publication {}",
                            interaction.ac, ac, publication.ac
                        ),
                    })
                })
                .collect::<Result<Vec<u32>>>()?;

            let mut participants = Vec::with_capacity(interaction.participants.len());
            for participant in &interaction.participants {
                let interactor = &participant.interactor;
                let interactor_ref = match interactor_ids.get(interactor.ac.as_str()) {
                    Some(id) => *id,
                    None => {
                        let id = ids.next();
                        interactor_ids.insert(&interactor.ac, id);
                        interactors.push(interactor_xml(interactor, id));
                        id
                    }
                };
                participants.push(ParticipantXml {
                    id: ids.next(),
                    interactor_ref: Some(interactor_ref),
                    biological_role: Some((&participant.biological_role).into()),
                    experimental_roles: Some(ExperimentalRoleList {
                        roles: vec![(&participant.experimental_role).into()],
                    }),
                });
            }

            let confidences: Vec<ConfidenceXml> = interaction
                .confidences
                .iter()
                .map(|c| ConfidenceXml {
                    unit: CvXml {
                        names: Names::short(&c.score_type),
                        xref: None,
                    },
                    value: c.value.clone(),
                })
                .collect();

            interactions.push(InteractionXml {
                id: ids.next(),
                imex_id: interaction.imex_id().map(str::to_string),
                names: Names::short(&interaction.short_label),
                xref: record_xref(&interaction.ac, &interaction.xrefs, None),
                experiments: ExperimentRefList { refs },
                participants: ParticipantList { participants },
                interaction_types: vec![(&interaction.interaction_type).into()],
                negative: interaction.negative.then_some(true),
                confidences: (!confidences.is_empty()).then_some(ConfidenceList { confidences }),
                attributes: AttributeList::from_annotations(&interaction.annotations),
            });
        }

        Ok(EntryXml {
            source: SourceXml {
                names: Names::short(source),
            },
            experiments: (!experiments.is_empty()).then_some(ExperimentList { experiments }),
            interactors: (!interactors.is_empty()).then_some(InteractorList { interactors }),
            interactions: (!interactions.is_empty()).then_some(InteractionList { interactions }),
        })
    }
}

fn bibref(publication: &Publication) -> Bibref {
    let identifier = publication.identifier_xref();
    let mut refs: Vec<DbRef> = identifier.iter().map(DbRef::from).collect();
    refs.push(ac_ref(&publication.ac));
    refs.extend(publication.xrefs.iter().map(DbRef::from));

    let mut attributes = Vec::new();
    let mut push = |name: &str, text: String| {
        attributes.push(AttributeXml {
            name: name.to_string(),
            text: Some(text),
        })
    };
    if !publication.authors.is_empty() {
        push(AUTHOR_LIST, publication.authors.join(", "));
    }
    if let Some(year) = publication.year {
        push(PUBLICATION_YEAR, year.to_string());
    }
    if let Some(title) = &publication.title {
        push(PUBLICATION_TITLE, title.clone());
    }
    push(CURATION_STATUS, publication.status.as_str().to_string());
    if let Some(curator) = &publication.curator {
        push(CURATOR, curator.clone());
    }
    if let Some(list) = AttributeList::from_annotations(&publication.annotations) {
        attributes.extend(list.attributes);
    }

    Bibref {
        // The accession ref is always present, so the list is never empty.
        xref: XrefXml::from_refs(refs).unwrap_or_else(|| XrefXml {
            primary: ac_ref(&publication.ac),
            secondary: Vec::new(),
        }),
        attributes: Some(AttributeList { attributes }),
    }
}

fn interactor_xml(interactor: &Interactor, id: u32) -> InteractorXml {
    let identity = interactor
        .xrefs
        .iter()
        .find(|x| x.qualifier.as_deref() == Some(IDENTITY_REF));
    InteractorXml {
        id,
        names: Names::short(&interactor.short_label),
        xref: record_xref(&interactor.ac, &interactor.xrefs, identity),
        interactor_type: (&interactor.interactor_type).into(),
        organism: interactor.taxid.map(|taxid| Organism { taxid }),
        attributes: AttributeList::from_annotations(&interactor.annotations),
    }
}

#[derive(Debug, Default)]
pub struct PsiXmlReader;

impl PsiXmlReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, xml: &str) -> Result<Vec<PublicationEntry>> {
        let set: EntrySet = quick_xml::de::from_str(xml)?;
        let entries = set
            .entries
            .into_iter()
            .map(read_entry)
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Parsed {} PSI-MI XML entries", entries.len());
        Ok(entries)
    }
}

fn conversion_error(message: String) -> DxError {
    DxError::ConversionError { message }
}

fn read_entry(entry: EntryXml) -> Result<PublicationEntry> {
    let institution = entry.source.names.short_label;
    let experiments_xml = entry.experiments.unwrap_or_default().experiments;

    let first = experiments_xml
        .first()
        .ok_or_else(|| conversion_error(format!("entry from {} has no experiment", institution)))?;
    let publication = read_publication(&first.bibref, &institution)?;

    let mut experiment_acs: HashMap<u32, String> = HashMap::new();
    let mut experiments = Vec::with_capacity(experiments_xml.len());
    for xml in experiments_xml {
        let mut xrefs = XrefXml::into_xrefs(xml.xref);
        let ac = take_ac(&mut xrefs)
            .ok_or_else(|| conversion_error(format!("experiment {} has no accession", xml.id)))?;
        experiment_acs.insert(xml.id, ac.clone());
        experiments.push(Experiment {
            ac,
            short_label: xml.names.short_label,
            detection_method: xml.detection_method.into(),
            participant_detection: xml.participant_detection.map(CvTerm::from),
            host_taxid: xml
                .hosts
                .and_then(|h| h.organisms.into_iter().next())
                .map(|o| o.taxid),
            publication_ac: publication.ac.clone(),
            xrefs,
            annotations: AttributeList::into_annotations(xml.attributes),
        });
    }

    let mut interactors: HashMap<u32, Interactor> = HashMap::new();
    for xml in entry.interactors.unwrap_or_default().interactors {
        let mut xrefs = XrefXml::into_xrefs(xml.xref);
        let ac = take_ac(&mut xrefs)
            .ok_or_else(|| conversion_error(format!("interactor {} has no accession", xml.id)))?;
        interactors.insert(
            xml.id,
            Interactor {
                ac,
                short_label: xml.names.short_label,
                interactor_type: xml.interactor_type.into(),
                taxid: xml.organism.map(|o| o.taxid),
                xrefs,
                annotations: AttributeList::into_annotations(xml.attributes),
            },
        );
    }

    let mut interactions = Vec::new();
    for xml in entry.interactions.unwrap_or_default().interactions {
        interactions.push(read_interaction(xml, &experiment_acs, &interactors)?);
    }

    let mut publication = publication;
    publication.experiment_acs = experiments.iter().map(|e| e.ac.clone()).collect();
    Ok(PublicationEntry {
        publication,
        experiments,
        interactions,
    })
}

fn read_publication(bibref: &Bibref, institution: &str) -> Result<Publication> {
    let mut xrefs = XrefXml::into_xrefs(Some(bibref.xref.clone()));
    let ac = take_ac(&mut xrefs)
        .ok_or_else(|| conversion_error("bibref has no publication accession".to_string()))?;

    let mut identifier = |db: &str| {
        let pos = xrefs
            .iter()
            .position(|x| x.database == db && x.qualifier.as_deref() == Some(PRIMARY_REFERENCE))?;
        Some(xrefs.remove(pos).id)
    };
    let pubmed_id = identifier(PUBMED_DB);
    let doi = identifier(DOI_DB);

    let mut publication = Publication {
        ac,
        pubmed_id,
        doi,
        title: None,
        authors: Vec::new(),
        year: None,
        status: CurationStatus::default(),
        institution: Some(institution.to_string()),
        curator: None,
        experiment_acs: Vec::new(),
        xrefs,
        annotations: Vec::new(),
    };

    for attribute in AttributeList::into_annotations(bibref.attributes.clone()) {
        let text = attribute.text.clone().unwrap_or_default();
        match attribute.topic.as_str() {
            AUTHOR_LIST => {
                publication.authors = text.split(", ").map(str::to_string).collect();
            }
            PUBLICATION_YEAR => publication.year = text.parse().ok(),
            PUBLICATION_TITLE => publication.title = Some(text),
            CURATION_STATUS => {
                publication.status = CurationStatus::parse(&text).ok_or_else(|| {
                    conversion_error(format!("unknown curation status '{}'", text))
                })?;
            }
            CURATOR => publication.curator = Some(text),
            _ => publication.annotations.push(attribute),
        }
    }
    Ok(publication)
}

fn read_interaction(
    xml: InteractionXml,
    experiment_acs: &HashMap<u32, String>,
    interactors: &HashMap<u32, Interactor>,
) -> Result<Interaction> {
    let mut xrefs = XrefXml::into_xrefs(xml.xref);
    let ac = take_ac(&mut xrefs)
        .ok_or_else(|| conversion_error(format!("interaction {} has no accession", xml.id)))?;

    let experiment_acs = xml
        .experiments
        .refs
        .iter()
        .map(|id| {
            experiment_acs
                .get(id)
                .cloned()
                .ok_or_else(|| conversion_error(format!("{} refers to unknown experiment {}", ac, id)))
        })
        .collect::<Result<Vec<_>>>()?;

    let unspecified = || CvTerm::new("MI:0499", "unspecified role");
    let mut participants = Vec::with_capacity(xml.participants.participants.len());
    for p in xml.participants.participants {
        let interactor_ref = p.interactor_ref.ok_or_else(|| {
            conversion_error(format!("participant {} of {} has no interactorRef", p.id, ac))
        })?;
        let interactor = interactors.get(&interactor_ref).cloned().ok_or_else(|| {
            conversion_error(format!("{} refers to unknown interactor {}", ac, interactor_ref))
        })?;
        participants.push(Participant {
            interactor,
            experimental_role: p
                .experimental_roles
                .and_then(|l| l.roles.into_iter().next())
                .map(CvTerm::from)
                .unwrap_or_else(unspecified),
            biological_role: p.biological_role.map(CvTerm::from).unwrap_or_else(unspecified),
        });
    }

    let interaction_type = xml
        .interaction_types
        .into_iter()
        .next()
        .map(CvTerm::from)
        .ok_or_else(|| conversion_error(format!("{} has no interaction type", ac)))?;

    let mut interaction = Interaction {
        ac,
        short_label: xml.names.short_label,
        interaction_type,
        experiment_acs,
        participants,
        negative: xml.negative.unwrap_or(false),
        confidences: xml
            .confidences
            .map(|l| l.confidences)
            .unwrap_or_default()
            .into_iter()
            .map(|c| Confidence {
                score_type: c.unit.names.short_label,
                value: c.value,
            })
            .collect(),
        xrefs,
        annotations: AttributeList::into_annotations(xml.attributes),
        created: None,
    };
    if let Some(imex) = xml.imex_id {
        if interaction.imex_id().is_none() {
            interaction.set_imex_id(&imex);
        }
    }
    Ok(interaction)
}
