//! Field-based row model between the domain records and MITAB.

use crate::domain::model::{
    BinaryInteraction, BinaryParticipant, Confidence, CvTerm, Interactor, Xref, IDENTITY,
    IMEX_DB, PROTEIN_MI, UNIPROT_DB,
};
use crate::utils::error::{DxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column keys, in MITAB 2.7 order.
pub mod keys {
    pub const ID_A: &str = "idA";
    pub const ID_B: &str = "idB";
    pub const ALTID_A: &str = "altidA";
    pub const ALTID_B: &str = "altidB";
    pub const ALIAS_A: &str = "aliasA";
    pub const ALIAS_B: &str = "aliasB";
    pub const DETMETHOD: &str = "detmethod";
    pub const PUBAUTH: &str = "pubauth";
    pub const PUBID: &str = "pubid";
    pub const TAXID_A: &str = "taxidA";
    pub const TAXID_B: &str = "taxidB";
    pub const TYPE: &str = "type";
    pub const SOURCE: &str = "source";
    pub const INTERACTION_ID: &str = "interaction_id";
    pub const CONFIDENCE: &str = "confidence";
    pub const COMPLEX_EXPANSION: &str = "complex_expansion";
    pub const BIOROLE_A: &str = "bioRoleA";
    pub const BIOROLE_B: &str = "bioRoleB";
    pub const EXPROLE_A: &str = "expRoleA";
    pub const EXPROLE_B: &str = "expRoleB";
    pub const TYPE_A: &str = "typeA";
    pub const TYPE_B: &str = "typeB";
    pub const XREFS_A: &str = "xrefsA";
    pub const XREFS_B: &str = "xrefsB";
    pub const XREFS_I: &str = "xrefsI";
    pub const ANNOTATIONS_A: &str = "annotA";
    pub const ANNOTATIONS_B: &str = "annotB";
    pub const ANNOTATIONS_I: &str = "annotI";
    pub const HOST_ORGANISM: &str = "hostOrganism";
    pub const PARAMETERS: &str = "parameters";
    pub const CREATION_DATE: &str = "creationDate";
    pub const UPDATE_DATE: &str = "updateDate";
    pub const CHECKSUM_A: &str = "checksumA";
    pub const CHECKSUM_B: &str = "checksumB";
    pub const CHECKSUM_I: &str = "checksumI";
    pub const NEGATIVE: &str = "negative";
    pub const FEATURES_A: &str = "featuresA";
    pub const FEATURES_B: &str = "featuresB";
    pub const STOICHIOMETRY_A: &str = "stoichiometryA";
    pub const STOICHIOMETRY_B: &str = "stoichiometryB";
    pub const PMETHOD_A: &str = "pmethodA";
    pub const PMETHOD_B: &str = "pmethodB";

    pub const MITAB27: [&str; 42] = [
        ID_A, ID_B, ALTID_A, ALTID_B, ALIAS_A, ALIAS_B, DETMETHOD, PUBAUTH, PUBID, TAXID_A,
        TAXID_B, TYPE, SOURCE, INTERACTION_ID, CONFIDENCE, COMPLEX_EXPANSION, BIOROLE_A,
        BIOROLE_B, EXPROLE_A, EXPROLE_B, TYPE_A, TYPE_B, XREFS_A, XREFS_B, XREFS_I,
        ANNOTATIONS_A, ANNOTATIONS_B, ANNOTATIONS_I, HOST_ORGANISM, PARAMETERS, CREATION_DATE,
        UPDATE_DATE, CHECKSUM_A, CHECKSUM_B, CHECKSUM_I, NEGATIVE, FEATURES_A, FEATURES_B,
        STOICHIOMETRY_A, STOICHIOMETRY_B, PMETHOD_A, PMETHOD_B,
    ];
}

pub const PSI_MI: &str = "psi-mi";
pub const INTACT_DB: &str = "intact";
pub const TAXID: &str = "taxid";
pub const MISCORE_TYPE: &str = "intact-miscore";

/// One value in a column: `db:value(text)`, any part optional except `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub db: Option<String>,
    pub value: String,
    pub text: Option<String>,
}

impl Field {
    pub fn new(db: &str, value: &str, text: Option<&str>) -> Self {
        Self {
            db: Some(db.to_string()),
            value: value.to_string(),
            text: text.map(str::to_string),
        }
    }

    pub fn raw(value: &str) -> Self {
        Self {
            db: None,
            value: value.to_string(),
            text: None,
        }
    }

    pub fn cv(term: &CvTerm) -> Self {
        Self::new(PSI_MI, &term.mi, Some(&term.short_label))
    }

    fn to_cv(&self) -> CvTerm {
        CvTerm {
            mi: self.value.clone(),
            short_label: self.text.clone().unwrap_or_else(|| self.value.clone()),
        }
    }

    fn is_db(&self, db: &str) -> bool {
        self.db.as_deref().map(|d| d.eq_ignore_ascii_case(db)).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    columns: BTreeMap<String, Vec<Field>>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> &[Field] {
        self.columns.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&Field> {
        self.get(key).first()
    }

    pub fn push(&mut self, key: &str, field: Field) {
        self.columns.entry(key.to_string()).or_default().push(field);
    }

    pub fn set(&mut self, key: &str, fields: Vec<Field>) {
        if fields.is_empty() {
            self.columns.remove(key);
        } else {
            self.columns.insert(key.to_string(), fields);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }
}

/// Converts binary interactions to rows and back.
#[derive(Debug, Clone)]
pub struct InteractionConverter {
    source: CvTerm,
}

impl Default for InteractionConverter {
    fn default() -> Self {
        Self {
            source: CvTerm::new("MI:0469", "IntAct"),
        }
    }
}

impl InteractionConverter {
    pub fn new(source: CvTerm) -> Self {
        Self { source }
    }

    pub fn to_row(&self, binary: &BinaryInteraction) -> Row {
        let mut row = Row::new();
        self.participant_columns(&mut row, &binary.a, Side::A);
        // Self interactions repeat interactor A on side B.
        let b = binary.b.as_ref().unwrap_or(&binary.a);
        self.participant_columns(&mut row, b, Side::B);

        row.set(keys::DETMETHOD, binary.detection_methods.iter().map(Field::cv).collect());
        if let Some(author) = &binary.first_author {
            row.push(keys::PUBAUTH, Field::raw(author));
        }
        row.set(
            keys::PUBID,
            binary
                .publication_ids
                .iter()
                .map(|x| Field::new(&x.database, &x.id, None))
                .collect(),
        );
        row.push(keys::TYPE, Field::cv(&binary.interaction_type));
        row.push(keys::SOURCE, Field::cv(&self.source));
        row.push(keys::INTERACTION_ID, Field::new(INTACT_DB, &binary.source_ac, None));
        if let Some(imex) = &binary.imex_id {
            row.push(keys::INTERACTION_ID, Field::new(IMEX_DB, imex, None));
        }
        row.set(
            keys::CONFIDENCE,
            binary
                .confidences
                .iter()
                .map(|c| Field::new(&c.score_type, &c.value, None))
                .collect(),
        );
        if let Some(method) = &binary.expansion_method {
            row.push(keys::COMPLEX_EXPANSION, Field::cv(method));
        }
        if let Some(host) = binary.host_taxid {
            row.push(keys::HOST_ORGANISM, Field::new(TAXID, &host.to_string(), None));
        }
        row.push(keys::NEGATIVE, Field::raw(if binary.negative { "true" } else { "false" }));
        row
    }

    fn participant_columns(&self, row: &mut Row, participant: &BinaryParticipant, side: Side) {
        let interactor = &participant.interactor;
        match interactor.uniprot_ac() {
            Some(ac) => row.push(side.key(keys::ID_A, keys::ID_B), Field::new(UNIPROT_DB, ac, None)),
            None => row.push(side.key(keys::ID_A, keys::ID_B), Field::new(INTACT_DB, &interactor.ac, None)),
        }
        row.push(side.key(keys::ALTID_A, keys::ALTID_B), Field::new(INTACT_DB, &interactor.ac, None));
        row.push(
            side.key(keys::ALIAS_A, keys::ALIAS_B),
            Field::new(PSI_MI, &interactor.short_label, Some("display_short")),
        );
        if let Some(taxid) = interactor.taxid {
            row.push(side.key(keys::TAXID_A, keys::TAXID_B), Field::new(TAXID, &taxid.to_string(), None));
        }
        row.push(side.key(keys::BIOROLE_A, keys::BIOROLE_B), Field::cv(&participant.biological_role));
        row.push(side.key(keys::EXPROLE_A, keys::EXPROLE_B), Field::cv(&participant.experimental_role));
        row.push(side.key(keys::TYPE_A, keys::TYPE_B), Field::cv(&interactor.interactor_type));
        row.set(
            side.key(keys::XREFS_A, keys::XREFS_B),
            interactor
                .xrefs
                .iter()
                .filter(|x| x.qualifier.as_deref() != Some(IDENTITY))
                .map(|x| Field::new(&x.database, &x.id, x.qualifier.as_deref()))
                .collect(),
        );
    }

    pub fn from_row(&self, row: &Row) -> Result<BinaryInteraction> {
        let a = self.participant_from_row(row, Side::A)?;
        let b = self.participant_from_row(row, Side::B)?;
        let b = if a.interactor.ac == b.interactor.ac { None } else { Some(b) };

        let interaction_ids = row.get(keys::INTERACTION_ID);
        let source_ac = interaction_ids
            .iter()
            .find(|f| f.is_db(INTACT_DB))
            .or_else(|| interaction_ids.first())
            .map(|f| f.value.clone())
            .ok_or_else(|| DxError::ConversionError {
                message: "row has no interaction identifier".to_string(),
            })?;
        let imex_id = interaction_ids
            .iter()
            .find(|f| f.is_db(IMEX_DB))
            .map(|f| f.value.clone());

        let expansion_method = row.first(keys::COMPLEX_EXPANSION).map(Field::to_cv);
        let interaction_type = row
            .first(keys::TYPE)
            .map(Field::to_cv)
            .unwrap_or_else(|| CvTerm::new("MI:0190", "interaction type"));

        Ok(BinaryInteraction {
            source_ac,
            a,
            b,
            interaction_type,
            expanded: expansion_method.is_some(),
            expansion_method,
            detection_methods: row.get(keys::DETMETHOD).iter().map(Field::to_cv).collect(),
            publication_ids: row
                .get(keys::PUBID)
                .iter()
                .map(|f| Xref::new(f.db.as_deref().unwrap_or(""), &f.value, None))
                .collect(),
            first_author: row.first(keys::PUBAUTH).map(|f| f.value.clone()),
            host_taxid: row
                .first(keys::HOST_ORGANISM)
                .and_then(|f| f.value.parse().ok()),
            imex_id,
            confidences: row
                .get(keys::CONFIDENCE)
                .iter()
                .map(|f| Confidence {
                    score_type: f.db.clone().unwrap_or_default(),
                    value: f.value.clone(),
                })
                .collect(),
            negative: row
                .first(keys::NEGATIVE)
                .map(|f| f.value.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }

    fn participant_from_row(&self, row: &Row, side: Side) -> Result<BinaryParticipant> {
        let id = row
            .first(side.key(keys::ID_A, keys::ID_B))
            .ok_or_else(|| DxError::ConversionError {
                message: format!("row has no {}", side.key(keys::ID_A, keys::ID_B)),
            })?;

        let mut xrefs = Vec::new();
        if id.is_db(UNIPROT_DB) {
            xrefs.push(Xref::new(UNIPROT_DB, &id.value, Some(IDENTITY)));
        }
        for field in row.get(side.key(keys::XREFS_A, keys::XREFS_B)) {
            xrefs.push(Xref::new(
                field.db.as_deref().unwrap_or(""),
                &field.value,
                field.text.as_deref(),
            ));
        }

        let ac = row
            .get(side.key(keys::ALTID_A, keys::ALTID_B))
            .iter()
            .find(|f| f.is_db(INTACT_DB))
            .map(|f| f.value.clone())
            .unwrap_or_else(|| id.value.clone());
        let short_label = row
            .first(side.key(keys::ALIAS_A, keys::ALIAS_B))
            .map(|f| f.value.clone())
            .unwrap_or_else(|| id.value.to_lowercase());
        let unspecified = || CvTerm::new("MI:0499", "unspecified role");

        Ok(BinaryParticipant {
            interactor: Interactor {
                ac,
                short_label,
                interactor_type: row
                    .first(side.key(keys::TYPE_A, keys::TYPE_B))
                    .map(Field::to_cv)
                    .unwrap_or_else(|| CvTerm::new(PROTEIN_MI, "protein")),
                taxid: row
                    .first(side.key(keys::TAXID_A, keys::TAXID_B))
                    .and_then(|f| f.value.parse().ok()),
                xrefs,
                annotations: Vec::new(),
            },
            experimental_role: row
                .first(side.key(keys::EXPROLE_A, keys::EXPROLE_B))
                .map(Field::to_cv)
                .unwrap_or_else(unspecified),
            biological_role: row
                .first(side.key(keys::BIOROLE_A, keys::BIOROLE_B))
                .map(Field::to_cv)
                .unwrap_or_else(unspecified),
        })
    }

    /// Adds the MI score of the pair to each row's confidence column.
    pub fn add_score(&self, row: &mut Row, score: f64) {
        row.push(keys::CONFIDENCE, Field::new(MISCORE_TYPE, &format!("{:.2}", score), None));
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    A,
    B,
}

impl Side {
    fn key(self, a: &'static str, b: &'static str) -> &'static str {
        match self {
            Side::A => a,
            Side::B => b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spoke::{ExpansionContext, SpokeExpander};
    use crate::domain::model::fixtures::*;
    use crate::domain::model::{CurationStatus, Referenced};

    fn binary() -> BinaryInteraction {
        let mut interaction = pair("EBI-I1", "EBI-E1", "P12345", "Q99999");
        interaction.set_imex_id("IM-3-1");
        let experiment = experiment("EBI-E1", "MI:0018", "EBI-P1");
        let publication = publication("EBI-P1", "1001", CurationStatus::Released);
        let ctx = ExpansionContext {
            experiments: vec![&experiment],
            publication: Some(&publication),
        };
        SpokeExpander::new().expand(&interaction, &ctx).remove(0)
    }

    #[test]
    fn test_row_columns() {
        let row = InteractionConverter::default().to_row(&binary());
        assert_eq!(row.first(keys::ID_A), Some(&Field::new(UNIPROT_DB, "P12345", None)));
        assert_eq!(row.first(keys::ALTID_B).map(|f| f.value.as_str()), Some("EBI-Q99999"));
        assert_eq!(row.first(keys::DETMETHOD).map(|f| f.value.as_str()), Some("MI:0018"));
        assert_eq!(row.first(keys::PUBAUTH).map(|f| f.value.as_str()), Some("Smith et al. (2010)"));
        assert_eq!(row.get(keys::INTERACTION_ID).len(), 2);
        assert!(row.get(keys::COMPLEX_EXPANSION).is_empty());
        assert_eq!(row.first(keys::NEGATIVE).map(|f| f.value.as_str()), Some("false"));
    }

    #[test]
    fn test_row_back_to_binary() {
        let original = binary();
        let converter = InteractionConverter::default();
        let parsed = converter.from_row(&converter.to_row(&original)).unwrap();
        assert_eq!(parsed.source_ac, "EBI-I1");
        assert_eq!(parsed.imex_id.as_deref(), Some("IM-3-1"));
        assert_eq!(parsed.uniprot_pair(), original.uniprot_pair());
        assert_eq!(parsed.a.experimental_role, original.a.experimental_role);
        assert_eq!(parsed.detection_methods, original.detection_methods);
        assert!(!parsed.expanded);
    }

    #[test]
    fn test_missing_identifier_is_an_error() {
        let mut row = InteractionConverter::default().to_row(&binary());
        row.set(keys::ID_A, vec![]);
        assert!(InteractionConverter::default().from_row(&row).is_err());
    }

    #[test]
    fn test_add_score() {
        let converter = InteractionConverter::default();
        let mut row = converter.to_row(&binary());
        converter.add_score(&mut row, 0.4567);
        assert_eq!(
            row.first(keys::CONFIDENCE),
            Some(&Field::new(MISCORE_TYPE, "0.46", None))
        );
    }
}
