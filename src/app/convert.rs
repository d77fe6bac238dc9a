//! Conversions between the JSON dataset, MITAB and PSI-MI XML.

use crate::adapters::store::Dataset;
use crate::core::spoke::SpokeExpander;
use crate::domain::model::BinaryInteraction;
use crate::formats::calimocho::InteractionConverter;
use crate::formats::mitab::{MitabReader, MitabVersion, MitabWriter};
use crate::formats::psi_xml::{PsiXmlReader, PsiXmlWriter, PublicationEntry};
use crate::utils::error::{DxError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Format {
    /// Dataset of publications, experiments and interactions (or binary records from MITAB).
    Json,
    Mitab,
    PsiXml,
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub mitab_version: MitabVersion,
    pub mitab_header: bool,
    /// Publication ACs to keep; empty keeps everything.
    pub publications: Vec<String>,
}

/// Parsed input: full records, or binary records when the source was MITAB.
enum Content {
    Records(Dataset),
    Binaries(Vec<BinaryInteraction>),
}

pub fn convert(input: &[u8], from: Format, to: Format, options: &ConvertOptions) -> Result<Vec<u8>> {
    let content = match from {
        Format::Json => Content::Records(serde_json::from_slice(input)?),
        Format::Mitab => {
            let converter = InteractionConverter::default();
            let binaries = MitabReader::new()
                .read(input)?
                .iter()
                .map(|row| converter.from_row(row))
                .collect::<Result<Vec<_>>>()?;
            Content::Binaries(binaries)
        }
        Format::PsiXml => {
            let xml = std::str::from_utf8(input).map_err(|e| DxError::ConversionError {
                message: format!("PSI-MI XML is not UTF-8: {}", e),
            })?;
            Content::Records(dataset_from_entries(PsiXmlReader::new().read(xml)?))
        }
    };

    let content = match content {
        Content::Records(dataset) if !options.publications.is_empty() => {
            Content::Records(select_publications(dataset, &options.publications))
        }
        other => other,
    };

    match (content, to) {
        (Content::Records(dataset), Format::Json) => Ok(serde_json::to_vec_pretty(&dataset)?),
        (Content::Binaries(binaries), Format::Json) => Ok(serde_json::to_vec_pretty(&binaries)?),
        (Content::Records(dataset), Format::Mitab) => write_mitab(&expand(&dataset), options),
        (Content::Binaries(binaries), Format::Mitab) => write_mitab(&binaries, options),
        (Content::Records(dataset), Format::PsiXml) => {
            let xml = PsiXmlWriter::default().to_xml(&entries_from_dataset(&dataset))?;
            Ok(xml.into_bytes())
        }
        (Content::Binaries(_), Format::PsiXml) => Err(DxError::ConversionError {
            message: "MITAB input carries binary records only and cannot be written as PSI-MI XML"
                .to_string(),
        }),
    }
}

fn write_mitab(binaries: &[BinaryInteraction], options: &ConvertOptions) -> Result<Vec<u8>> {
    let converter = InteractionConverter::default();
    let rows: Vec<_> = binaries.iter().map(|b| converter.to_row(b)).collect();
    let mut out = Vec::new();
    MitabWriter::new(options.mitab_version, options.mitab_header).write(&mut out, &rows)?;
    tracing::info!("Wrote {} MITAB lines", rows.len());
    Ok(out)
}

pub fn expand(dataset: &Dataset) -> Vec<BinaryInteraction> {
    let experiments = dataset
        .experiments
        .iter()
        .map(|e| (e.ac.clone(), e.clone()))
        .collect::<HashMap<_, _>>();
    let publications = dataset
        .publications
        .iter()
        .map(|p| (p.ac.clone(), p.clone()))
        .collect::<HashMap<_, _>>();
    SpokeExpander::new().expand_all(&dataset.interactions, &experiments, &publications)
}

fn select_publications(dataset: Dataset, keep: &[String]) -> Dataset {
    let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
    let experiments: Vec<_> = dataset
        .experiments
        .into_iter()
        .filter(|e| keep.contains(e.publication_ac.as_str()))
        .collect();
    let experiment_acs: HashSet<&str> = experiments.iter().map(|e| e.ac.as_str()).collect();
    let interactions = dataset
        .interactions
        .into_iter()
        .filter(|i| i.experiment_acs.iter().any(|ac| experiment_acs.contains(ac.as_str())))
        .collect();
    Dataset {
        publications: dataset
            .publications
            .into_iter()
            .filter(|p| keep.contains(p.ac.as_str()))
            .collect(),
        experiments,
        interactions,
    }
}

/// Groups the dataset per publication. Interactions are attached through their first experiment.
pub fn entries_from_dataset(dataset: &Dataset) -> Vec<PublicationEntry> {
    let owner: HashMap<&str, &str> = dataset
        .experiments
        .iter()
        .map(|e| (e.ac.as_str(), e.publication_ac.as_str()))
        .collect();

    dataset
        .publications
        .iter()
        .map(|publication| PublicationEntry {
            publication: publication.clone(),
            experiments: dataset
                .experiments
                .iter()
                .filter(|e| e.publication_ac == publication.ac)
                .cloned()
                .collect(),
            interactions: dataset
                .interactions
                .iter()
                .filter(|i| {
                    i.experiment_acs
                        .first()
                        .and_then(|ac| owner.get(ac.as_str()))
                        .is_some_and(|p| *p == publication.ac)
                })
                .cloned()
                .collect(),
        })
        .collect()
}

pub fn dataset_from_entries(entries: Vec<PublicationEntry>) -> Dataset {
    let mut dataset = Dataset::default();
    for entry in entries {
        dataset.publications.push(entry.publication);
        dataset.experiments.extend(entry.experiments);
        dataset.interactions.extend(entry.interactions);
    }
    dataset
}
