use crate::config::toml_config::{ExportConfig, OutputConfig};
use crate::core::extractor::{Extraction, InteractionExtractor};
use crate::core::miscore::{FilterOutcome, MiScoreFilter, PairRejection, WeightedMiScore};
use crate::domain::ports::{InteractionStore, Pipeline, Storage};
use crate::formats::calimocho::InteractionConverter;
use crate::formats::mitab::{MitabVersion, MitabWriter};
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

/// Files produced by one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportFiles {
    pub accepted: String,
    pub scores: String,
    pub mitab: String,
    pub accepted_count: usize,
    pub rejected_by_rule: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Serialize)]
struct ScoreLine<'a> {
    uniprot_a: &'a str,
    uniprot_b: &'a str,
    miscore: String,
    status: &'static str,
    interactions: String,
}

/// Selects interactions for the UniProt DR export and writes them out.
pub struct UniprotExportPipeline<S: Storage, T: InteractionStore> {
    storage: S,
    store: Arc<T>,
    export: ExportConfig,
    output: OutputConfig,
    version: MitabVersion,
}

impl<S: Storage, T: InteractionStore> UniprotExportPipeline<S, T> {
    pub fn new(storage: S, store: Arc<T>, export: ExportConfig, output: OutputConfig) -> Result<Self> {
        let version = output.version()?;
        Ok(Self {
            storage,
            store,
            export,
            output,
            version,
        })
    }

    fn score_table(outcome: &FilterOutcome) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(Vec::new());

        let accepted = outcome.accepted_pairs.iter().map(|p| (p, "accepted"));
        let rejected = outcome.rejected_pairs.iter().map(|(p, reason)| {
            let status = match reason {
                PairRejection::BelowThreshold => "below-threshold",
                PairRejection::SpokeExpandedOnly => "spoke-expanded-only",
            };
            (p, status)
        });
        for (pair, status) in accepted.chain(rejected) {
            writer.serialize(ScoreLine {
                uniprot_a: &pair.a,
                uniprot_b: &pair.b,
                miscore: format!("{:.3}", pair.score),
                status,
                interactions: pair.evidence_acs.join(","),
            })?;
        }

        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn bundle(&self, result: &ExportFiles) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in [
            (&self.output.accepted_file, &result.accepted),
            (&self.output.scores_file, &result.scores),
            (&self.output.mitab_file, &result.mitab),
        ] {
            zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
            zip.write_all(content.as_bytes())?;
        }
        Ok(zip.finish()?.into_inner())
    }
}

#[async_trait::async_trait]
impl<S: Storage, T: InteractionStore> Pipeline for UniprotExportPipeline<S, T> {
    type Extracted = Extraction;
    type Transformed = ExportFiles;

    async fn extract(&self) -> Result<Extraction> {
        InteractionExtractor::new(self.store.as_ref(), self.export.rules.clone())
            .extract()
            .await
    }

    async fn transform(&self, extraction: Extraction) -> Result<ExportFiles> {
        let settings = &self.export.miscore;
        let filter = MiScoreFilter::new(
            WeightedMiScore::new(settings),
            settings.threshold,
            settings.exclude_spoke_expanded,
        );
        let outcome = filter.filter(&extraction);

        let scores: HashMap<(&str, &str), f64> = outcome
            .accepted_pairs
            .iter()
            .map(|p| ((p.a.as_str(), p.b.as_str()), p.score))
            .collect();
        let converter = InteractionConverter::default();
        let rows: Vec<_> = outcome
            .binaries
            .iter()
            .map(|binary| {
                let mut row = converter.to_row(binary);
                let score = binary
                    .uniprot_pair()
                    .and_then(|(a, b)| scores.get(&(a.as_str(), b.as_str())).copied());
                if let Some(score) = score {
                    converter.add_score(&mut row, score);
                }
                row
            })
            .collect();
        let mitab = MitabWriter::new(self.version, self.output.mitab_header).to_string(&rows)?;

        let mut accepted = outcome.accepted_acs.join("\n");
        if !accepted.is_empty() {
            accepted.push('\n');
        }

        for (reason, count) in &extraction.rejected {
            tracing::info!("⏭️ {} interactions rejected: {}", count, reason);
        }

        Ok(ExportFiles {
            accepted,
            scores: Self::score_table(&outcome)?,
            mitab,
            accepted_count: outcome.accepted_acs.len(),
            rejected_by_rule: extraction.rejected,
        })
    }

    async fn load(&self, result: ExportFiles) -> Result<String> {
        self.storage
            .write_file(&self.output.accepted_file, result.accepted.as_bytes())
            .await?;
        self.storage
            .write_file(&self.output.scores_file, result.scores.as_bytes())
            .await?;
        self.storage
            .write_file(&self.output.mitab_file, result.mitab.as_bytes())
            .await?;
        tracing::info!(
            "📁 Exported {} interactions to {}",
            result.accepted_count,
            self.output.accepted_file
        );

        match &self.output.bundle {
            Some(bundle) => {
                let zip_data = self.bundle(&result)?;
                tracing::debug!("Writing bundle {} ({} bytes)", bundle, zip_data.len());
                self.storage.write_file(bundle, &zip_data).await?;
                Ok(format!("{}/{}", self.output.directory, bundle))
            }
            None => Ok(format!("{}/{}", self.output.directory, self.output.accepted_file)),
        }
    }
}
