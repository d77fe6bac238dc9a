pub mod uniprot_export;

pub use uniprot_export::{ExportFiles, UniprotExportPipeline};
