pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{CliConfig, Command};

#[cfg(feature = "cli")]
mod args {
    use crate::app::convert::Format;
    use clap::{Parser, Subcommand};
    use std::path::PathBuf;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "intact-dx")]
    #[command(about = "IMEx id management, UniProt export and PSI-MI format conversion")]
    pub struct CliConfig {
        /// TOML configuration file; defaults apply when omitted.
        #[arg(long, short, global = true)]
        pub config: Option<PathBuf>,

        /// JSON dataset, overriding `store.dataset`.
        #[arg(long, global = true)]
        pub dataset: Option<String>,

        #[arg(long, short, global = true, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
        pub monitor: bool,

        #[arg(long, global = true, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Select interactions for UniProt and write the export files.
        UniprotExport {
            /// Output directory, overriding `output.directory`.
            #[arg(long)]
            output: Option<String>,
            /// MI score threshold, overriding `export.miscore.threshold`.
            #[arg(long)]
            threshold: Option<f64>,
            /// Also write a zip bundle with this name.
            #[arg(long)]
            bundle: Option<String>,
        },
        /// Assign IMEx ids to publications and their interactions, then sync the registry.
        ImexAssign {
            #[arg(required = true)]
            publications: Vec<String>,
            /// Assign locally without contacting the registry afterwards.
            #[arg(long)]
            no_sync: bool,
        },
        /// Bring the registry in line with local publications.
        ImexSync {
            publications: Vec<String>,
            /// Every publication in the store.
            #[arg(long, conflicts_with = "publications")]
            all: bool,
            /// With --all, assign ids to eligible publications that lack one.
            #[arg(long, requires = "all")]
            assign_missing: bool,
        },
        /// Convert between the JSON dataset, MITAB and PSI-MI XML.
        Convert {
            #[arg(long, value_enum)]
            from: Format,
            #[arg(long, value_enum)]
            to: Format,
            input: PathBuf,
            output: PathBuf,
            /// MITAB flavour to write: 2.5 or 2.7.
            #[arg(long)]
            mitab_version: Option<String>,
            /// Keep only these publication ACs.
            #[arg(long = "publication")]
            publications: Vec<String>,
        },
    }

}
