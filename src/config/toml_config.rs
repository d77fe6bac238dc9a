use crate::core::eligibility::ExportRules;
use crate::core::miscore::MiScoreSettings;
use crate::formats::mitab::MitabVersion;
use crate::utils::error::{DxError, Result};
use crate::utils::validation::{
    validate_mi_id, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_required_field, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for every subcommand, read from a TOML file. All sections are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DxConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub imex: ImexConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON dataset standing in for the curation database.
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// Write assigned ids back to the dataset file.
    #[serde(default = "default_true")]
    pub write_back: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            write_back: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Memory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub kind: RegistryKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// First publication number handed out by the in-memory registry.
    #[serde(default = "default_first_number")]
    pub first_number: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::Memory,
            endpoint: None,
            username: None,
            password: None,
            timeout_seconds: default_timeout(),
            first_number: default_first_number(),
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Basic-auth credentials when both parts are set and were substituted.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) if !user.starts_with("${") => {
                Some((user.clone(), password.clone()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub rules: ExportRules,
    #[serde(default)]
    pub miscore: MiScoreSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImexConfig {
    /// `imex-sync --all` also assigns ids to eligible publications lacking one.
    #[serde(default)]
    pub assign_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: String,
    #[serde(default = "default_accepted_file")]
    pub accepted_file: String,
    #[serde(default = "default_scores_file")]
    pub scores_file: String,
    #[serde(default = "default_mitab_file")]
    pub mitab_file: String,
    #[serde(default = "default_mitab_version")]
    pub mitab_version: String,
    #[serde(default = "default_true")]
    pub mitab_header: bool,
    /// Zip archive bundling the export files, when set.
    #[serde(default)]
    pub bundle: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            accepted_file: default_accepted_file(),
            scores_file: default_scores_file(),
            mitab_file: default_mitab_file(),
            mitab_version: default_mitab_version(),
            mitab_header: true,
            bundle: None,
        }
    }
}

impl OutputConfig {
    pub fn version(&self) -> Result<MitabVersion> {
        MitabVersion::parse(&self.mitab_version).ok_or_else(|| DxError::InvalidConfigValueError {
            field: "output.mitab_version".to_string(),
            value: self.mitab_version.clone(),
            reason: "Expected 2.5 or 2.7".to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub json_logs: bool,
}

fn default_true() -> bool {
    true
}

fn default_dataset() -> String {
    "./data/dataset.json".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_first_number() -> u64 {
    1
}

fn default_output_dir() -> String {
    "./output".to_string()
}

fn default_accepted_file() -> String {
    "uniprot_export_interactions.txt".to_string()
}

fn default_scores_file() -> String {
    "uniprot_export_scores.tsv".to_string()
}

fn default_mitab_file() -> String {
    "uniprot_export.mitab".to_string()
}

fn default_mitab_version() -> String {
    "2.7".to_string()
}

impl DxConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        toml::from_str(&processed).map_err(|e| DxError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DxError::ConfigError {
            message: e.to_string(),
        })?;
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });
        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl Validate for DxConfig {
    fn validate(&self) -> Result<()> {
        validate_path("store.dataset", &self.store.dataset)?;

        if self.registry.kind == RegistryKind::Http {
            let endpoint = validate_required_field("registry.endpoint", &self.registry.endpoint)?;
            validate_url("registry.endpoint", endpoint)?;
        }
        validate_positive_number("registry.timeout_seconds", self.registry.timeout_seconds, 1)?;
        validate_positive_number("registry.first_number", self.registry.first_number, 1)?;

        let miscore = &self.export.miscore;
        validate_range("export.miscore.threshold", miscore.threshold, 0.0, 1.0)?;
        for (field, weight) in [
            ("export.miscore.method_weight", miscore.method_weight),
            ("export.miscore.type_weight", miscore.type_weight),
            ("export.miscore.publication_weight", miscore.publication_weight),
        ] {
            validate_range(field, weight, 0.0, 100.0)?;
        }
        if miscore.method_weight + miscore.type_weight + miscore.publication_weight <= 0.0 {
            return Err(DxError::InvalidConfigValueError {
                field: "export.miscore".to_string(),
                value: "0".to_string(),
                reason: "At least one weight must be positive".to_string(),
            });
        }
        for (mi, score) in miscore.method_scores.iter().chain(miscore.type_scores.iter()) {
            validate_mi_id("export.miscore.scores", mi)?;
            validate_range("export.miscore.scores", *score, 0.0, 1.0)?;
        }
        for mi in self.export.rules.method_rules.keys() {
            validate_mi_id("export.rules.method_rules", mi)?;
        }

        validate_path("output.directory", &self.output.directory)?;
        validate_non_empty_string("output.accepted_file", &self.output.accepted_file)?;
        validate_non_empty_string("output.scores_file", &self.output.scores_file)?;
        validate_non_empty_string("output.mitab_file", &self.output.mitab_file)?;
        if let Some(bundle) = &self.output.bundle {
            validate_non_empty_string("output.bundle", bundle)?;
        }
        self.output.version()?;
        Ok(())
    }
}
