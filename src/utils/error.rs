use thiserror::Error;

#[derive(Error, Debug)]
pub enum DxError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Registry request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("MITAB processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("PSI-MI XML write error: {0}")]
    XmlWriteError(#[from] quick_xml::se::SeError),

    #[error("PSI-MI XML read error: {0}")]
    XmlReadError(#[from] quick_xml::de::DeError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid IMEx identifier: {value}")]
    InvalidImexId { value: String },

    #[error("IMEx conflict on {ac}: local {local}, registry {remote}")]
    ImexConflict {
        ac: String,
        local: String,
        remote: String,
    },

    #[error("Registry error for {publication}: {message}")]
    RegistryError { publication: String, message: String },

    #[error("{kind} not found: {ac}")]
    NotFound { kind: &'static str, ac: String },

    #[error("Conversion error: {message}")]
    ConversionError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Storage,
    Format,
    Curation,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DxError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DxError::ConfigError { .. }
            | DxError::MissingConfigError { .. }
            | DxError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            DxError::HttpError(_) | DxError::RegistryError { .. } => ErrorCategory::Network,
            DxError::IoError(_) | DxError::ZipError(_) | DxError::NotFound { .. } => {
                ErrorCategory::Storage
            }
            DxError::CsvError(_)
            | DxError::SerializationError(_)
            | DxError::XmlWriteError(_)
            | DxError::XmlReadError(_)
            | DxError::ConversionError { .. } => ErrorCategory::Format,
            DxError::InvalidImexId { .. } | DxError::ImexConflict { .. } => {
                ErrorCategory::Curation
            }
            DxError::ProcessingError { .. } | DxError::ValidationError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DxError::HttpError(_) | DxError::RegistryError { .. } => ErrorSeverity::Medium,
            DxError::ConfigError { .. }
            | DxError::MissingConfigError { .. }
            | DxError::InvalidConfigValueError { .. }
            | DxError::IoError(_)
            | DxError::ZipError(_) => ErrorSeverity::Critical,
            DxError::ValidationError { .. } => ErrorSeverity::Low,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML configuration and command-line flags",
            ErrorCategory::Network => "Check the registry endpoint and credentials, then retry",
            ErrorCategory::Storage => "Check that the dataset and output paths exist and are writable",
            ErrorCategory::Format => "Check that the input file matches the expected format",
            ErrorCategory::Curation => {
                "Resolve the identifier mismatch with the curators before re-running"
            }
            ErrorCategory::Processing => "Re-run with --verbose to see the failing record",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DxError::ImexConflict { ac, .. } => {
                format!("IMEx identifiers disagree for {}: {}", ac, self)
            }
            DxError::NotFound { kind, ac } => format!("{} {} does not exist in the store", kind, ac),
            DxError::HttpError(_) => "The publication registry could not be reached".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DxError>;
