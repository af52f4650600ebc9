//! ---
//! lvnet_section: "02-calculation-engine"
//! lvnet_subsection: "module"
//! lvnet_type: "source"
//! lvnet_scope: "code"
//! lvnet_description: "Error type shared by the calculation engine."
//! lvnet_version: "v0.0.0-prealpha"
//! lvnet_owner: "tbd"
//! ---
use thiserror::Error;

use crate::validation::ValidationReport;

pub type Result<T> = std::result::Result<T, CalcEngineError>;

#[derive(Debug, Error)]
pub enum CalcEngineError {
    #[error("no source node found in network topology")]
    MissingSource,
    #[error("network input rejected: {0}")]
    InvalidInput(ValidationReport),
    #[error("monte carlo requires at least one iteration")]
    InvalidIterations,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
}
