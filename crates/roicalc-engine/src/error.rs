use std::fmt;

use thiserror::Error;

/// Malformed A1 address text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address `{0}` is empty")]
    Empty(String),
    #[error("address `{address}` has an invalid column prefix")]
    InvalidColumn { address: String },
    #[error("address `{address}` has an invalid row suffix")]
    InvalidRow { address: String },
    #[error("address `{address}` has a non-positive row number")]
    NonPositiveRow { address: String },
    #[error("address `{address}` exceeds the sheet bounds")]
    OutOfBounds { address: String },
    #[error("address `{address}` is missing a sheet qualifier")]
    MissingSheet { address: String },
}

/// Failures while parsing or binding a field schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema parse failed: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("schema `{schema}` does not bind `{field}`")]
    MissingField { schema: String, field: String },
    #[error("schema `{schema}` is invalid: {message}")]
    Invalid { schema: String, message: String },
    #[error("schema `{0}` is already registered")]
    Duplicate(String),
}

/// Failures that leave an engine unable to become ready.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to fetch workbook from {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("failed to load workbook from {url} (HTTP {status})")]
    HttpStatus { url: String, status: u16 },
    #[error("failed to read workbook file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse workbook: {0}")]
    Parse(String),
    #[error("workbook does not match any known model layout (expected one of: {expected})")]
    SchemaNotDetected { expected: String },
    #[error("workbook matches several model layouts: {candidates}")]
    AmbiguousSchema { candidates: String },
    #[error("failed to initialise evaluation session: {0}")]
    Session(String),
    #[error("workbook load was cancelled")]
    Cancelled,
    #[error("engine already failed to load; construct a new engine")]
    Terminal,
    #[error("engine is already loaded")]
    AlreadyLoaded,
}

/// Errors raised by the evaluation engine while writing or recomputing.
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("engine is not ready (state: {0})")]
    NotReady(crate::engine::EngineState),
    #[error("failed to write {address}: {message}")]
    Write { address: String, message: String },
    #[error("recalculation failed: {0}")]
    Recalculate(String),
}

/// Human-readable validation messages collected before a calculation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages.join(" "))
    }
}

/// Umbrella error returned by the engine facade.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Calculation(#[from] CalculationError),
}
