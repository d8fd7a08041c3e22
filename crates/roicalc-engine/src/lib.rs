//! ROI model runtime.
//!
//! Binds a fixed set of business inputs to cells of a pre-authored
//! spreadsheet model, recalculates it in-process, and extracts savings totals,
//! a per-category breakdown, and a 36-month cumulative return series.
//!
//! ```no_run
//! # async fn run() -> Result<(), roicalc_engine::EngineError> {
//! use roicalc_engine::RoiEngine;
//!
//! let mut engine = RoiEngine::open("roi_model.xlsx").await?;
//! let initial = engine.initial_state()?;
//! let result = engine.calculate_checked(&initial.inputs, &initial.assumptions)?;
//! println!("saved ${:.0}", result.totals.dollars_saved);
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod engine;
pub mod error;
pub mod extract;
pub mod loader;
pub mod model;
pub mod percent;
pub mod schema;
pub mod session;
pub mod source;
pub mod validate;

pub use address::CellAddress;
pub use engine::{EngineConfig, EngineState, RoiEngine};
pub use error::{
    AddressError, CalculationError, EngineError, LoadError, SchemaError, ValidationError,
};
pub use extract::ResultExtractor;
pub use loader::{CellContent, SheetMatrix, WorkbookLoader, WorkbookModel};
pub use model::{
    AssumptionField, CalculationResult, Category, InitialState, InputField, MONTHLY_POINTS,
    MonthlyPoint, RoiAssumptions, RoiInputs, UseCaseResult,
};
pub use percent::{CalibrationReport, FieldCalibration, PercentMode, PercentNormalizer};
pub use schema::{FieldSchema, PercentSpec, SchemaRegistry};
pub use session::FormulaEvaluationSession;
pub use source::{FetchOptions, WorkbookSource};
pub use validate::{validate, validate_assumptions, validate_inputs};
