//! Engine facade: the only object hosts talk to.
//!
//! A [`RoiEngine`] moves through a small lifecycle:
//!
//! ```text
//! Unloaded -> Loading -> Ready <-> Calculating
//!                \-> LoadFailed (terminal)
//! ```
//!
//! Loading fetches and decodes the workbook, selects its schema, seeds an
//! evaluation session, and calibrates percent modes. Every mutating call takes
//! `&mut self`, so at most one calculation can be in flight per engine.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{CalculationError, EngineError, LoadError, SchemaError};
use crate::extract::ResultExtractor;
use crate::loader::{WorkbookLoader, WorkbookModel};
use crate::model::{
    AssumptionField, CalculationResult, InitialState, InputField, RoiAssumptions, RoiInputs,
};
use crate::percent::{CalibrationReport, PercentNormalizer};
use crate::schema::{FieldSchema, SchemaRegistry};
use crate::session::FormulaEvaluationSession;
use crate::source::{FetchOptions, WorkbookSource};
use crate::validate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Ready,
    Calculating,
    LoadFailed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineState::Unloaded => "unloaded",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Calculating => "calculating",
            EngineState::LoadFailed => "load failed",
        })
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub registry: SchemaRegistry,
    pub fetch: FetchOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            registry: SchemaRegistry::builtin(),
            fetch: FetchOptions::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_registry(mut self, registry: SchemaRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register an additional schema from YAML.
    pub fn with_schema_yaml(mut self, yaml: &str) -> Result<Self, SchemaError> {
        self.registry.register_yaml(yaml)?;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.fetch.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.fetch.user_agent = user_agent.into();
        self
    }
}

struct Loaded {
    model: WorkbookModel,
    schema: FieldSchema,
    session: FormulaEvaluationSession,
    normalizer: PercentNormalizer,
    calibration: CalibrationReport,
}

pub struct RoiEngine {
    config: EngineConfig,
    state: EngineState,
    loaded: Option<Loaded>,
}

impl RoiEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: EngineState::Unloaded,
            loaded: None,
        }
    }

    /// Build an engine with the default configuration and load `source`.
    pub async fn open(source: impl Into<WorkbookSource>) -> Result<Self, LoadError> {
        Self::open_with(EngineConfig::default(), source).await
    }

    pub async fn open_with(
        config: EngineConfig,
        source: impl Into<WorkbookSource>,
    ) -> Result<Self, LoadError> {
        let mut engine = Self::new(config);
        engine.load(source).await?;
        Ok(engine)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schema(&self) -> Option<&FieldSchema> {
        self.loaded.as_ref().map(|l| &l.schema)
    }

    pub fn calibration(&self) -> Option<&CalibrationReport> {
        self.loaded.as_ref().map(|l| &l.calibration)
    }

    pub fn model(&self) -> Option<&WorkbookModel> {
        self.loaded.as_ref().map(|l| &l.model)
    }

    pub fn session(&self) -> Option<&FormulaEvaluationSession> {
        self.loaded.as_ref().map(|l| &l.session)
    }

    pub async fn load(&mut self, source: impl Into<WorkbookSource>) -> Result<(), LoadError> {
        self.load_cancellable(source, &AtomicBool::new(false)).await
    }

    /// Load `source`, abandoning the result (or the fetch error) if `cancel` is set once the
    /// fetch completes.
    ///
    /// A cancelled load leaves the engine `Unloaded`; any other failure is terminal.
    pub async fn load_cancellable(
        &mut self,
        source: impl Into<WorkbookSource>,
        cancel: &AtomicBool,
    ) -> Result<(), LoadError> {
        self.begin_load()?;
        let source = source.into();
        info!(%source, "loading workbook");

        let bytes = match source.fetch(&self.config.fetch).await {
            Ok(bytes) => bytes,
            Err(_) if cancel.load(Ordering::SeqCst) => return Err(self.cancelled(&source)),
            Err(err) => return Err(self.fail(err)),
        };
        if cancel.load(Ordering::SeqCst) {
            return Err(self.cancelled(&source));
        }
        self.finish_load(&bytes)
    }

    fn cancelled(&mut self, source: &WorkbookSource) -> LoadError {
        info!(%source, "workbook load cancelled");
        self.state = EngineState::Unloaded;
        LoadError::Cancelled
    }

    /// Load from bytes already in memory.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        self.begin_load()?;
        self.finish_load(bytes)
    }

    fn begin_load(&mut self) -> Result<(), LoadError> {
        match self.state {
            EngineState::LoadFailed => Err(LoadError::Terminal),
            EngineState::Unloaded => {
                self.state = EngineState::Loading;
                Ok(())
            }
            _ => Err(LoadError::AlreadyLoaded),
        }
    }

    fn finish_load(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        match self.build(bytes) {
            Ok(loaded) => {
                info!(
                    schema = %loaded.schema.id,
                    ambiguous = loaded.calibration.is_ambiguous(),
                    "engine ready"
                );
                self.loaded = Some(loaded);
                self.state = EngineState::Ready;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn build(&self, bytes: &[u8]) -> Result<Loaded, LoadError> {
        let (model, schema) = WorkbookLoader::new(&self.config.registry).load(bytes)?;
        let session = FormulaEvaluationSession::from_model(&model)?;
        let (normalizer, calibration) = PercentNormalizer::calibrate(&schema, &session);
        Ok(Loaded {
            model,
            schema,
            session,
            normalizer,
            calibration,
        })
    }

    fn fail(&mut self, err: LoadError) -> LoadError {
        warn!(error = %err, "workbook load failed");
        self.state = EngineState::LoadFailed;
        err
    }

    fn ready(&self) -> Result<&Loaded, CalculationError> {
        match (&self.loaded, self.state) {
            (Some(loaded), EngineState::Ready) => Ok(loaded),
            (_, state) => Err(CalculationError::NotReady(state)),
        }
    }

    /// Inputs and assumptions as authored in the workbook, in UI units.
    pub fn initial_state(&self) -> Result<InitialState, CalculationError> {
        let loaded = self.ready()?;
        let mut inputs = RoiInputs::default();
        for field in InputField::ALL {
            let raw = loaded.session.read_number(&loaded.schema.input(field).cell);
            inputs.set(field, loaded.normalizer.to_ui(field, raw));
        }
        let assumptions = ResultExtractor::new(&loaded.schema).assumptions(&loaded.session);
        Ok(InitialState {
            inputs,
            assumptions,
        })
    }

    /// Write every field, recompute, and extract results. Performs no validation.
    pub fn calculate(
        &mut self,
        inputs: &RoiInputs,
        assumptions: &RoiAssumptions,
    ) -> Result<CalculationResult, CalculationError> {
        self.ready()?;
        self.state = EngineState::Calculating;
        let result = self.run(inputs, assumptions);
        self.state = EngineState::Ready;
        if let Err(err) = &result {
            warn!(error = %err, "calculation failed");
        }
        result
    }

    /// Validate first; the session is left untouched when validation fails.
    pub fn calculate_checked(
        &mut self,
        inputs: &RoiInputs,
        assumptions: &RoiAssumptions,
    ) -> Result<CalculationResult, EngineError> {
        validate(inputs, assumptions)?;
        Ok(self.calculate(inputs, assumptions)?)
    }

    fn run(
        &mut self,
        inputs: &RoiInputs,
        assumptions: &RoiAssumptions,
    ) -> Result<CalculationResult, CalculationError> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Err(CalculationError::NotReady(self.state));
        };
        let Loaded {
            schema,
            session,
            normalizer,
            ..
        } = loaded;

        for field in InputField::ALL {
            let raw = normalizer.to_raw(field, inputs.get(field));
            session.write(&schema.input(field).cell, raw)?;
        }
        for field in AssumptionField::ALL {
            session.write(schema.assumption(field), assumptions.get(field))?;
        }
        session.recalculate()?;
        debug!(schema = %schema.id, "recalculated");

        Ok(ResultExtractor::new(schema).extract(session))
    }
}

impl fmt::Debug for RoiEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoiEngine")
            .field("state", &self.state)
            .field("schema", &self.schema().map(|s| s.id.as_str()))
            .finish_non_exhaustive()
    }
}
