//! Percentage storage conventions.
//!
//! Workbooks store percentages either as fractions (`0.25`) or as whole
//! percents (`25`). Hosts always exchange whole percents. The mode of each
//! percent-bearing field is decided once, right after load, and kept for the
//! lifetime of the session.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::model::InputField;
use crate::schema::{FieldSchema, PercentSpec};
use crate::session::FormulaEvaluationSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentMode {
    /// Stored as `0..=1`.
    Fraction,
    /// Stored as `0..=100`.
    Percent,
}

impl PercentMode {
    /// Heuristic used when the schema does not say: defaults at or below 1 are fractions.
    pub fn infer(default: f64) -> Self {
        if default <= 1.0 {
            PercentMode::Fraction
        } else {
            PercentMode::Percent
        }
    }
}

impl fmt::Display for PercentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PercentMode::Fraction => "fraction",
            PercentMode::Percent => "percent",
        })
    }
}

/// How one field's mode was decided.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldCalibration {
    pub mode: PercentMode,
    /// Raw default read from the workbook.
    pub default: f64,
    /// `true` when the mode came from schema metadata rather than inference.
    pub declared: bool,
    /// `true` when inference had nothing to go on (a zero default).
    pub ambiguous: bool,
}

/// Outcome of calibration, exposed for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationReport {
    pub fields: BTreeMap<InputField, FieldCalibration>,
}

impl CalibrationReport {
    pub fn ambiguous(&self) -> impl Iterator<Item = InputField> + '_ {
        self.fields
            .iter()
            .filter(|(_, cal)| cal.ambiguous)
            .map(|(field, _)| *field)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous().next().is_some()
    }
}

/// Per-session percent conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentNormalizer {
    modes: BTreeMap<InputField, PercentMode>,
}

impl PercentNormalizer {
    /// Decide each percent field's mode from schema metadata or the shipped default.
    pub fn calibrate(
        schema: &FieldSchema,
        session: &FormulaEvaluationSession,
    ) -> (Self, CalibrationReport) {
        let mut modes = BTreeMap::new();
        let mut report = CalibrationReport::default();

        for field in InputField::PERCENT {
            let default = session.read_number(&schema.input(field).cell);
            let (mode, declared) = match schema.percent_spec(field) {
                PercentSpec::Fraction => (PercentMode::Fraction, true),
                PercentSpec::Percent => (PercentMode::Percent, true),
                PercentSpec::Infer => (PercentMode::infer(default), false),
            };
            let ambiguous = !declared && default == 0.0;
            if ambiguous {
                warn!(
                    field = field.key(),
                    assumed = %mode,
                    "percent default is 0; storage mode cannot be inferred"
                );
            }
            info!(field = field.key(), %mode, default, declared, "percent mode calibrated");

            modes.insert(field, mode);
            report.fields.insert(
                field,
                FieldCalibration {
                    mode,
                    default,
                    declared,
                    ambiguous,
                },
            );
        }
        (Self { modes }, report)
    }

    /// Normalizer with fixed modes.
    pub fn with_modes(modes: impl IntoIterator<Item = (InputField, PercentMode)>) -> Self {
        Self {
            modes: modes.into_iter().collect(),
        }
    }

    /// Mode of `field`; `None` for fields that are not percentages.
    pub fn mode(&self, field: InputField) -> Option<PercentMode> {
        self.modes.get(&field).copied()
    }

    /// UI value (`0..=100`) to the workbook's representation.
    pub fn to_raw(&self, field: InputField, ui: f64) -> f64 {
        match self.mode(field) {
            Some(PercentMode::Fraction) => ui / 100.0,
            _ => ui,
        }
    }

    /// Workbook representation to a UI value (`0..=100`).
    pub fn to_ui(&self, field: InputField, raw: f64) -> f64 {
        match self.mode(field) {
            Some(PercentMode::Fraction) => raw * 100.0,
            _ => raw,
        }
    }
}
