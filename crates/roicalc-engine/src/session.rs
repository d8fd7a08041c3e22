//! Live evaluation context over a decoded workbook.
//!
//! The session owns a `formualizer_workbook::Workbook` seeded from a
//! [`WorkbookModel`]. Hosts never see it directly; the engine facade writes
//! inputs through it, recomputes, and reads outputs back.

use std::fmt;

use formualizer_workbook::{LiteralValue, Workbook, WorkbookMode};
use tracing::{debug, trace};

use crate::address::CellAddress;
use crate::error::{CalculationError, LoadError};
use crate::loader::{CellContent, WorkbookModel};

pub struct FormulaEvaluationSession {
    workbook: Workbook,
    sheets: Vec<String>,
}

impl FormulaEvaluationSession {
    /// Seed a workbook with every literal and formula in `model`, then evaluate it once.
    pub fn from_model(model: &WorkbookModel) -> Result<Self, LoadError> {
        let mut workbook = Workbook::new_with_mode(WorkbookMode::Ephemeral);
        let sheets: Vec<String> = model.sheet_names().map(str::to_string).collect();

        // Sheets first so cross-sheet references resolve when formulas are parsed.
        for name in &sheets {
            workbook
                .add_sheet(name)
                .map_err(|e| LoadError::Session(format!("sheet `{name}`: {e}")))?;
        }

        let mut formulas = Vec::new();
        for (name, matrix) in model.sheets() {
            for (row, col, content) in matrix.populated() {
                let (row, col) = (row + 1, col + 1);
                let value = match content {
                    CellContent::Formula(source) => {
                        formulas.push((name, row, col, source.as_str()));
                        continue;
                    }
                    CellContent::Number(n) => LiteralValue::Number(*n),
                    CellContent::Boolean(b) => LiteralValue::Boolean(*b),
                    CellContent::Text(s) => LiteralValue::Text(s.clone()),
                    CellContent::Empty => continue,
                };
                workbook
                    .set_value(name, row, col, value)
                    .map_err(|e| LoadError::Session(format!("{name} R{row}C{col}: {e}")))?;
            }
        }
        for (name, row, col, source) in formulas {
            workbook
                .set_formula(name, row, col, source)
                .map_err(|e| LoadError::Session(format!("{name} R{row}C{col} `{source}`: {e}")))?;
        }

        let mut session = Self { workbook, sheets };
        session
            .recalculate()
            .map_err(|e| LoadError::Session(e.to_string()))?;
        Ok(session)
    }

    pub fn sheet_names(&self) -> &[String] {
        &self.sheets
    }

    /// Current value at `address`, as computed by the last recalculation.
    pub fn read_value(&self, address: &CellAddress) -> Option<LiteralValue> {
        self.workbook
            .get_value(&address.sheet, address.excel_row(), address.excel_col())
    }

    /// Numeric value at `address`, or `None` when it does not coerce.
    pub fn try_read_number(&self, address: &CellAddress) -> Option<f64> {
        self.read_value(address).as_ref().and_then(coerce_number)
    }

    /// Numeric value at `address`, falling back to `0`.
    pub fn read_number(&self, address: &CellAddress) -> f64 {
        self.read_number_or(address, 0.0)
    }

    pub fn read_number_or(&self, address: &CellAddress, fallback: f64) -> f64 {
        match self.try_read_number(address) {
            Some(n) => n,
            None => {
                debug!(%address, value = ?self.read_value(address), fallback, "non-numeric cell");
                fallback
            }
        }
    }

    /// Replace the content of `address` with a number.
    pub fn write(&mut self, address: &CellAddress, value: f64) -> Result<(), CalculationError> {
        trace!(%address, value, "write");
        self.workbook
            .set_value(
                &address.sheet,
                address.excel_row(),
                address.excel_col(),
                LiteralValue::Number(value),
            )
            .map_err(|e| CalculationError::Write {
                address: address.to_string(),
                message: e.to_string(),
            })
    }

    /// Recompute every formula affected by prior writes.
    pub fn recalculate(&mut self) -> Result<(), CalculationError> {
        self.workbook
            .evaluate_all()
            .map(|_| ())
            .map_err(|e| CalculationError::Recalculate(e.to_string()))
    }
}

impl fmt::Debug for FormulaEvaluationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaEvaluationSession")
            .field("sheets", &self.sheets)
            .finish_non_exhaustive()
    }
}

/// Finite numbers and numeric text coerce; everything else does not.
pub fn coerce_number(value: &LiteralValue) -> Option<f64> {
    let n = match value {
        LiteralValue::Number(n) => *n,
        LiteralValue::Int(i) => *i as f64,
        LiteralValue::Text(s) => s.trim().parse::<f64>().ok()?,
        LiteralValue::Array(rows) => return rows.first()?.first().and_then(coerce_number),
        _ => return None,
    };
    n.is_finite().then_some(n)
}
