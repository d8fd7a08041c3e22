//! Versioned field schemas.
//!
//! A [`FieldSchema`] binds every logical input, assumption, and output of the
//! ROI model to a fixed cell address for one workbook layout. Schemas are
//! authored as YAML; the built-in layouts live in `schemas/`. A loaded workbook
//! is matched against the registered schemas by their [`Marker`], and exactly
//! one must match.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::address::{CellAddress, to_row_col};
use crate::error::{AddressError, LoadError, SchemaError};
use crate::loader::{CellContent, WorkbookModel};
use crate::model::{AssumptionField, Category, InputField, MONTHLY_POINTS};

const MODEL_SHEETS_YAML: &str = include_str!("../schemas/model_sheets.yaml");
const CALCULATOR_SHEET_YAML: &str = include_str!("../schemas/calculator_sheet.yaml");

/// One workbook layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSchema {
    pub id: String,
    pub version: u32,
    #[serde(default)]
    pub description: Option<String>,
    pub marker: Marker,
    pub inputs: BTreeMap<InputField, FieldBinding>,
    pub assumptions: BTreeMap<AssumptionField, CellAddress>,
    pub breakdown: BTreeMap<Category, OutputBinding>,
    pub monthly: MonthlyLayout,
}

impl FieldSchema {
    /// Parse and validate a schema document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let schema: FieldSchema = serde_yaml::from_str(yaml)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check that every field is bound and the layout is usable.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.id.trim().is_empty() {
            return Err(SchemaError::Invalid {
                schema: self.id.clone(),
                message: "schema id must not be empty".to_string(),
            });
        }
        for field in InputField::ALL {
            let binding = self
                .inputs
                .get(&field)
                .ok_or_else(|| self.missing(field.key()))?;
            if binding.percent.is_some() && !field.is_percent() {
                return Err(SchemaError::Invalid {
                    schema: self.id.clone(),
                    message: format!("`{field}` is not a percentage field"),
                });
            }
        }
        for field in AssumptionField::ALL {
            if !self.assumptions.contains_key(&field) {
                return Err(self.missing(field.key()));
            }
        }
        for category in Category::ALL {
            if !self.breakdown.contains_key(&category) {
                return Err(self.missing(&format!("breakdown.{category}")));
            }
        }
        for (name, span) in [
            ("monthly.months", &self.monthly.months),
            ("monthly.returns", &self.monthly.returns),
        ] {
            if span.width as usize != MONTHLY_POINTS {
                return Err(SchemaError::Invalid {
                    schema: self.id.clone(),
                    message: format!(
                        "`{name}` spans {} columns, expected {MONTHLY_POINTS}",
                        span.width
                    ),
                });
            }
        }
        if let Marker::Sheets(marker) = &self.marker {
            if marker.sheets.is_empty() {
                return Err(SchemaError::Invalid {
                    schema: self.id.clone(),
                    message: "marker must name at least one sheet".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn input(&self, field: InputField) -> &FieldBinding {
        &self.inputs[&field]
    }

    pub fn assumption(&self, field: AssumptionField) -> &CellAddress {
        &self.assumptions[&field]
    }

    pub fn output(&self, category: Category) -> &OutputBinding {
        &self.breakdown[&category]
    }

    /// Percent metadata for a percentage field (`Infer` when unspecified).
    pub fn percent_spec(&self, field: InputField) -> PercentSpec {
        self.inputs
            .get(&field)
            .and_then(|binding| binding.percent)
            .unwrap_or(PercentSpec::Infer)
    }

    /// Whether this schema's marker is present in `model`.
    pub fn matches(&self, model: &WorkbookModel) -> bool {
        self.marker.matches(model)
    }

    fn missing(&self, field: &str) -> SchemaError {
        SchemaError::MissingField {
            schema: self.id.clone(),
            field: field.to_string(),
        }
    }
}

/// Input binding: a bare address, or an address with percent metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "FieldBindingRepr")]
pub struct FieldBinding {
    pub cell: CellAddress,
    pub percent: Option<PercentSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldBindingRepr {
    Cell(CellAddress),
    Detailed {
        cell: CellAddress,
        #[serde(default)]
        percent: Option<PercentSpec>,
    },
}

impl From<FieldBindingRepr> for FieldBinding {
    fn from(value: FieldBindingRepr) -> Self {
        match value {
            FieldBindingRepr::Cell(cell) => FieldBinding {
                cell,
                percent: None,
            },
            FieldBindingRepr::Detailed { cell, percent } => FieldBinding { cell, percent },
        }
    }
}

/// How a percentage field is stored in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PercentSpec {
    /// Decide from the shipped default at calibration.
    Infer,
    /// Stored as `0..=1`.
    Fraction,
    /// Stored as `0..=100`.
    Percent,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputBinding {
    pub hours: CellAddress,
    pub dollars: CellAddress,
}

/// Column span of the cumulative return series.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonthlyLayout {
    pub months: RowSpan,
    pub returns: RowSpan,
}

/// Contiguous single-row range, e.g. `MODEL_OUTPUTS!E1:AN1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct RowSpan {
    pub start: CellAddress,
    pub width: u32,
}

impl RowSpan {
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let (head, tail) = text.rsplit_once(':').ok_or_else(|| AddressError::InvalidRow {
            address: text.to_string(),
        })?;
        let start = CellAddress::parse(head)?;
        let (end_row, end_col) = to_row_col(tail)?;
        if end_row != start.row || end_col < start.col {
            return Err(AddressError::OutOfBounds {
                address: text.to_string(),
            });
        }
        Ok(Self {
            width: end_col - start.col + 1,
            start,
        })
    }

    /// Address of the `index`-th cell in the span; `None` outside it.
    pub fn cell(&self, index: u32) -> Option<CellAddress> {
        if index >= self.width {
            return None;
        }
        self.start.offset_cols(index)
    }

    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        (0..self.width).filter_map(|idx| self.cell(idx))
    }
}

impl TryFrom<String> for RowSpan {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Detectable feature of a workbook layout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Marker {
    Sheets(SheetsMarker),
    Title(TitleMarker),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetsMarker {
    /// Every listed sheet must be present.
    pub sheets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TitleMarker {
    pub title: TitleCell,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TitleCell {
    pub cell: CellAddress,
    pub text: String,
}

impl Marker {
    pub fn matches(&self, model: &WorkbookModel) -> bool {
        match self {
            Marker::Sheets(marker) => marker.sheets.iter().all(|name| model.has_sheet(name)),
            Marker::Title(marker) => match model.cell(&marker.title.cell) {
                Some(CellContent::Text(text)) => {
                    text.trim().eq_ignore_ascii_case(marker.title.text.trim())
                }
                _ => false,
            },
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Marker::Sheets(marker) => format!("sheets {}", marker.sheets.join(", ")),
            Marker::Title(marker) => {
                format!("title `{}` at {}", marker.title.text, marker.title.cell)
            }
        }
    }
}

/// Set of known layouts consulted at load time.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<FieldSchema>,
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the layouts shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for yaml in [MODEL_SHEETS_YAML, CALCULATOR_SHEET_YAML] {
            let schema = FieldSchema::from_yaml_str(yaml).expect("built-in schema must be valid");
            registry.schemas.push(schema);
        }
        registry
    }

    pub fn register(&mut self, schema: FieldSchema) -> Result<(), SchemaError> {
        schema.validate()?;
        if self.get(&schema.id).is_some() {
            return Err(SchemaError::Duplicate(schema.id));
        }
        self.schemas.push(schema);
        Ok(())
    }

    pub fn register_yaml(&mut self, yaml: &str) -> Result<(), SchemaError> {
        self.register(FieldSchema::from_yaml_str(yaml)?)
    }

    pub fn get(&self, id: &str) -> Option<&FieldSchema> {
        self.schemas.iter().find(|schema| schema.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSchema> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Select the single schema whose marker matches `model`.
    pub fn detect(&self, model: &WorkbookModel) -> Result<&FieldSchema, LoadError> {
        let candidates: Vec<&FieldSchema> =
            self.schemas.iter().filter(|s| s.matches(model)).collect();
        match candidates.as_slice() {
            [schema] => Ok(*schema),
            [] => Err(LoadError::SchemaNotDetected {
                expected: self
                    .schemas
                    .iter()
                    .map(|s| format!("{} ({})", s.id, s.marker.describe()))
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
            many => Err(LoadError::AmbiguousSchema {
                candidates: many
                    .iter()
                    .map(|s| s.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}
