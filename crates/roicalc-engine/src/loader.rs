//! Workbook decoding into an in-memory cell model.

use std::io::Cursor;

use calamine::{Data, Range, Reader, open_workbook_auto_from_rs};
use tracing::{debug, info};

use crate::address::CellAddress;
use crate::error::LoadError;
use crate::schema::{FieldSchema, SchemaRegistry};

/// Authored content of one cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellContent {
    Number(f64),
    Boolean(bool),
    Text(String),
    /// Formula source including the leading `=`.
    Formula(String),
    #[default]
    Empty,
}

impl CellContent {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellContent::Empty)
    }

    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellContent::Formula(src) => Some(src),
            _ => None,
        }
    }

    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellContent::Empty,
            Data::String(s) if s.is_empty() => CellContent::Empty,
            Data::String(s) => CellContent::Text(s.clone()),
            Data::Float(f) => CellContent::Number(*f),
            Data::Int(i) => CellContent::Number(*i as f64),
            Data::Bool(b) => CellContent::Boolean(*b),
            // Serial number, as the evaluation engine expects.
            Data::DateTime(dt) => CellContent::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellContent::Text(s.clone()),
            Data::Error(e) => CellContent::Text(e.to_string()),
        }
    }
}

/// Rectangular grid anchored at A1.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetMatrix {
    rows: Vec<Vec<CellContent>>,
    width: usize,
}

impl SheetMatrix {
    /// Grid of `height` x `width` empty cells.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            rows: vec![vec![CellContent::Empty; width]; height],
            width,
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&CellContent> {
        self.rows.get(row as usize)?.get(col as usize)
    }

    /// Non-empty cells in row-major order, zero-based.
    pub fn populated(&self) -> impl Iterator<Item = (u32, u32, &CellContent)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| !cell.is_empty())
                .map(move |(c, cell)| (r as u32, c as u32, cell))
        })
    }

    pub fn rows(&self) -> &[Vec<CellContent>] {
        &self.rows
    }

    /// Overwrite one cell; out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, col: usize, content: CellContent) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *slot = content;
        }
    }
}

/// Ordered sheets of a decoded workbook. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkbookModel {
    sheets: Vec<(String, SheetMatrix)>,
}

impl WorkbookModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet, replacing any existing sheet of the same name.
    pub fn insert_sheet(&mut self, name: impl Into<String>, matrix: SheetMatrix) {
        let name = name.into();
        match self.sheets.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = matrix,
            None => self.sheets.push((name, matrix)),
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetMatrix> {
        self.sheets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, matrix)| matrix)
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet(name).is_some()
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|(n, _)| n.as_str())
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&str, &SheetMatrix)> {
        self.sheets.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Content at `address`; `None` when outside the sheet or the sheet is absent.
    pub fn cell(&self, address: &CellAddress) -> Option<&CellContent> {
        self.sheet(&address.sheet)?.get(address.row, address.col)
    }
}

/// Decodes workbook bytes and selects the matching schema.
#[derive(Debug, Clone, Copy)]
pub struct WorkbookLoader<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> WorkbookLoader<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Decode `bytes` and detect its layout.
    pub fn load(&self, bytes: &[u8]) -> Result<(WorkbookModel, FieldSchema), LoadError> {
        let model = Self::parse(bytes)?;
        let schema = self.registry.detect(&model)?;
        info!(
            schema = %schema.id,
            version = schema.version,
            sheets = model.sheets.len(),
            "workbook layout detected"
        );
        Ok((model, schema.clone()))
    }

    /// Decode `bytes` (xlsx, xlsm, xlsb, xls or ods) into a [`WorkbookModel`].
    pub fn parse(bytes: &[u8]) -> Result<WorkbookModel, LoadError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| LoadError::Parse(e.to_string()))?;

        let mut model = WorkbookModel::new();
        for name in workbook.sheet_names() {
            let values = workbook
                .worksheet_range(&name)
                .map_err(|e| LoadError::Parse(format!("sheet `{name}`: {e}")))?;
            let formulas = match workbook.worksheet_formula(&name) {
                Ok(range) => Some(range),
                Err(e) => {
                    debug!(sheet = %name, error = %e, "no formulas read");
                    None
                }
            };
            let matrix = build_matrix(&values, formulas.as_ref());
            debug!(
                sheet = %name,
                rows = matrix.height(),
                cols = matrix.width(),
                "sheet decoded"
            );
            model.insert_sheet(name, matrix);
        }
        Ok(model)
    }
}

fn used_end<T>(range: &Range<T>) -> Option<(u32, u32)>
where
    T: calamine::CellType,
{
    if range.is_empty() { None } else { range.end() }
}

fn build_matrix(values: &Range<Data>, formulas: Option<&Range<String>>) -> SheetMatrix {
    let ends = [used_end(values), formulas.and_then(used_end)];
    let (height, width) = ends
        .into_iter()
        .flatten()
        .fold((0usize, 0usize), |(h, w), (r, c)| {
            (h.max(r as usize + 1), w.max(c as usize + 1))
        });
    let mut matrix = SheetMatrix::new(height, width);

    let (start_row, start_col) = values.start().unwrap_or_default();
    for (row, col, data) in values.used_cells() {
        matrix.set(
            row + start_row as usize,
            col + start_col as usize,
            CellContent::from_data(data),
        );
    }

    // Formula source wins over any cached value.
    if let Some(formulas) = formulas {
        let (start_row, start_col) = formulas.start().unwrap_or_default();
        for (row, col, source) in formulas.used_cells() {
            let source = source.trim();
            if source.is_empty() {
                continue;
            }
            let source = if source.starts_with('=') {
                source.to_string()
            } else {
                format!("={source}")
            };
            matrix.set(
                row + start_row as usize,
                col + start_col as usize,
                CellContent::Formula(source),
            );
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_starts_empty_and_rectangular() {
        let matrix = SheetMatrix::new(3, 4);
        assert_eq!(matrix.height(), 3);
        assert_eq!(matrix.width(), 4);
        assert!(matrix.rows().iter().all(|row| row.len() == 4));
        assert_eq!(matrix.get(2, 3), Some(&CellContent::Empty));
        assert_eq!(matrix.get(3, 0), None);
        assert_eq!(matrix.populated().count(), 0);
    }

    #[test]
    fn model_lookup_by_address() {
        let mut matrix = SheetMatrix::new(2, 2);
        matrix.set(1, 1, CellContent::Formula("=A1*2".into()));
        let mut model = WorkbookModel::new();
        model.insert_sheet("Calc", matrix);

        let addr = CellAddress::parse("Calc!B2").unwrap();
        assert_eq!(model.cell(&addr).and_then(CellContent::as_formula), Some("=A1*2"));
        assert_eq!(model.cell(&CellAddress::parse("Calc!Z9").unwrap()), None);
        assert_eq!(model.cell(&CellAddress::parse("Other!A1").unwrap()), None);
        assert_eq!(model.sheet_names().collect::<Vec<_>>(), vec!["Calc"]);
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        assert!(matches!(
            WorkbookLoader::parse(b"definitely not a workbook"),
            Err(LoadError::Parse(_))
        ));
    }
}
