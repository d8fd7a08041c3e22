//! A1 address translation.
//!
//! Converts between spreadsheet A1 text (`"B12"`, `"AN2"`) and zero-based
//! `(row, col)` pairs, and parses sheet-qualified references such as
//! `MODEL_INPUTS!B8` or `'ROI Calculator'!C4` into [`CellAddress`] values.
//! Column letters are base-26 with `A..=Z` mapping to `1..=26`.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Number of rows addressable in a worksheet (Excel limit).
pub const MAX_ROWS: u32 = 1_048_576;
/// Number of columns addressable in a worksheet (Excel limit, `XFD`).
pub const MAX_COLS: u32 = 16_384;

static QUALIFIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:'((?:[^']|'')+)'|([^!']+))!(.+)$").expect("qualified address regex")
});

/// Parse A1 text into a zero-based `(row, col)` pair.
///
/// Lowercase column letters and leading zeros in the row are accepted.
pub fn to_row_col(a1: &str) -> Result<(u32, u32), AddressError> {
    let text = a1.trim();
    if text.is_empty() {
        return Err(AddressError::Empty(a1.to_string()));
    }

    let split = text
        .find(|ch: char| !ch.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (letters, digits) = text.split_at(split);
    if letters.is_empty() {
        return Err(AddressError::InvalidColumn {
            address: a1.to_string(),
        });
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::InvalidRow {
            address: a1.to_string(),
        });
    }

    let col = letters_to_column(letters).ok_or_else(|| AddressError::OutOfBounds {
        address: a1.to_string(),
    })?;
    let row1: u32 = digits.parse().map_err(|_| AddressError::OutOfBounds {
        address: a1.to_string(),
    })?;
    if row1 == 0 {
        return Err(AddressError::NonPositiveRow {
            address: a1.to_string(),
        });
    }
    if row1 > MAX_ROWS || col >= MAX_COLS {
        return Err(AddressError::OutOfBounds {
            address: a1.to_string(),
        });
    }
    Ok((row1 - 1, col))
}

/// Render a zero-based `(row, col)` pair as A1 text.
pub fn to_a1(row: u32, col: u32) -> String {
    format!("{}{}", column_to_letters(col), u64::from(row) + 1)
}

/// Canonical A1 spelling: uppercase letters, no leading zeros.
pub fn normalize(a1: &str) -> Result<String, AddressError> {
    let (row, col) = to_row_col(a1)?;
    Ok(to_a1(row, col))
}

/// Zero-based column index to letters (0 -> A, 25 -> Z, 26 -> AA).
pub fn column_to_letters(mut col: u32) -> String {
    let mut buf = Vec::new();
    loop {
        buf.push(b'A' + (col % 26) as u8);
        col /= 26;
        if col == 0 {
            break;
        }
        col -= 1;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Column letters (case-insensitive) to a zero-based index.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u32 = 0;
    for ch in letters.bytes() {
        let ch = ch.to_ascii_uppercase();
        if !ch.is_ascii_uppercase() {
            return None;
        }
        n = n.checked_mul(26)?.checked_add(u32::from(ch - b'A') + 1)?;
    }
    Some(n - 1)
}

/// Sheet-scoped, zero-based cell address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddress {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(sheet: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// Address `a1` on `sheet`.
    pub fn from_a1(sheet: impl Into<String>, a1: &str) -> Result<Self, AddressError> {
        let (row, col) = to_row_col(a1)?;
        Ok(Self::new(sheet, row, col))
    }

    /// Parse `Sheet!A1` or `'Quoted Sheet'!A1`.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let caps = QUALIFIED
            .captures(text.trim())
            .ok_or_else(|| AddressError::MissingSheet {
                address: text.to_string(),
            })?;
        let sheet = match (caps.get(1), caps.get(2)) {
            (Some(quoted), _) => quoted.as_str().replace("''", "'"),
            (None, Some(bare)) => bare.as_str().trim().to_string(),
            (None, None) => {
                return Err(AddressError::MissingSheet {
                    address: text.to_string(),
                });
            }
        };
        Self::from_a1(sheet, &caps[3])
    }

    /// A1 text without the sheet qualifier.
    pub fn a1(&self) -> String {
        to_a1(self.row, self.col)
    }

    /// One-based row as used by the evaluation engine.
    pub fn excel_row(&self) -> u32 {
        self.row + 1
    }

    /// One-based column as used by the evaluation engine.
    pub fn excel_col(&self) -> u32 {
        self.col + 1
    }

    /// Same row, `delta` columns to the right; `None` past the last column.
    pub fn offset_cols(&self, delta: u32) -> Option<Self> {
        let col = self.col.checked_add(delta).filter(|col| *col < MAX_COLS)?;
        Some(Self::new(self.sheet.clone(), self.row, col))
    }
}

fn needs_quotes(sheet: &str) -> bool {
    sheet.is_empty()
        || !sheet
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if needs_quotes(&self.sheet) {
            write!(f, "'{}'!{}", self.sheet.replace('\'', "''"), self.a1())
        } else {
            write!(f, "{}!{}", self.sheet, self.a1())
        }
    }
}

impl FromStr for CellAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CellAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CellAddress> for String {
    fn from(value: CellAddress) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_single_and_multi_letter_columns() {
        assert_eq!(to_row_col("A1").unwrap(), (0, 0));
        assert_eq!(to_row_col("B12").unwrap(), (11, 1));
        assert_eq!(to_row_col("Z3").unwrap(), (2, 25));
        assert_eq!(to_row_col("AA1").unwrap(), (0, 26));
        assert_eq!(to_row_col("AN2").unwrap(), (1, 39));
        assert_eq!(to_row_col("XFD1048576").unwrap(), (1_048_575, 16_383));
    }

    #[test]
    fn accepts_lowercase_and_padding() {
        assert_eq!(to_row_col(" e05 ").unwrap(), (4, 4));
        assert_eq!(normalize("ab007").unwrap(), "AB7");
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(matches!(to_row_col(""), Err(AddressError::Empty(_))));
        assert!(matches!(
            to_row_col("12"),
            Err(AddressError::InvalidColumn { .. })
        ));
        assert!(matches!(
            to_row_col("$B$2"),
            Err(AddressError::InvalidColumn { .. })
        ));
        assert!(matches!(to_row_col("B"), Err(AddressError::InvalidRow { .. })));
        assert!(matches!(
            to_row_col("B2C"),
            Err(AddressError::InvalidRow { .. })
        ));
        assert!(matches!(
            to_row_col("B0"),
            Err(AddressError::NonPositiveRow { .. })
        ));
        assert!(matches!(
            to_row_col("XFE1"),
            Err(AddressError::OutOfBounds { .. })
        ));
        assert!(matches!(
            to_row_col("A99999999999"),
            Err(AddressError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(4), "E");
        assert_eq!(column_to_letters(27), "AB");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(702), "AAA");
        assert_eq!(letters_to_column("an"), Some(39));
        assert_eq!(letters_to_column("A1"), None);
    }

    #[test]
    fn qualified_addresses() {
        let addr = CellAddress::parse("MODEL_INPUTS!B8").unwrap();
        assert_eq!(addr, CellAddress::new("MODEL_INPUTS", 7, 1));
        assert_eq!(addr.to_string(), "MODEL_INPUTS!B8");
        assert_eq!((addr.excel_row(), addr.excel_col()), (8, 2));

        let quoted = CellAddress::parse("'Bob''s ROI'!c4").unwrap();
        assert_eq!(quoted.sheet, "Bob's ROI");
        assert_eq!(quoted.to_string(), "'Bob''s ROI'!C4");
        assert_eq!(CellAddress::parse(&quoted.to_string()).unwrap(), quoted);

        assert!(matches!(
            CellAddress::parse("B8"),
            Err(AddressError::MissingSheet { .. })
        ));
        assert_eq!(
            CellAddress::parse("Sheet1!E2").unwrap().offset_cols(35).unwrap().a1(),
            "AN2"
        );
    }

    #[test]
    fn offset_past_last_column_is_none() {
        let last_but_one = CellAddress::parse("Sheet1!XFC1").unwrap();
        assert_eq!(last_but_one.offset_cols(1).unwrap().a1(), "XFD1");
        assert!(last_but_one.offset_cols(2).is_none());
        assert!(last_but_one.offset_cols(u32::MAX).is_none());
    }

    proptest! {
        #[test]
        fn row_col_roundtrip(row in 0u32..MAX_ROWS, col in 0u32..MAX_COLS) {
            prop_assert_eq!(to_row_col(&to_a1(row, col)).unwrap(), (row, col));
        }

        #[test]
        fn a1_roundtrip_matches_normalized_text(
            letters in "[a-zA-Z]{1,2}",
            zeros in "0{0,2}",
            row in 1u32..100_000,
        ) {
            let text = format!("{letters}{zeros}{row}");
            let (r, c) = to_row_col(&text).unwrap();
            prop_assert_eq!(to_a1(r, c), format!("{}{}", letters.to_ascii_uppercase(), row));
        }
    }
}
