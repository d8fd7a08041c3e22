// Shared fixtures: ROI workbooks built in memory with umya-spreadsheet.
#![allow(dead_code)]

use std::io::Cursor;

use roicalc_engine::CellAddress;
use umya_spreadsheet::{Spreadsheet, Worksheet};

pub const EPS: f64 = 1e-6;

pub fn addr(text: &str) -> CellAddress {
    CellAddress::parse(text).unwrap()
}

pub fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= EPS * expected.abs().max(1.0)
}

/// Serialize a workbook assembled by `build` to xlsx bytes.
pub fn xlsx_bytes(build: impl FnOnce(&mut Spreadsheet)) -> Vec<u8> {
    let mut book = umya_spreadsheet::new_file();
    build(&mut book);
    let mut out = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out).unwrap();
    out.into_inner()
}

fn sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> &'a mut Worksheet {
    if book.get_sheet_by_name(name).is_none() {
        book.new_sheet(name).unwrap();
    }
    book.get_sheet_by_name_mut(name).unwrap()
}

fn number(ws: &mut Worksheet, cell: &str, value: f64) {
    ws.get_cell_mut(cell).set_value_number(value);
}

fn text(ws: &mut Worksheet, cell: &str, value: &str) {
    ws.get_cell_mut(cell).set_value(value);
}

fn formula(ws: &mut Worksheet, cell: &str, source: &str) {
    ws.get_cell_mut(cell).set_formula(source);
}

/// Authored defaults of the two-sheet fixture (percentages stored as fractions).
pub const MODEL_DEFAULTS: [(&str, f64); 18] = [
    ("B2", 50.0),
    ("B3", 200_000.0),
    ("B6", 4.0),
    ("B7", 0.75),
    ("B8", 0.25),
    ("B10", 12.0),
    ("B11", 2.0),
    ("B12", 0.3),
    ("B13", 10.0),
    ("B15", 16.0),
    ("B16", 0.1),
    ("B19", 5.0),
    ("B20", 0.25),
    ("B21", 8.0),
    ("E2", 100_000.0),
    ("E3", 1.0),
    ("E4", 2.0),
    ("E5", 6.0),
];

/// Two-sheet layout with a working savings model.
pub fn model_sheets_workbook() -> Vec<u8> {
    model_sheets_with(|_| {})
}

/// Two-sheet layout; `tweak` may overwrite MODEL_INPUTS cells before saving.
pub fn model_sheets_with(tweak: impl FnOnce(&mut Worksheet)) -> Vec<u8> {
    xlsx_bytes(|book| {
        add_model_sheets(book);
        tweak(sheet(book, "MODEL_INPUTS"));
    })
}

pub fn add_model_sheets(book: &mut Spreadsheet) {
    let inputs = sheet(book, "MODEL_INPUTS");
    text(inputs, "A2", "Number of developers");
    text(inputs, "A11", "Time to onboard (weeks)");
    text(inputs, "D2", "Yearly license cost");
    for (cell, value) in MODEL_DEFAULTS {
        number(inputs, cell, value);
    }
    // Hourly loaded cost.
    formula(inputs, "B4", "B3/2080");

    let out = sheet(book, "MODEL_OUTPUTS");
    text(out, "A2", "Ticketops hours");
    formula(
        out,
        "B2",
        "MODEL_INPUTS!B2*MODEL_INPUTS!B6*12*MODEL_INPUTS!B7*MODEL_INPUTS!B8",
    );
    formula(out, "B3", "B2*MODEL_INPUTS!B4");
    formula(
        out,
        "B5",
        "MODEL_INPUTS!B10*(MODEL_INPUTS!B11*40*MODEL_INPUTS!B12+MODEL_INPUTS!B13)",
    );
    formula(out, "B6", "B5*MODEL_INPUTS!B4");
    formula(
        out,
        "B8",
        "MODEL_INPUTS!B2*MODEL_INPUTS!B15*12*MODEL_INPUTS!B16",
    );
    formula(out, "B9", "B8*MODEL_INPUTS!B4");
    formula(
        out,
        "B11",
        "MODEL_INPUTS!B19*MODEL_INPUTS!B20*MODEL_INPUTS!B21*MODEL_INPUTS!B2*12",
    );
    formula(out, "B12", "B11*MODEL_INPUTS!B4");
    // Annual benefit and annual cost.
    formula(out, "B14", "B3+B6+B9+B12");
    formula(out, "B15", "MODEL_INPUTS!E2+MODEL_INPUTS!E3*MODEL_INPUTS!B3");

    monthly_series(out, 4, 1, "$B$14", "$B$15", "MODEL_INPUTS!$E$4", "MODEL_INPUTS!$E$5");
}

/// Month labels on `label_row`, cumulative return on the row below, from
/// zero-based column `start_col` for 36 columns.
fn monthly_series(
    ws: &mut Worksheet,
    start_col: u32,
    label_row: u32,
    benefit: &str,
    cost: &str,
    offset: &str,
    adoption: &str,
) {
    let letters = |col: u32| roicalc_engine::address::column_to_letters(col);
    let roi_row = label_row + 1;
    for idx in 0..36 {
        let col = letters(start_col + idx);
        let label = format!("{col}{label_row}");
        let roi = format!("{col}{roi_row}");
        let ramp = format!(
            "{benefit}/12*MIN(1,MAX(0,({label}-{offset})/{adoption}))-{cost}/12"
        );
        if idx == 0 {
            number(ws, &label, 1.0);
            formula(ws, &roi, &ramp);
        } else {
            let prev = letters(start_col + idx - 1);
            formula(ws, &label, &format!("{prev}{label_row}+1"));
            formula(ws, &roi, &format!("{prev}{roi_row}+{ramp}"));
        }
    }
}

/// Single-sheet layout identified by its title; percentages stored as 0-100.
pub fn calculator_sheet_workbook() -> Vec<u8> {
    xlsx_bytes(add_calculator_sheet)
}

pub fn add_calculator_sheet(book: &mut Spreadsheet) {
    let ws = sheet(book, "ROI Calculator");
    text(ws, "A1", "Port ROI Calculator");
    for (cell, value) in [
        ("C4", 40.0),
        ("C5", 156_000.0),
        ("C8", 5.0),
        ("C9", 1.0),
        ("C10", 20.0),
        ("C13", 10.0),
        ("C14", 3.0),
        ("C15", 50.0),
        ("C16", 8.0),
        ("C19", 10.0),
        ("C20", 15.0),
        ("C23", 2.0),
        ("C24", 0.5),
        ("C25", 4.0),
        ("F4", 50_000.0),
        ("F5", 0.5),
        ("F6", 1.0),
        ("F7", 3.0),
    ] {
        number(ws, cell, value);
    }
    formula(ws, "C6", "C5/2080");
    formula(ws, "I4", "C4*C8*12*C9*C10/100");
    formula(ws, "J4", "I4*C6");
    formula(ws, "I5", "C13*(C14*40*C15/100+C16)");
    formula(ws, "J5", "I5*C6");
    formula(ws, "I6", "C4*C19*12*C20/100");
    formula(ws, "J6", "I6*C6");
    formula(ws, "I7", "C23*C24*C25*C4*12");
    formula(ws, "J7", "I7*C6");
    formula(ws, "J9", "J4+J5+J6+J7");
    formula(ws, "J10", "F4+F5*C5");

    monthly_series(ws, 2, 30, "$J$9", "$J$10", "$F$6", "$F$7");
}
