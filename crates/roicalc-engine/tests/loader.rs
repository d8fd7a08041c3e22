mod common;

use common::{add_calculator_sheet, add_model_sheets, addr, model_sheets_workbook, xlsx_bytes};
use roicalc_engine::{
    CellContent, EngineConfig, EngineState, LoadError, RoiEngine, SchemaRegistry, WorkbookLoader,
};

#[test]
fn formulas_keep_their_source_with_equals_prefix() {
    let model = WorkbookLoader::parse(&model_sheets_workbook()).unwrap();
    match model.cell(&addr("MODEL_INPUTS!B4")) {
        Some(CellContent::Formula(src)) => assert_eq!(src, "=B3/2080"),
        other => panic!("expected formula, got {other:?}"),
    }
    assert_eq!(
        model.cell(&addr("MODEL_INPUTS!B2")),
        Some(&CellContent::Number(50.0))
    );
    assert_eq!(
        model.cell(&addr("MODEL_INPUTS!A2")),
        Some(&CellContent::Text("Number of developers".into()))
    );
    assert!(matches!(
        model.cell(&addr("MODEL_OUTPUTS!AN2")),
        Some(CellContent::Formula(_))
    ));
}

#[test]
fn matrices_are_rectangular_with_explicit_empties() {
    let model = WorkbookLoader::parse(&model_sheets_workbook()).unwrap();
    let outputs = model.sheet("MODEL_OUTPUTS").unwrap();
    // A1 through AN15.
    assert_eq!(outputs.width(), 40);
    assert_eq!(outputs.height(), 15);
    assert!(outputs.rows().iter().all(|row| row.len() == outputs.width()));
    assert_eq!(outputs.get(0, 0), Some(&CellContent::Empty));
    assert_eq!(model.cell(&addr("MODEL_OUTPUTS!C4")), Some(&CellContent::Empty));

    let inputs = model.sheet("MODEL_INPUTS").unwrap();
    assert_eq!((inputs.height(), inputs.width()), (21, 5));
}

#[test]
fn sheets_keep_workbook_order() {
    let model = WorkbookLoader::parse(&model_sheets_workbook()).unwrap();
    let names: Vec<&str> = model.sheet_names().collect();
    assert_eq!(names, vec!["Sheet1", "MODEL_INPUTS", "MODEL_OUTPUTS"]);
}

#[test]
fn detects_each_layout_by_marker() {
    let registry = SchemaRegistry::builtin();
    let loader = WorkbookLoader::new(&registry);

    let (_, schema) = loader.load(&model_sheets_workbook()).unwrap();
    assert_eq!((schema.id.as_str(), schema.version), ("model-sheets", 2));

    let (_, schema) = loader.load(&xlsx_bytes(add_calculator_sheet)).unwrap();
    assert_eq!((schema.id.as_str(), schema.version), ("calculator-sheet", 1));
}

#[test]
fn unknown_layout_fails_to_load() {
    let bytes = xlsx_bytes(|book| {
        book.get_sheet_by_name_mut("Sheet1")
            .unwrap()
            .get_cell_mut("A1")
            .set_value("Quarterly budget");
    });
    let mut engine = RoiEngine::new(EngineConfig::default());
    match engine.load_bytes(&bytes) {
        Err(LoadError::SchemaNotDetected { expected }) => {
            assert!(expected.contains("model-sheets"));
            assert!(expected.contains("calculator-sheet"));
        }
        other => panic!("expected SchemaNotDetected, got {other:?}"),
    }
    assert_eq!(engine.state(), EngineState::LoadFailed);
}

#[test]
fn workbook_matching_both_layouts_is_ambiguous() {
    let bytes = xlsx_bytes(|book| {
        add_model_sheets(book);
        add_calculator_sheet(book);
    });
    let mut engine = RoiEngine::new(EngineConfig::default());
    match engine.load_bytes(&bytes) {
        Err(LoadError::AmbiguousSchema { candidates }) => {
            assert_eq!(candidates, "model-sheets, calculator-sheet");
        }
        other => panic!("expected AmbiguousSchema, got {other:?}"),
    }
}

#[test]
fn partial_marker_does_not_match() {
    let bytes = xlsx_bytes(|book| {
        book.new_sheet("MODEL_INPUTS").unwrap();
    });
    let registry = SchemaRegistry::builtin();
    assert!(matches!(
        WorkbookLoader::new(&registry).load(&bytes),
        Err(LoadError::SchemaNotDetected { .. })
    ));
}

#[test]
fn extra_schema_extends_detection() {
    const RENAMED: &str = include_str!("../schemas/model_sheets.yaml");
    let yaml = RENAMED
        .replace("id: model-sheets", "id: model-sheets-renamed")
        .replace("MODEL_INPUTS", "INPUTS")
        .replace("MODEL_OUTPUTS", "OUTPUTS");
    let config = EngineConfig::default().with_schema_yaml(&yaml).unwrap();
    assert_eq!(config.registry.len(), 3);

    let bytes = xlsx_bytes(|book| {
        book.new_sheet("INPUTS").unwrap();
        book.new_sheet("OUTPUTS").unwrap();
    });
    let registry = config.registry.clone();
    let (_, schema) = WorkbookLoader::new(&registry).load(&bytes).unwrap();
    assert_eq!(schema.id, "model-sheets-renamed");
}
