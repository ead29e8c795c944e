use dbmlc::compiler::compile;
use dbmlc::database::RecordCell;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
struct RecordsTest {
    name: String,
    dbml: String,
    #[serde(default)]
    diagnostics: Vec<String>,
    #[serde(default)]
    tables: Vec<ExpectedTable>,
}

#[derive(Deserialize, Debug)]
struct ExpectedTable {
    table: String,
    schema: Option<String>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize, Debug)]
struct RecordsTestData {
    tests: Vec<RecordsTest>,
}

const RECORDS_TESTS_FILE: &str = "tests/records_tests.toml";

/// `type|value` rendering of a cell, compact enough to write expectations
/// as plain strings in the fixture file.
fn render_cell(cell: &RecordCell) -> String {
    let kind = serde_json::to_value(cell.r#type).expect("cell type serializes");
    format!("{}|{}", kind.as_str().expect("cell type is a string"), cell.value)
}

#[test]
fn test_records() {
    let data_file =
        std::fs::read_to_string(RECORDS_TESTS_FILE).expect("Cannot open records test cases");
    let test_data: RecordsTestData =
        toml::from_str(&data_file).expect("Cannot parse records test cases");

    for test in test_data.tests {
        println!("Testing records for: {}", test.name);
        let compilation = compile(&test.dbml);

        // `CODE:SEVERITY`, so the fixtures pin the error/warning split too.
        let mut got_codes: Vec<String> = compilation
            .diagnostics
            .iter()
            .map(|d| format!("{}:{}", d.code, d.severity))
            .collect();
        got_codes.sort();
        let mut want_codes = test.diagnostics.clone();
        want_codes.sort();
        assert_eq!(got_codes, want_codes, "diagnostics for `{}`", test.name);

        assert_eq!(
            compilation.database.records.len(),
            test.tables.len(),
            "record-set count for `{}`",
            test.name
        );
        for expected in &test.tables {
            let record = compilation
                .database
                .record_for(expected.schema.as_deref(), &expected.table)
                .unwrap_or_else(|| panic!("no records for table `{}`", expected.table));
            assert_eq!(record.columns, expected.columns, "columns for `{}`", test.name);
            let rows: Vec<Vec<String>> = record
                .values
                .iter()
                .map(|row| row.iter().map(render_cell).collect())
                .collect();
            assert_eq!(rows, expected.rows, "rows for `{}`", test.name);
        }
    }
}
