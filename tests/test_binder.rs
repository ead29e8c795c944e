use dbmlc::compiler::compile;
use dbmlc::diagnostics::CompileErrorCode;

fn codes(source: &str) -> Vec<CompileErrorCode> {
    compile(source).diagnostics.iter().map(|d| d.code).collect()
}

#[test]
fn partial_injection_merges_in_declaration_order() {
    let source = "
TablePartial base {
  x int
  shared varchar
}

Table t {
  a int
  ~base
  shared text
}
";
    let compilation = compile(source);
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
    let table = compilation.database.table(None, "t").unwrap();
    let names: Vec<&str> = table.fields.iter().map(|f| f.name.as_str()).collect();
    // Host `shared` wins over the injected one and moves to the end.
    assert_eq!(names, ["a", "x", "shared"]);
    assert_eq!(table.field("shared").unwrap().r#type.name, "text");
    assert_eq!(table.field("x").unwrap().r#type.name, "int");
}

#[test]
fn partials_cannot_inject_partials() {
    let source = "
TablePartial a { x int }
TablePartial b {
  y int
  ~a
}
";
    assert!(codes(source).contains(&CompileErrorCode::BindingError));
}

#[test]
fn duplicate_table_names_in_one_schema() {
    let source = "
Table t { id int }
Table t { id int }
";
    assert!(codes(source).contains(&CompileErrorCode::DuplicateName));

    // Same name in another schema is fine.
    let source = "
Table t { id int }
Table other.t { id int }
";
    assert!(codes(source).is_empty());
}

#[test]
fn ref_endpoints_must_resolve() {
    let source = "
Table a { id int }

Ref: a.id > missing.id
";
    assert!(codes(source).contains(&CompileErrorCode::NameNotFound));

    let source = "
Table a { id int }
Table b { a_id int }

Ref: b.a_id > a.nope
";
    assert!(codes(source).contains(&CompileErrorCode::NameNotFound));
}

#[test]
fn ref_endpoint_arity_must_match() {
    let source = "
Table a { x int\n y int }
Table b { x int }

Ref: b.x > a.(x, y)
";
    let compilation = compile(source);
    assert!(compilation.has_errors(), "{:?}", compilation.diagnostics);
}

#[test]
fn unknown_and_duplicate_column_settings() {
    let source = "
Table t {
  id int [sparkly]
}
";
    assert!(codes(source).contains(&CompileErrorCode::UnknownColumnSetting));

    let source = "
Table t {
  id int [pk, pk]
}
";
    assert!(codes(source).contains(&CompileErrorCode::DuplicateColumnSetting));
}

#[test]
fn setting_values_are_shape_checked() {
    // `note` wants a string, `pk` wants no value at all.
    let source = "
Table t {
  id int [note: 5]
}
";
    assert!(codes(source).contains(&CompileErrorCode::InvalidColumnSettingValue));

    let source = "
Table t [headercolor: notacolor] {
  id int
}
";
    assert!(codes(source).contains(&CompileErrorCode::InvalidTableSettingValue));
}

#[test]
fn records_bind_to_their_table_and_columns() {
    let source = "
records missing(id) {
  1
}
";
    assert!(codes(source).contains(&CompileErrorCode::NameNotFound));

    let source = "
Table t { id int }

records t(id, nope) {
  1, 2
}
";
    assert!(codes(source).contains(&CompileErrorCode::NameNotFound));
}

#[test]
fn indexes_only_live_inside_tables() {
    let source = "
indexes {
  (a, b)
}
";
    assert!(codes(source).contains(&CompileErrorCode::InvalidElementContext));
}

#[test]
fn table_alias_resolves_at_reference_sites() {
    let source = "
Table users as U {
  id int [pk]
}

Table posts {
  author_id int [ref: > U.id]
}
";
    let compilation = compile(source);
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
    assert_eq!(compilation.database.refs.len(), 1);
    // The alias denotes the table itself, not a separate entity.
    assert_eq!(compilation.database.refs[0].endpoints[1].table_name, "users");
}
