use dbmlc::compiler::Compiler;
use dbmlc::diagnostics::CompileErrorCode;
use dbmlc::edit::{append_records, delete_record_row, rename_table, RecordValue};
use dbmlc::suggest::{suggest, CompletionKind};

const SOURCE: &str = "\
Table users {
  id int [pk]
  name varchar
}

Table posts {
  id int [pk]
  author_id int [ref: > users.id]
}

records users(id, name) {
  1, 'Ann'
}

records posts(id, author_id) {
  1, 1
}
";

#[test]
fn edit_recompile_loop_stays_consistent() {
    let mut compiler = Compiler::new();
    compiler.set_source(SOURCE);
    let compilation = compiler.compilation().unwrap();
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);

    // Append a user, recompile, and the new row is live for FK checks.
    let next = append_records(
        compilation,
        None,
        "users",
        &["id".to_owned(), "name".to_owned()],
        &[vec![
            RecordValue::Number("2".into()),
            RecordValue::String("Ben".into()),
        ]],
    )
    .unwrap();
    compiler.set_source(&next);
    let compilation = compiler.compilation().unwrap();
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
    let users = compilation.database.record_for(None, "users").unwrap();
    assert_eq!(users.values.len(), 2);

    // Delete the row a post points at and the FK check notices. Dirty data
    // warns, it never blocks compilation.
    let broken = delete_record_row(compilation, None, "users", 0).unwrap();
    compiler.set_source(&broken);
    let compilation = compiler.compilation().unwrap();
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
    assert!(
        compilation
            .warnings()
            .any(|d| d.code == CompileErrorCode::ForeignKeyViolated)
    );
}

#[test]
fn rename_table_keeps_the_model_compiling() {
    let mut compiler = Compiler::new();
    compiler.set_source(SOURCE);
    let renamed = rename_table(compiler.compilation().unwrap(), None, "users", "people").unwrap();

    compiler.set_source(&renamed);
    let compilation = compiler.compilation().unwrap();
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
    assert!(compilation.database.table(None, "people").is_some());
    assert!(compilation.database.table(None, "users").is_none());
    assert_eq!(compilation.database.refs[0].endpoints[1].table_name, "people");
    assert!(compilation.database.record_for(None, "people").is_some());
}

#[test]
fn completion_offers_ref_targets_inside_a_ref_element() {
    let source = "\
Table users { id int }
Table posts { author_id int }

Ref: posts.author_id > users.id
";
    let mut compiler = Compiler::new();
    compiler.set_source(source);
    let compilation = compiler.compilation().unwrap();
    let offset = source.rfind("users.id").unwrap();
    let list = suggest(compilation, offset);
    let labels: Vec<&str> = list.items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"users.id"));
    assert!(labels.contains(&"posts.author_id"));
    assert!(list.items.iter().all(|i| i.kind == CompletionKind::RefTarget));
}
