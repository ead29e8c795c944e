use dbmlc::ast::{ElementKind, ProgramNode};
use dbmlc::diagnostics::Diagnostic;
use dbmlc::parser::parse_tokens;
use dbmlc::scanner::Scanner;

fn parse_dbml(source: &str) -> (ProgramNode, Vec<Diagnostic>) {
    let (tokens, scan_diagnostics) = Scanner::new(source).scan();
    assert!(
        scan_diagnostics.is_empty(),
        "scanner diagnostics: {:?}",
        scan_diagnostics
    );
    parse_tokens(&tokens)
}

fn tables_of(program: &ProgramNode) -> usize {
    program
        .elements
        .iter()
        .filter(|e| e.kind == ElementKind::Table)
        .count()
}

#[test]
fn test_should_parse() {
    let sources = [
        "
        Table users {
          id int [pk, increment]
          email varchar(120) [unique, not null]
          created_at timestamp [default: `now()`]
        }
        ",
        "
        Table orders as O [headercolor: #3498DB] {
          id int [pk]
          total decimal(10, 2) [default: 0]
          note: 'money amounts in cents'
        }
        ",
        r#"
        Table "quoted table" {
          "quoted column" varchar
        }
        "#,
        "
        enum status {
          active [note: 'visible to everyone']
          inactive
        }

        Table posts {
          id int [pk]
          state status [default: 'active']
        }
        ",
        "
        Table inventory.items {
          id int [pk]
          sku varchar(32)

          indexes {
            (id, sku) [unique, name: 'items_id_sku']
            (`lower(sku)`)
            sku [type: hash]
          }
        }
        ",
        "
        Table a { id int [pk] }
        Table b {
          a_id int [ref: > a.id]
          twin_id int [ref: - a.id]
        }

        Ref: b.a_id > a.id [delete: cascade, update: no action]
        Ref link: a.id < b.a_id [delete: set null]
        ",
        "
        Table left { x int\n y int }
        Table right { x int\n y int }

        Ref: left.(x, y) <> right.(x, y)
        ",
        "
        TablePartial timestamps {
          created_at timestamp [default: `now()`]
          updated_at timestamp
        }

        Table events {
          id int [pk]
          ~timestamps
        }
        ",
        "
        Table users {
          id int [pk]
          name varchar

          records (id, name) {
            1, 'Ann'
            2, 'Ben'
          }
        }

        records users {
          3, 'Cid'
        }
        ",
        "
        Table m {
          i int
          f float
          neg int
        }

        records m(i, f, neg) {
          1, 1.5, -5
          2, 2e3, +7
        }
        ",
        "
        Project blog {
          database_type: 'PostgreSQL'
          Note { 'sample project' }
        }

        TableGroup core [color: #EEE] {
          users
          posts
        }

        Table users { id int }
        Table posts { id int }
        ",
    ];
    for source in sources {
        println!("Testing parser for DBML: {}", source);
        let (_, diagnostics) = parse_dbml(source);
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }
}

#[test]
fn empty_token_slice_parses_to_an_empty_program() {
    let (program, diagnostics) = parse_tokens(&[]);
    assert!(program.elements.is_empty());
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
}

#[test]
fn malformed_element_does_not_take_down_the_file() {
    let source = "
Table a { id int }
123 456
Table b { id int }
";
    let (program, diagnostics) = parse_dbml(source);
    assert!(!diagnostics.is_empty());
    assert_eq!(tables_of(&program), 2);
}

#[test]
fn setting_list_resynchronizes_at_commas() {
    let source = "
Table t {
  id int [pk,, unique]
  name varchar
}
Table u { id int }
";
    let (program, diagnostics) = parse_dbml(source);
    assert!(!diagnostics.is_empty());
    assert_eq!(tables_of(&program), 2);
    // Both columns of `t` survive the bad setting list.
    let table = &program.elements[0];
    if let dbmlc::ast::ElementBody::Block(block) = &table.body {
        assert_eq!(block.items.len(), 2);
    } else {
        panic!("expected a block body");
    }
}

#[test]
fn unclosed_block_still_yields_the_element() {
    let source = "Table t {\n  id int\n";
    let (program, diagnostics) = parse_dbml(source);
    assert!(!diagnostics.is_empty());
    assert_eq!(tables_of(&program), 1);
}

#[test]
fn every_line_after_a_broken_one_is_reparsed() {
    // `(` opens a tuple that swallows up to the matching context; the
    // following table must still come out whole.
    let source = "
Table t {
  id int [default: (]
}

Table after { id int }
";
    let (program, diagnostics) = parse_dbml(source);
    assert!(!diagnostics.is_empty());
    assert!(
        program
            .elements
            .iter()
            .any(|e| e.kind == ElementKind::Table
                && e.name.as_ref().and_then(|n| n.name_parts()).map(|p| p.join("."))
                    == Some("after".to_owned()))
    );
}
