use dbmlc::compiler::compile;
use dbmlc::database::{Database, DefaultKind, Relation};

fn interpret(source: &str) -> Database {
    let compilation = compile(source);
    assert!(!compilation.has_errors(), "{:?}", compilation.diagnostics);
    compilation.database
}

#[test]
fn full_schema_round_trip() {
    let source = "
Project shop {
  database_type: 'PostgreSQL'
  Note { 'demo schema' }
}

enum order_status {
  pending
  shipped [note: 'left the warehouse']
}

Table users as U [headercolor: #3498DB] {
  id int [pk, increment]
  email varchar(120) [unique, not null]
  bio text [note: 'freeform']
  note: 'people'
}

Table orders {
  id int [pk]
  user_id int [ref: > users.id]
  status order_status [default: 'pending']
  total decimal(10, 2) [default: 0]

  indexes {
    (user_id, status) [name: 'orders_user_status']
    total [type: btree]
  }
}

Ref: orders.user_id > U.id [delete: set null, update: cascade]

TableGroup commerce {
  users
  orders
}
";
    let db = interpret(source);

    let project = db.project.as_ref().unwrap();
    assert_eq!(project.name.as_deref(), Some("shop"));
    assert_eq!(
        project.fields.get("database_type").map(String::as_str),
        Some("PostgreSQL")
    );
    assert_eq!(project.note.as_deref(), Some("demo schema"));

    assert_eq!(db.enums.len(), 1);
    assert_eq!(db.enums[0].values[1].note.as_deref(), Some("left the warehouse"));

    let users = db.table(None, "users").unwrap();
    assert_eq!(users.alias.as_deref(), Some("U"));
    assert_eq!(users.header_color.as_deref(), Some("#3498DB"));
    assert_eq!(users.note.as_deref(), Some("people"));
    assert!(users.field("id").unwrap().increment);
    assert!(users.field("email").unwrap().not_null);

    let orders = db.table(None, "orders").unwrap();
    let status = orders.field("status").unwrap();
    assert!(status.r#type.is_enum);
    assert_eq!(status.r#type.name, "order_status");
    assert_eq!(
        status.default.as_ref().map(|d| (d.kind, d.value.as_str())),
        Some((DefaultKind::String, "pending"))
    );
    assert_eq!(orders.indexes.len(), 2);
    assert_eq!(
        orders.indexes[0].column_names(),
        Some(vec!["user_id".to_owned(), "status".to_owned()])
    );
    assert_eq!(orders.indexes[1].r#type.as_deref(), Some("btree"));

    // One inline ref plus one ref element, both resolved to `users`.
    assert_eq!(db.refs.len(), 2);
    let named = db.refs.iter().find(|r| r.on_delete.is_some()).unwrap();
    assert_eq!(named.relation, Relation::ManyToOne);
    assert_eq!(named.endpoints[1].table_name, "users");
    assert_eq!(named.on_delete.as_deref(), Some("set null"));
    assert_eq!(named.on_update.as_deref(), Some("cascade"));

    assert_eq!(db.table_groups.len(), 1);
    assert_eq!(db.table_groups[0].members.len(), 2);
}

#[test]
fn schemas_separate_identically_named_tables() {
    let source = "
Table t { id int }
Table audit.t {
  id int
  actor varchar
}
";
    let db = interpret(source);
    assert_eq!(db.table(None, "t").unwrap().fields.len(), 1);
    let audited = db.table(Some("audit"), "t").unwrap();
    assert_eq!(audited.fields.len(), 2);
    assert_eq!(audited.schema_name.as_deref(), Some("audit"));
    // `public.` is normalized away.
    assert!(db.table(Some("public"), "t").is_some());
}

#[test]
fn partial_fields_carry_their_own_settings() {
    let source = "
TablePartial soft_delete {
  deleted_at timestamp [default: `null`]
}

Table docs {
  id int [pk]
  ~soft_delete
}
";
    let db = interpret(source);
    assert_eq!(db.table_partials.len(), 1);
    let docs = db.table(None, "docs").unwrap();
    let deleted = docs.field("deleted_at").unwrap();
    assert_eq!(
        deleted.default.as_ref().map(|d| d.kind),
        Some(DefaultKind::Expression)
    );
    assert_eq!(deleted.r#type.raw, "timestamp");
}

#[test]
fn column_type_raw_preserves_the_spelling() {
    let source = "
Table t {
  a Varchar(255)
  b decimal(6, 3)
}
";
    let db = interpret(source);
    let table = db.table(None, "t").unwrap();
    let a = table.field("a").unwrap();
    assert_eq!(a.r#type.name, "varchar");
    assert_eq!(a.r#type.raw, "Varchar(255)");
    assert_eq!(table.field("b").unwrap().r#type.args, vec!["6", "3"]);
}
