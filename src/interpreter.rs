//! First interpretation pass: lowers the bound syntax tree into the plain
//! [`Database`] value. Everything name-shaped was already validated and
//! resolved by the binder, so this pass only extracts; malformed pieces it
//! encounters are skipped, never reported twice.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::{
    BlockItem, ElementBody, ElementKind, ElementNode, Expr, LiteralKind, NodeId, Operator,
    ProgramNode, SettingItem,
};
use crate::binder::{self, Analysis};
use crate::database::{
    ColumnType, Database, DefaultKind, DefaultValue, Enum, EnumValue, Field, IndexColumn,
    IndexColumnKind, IndexDef, Project, Ref, RefEndpoint, Relation, Table, TableGroup,
    TableGroupMember, TablePartial, DEFAULT_SCHEMA,
};

pub fn interpret(program: &ProgramNode, analysis: &Analysis, source: &str) -> Database {
    Interpreter {
        analysis,
        source,
        column_lines: index_column_lines(program),
    }
    .run(program)
}

/// Column declaration lines across every table and partial, keyed by node
/// id. Merged field lists refer into partial bodies, so a table cannot find
/// all of its lines inside its own block.
fn index_column_lines(program: &ProgramNode) -> HashMap<NodeId, &Expr> {
    let mut lines = HashMap::new();
    for element in &program.elements {
        if !matches!(element.kind, ElementKind::Table | ElementKind::TablePartial) {
            continue;
        }
        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                if let BlockItem::Line(expr) = item {
                    lines.insert(expr.id(), expr);
                }
            }
        }
    }
    lines
}

struct Interpreter<'a> {
    analysis: &'a Analysis,
    source: &'a str,
    column_lines: HashMap<NodeId, &'a Expr>,
}

impl<'a> Interpreter<'a> {
    fn run(&self, program: &ProgramNode) -> Database {
        let mut database = Database::default();
        for element in &program.elements {
            match element.kind {
                ElementKind::Table => {
                    if let Some(table) = self.interpret_table(element, &mut database.refs) {
                        database.tables.push(table);
                    }
                }
                ElementKind::TablePartial => {
                    if let Some(partial) = self.interpret_partial(element) {
                        database.table_partials.push(partial);
                    }
                }
                ElementKind::Enum => {
                    if let Some(enum_def) = self.interpret_enum(element) {
                        database.enums.push(enum_def);
                    }
                }
                ElementKind::Ref => self.interpret_ref(element, &mut database.refs),
                ElementKind::TableGroup => {
                    if let Some(group) = self.interpret_table_group(element) {
                        database.table_groups.push(group);
                    }
                }
                ElementKind::Project => {
                    if database.project.is_none() {
                        database.project = Some(self.interpret_project(element));
                    }
                }
                _ => {}
            }
        }
        database
    }

    fn element_name(&self, element: &ElementNode) -> Option<(Option<String>, String)> {
        let mut parts = element.name.as_ref()?.name_parts()?;
        match parts.len() {
            1 => Some((None, parts.remove(0))),
            2 => {
                let name = parts.remove(1);
                Some((normalize_schema(parts.remove(0)), name))
            }
            _ => None,
        }
    }

    fn interpret_table(&self, element: &ElementNode, refs: &mut Vec<Ref>) -> Option<Table> {
        let (schema_name, name) = self.element_name(element)?;
        let settings = setting_items(element);
        let mut table = Table {
            schema_name: schema_name.clone(),
            name: name.clone(),
            alias: element.alias.as_ref().map(|a| a.value()),
            note: setting_string(settings, "note"),
            header_color: setting_color(settings),
            fields: Vec::new(),
            indexes: Vec::new(),
        };

        let field_list = self.analysis.table_fields.get(&element.id)?;
        for resolved in field_list {
            let Some(line) = self.column_lines.get(&resolved.line_node) else {
                continue;
            };
            if let Some(field) = self.interpret_field(line) {
                // Inline refs always hang off the host table, including for
                // fields that came in through a partial.
                self.collect_inline_ref(line, &schema_name, &name, refs);
                table.fields.push(field);
            }
        }

        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                match item {
                    BlockItem::Field(field) if field.name.value().eq_ignore_ascii_case("note") => {
                        if let Some(text) = string_of(&field.value) {
                            table.note = Some(text);
                        }
                    }
                    BlockItem::SubElement(sub) => match sub.kind {
                        ElementKind::Indexes => {
                            table.indexes.extend(self.interpret_indexes(sub));
                        }
                        ElementKind::Note => {
                            if let Some(text) = note_content(sub) {
                                table.note = Some(text);
                            }
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
        Some(table)
    }

    fn interpret_partial(&self, element: &ElementNode) -> Option<TablePartial> {
        let (_, name) = self.element_name(element)?;
        let settings = setting_items(element);
        let mut partial = TablePartial {
            name,
            note: setting_string(settings, "note"),
            header_color: setting_color(settings),
            fields: Vec::new(),
            indexes: Vec::new(),
        };
        if let Some(field_list) = self.analysis.table_fields.get(&element.id) {
            for resolved in field_list {
                if let Some(field) = self
                    .column_lines
                    .get(&resolved.line_node)
                    .and_then(|line| self.interpret_field(line))
                {
                    partial.fields.push(field);
                }
            }
        }
        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                if let BlockItem::SubElement(sub) = item
                    && sub.kind == ElementKind::Indexes
                {
                    partial.indexes.extend(self.interpret_indexes(sub));
                }
            }
        }
        Some(partial)
    }

    fn interpret_field(&self, line: &Expr) -> Option<Field> {
        let Expr::FunctionApplication(app) = line else {
            return None;
        };
        let name = match app.callee.as_ref() {
            Expr::Variable(v) => v.name(),
            _ => return None,
        };
        let type_expr = app.args.first()?;
        let r#type = self.interpret_column_type(type_expr)?;
        let settings: &[SettingItem] = app
            .args
            .iter()
            .find_map(|arg| match arg {
                Expr::List(list) => Some(list.items.as_slice()),
                _ => None,
            })
            .unwrap_or(&[]);

        Some(Field {
            name,
            r#type,
            pk: setting_flag(settings, "pk") || setting_flag(settings, "primary key"),
            unique: setting_flag(settings, "unique"),
            not_null: setting_flag(settings, "not null"),
            increment: setting_flag(settings, "increment"),
            default: setting_expr(settings, "default").and_then(default_value),
            note: setting_string(settings, "note"),
        })
    }

    fn interpret_column_type(&self, type_expr: &Expr) -> Option<ColumnType> {
        let raw_span = type_expr.span();
        let raw = self
            .source
            .get(raw_span.start..raw_span.end)
            .unwrap_or_default()
            .to_owned();
        let (name_expr, args) = match type_expr {
            Expr::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .filter_map(|arg| match arg {
                        Expr::Literal(l) => Some(l.token.value()),
                        Expr::Variable(v) => Some(v.name()),
                        _ => None,
                    })
                    .collect();
                (call.callee.as_ref(), args)
            }
            other => (other, Vec::new()),
        };
        let mut parts = name_expr.name_parts()?;
        let (schema_name, base) = match parts.len() {
            1 => (None, parts.remove(0)),
            2 => {
                let base = parts.remove(1);
                (normalize_schema(parts.remove(0)), base)
            }
            _ => return None,
        };
        let is_enum = self
            .analysis
            .node_symbols
            .contains_key(&name_expr.id());
        Some(ColumnType {
            name: if is_enum { base } else { base.to_lowercase() },
            args,
            schema_name,
            raw,
            is_enum,
        })
    }

    fn collect_inline_ref(
        &self,
        line: &Expr,
        schema_name: &Option<String>,
        table_name: &str,
        refs: &mut Vec<Ref>,
    ) {
        let Expr::FunctionApplication(app) = line else {
            return;
        };
        let Expr::Variable(column) = app.callee.as_ref() else {
            return;
        };
        let settings = app.args.iter().find_map(|arg| match arg {
            Expr::List(list) => Some(list.items.as_slice()),
            _ => None,
        });
        let Some(Expr::Prefix(prefix)) = setting_expr(settings.unwrap_or(&[]), "ref") else {
            return;
        };
        let Some(relation) = relation_of(prefix.op) else {
            return;
        };
        let Some((table_path, columns, node)) = binder::destructure_ref_endpoint(&prefix.expr)
        else {
            return;
        };
        let this_end = RefEndpoint {
            schema_name: schema_name.clone(),
            table_name: table_name.to_owned(),
            column_names: vec![column.name()],
        };
        refs.push(Ref {
            name: None,
            endpoints: [this_end, self.endpoint(table_path, columns, node)],
            relation,
            on_delete: None,
            on_update: None,
        });
    }

    /// Ref endpoint with the table spelled canonically; alias-spelled paths
    /// resolve through the binding when one exists.
    fn endpoint(
        &self,
        table_path: Vec<String>,
        column_names: Vec<String>,
        node: NodeId,
    ) -> RefEndpoint {
        if let Some(&idx) = self.analysis.node_symbols.get(&node)
            && let Some(symbol) = self.analysis.symbols.get(idx)
            && symbol.kind == binder::SymbolKind::Table
        {
            return RefEndpoint {
                schema_name: self.analysis.schema_name_of(idx),
                table_name: symbol.name.clone(),
                column_names,
            };
        }
        endpoint_of(table_path, column_names)
    }

    fn interpret_indexes(&self, element: &ElementNode) -> Vec<IndexDef> {
        let ElementBody::Block(block) = &element.body else {
            return Vec::new();
        };
        let mut indexes = Vec::new();
        for item in &block.items {
            let BlockItem::Line(expr) = item else { continue };
            let (target, settings): (&Expr, &[SettingItem]) = match expr {
                Expr::FunctionApplication(app) => {
                    let settings = app
                        .args
                        .iter()
                        .find_map(|arg| match arg {
                            Expr::List(list) => Some(list.items.as_slice()),
                            _ => None,
                        })
                        .unwrap_or(&[]);
                    (app.callee.as_ref(), settings)
                }
                other => (other, &[]),
            };
            let columns = match index_columns(target) {
                Some(columns) => columns,
                None => continue,
            };
            indexes.push(IndexDef {
                columns,
                pk: setting_flag(settings, "pk"),
                unique: setting_flag(settings, "unique"),
                name: setting_string(settings, "name"),
                note: setting_string(settings, "note"),
                r#type: binder::normalized_words(setting_expr(settings, "type")),
            });
        }
        indexes
    }

    fn interpret_enum(&self, element: &ElementNode) -> Option<Enum> {
        let (schema_name, name) = self.element_name(element)?;
        let mut enum_def = Enum {
            schema_name,
            name,
            values: Vec::new(),
        };
        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                let BlockItem::Line(expr) = item else { continue };
                let (value_name, settings) = match expr {
                    Expr::Variable(v) => (v.name(), None),
                    Expr::FunctionApplication(app) => {
                        let name = match app.callee.as_ref() {
                            Expr::Variable(v) => v.name(),
                            _ => continue,
                        };
                        let settings = app.args.iter().find_map(|arg| match arg {
                            Expr::List(list) => Some(list.items.as_slice()),
                            _ => None,
                        });
                        (name, settings)
                    }
                    _ => continue,
                };
                enum_def.values.push(EnumValue {
                    name: value_name,
                    note: setting_string(settings.unwrap_or(&[]), "note"),
                });
            }
        }
        Some(enum_def)
    }

    fn interpret_ref(&self, element: &ElementNode, refs: &mut Vec<Ref>) {
        let name = element
            .name
            .as_ref()
            .and_then(|n| n.name_parts())
            .and_then(|mut p| (p.len() == 1).then(|| p.remove(0)));
        let settings = setting_items(element);
        let on_delete = binder::normalized_words(setting_expr(settings, "delete"));
        let on_update = binder::normalized_words(setting_expr(settings, "update"));

        let lines: Vec<&Expr> = match &element.body {
            ElementBody::Simple(expr) => vec![expr],
            ElementBody::Block(block) => block
                .items
                .iter()
                .filter_map(|item| match item {
                    BlockItem::Line(expr) => Some(expr),
                    _ => None,
                })
                .collect(),
            ElementBody::None => Vec::new(),
        };
        for line in lines {
            let Expr::Infix(infix) = line else { continue };
            let Some(relation) = relation_of(infix.op) else {
                continue;
            };
            let left = binder::destructure_ref_endpoint(&infix.left);
            let right = binder::destructure_ref_endpoint(&infix.right);
            if let (Some((lt, lc, ln)), Some((rt, rc, rn))) = (left, right) {
                refs.push(Ref {
                    name: name.clone(),
                    endpoints: [self.endpoint(lt, lc, ln), self.endpoint(rt, rc, rn)],
                    relation,
                    on_delete: on_delete.clone(),
                    on_update: on_update.clone(),
                });
            }
        }
    }

    fn interpret_table_group(&self, element: &ElementNode) -> Option<TableGroup> {
        let (_, name) = self.element_name(element)?;
        let settings = setting_items(element);
        let mut group = TableGroup {
            name,
            note: setting_string(settings, "note"),
            color: setting_color(settings),
            members: Vec::new(),
        };
        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                match item {
                    BlockItem::Line(expr) => {
                        let Some(mut parts) = expr.name_parts().filter(|p| p.len() <= 2) else {
                            continue;
                        };
                        let (schema_name, table_name) = match parts.len() {
                            1 => (None, parts.remove(0)),
                            _ => {
                                let table = parts.remove(1);
                                (normalize_schema(parts.remove(0)), table)
                            }
                        };
                        group.members.push(TableGroupMember {
                            schema_name,
                            table_name,
                        });
                    }
                    BlockItem::Field(field)
                        if field.name.value().eq_ignore_ascii_case("note") =>
                    {
                        if let Some(text) = string_of(&field.value) {
                            group.note = Some(text);
                        }
                    }
                    BlockItem::SubElement(sub) if sub.kind == ElementKind::Note => {
                        if let Some(text) = note_content(sub) {
                            group.note = Some(text);
                        }
                    }
                    _ => {}
                }
            }
        }
        Some(group)
    }

    fn interpret_project(&self, element: &ElementNode) -> Project {
        let mut project = Project {
            name: element
                .name
                .as_ref()
                .and_then(|n| n.name_parts())
                .map(|p| p.join(".")),
            note: None,
            fields: IndexMap::new(),
        };
        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                match item {
                    BlockItem::Field(field) => {
                        let key = field.name.value();
                        let Expr::Literal(literal) = &field.value else {
                            continue;
                        };
                        let value = literal.token.value();
                        if key.eq_ignore_ascii_case("note") {
                            project.note = Some(value);
                        } else {
                            project.fields.insert(key, value);
                        }
                    }
                    BlockItem::SubElement(sub) if sub.kind == ElementKind::Note => {
                        if let Some(text) = note_content(sub) {
                            project.note = Some(text);
                        }
                    }
                    _ => {}
                }
            }
        }
        project
    }
}

/// `public` is the implicit default; we store it as absent so qualified and
/// unqualified spellings of the same table compare equal.
fn normalize_schema(schema: String) -> Option<String> {
    if schema == DEFAULT_SCHEMA {
        None
    } else {
        Some(schema)
    }
}

fn endpoint_of(mut table_path: Vec<String>, column_names: Vec<String>) -> RefEndpoint {
    let (schema_name, table_name) = match table_path.len() {
        1 => (None, table_path.remove(0)),
        _ => {
            let table = table_path.remove(1);
            (normalize_schema(table_path.remove(0)), table)
        }
    };
    RefEndpoint {
        schema_name,
        table_name,
        column_names,
    }
}

fn relation_of(op: Operator) -> Option<Relation> {
    match op {
        Operator::Less => Some(Relation::OneToMany),
        Operator::Greater => Some(Relation::ManyToOne),
        Operator::Minus => Some(Relation::OneToOne),
        Operator::LessGreater => Some(Relation::ManyToMany),
        _ => None,
    }
}

fn index_columns(target: &Expr) -> Option<Vec<IndexColumn>> {
    match target {
        Expr::Variable(v) => Some(vec![IndexColumn {
            kind: IndexColumnKind::Column,
            value: v.name(),
        }]),
        Expr::FunctionLiteral(f) => Some(vec![IndexColumn {
            kind: IndexColumnKind::Expression,
            value: f.token.value(),
        }]),
        Expr::Tuple(tuple) => tuple
            .items
            .iter()
            .map(|member| match member {
                Expr::Variable(v) => Some(IndexColumn {
                    kind: IndexColumnKind::Column,
                    value: v.name(),
                }),
                Expr::FunctionLiteral(f) => Some(IndexColumn {
                    kind: IndexColumnKind::Expression,
                    value: f.token.value(),
                }),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn default_value(expr: &Expr) -> Option<DefaultValue> {
    match expr {
        Expr::Literal(literal) => {
            let kind = match literal.kind {
                LiteralKind::Number => DefaultKind::Number,
                LiteralKind::String => DefaultKind::String,
                LiteralKind::Boolean => DefaultKind::Boolean,
                LiteralKind::Null => DefaultKind::Null,
            };
            Some(DefaultValue {
                kind,
                value: literal.token.value(),
            })
        }
        Expr::FunctionLiteral(function) => Some(DefaultValue {
            kind: DefaultKind::Expression,
            value: function.token.value(),
        }),
        Expr::Prefix(prefix) if matches!(prefix.op, Operator::Minus | Operator::Plus) => {
            let Expr::Literal(literal) = prefix.expr.as_ref() else {
                return None;
            };
            Some(DefaultValue {
                kind: DefaultKind::Number,
                value: format!("{}{}", prefix.op.as_str(), literal.token.value()),
            })
        }
        _ => None,
    }
}

fn note_content(element: &ElementNode) -> Option<String> {
    match &element.body {
        ElementBody::Simple(expr) => string_of(expr),
        ElementBody::Block(block) => block.items.iter().find_map(|item| match item {
            BlockItem::Line(expr) => string_of(expr),
            _ => None,
        }),
        ElementBody::None => None,
    }
}

fn string_of(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(literal) if literal.kind == LiteralKind::String => {
            Some(literal.token.value())
        }
        _ => None,
    }
}

fn setting_items(element: &ElementNode) -> &[SettingItem] {
    element
        .settings
        .as_ref()
        .map(|list| list.items.as_slice())
        .unwrap_or(&[])
}

fn setting_expr<'e>(items: &'e [SettingItem], name: &str) -> Option<&'e Expr> {
    items
        .iter()
        .find(|item| item.name == name)
        .and_then(|item| item.value.as_ref())
}

fn setting_flag(items: &[SettingItem], name: &str) -> bool {
    items.iter().any(|item| item.name == name)
}

fn setting_string(items: &[SettingItem], name: &str) -> Option<String> {
    setting_expr(items, name).and_then(string_of)
}

/// Color settings accept both `#8e44ad` identifiers and quoted strings.
fn setting_color(items: &[SettingItem]) -> Option<String> {
    let expr = setting_expr(items, "headercolor").or_else(|| setting_expr(items, "color"))?;
    match expr {
        Expr::Variable(v) => Some(v.name()),
        other => string_of(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind;
    use crate::parser::parse_tokens;
    use crate::scanner::Scanner;

    fn interpret_source(source: &str) -> Database {
        let (tokens, _) = Scanner::new(source).scan();
        let (program, _) = parse_tokens(&tokens);
        let (analysis, _) = bind(&program);
        interpret(&program, &analysis, source)
    }

    #[test]
    fn table_with_settings_and_inline_ref() {
        let source = "\
Table users as U [headercolor: #3498DB] {
  id int [pk, increment]
  name varchar(255) [not null, default: 'anon']
  note: 'people'
}

Table posts {
  author_id int [ref: > users.id]
}
";
        let db = interpret_source(source);
        let users = db.table(None, "users").expect("users");
        assert_eq!(users.alias.as_deref(), Some("U"));
        assert_eq!(users.header_color.as_deref(), Some("#3498DB"));
        assert_eq!(users.note.as_deref(), Some("people"));
        assert_eq!(users.fields.len(), 2);
        assert!(users.fields[0].pk && users.fields[0].increment);
        assert_eq!(users.fields[1].r#type.name, "varchar");
        assert_eq!(users.fields[1].r#type.args, vec!["255"]);
        assert_eq!(
            users.fields[1].default.as_ref().map(|d| d.value.as_str()),
            Some("anon")
        );

        assert_eq!(db.refs.len(), 1);
        assert_eq!(db.refs[0].relation, Relation::ManyToOne);
        assert_eq!(db.refs[0].endpoints[0].table_name, "posts");
        assert_eq!(db.refs[0].endpoints[1].table_name, "users");
    }

    #[test]
    fn enum_typed_column_is_marked() {
        let source = "\
enum status {
  active [note: 'live']
  inactive
}

Table jobs {
  id int
  state status
}
";
        let db = interpret_source(source);
        let jobs = db.table(None, "jobs").expect("jobs");
        assert!(jobs.field("state").expect("state").r#type.is_enum);
        assert_eq!(db.enums[0].values[0].note.as_deref(), Some("live"));
    }

    #[test]
    fn partial_fields_merge_into_host_table() {
        let source = "\
TablePartial timestamps {
  created_at timestamp [default: `now()`]
}

Table events {
  id int [pk]
  ~timestamps
}
";
        let db = interpret_source(source);
        let events = db.table(None, "events").expect("events");
        let names: Vec<_> = events.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "created_at"]);
        assert_eq!(
            events.fields[1].default.as_ref().map(|d| d.kind),
            Some(DefaultKind::Expression)
        );
        assert_eq!(db.table_partials.len(), 1);
    }

    #[test]
    fn ref_element_with_actions() {
        let source = "\
Table a { id int }
Table b { a_id int }

Ref fk_b_a: b.a_id > a.id [delete: cascade, update: set null]
";
        let db = interpret_source(source);
        assert_eq!(db.refs.len(), 1);
        let r = &db.refs[0];
        assert_eq!(r.name.as_deref(), Some("fk_b_a"));
        assert_eq!(r.on_delete.as_deref(), Some("cascade"));
        assert_eq!(r.on_update.as_deref(), Some("set null"));
    }

    #[test]
    fn composite_index_and_project() {
        let source = "\
Project demo {
  database_type: 'PostgreSQL'
  note: 'sample'
}

Table t {
  a int
  b int

  indexes {
    (a, b) [pk]
    `a * 2` [name: 'expr_idx']
  }
}
";
        let db = interpret_source(source);
        let project = db.project.as_ref().expect("project");
        assert_eq!(project.fields.get("database_type").map(String::as_str), Some("PostgreSQL"));
        assert_eq!(project.note.as_deref(), Some("sample"));

        let t = db.table(None, "t").expect("t");
        assert_eq!(t.indexes.len(), 2);
        assert!(t.indexes[0].pk);
        assert_eq!(t.indexes[0].column_names(), Some(vec!["a".into(), "b".into()]));
        assert_eq!(t.indexes[1].column_names(), None);
        assert_eq!(t.indexes[1].name.as_deref(), Some("expr_idx"));
    }
}
