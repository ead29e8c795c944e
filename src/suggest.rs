//! Cursor-position completion over a finished compilation.
//!
//! The provider works off the bound syntax tree plus the token stream: the
//! innermost element containing the cursor decides the context (records
//! column list, ref endpoint, column type position), and the database model
//! supplies the candidates.

use serde::Serialize;

use crate::ast::{BlockItem, ElementBody, ElementKind, ElementNode, TokenKind};
use crate::binder::SymbolKind;
use crate::compiler::Compilation;
use crate::database::Table;
use crate::diagnostics::line_col;

const TYPE_NAMES: &[&str] = &[
    "int", "integer", "bigint", "smallint", "serial", "varchar", "char", "text", "decimal",
    "numeric", "float", "double", "real", "boolean", "bool", "date", "time", "datetime",
    "timestamp", "timestamptz", "uuid", "json", "jsonb", "blob",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    Column,
    RefTarget,
    TypeName,
    EnumName,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionKind,
    /// Text to splice at the cursor; differs from `label` for `*`, which
    /// expands to the full column list.
    pub insert_text: String,
}

impl CompletionItem {
    fn plain(label: impl Into<String>, kind: CompletionKind) -> Self {
        let label = label.into();
        Self {
            insert_text: label.clone(),
            label,
            kind,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletionList {
    pub items: Vec<CompletionItem>,
}

pub fn suggest(compilation: &Compilation, offset: usize) -> CompletionList {
    let Some((element, host)) = innermost_element(compilation, offset) else {
        return CompletionList::default();
    };
    match element.kind {
        ElementKind::Records => {
            if element
                .args
                .as_ref()
                .map(|args| args.span.contains(offset))
                .unwrap_or(false)
            {
                return records_columns(compilation, element, host);
            }
            CompletionList::default()
        }
        ElementKind::Ref => ref_targets(compilation),
        ElementKind::Table | ElementKind::TablePartial => {
            if after_relation_operator(compilation, offset) {
                ref_targets(compilation)
            } else if in_type_position(compilation, offset) {
                type_names(compilation)
            } else {
                CompletionList::default()
            }
        }
        _ => CompletionList::default(),
    }
}

/// The innermost element whose span contains the cursor, along with the
/// enclosing table element for nested blocks.
fn innermost_element<'a>(
    compilation: &'a Compilation,
    offset: usize,
) -> Option<(&'a ElementNode, Option<&'a ElementNode>)> {
    let outer = compilation
        .program
        .elements
        .iter()
        .find(|e| e.span.contains(offset))?;
    if let ElementBody::Block(block) = &outer.body {
        for item in &block.items {
            if let BlockItem::SubElement(sub) = item
                && sub.span.contains(offset)
            {
                return Some((sub, Some(outer)));
            }
        }
    }
    Some((outer, None))
}

fn bound_table<'a>(
    compilation: &'a Compilation,
    element: &ElementNode,
    host: Option<&ElementNode>,
) -> Option<&'a Table> {
    let node = host.map(|h| h.id).unwrap_or(element.id);
    let symbol = compilation.analysis.symbol_of(node)?;
    if symbol.kind != SymbolKind::Table {
        return None;
    }
    let schema = compilation
        .analysis
        .node_symbols
        .get(&node)
        .and_then(|&idx| compilation.analysis.schema_name_of(idx));
    compilation.database.table(schema.as_deref(), &symbol.name)
}

fn records_columns(
    compilation: &Compilation,
    element: &ElementNode,
    host: Option<&ElementNode>,
) -> CompletionList {
    let Some(table) = bound_table(compilation, element, host) else {
        return CompletionList::default();
    };
    let all: Vec<String> = table.fields.iter().map(|f| f.name.clone()).collect();
    let mut items: Vec<CompletionItem> = all
        .iter()
        .map(|name| CompletionItem::plain(name, CompletionKind::Column))
        .collect();
    items.push(CompletionItem {
        label: "*".to_owned(),
        kind: CompletionKind::Column,
        insert_text: all.join(", "),
    });
    CompletionList { items }
}

fn ref_targets(compilation: &Compilation) -> CompletionList {
    let mut items = Vec::new();
    for table in &compilation.database.tables {
        for field in &table.fields {
            items.push(CompletionItem::plain(
                format!("{}.{}", table.qualified_name(), field.name),
                CompletionKind::RefTarget,
            ));
        }
    }
    CompletionList { items }
}

fn type_names(compilation: &Compilation) -> CompletionList {
    let mut items: Vec<CompletionItem> = TYPE_NAMES
        .iter()
        .map(|name| CompletionItem::plain(*name, CompletionKind::TypeName))
        .collect();
    for enum_def in &compilation.database.enums {
        let label = match &enum_def.schema_name {
            Some(schema) => format!("{schema}.{}", enum_def.name),
            None => enum_def.name.clone(),
        };
        items.push(CompletionItem::plain(label, CompletionKind::EnumName));
    }
    CompletionList { items }
}

/// The last token ending at or before the cursor.
fn previous_token(compilation: &Compilation, offset: usize) -> Option<&crate::ast::Token> {
    compilation
        .tokens
        .iter()
        .take_while(|t| t.span().end <= offset)
        .filter(|t| t.kind != TokenKind::Eof)
        .last()
}

fn after_relation_operator(compilation: &Compilation, offset: usize) -> bool {
    matches!(
        previous_token(compilation, offset).map(|t| &t.kind),
        Some(TokenKind::Less | TokenKind::Greater | TokenKind::Minus | TokenKind::LessGreater)
    )
}

/// One identifier alone before the cursor on the current line means the
/// cursor sits where a column type goes.
fn in_type_position(compilation: &Compilation, offset: usize) -> bool {
    let (cursor_line, _) = line_col(&compilation.source, offset);
    let before: Vec<_> = compilation
        .tokens
        .iter()
        .filter(|t| t.span().end <= offset && t.kind != TokenKind::Eof)
        .filter(|t| line_col(&compilation.source, t.offset).0 == cursor_line)
        .collect();
    matches!(
        before.as_slice(),
        [token] if matches!(token.kind, TokenKind::Identifier(_) | TokenKind::QuotedVariable(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    #[test]
    fn records_column_list_offers_columns_and_star() {
        let source = "\
Table t {
  id int
  name varchar
}

records t(id) {
  1
}
";
        let compilation = compile(source);
        let offset = source.find("(id)").unwrap() + 1;
        let list = suggest(&compilation, offset);
        let labels: Vec<_> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert!(labels.contains(&"id"));
        assert!(labels.contains(&"name"));
        let star = list.items.iter().find(|i| i.label == "*").unwrap();
        assert_eq!(star.insert_text, "id, name");
    }

    #[test]
    fn ref_body_offers_table_column_paths() {
        let source = "\
Table users { id int }
Table posts { author_id int }

Ref: posts.author_id > users.id
";
        let compilation = compile(source);
        let offset = source.rfind("users.id").unwrap();
        let list = suggest(&compilation, offset);
        assert!(
            list.items
                .iter()
                .any(|i| i.label == "users.id" && i.kind == CompletionKind::RefTarget)
        );
    }

    #[test]
    fn type_position_offers_types_and_enums() {
        let source = "\
enum status { active }

Table t {
  id int
  state status
}
";
        let compilation = compile(source);
        // Right after `state `, where the type goes.
        let offset = source.find("state ").unwrap() + "state ".len();
        let list = suggest(&compilation, offset);
        assert!(list.items.iter().any(|i| i.label == "varchar"));
        assert!(
            list.items
                .iter()
                .any(|i| i.label == "status" && i.kind == CompletionKind::EnumName)
        );
    }
}
