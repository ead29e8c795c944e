//! Source-text mutation helpers.
//!
//! Editors mutate the `.dbml` text, not the model: every helper here takes a
//! finished [`Compilation`] plus the change to make, and returns a new source
//! string. Callers recompile the result. Misuse (unknown table, row index out
//! of range, ragged rows) is an `anyhow` error, not a diagnostic.

use anyhow::{anyhow, bail, Result};

use crate::ast::{BlockItem, ElementBody, ElementKind, ElementNode, Expr, NodeId};
use crate::binder::SymbolKind;
use crate::compiler::Compilation;
use crate::database::DEFAULT_SCHEMA;
use crate::diagnostics::Span;

#[derive(Debug, Clone)]
pub struct TextEdit {
    pub span: Span,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(span: Span, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }

    pub fn insert(offset: usize, new_text: impl Into<String>) -> Self {
        Self::replace(Span::point(offset), new_text)
    }
}

/// A value to write into a records row.
#[derive(Debug, Clone)]
pub enum RecordValue {
    String(String),
    /// Rendered as written; the caller owns the numeric formatting.
    Number(String),
    Bool(bool),
    Null,
    /// Backtick expression like `now()`.
    Expression(String),
}

impl RecordValue {
    fn render(&self) -> String {
        match self {
            RecordValue::String(s) => {
                format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            RecordValue::Number(n) => n.clone(),
            RecordValue::Bool(b) => b.to_string(),
            RecordValue::Null => "null".to_owned(),
            RecordValue::Expression(e) => format!("`{e}`"),
        }
    }
}

/// Splices non-overlapping edits into `source`. Edits are applied in
/// reverse offset order so earlier offsets stay valid throughout.
pub fn apply_text_edits(source: &str, edits: &[TextEdit]) -> Result<String> {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| b.span.start.cmp(&a.span.start));
    for window in sorted.windows(2) {
        // window[0] starts at or after window[1]
        if window[1].span.end > window[0].span.start {
            bail!(
                "overlapping text edits at {}..{} and {}..{}",
                window[1].span.start,
                window[1].span.end,
                window[0].span.start,
                window[0].span.end
            );
        }
    }
    let mut result = source.to_owned();
    for edit in sorted {
        if edit.span.end > result.len() || !result.is_char_boundary(edit.span.start) {
            bail!("text edit out of bounds at {}..{}", edit.span.start, edit.span.end);
        }
        result.replace_range(edit.span.start..edit.span.end, &edit.new_text);
    }
    Ok(result)
}

/// Appends rows to the table's records. Rows land in an existing top-level
/// block with exactly these columns when one exists, otherwise a new block
/// is appended at the end of the file.
pub fn append_records(
    compilation: &Compilation,
    schema: Option<&str>,
    table: &str,
    columns: &[String],
    rows: &[Vec<RecordValue>],
) -> Result<String> {
    if columns.is_empty() {
        bail!("append_records needs at least one column");
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            bail!(
                "row {} has {} values for {} columns",
                i,
                row.len(),
                columns.len()
            );
        }
    }
    let rendered: String = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(RecordValue::render).collect();
            format!("  {}\n", values.join(", "))
        })
        .collect();

    let blocks = records_blocks(compilation, schema, table);
    let target = blocks.iter().find(|b| {
        b.top_level && b.explicit_columns.as_deref() == Some(columns)
    });
    let edit = match target {
        Some(block) => {
            let ElementBody::Block(body) = &block.element.body else {
                bail!("records block for `{table}` has no body");
            };
            // Just before the closing brace.
            TextEdit::insert(body.span.end.saturating_sub(1), rendered)
        }
        None => {
            let qualified = match schema {
                Some(schema) if schema != DEFAULT_SCHEMA => format!("{schema}.{table}"),
                _ => table.to_owned(),
            };
            let text = format!(
                "\nrecords {qualified}({}) {{\n{rendered}}}\n",
                columns.join(", ")
            );
            TextEdit::insert(compilation.source.len(), text)
        }
    };
    apply_text_edits(&compilation.source, &[edit])
}

/// Deletes one row (whole line) by its document-order index across every
/// records block of the table.
pub fn delete_record_row(
    compilation: &Compilation,
    schema: Option<&str>,
    table: &str,
    row_index: usize,
) -> Result<String> {
    let located = locate_row(compilation, schema, table, row_index)?;
    let span = line_span(&compilation.source, located.row.span());
    apply_text_edits(&compilation.source, &[TextEdit::replace(span, "")])
}

/// Replaces one cell with `null`.
pub fn delete_record_value(
    compilation: &Compilation,
    schema: Option<&str>,
    table: &str,
    row_index: usize,
    column: &str,
) -> Result<String> {
    update_record_field(compilation, schema, table, row_index, column, &RecordValue::Null)
}

/// Overwrites one cell with a new value.
pub fn update_record_field(
    compilation: &Compilation,
    schema: Option<&str>,
    table: &str,
    row_index: usize,
    column: &str,
    value: &RecordValue,
) -> Result<String> {
    let located = locate_row(compilation, schema, table, row_index)?;
    let position = located
        .columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| {
            anyhow!("the records block holding row {row_index} does not cover column `{column}`")
        })?;
    let cells: Vec<&Expr> = match located.row {
        Expr::Tuple(tuple) => tuple.items.iter().collect(),
        single => vec![single],
    };
    let cell = cells
        .get(position)
        .ok_or_else(|| anyhow!("row {row_index} has no value at position {position}"))?;
    apply_text_edits(
        &compilation.source,
        &[TextEdit::replace(cell.span(), value.render())],
    )
}

/// Removes every records block (top-level and nested) for the table.
pub fn remove_all_records(
    compilation: &Compilation,
    schema: Option<&str>,
    table: &str,
) -> Result<String> {
    let blocks = records_blocks(compilation, schema, table);
    let edits: Vec<TextEdit> = blocks
        .iter()
        .map(|block| TextEdit::replace(line_span(&compilation.source, block.element.span), ""))
        .collect();
    apply_text_edits(&compilation.source, &edits)
}

/// Renames a table at its declaration and every resolved reference site
/// (ref endpoints, records headers, table groups), including sites that
/// spelled the table through its alias.
pub fn rename_table(
    compilation: &Compilation,
    schema: Option<&str>,
    old_name: &str,
    new_name: &str,
) -> Result<String> {
    if new_name.is_empty() {
        bail!("new table name is empty");
    }
    let symbol_idx = compilation
        .analysis
        .find_table(schema, old_name)
        .ok_or_else(|| anyhow!("table `{old_name}` not found"))?;
    let symbol = &compilation.analysis.symbols[symbol_idx];
    if symbol.kind != SymbolKind::Table {
        bail!("`{old_name}` is not a table");
    }

    let spans = expr_spans(compilation);
    let mut edits: Vec<TextEdit> = Vec::new();
    for reference in &symbol.references {
        if let Some(span) = spans.get(reference) {
            edits.push(TextEdit::replace(*span, new_name));
        }
    }
    if let Some(decl_node) = symbol.decl_node
        && let Some(element) = compilation.program.elements.iter().find(|e| e.id == decl_node)
        && let Some(vars) = element.name.as_ref().and_then(|n| n.path_variables())
        && let Some(last) = vars.last()
    {
        edits.push(TextEdit::replace(last.span, new_name));
    }
    apply_text_edits(&compilation.source, &edits)
}

struct RecordsBlock<'a> {
    element: &'a ElementNode,
    top_level: bool,
    /// Column list as written in the header, `None` when the block covers
    /// every table column.
    explicit_columns: Option<Vec<String>>,
    columns: Vec<String>,
    rows: Vec<&'a Expr>,
}

struct LocatedRow<'a> {
    row: &'a Expr,
    columns: Vec<String>,
}

/// Records blocks bound to one table, in document order.
fn records_blocks<'a>(
    compilation: &'a Compilation,
    schema: Option<&str>,
    table: &str,
) -> Vec<RecordsBlock<'a>> {
    let mut blocks = Vec::new();
    let all_columns: Vec<String> = compilation
        .database
        .table(schema, table)
        .map(|t| t.fields.iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default();

    let mut push = |element: &'a ElementNode, top_level: bool, blocks: &mut Vec<RecordsBlock<'a>>| {
        if !block_matches(compilation, element, schema, table) {
            return;
        }
        let explicit_columns: Option<Vec<String>> = element.args.as_ref().map(|args| {
            args.items
                .iter()
                .filter_map(|arg| match arg {
                    Expr::Variable(v) => Some(v.name()),
                    _ => None,
                })
                .collect()
        });
        let columns = explicit_columns.clone().unwrap_or_else(|| all_columns.clone());
        let rows = match &element.body {
            ElementBody::Block(block) => block
                .items
                .iter()
                .filter_map(|item| match item {
                    BlockItem::Line(expr) => Some(expr),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        blocks.push(RecordsBlock {
            element,
            top_level,
            explicit_columns,
            columns,
            rows,
        });
    };

    for element in &compilation.program.elements {
        match element.kind {
            ElementKind::Records => push(element, true, &mut blocks),
            ElementKind::Table => {
                if let ElementBody::Block(block) = &element.body {
                    for item in &block.items {
                        if let BlockItem::SubElement(sub) = item
                            && sub.kind == ElementKind::Records
                        {
                            push(sub, false, &mut blocks);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    blocks
}

fn block_matches(
    compilation: &Compilation,
    element: &ElementNode,
    schema: Option<&str>,
    table: &str,
) -> bool {
    let Some(symbol) = compilation.analysis.symbol_of(element.id) else {
        return false;
    };
    if symbol.kind != SymbolKind::Table || symbol.name != table {
        return false;
    }
    let bound_schema = compilation
        .analysis
        .node_symbols
        .get(&element.id)
        .and_then(|&idx| compilation.analysis.schema_name_of(idx));
    bound_schema.as_deref().unwrap_or(DEFAULT_SCHEMA) == schema.unwrap_or(DEFAULT_SCHEMA)
}

fn locate_row<'a>(
    compilation: &'a Compilation,
    schema: Option<&str>,
    table: &str,
    row_index: usize,
) -> Result<LocatedRow<'a>> {
    let blocks = records_blocks(compilation, schema, table);
    let mut seen = 0usize;
    for block in &blocks {
        if row_index < seen + block.rows.len() {
            return Ok(LocatedRow {
                row: block.rows[row_index - seen],
                columns: block.columns.clone(),
            });
        }
        seen += block.rows.len();
    }
    bail!("row {row_index} out of range for table `{table}` ({seen} rows)")
}

/// Widens a span to cover its whole line(s), trailing newline included.
fn line_span(source: &str, span: Span) -> Span {
    let bytes = source.as_bytes();
    let mut start = span.start.min(source.len());
    while start > 0 && bytes[start - 1] != b'\n' {
        start -= 1;
    }
    let mut end = span.end.min(source.len());
    while end < source.len() && bytes[end] != b'\n' {
        end += 1;
    }
    if end < source.len() {
        end += 1;
    }
    Span::new(start, end)
}

/// Span of every expression node, for turning recorded symbol references
/// back into editable source ranges.
fn expr_spans(compilation: &Compilation) -> std::collections::HashMap<NodeId, Span> {
    let mut spans = std::collections::HashMap::new();
    for element in &compilation.program.elements {
        collect_element(element, &mut spans);
    }
    spans
}

fn collect_element(element: &ElementNode, spans: &mut std::collections::HashMap<NodeId, Span>) {
    if let Some(name) = &element.name {
        collect_expr(name, spans);
    }
    if let Some(args) = &element.args {
        for item in &args.items {
            collect_expr(item, spans);
        }
    }
    if let Some(settings) = &element.settings {
        for item in &settings.items {
            if let Some(value) = &item.value {
                collect_expr(value, spans);
            }
        }
    }
    match &element.body {
        ElementBody::Simple(expr) => collect_expr(expr, spans),
        ElementBody::Block(block) => {
            for item in &block.items {
                match item {
                    BlockItem::SubElement(sub) => collect_element(sub, spans),
                    BlockItem::Field(field) => collect_expr(&field.value, spans),
                    BlockItem::Line(expr) => collect_expr(expr, spans),
                }
            }
        }
        ElementBody::None => {}
    }
}

fn collect_expr(expr: &Expr, spans: &mut std::collections::HashMap<NodeId, Span>) {
    spans.insert(expr.id(), expr.span());
    match expr {
        Expr::Literal(_) | Expr::Variable(_) | Expr::FunctionLiteral(_) => {}
        Expr::Prefix(prefix) => collect_expr(&prefix.expr, spans),
        Expr::Infix(infix) => {
            collect_expr(&infix.left, spans);
            collect_expr(&infix.right, spans);
        }
        Expr::Access(access) => {
            collect_expr(&access.base, spans);
            collect_expr(&access.member, spans);
        }
        Expr::Call(call) => {
            collect_expr(&call.callee, spans);
            for arg in &call.args {
                collect_expr(arg, spans);
            }
        }
        Expr::List(list) => {
            for item in &list.items {
                if let Some(value) = &item.value {
                    collect_expr(value, spans);
                }
            }
        }
        Expr::Tuple(tuple) => {
            for item in &tuple.items {
                collect_expr(item, spans);
            }
        }
        Expr::Block(block) => {
            for item in &block.items {
                collect_expr(item, spans);
            }
        }
        Expr::FunctionApplication(app) => {
            collect_expr(&app.callee, spans);
            for arg in &app.args {
                collect_expr(arg, spans);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    #[test]
    fn apply_edits_in_reverse_order() {
        let edits = vec![
            TextEdit::replace(Span::new(0, 1), "X"),
            TextEdit::replace(Span::new(2, 3), "Y"),
        ];
        assert_eq!(apply_text_edits("abc", &edits).unwrap(), "XbY");
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let edits = vec![
            TextEdit::replace(Span::new(0, 2), "X"),
            TextEdit::replace(Span::new(1, 3), "Y"),
        ];
        assert!(apply_text_edits("abc", &edits).is_err());
    }

    #[test]
    fn append_into_matching_block() {
        let source = "\
Table t {
  id int
}

records t(id) {
  1
}
";
        let compilation = compile(source);
        let next = append_records(
            &compilation,
            None,
            "t",
            &["id".to_owned()],
            &[vec![RecordValue::Number("2".into())]],
        )
        .unwrap();
        assert!(next.contains("  1\n  2\n}"), "{next}");
        // And the result still compiles with both rows.
        let recompiled = compile(&next);
        assert_eq!(recompiled.database.records[0].values.len(), 2);
    }

    #[test]
    fn append_creates_block_when_columns_differ() {
        let source = "Table t {\n  id int\n  name varchar\n}\n";
        let compilation = compile(source);
        let next = append_records(
            &compilation,
            None,
            "t",
            &["id".to_owned(), "name".to_owned()],
            &[vec![
                RecordValue::Number("1".into()),
                RecordValue::String("it's".into()),
            ]],
        )
        .unwrap();
        assert!(next.contains("records t(id, name) {"), "{next}");
        assert!(next.contains(r"1, 'it\'s'"), "{next}");
    }

    #[test]
    fn delete_row_by_document_order() {
        let source = "\
Table t { id int }

records t(id) {
  1
  2
}

records t {
  3
}
";
        let compilation = compile(source);
        let next = delete_record_row(&compilation, None, "t", 2).unwrap();
        assert!(!next.contains('3'), "{next}");
        assert!(next.contains('2'));
    }

    #[test]
    fn update_and_delete_value() {
        let source = "Table t { id int\n note varchar }\n\nrecords t(id, note) {\n  1, 'old'\n}\n";
        let compilation = compile(source);
        let next = update_record_field(
            &compilation,
            None,
            "t",
            0,
            "note",
            &RecordValue::String("new".into()),
        )
        .unwrap();
        assert!(next.contains("1, 'new'"), "{next}");

        let cleared = delete_record_value(&compilation, None, "t", 0, "note").unwrap();
        assert!(cleared.contains("1, null"), "{cleared}");
    }

    #[test]
    fn rename_table_rewrites_declaration_and_references() {
        let source = "\
Table users {
  id int [pk]
}

Table posts {
  author_id int [ref: > users.id]
}

records users(id) {
  1
}
";
        let compilation = compile(source);
        let next = rename_table(&compilation, None, "users", "people").unwrap();
        assert!(next.contains("Table people {"), "{next}");
        assert!(next.contains("ref: > people.id"), "{next}");
        assert!(next.contains("records people(id)"), "{next}");
        assert!(!next.contains("users"), "{next}");
    }

    #[test]
    fn remove_all_records_deletes_every_block() {
        let source = "\
Table t {
  id int

  records (id) {
    1
  }
}

records t(id) {
  2
}
";
        let compilation = compile(source);
        let next = remove_all_records(&compilation, None, "t").unwrap();
        assert!(!next.contains("records"), "{next}");
        assert!(next.contains("Table t"), "{next}");
    }
}
