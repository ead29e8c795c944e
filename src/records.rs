//! Second interpretation pass: record blocks.
//!
//! Every `records` block (top-level or nested in a table) is merged into a
//! single [`TableRecord`] per table, cells are coerced against the column
//! types, and the table's constraints (primary key, unique, not null,
//! foreign keys) are checked across the merged rows. Rows keep document
//! order across blocks, so "row 3 of table t" means the same thing here and
//! in the source file.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;

use crate::ast::{
    BlockItem, ElementBody, ElementKind, ElementNode, Expr, LiteralKind, Operator, ProgramNode,
};
use crate::binder::{Analysis, SymbolKind};
use crate::database::{
    CellType, Database, DefaultKind, Field, RecordCell, Relation, Table, TableRecord,
};
use crate::diagnostics::{CompileErrorCode, Diagnostic, Span};

const INTEGER_TYPES: &[&str] = &[
    "int", "integer", "bigint", "smallint", "tinyint", "mediumint", "int2", "int4", "int8",
];
const FLOAT_TYPES: &[&str] = &["float", "double", "real", "float4", "float8"];
const DECIMAL_TYPES: &[&str] = &["decimal", "numeric"];
const BOOLEAN_TYPES: &[&str] = &["boolean", "bool"];
const DATETIME_TYPES: &[&str] = &["datetime", "timestamp", "timestamptz"];
const SIZED_STRING_TYPES: &[&str] = &["varchar", "char", "nvarchar", "nchar", "character varying"];

const TRUE_WORDS: &[&str] = &["true", "t", "yes", "y", "1"];
const FALSE_WORDS: &[&str] = &["false", "f", "no", "n", "0"];

/// Datetime fallbacks tried after RFC 3339, with and without a zone, plus
/// date-only and time-only spellings.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];
const TIME_FORMAT: &str = "%H:%M:%S%.f";

pub fn evaluate_records(
    program: &ProgramNode,
    analysis: &Analysis,
    database: &Database,
) -> (Vec<TableRecord>, Vec<Diagnostic>) {
    let mut engine = Engine {
        analysis,
        database,
        diagnostics: Vec::new(),
    };
    let checked = engine.evaluate(program);
    engine.check_foreign_keys(&checked);
    let records = checked.into_iter().map(|c| c.record).collect();
    (records, engine.diagnostics)
}

/// One raw `records` block before merging.
struct RawBlock<'a> {
    /// Explicit column list; `None` means every table column in order.
    columns: Option<Vec<String>>,
    rows: Vec<&'a Expr>,
    span: Span,
    top_level: bool,
}

struct CheckedTable {
    record: TableRecord,
    row_spans: Vec<Span>,
}

struct Engine<'a> {
    analysis: &'a Analysis,
    database: &'a Database,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Engine<'a> {
    fn error(&mut self, code: CompileErrorCode, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(code, span, message));
    }

    fn warning(&mut self, code: CompileErrorCode, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::warning(code, span, message));
    }

    fn evaluate(&mut self, program: &ProgramNode) -> Vec<CheckedTable> {
        let mut grouped: IndexMap<(Option<String>, String), Vec<RawBlock>> = IndexMap::new();
        for element in &program.elements {
            match element.kind {
                ElementKind::Records => {
                    if let Some(key) = self.records_table(element) {
                        grouped.entry(key).or_default().push(raw_block(element, true));
                    }
                }
                ElementKind::Table => {
                    let ElementBody::Block(block) = &element.body else {
                        continue;
                    };
                    for item in &block.items {
                        if let BlockItem::SubElement(sub) = item
                            && sub.kind == ElementKind::Records
                            && let Some(key) = self.records_table(sub)
                        {
                            grouped.entry(key).or_default().push(raw_block(sub, false));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut checked = Vec::new();
        for ((schema, table_name), blocks) in grouped {
            let Some(table) = self.database.table(schema.as_deref(), &table_name) else {
                continue;
            };
            if let Some(result) = self.evaluate_table(table, blocks) {
                checked.push(result);
            }
        }
        checked
    }

    /// The table a records element was bound to, or `None` when the binder
    /// could not resolve it.
    fn records_table(&self, element: &ElementNode) -> Option<(Option<String>, String)> {
        let symbol = self.analysis.symbol_of(element.id)?;
        if symbol.kind != SymbolKind::Table {
            return None;
        }
        let schema = self
            .analysis
            .node_symbols
            .get(&element.id)
            .and_then(|&idx| self.analysis.schema_name_of(idx));
        Some((schema, symbol.name.clone()))
    }

    fn evaluate_table(&mut self, table: &Table, blocks: Vec<RawBlock>) -> Option<CheckedTable> {
        let blocks = self.drop_duplicate_blocks(table, blocks);

        // Merged column list: union of block columns, in field order.
        let mut merged_columns: Vec<String> = Vec::new();
        for field in &table.fields {
            let used = blocks.iter().any(|b| match &b.columns {
                None => true,
                Some(cols) => cols.contains(&field.name),
            });
            if used {
                merged_columns.push(field.name.clone());
            }
        }

        let mut rows: Vec<Vec<RecordCell>> = Vec::new();
        let mut row_spans: Vec<Span> = Vec::new();
        for block in &blocks {
            let effective: Vec<&str> = match &block.columns {
                Some(cols) => cols.iter().map(String::as_str).collect(),
                None => table.fields.iter().map(|f| f.name.as_str()).collect(),
            };
            self.check_missing_pk_columns(table, &effective, block.span);
            for row in &block.rows {
                let cells = row_cells(row);
                if cells.len() != effective.len() {
                    self.error(
                        CompileErrorCode::RecordsArityMismatch,
                        row.span(),
                        format!(
                            "Expected {} values but got {} in records for table `{}`",
                            effective.len(),
                            cells.len(),
                            table.qualified_name()
                        ),
                    );
                    return None;
                }
                let mut out_row: Vec<RecordCell> = Vec::with_capacity(merged_columns.len());
                for column in &merged_columns {
                    let cell = match effective.iter().position(|c| c == column) {
                        Some(i) => {
                            let field = table.field(column);
                            match field {
                                Some(field) => self.coerce_cell(cells[i], field, table),
                                None => RecordCell::unknown(),
                            }
                        }
                        None => RecordCell::unknown(),
                    };
                    out_row.push(cell);
                }
                rows.push(out_row);
                row_spans.push(row.span());
            }
        }

        let record = TableRecord {
            schema_name: table.schema_name.clone(),
            table_name: table.name.clone(),
            columns: merged_columns,
            values: rows,
        };
        let checked = CheckedTable { record, row_spans };
        self.check_primary_key(table, &checked);
        self.check_unique(table, &checked);
        self.check_not_null(table, &checked);
        Some(checked)
    }

    /// Two top-level blocks for the same table with the same explicit column
    /// list are redundant at best and conflicting at worst; later ones are
    /// dropped. Nested blocks and blocks without a column list always merge.
    fn drop_duplicate_blocks<'b>(
        &mut self,
        table: &Table,
        blocks: Vec<RawBlock<'b>>,
    ) -> Vec<RawBlock<'b>> {
        let mut seen: Vec<Vec<String>> = Vec::new();
        let mut kept = Vec::new();
        for block in blocks {
            if block.top_level && let Some(columns) = &block.columns {
                if seen.contains(columns) {
                    self.error(
                        CompileErrorCode::DuplicateRecordsForTable,
                        block.span,
                        format!(
                            "table `{}` already has a records block with these columns",
                            table.qualified_name()
                        ),
                    );
                    continue;
                }
                seen.push(columns.clone());
            }
            kept.push(block);
        }
        kept
    }

    fn check_missing_pk_columns(&mut self, table: &Table, effective: &[&str], span: Span) {
        for name in pk_columns(table) {
            let Some(field) = table.field(&name) else { continue };
            if !effective.contains(&name.as_str()) && field.default.is_none() {
                self.error(
                    CompileErrorCode::MissingPrimaryKeyColumn,
                    span,
                    format!(
                        "primary key column `{name}` has no default and is not covered by this records block"
                    ),
                );
            }
        }
    }

    // ---------------------------------------------------------------
    // Cell coercion
    // ---------------------------------------------------------------

    fn coerce_cell(&mut self, expr: &Expr, field: &Field, table: &Table) -> RecordCell {
        let span = expr.span();
        let raw = match raw_value(expr) {
            Some(raw) => raw,
            None => {
                self.error(
                    CompileErrorCode::InvalidRecordValue,
                    span,
                    format!("invalid value for column `{}`", field.name),
                );
                return RecordCell::unknown();
            }
        };
        match raw {
            RawValue::Null => RecordCell::null(),
            RawValue::Backtick(text) => RecordCell {
                r#type: CellType::Expression,
                value: serde_json::Value::String(text),
            },
            RawValue::EnumAccess => self.coerce_enum_access(expr, field, span),
            other => {
                if field.r#type.is_enum {
                    return self.coerce_enum_word(other, field, span);
                }
                let type_name = field.r#type.name.as_str();
                if INTEGER_TYPES.contains(&type_name) {
                    self.coerce_integer(other, field, span)
                } else if DECIMAL_TYPES.contains(&type_name) {
                    self.coerce_decimal(other, field, span)
                } else if FLOAT_TYPES.contains(&type_name) {
                    self.coerce_float(other, field, span)
                } else if BOOLEAN_TYPES.contains(&type_name) {
                    self.coerce_boolean(other, field, span)
                } else if DATETIME_TYPES.contains(&type_name) {
                    self.coerce_datetime(other, field, span)
                } else if type_name == "date" {
                    self.coerce_date(other, field, span)
                } else if type_name == "time" {
                    self.coerce_time(other, field, span)
                } else if SIZED_STRING_TYPES.contains(&type_name) {
                    self.coerce_sized_string(other, field, table, span)
                } else {
                    untyped_cell(other)
                }
            }
        }
    }

    fn coerce_enum_access(&mut self, expr: &Expr, field: &Field, span: Span) -> RecordCell {
        let Some(symbol) = self.analysis.symbol_of(expr.id()) else {
            // Binder already reported the unresolved access.
            return RecordCell::unknown();
        };
        let value = symbol.name.clone();
        let parent_enum = symbol
            .owner
            .and_then(|idx| self.analysis.symbols.get(idx))
            .map(|s| s.name.clone());
        if !field.r#type.is_enum || parent_enum.as_deref() != Some(field.r#type.name.as_str()) {
            self.error(
                CompileErrorCode::InvalidRecordValue,
                span,
                format!(
                    "column `{}` has type `{}`, not enum `{}`",
                    field.name,
                    field.r#type.name,
                    parent_enum.as_deref().unwrap_or("?")
                ),
            );
            return RecordCell::unknown();
        }
        RecordCell {
            r#type: CellType::Enum,
            value: serde_json::Value::String(value),
        }
    }

    fn coerce_enum_word(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let text = match raw {
            RawValue::Word(w) | RawValue::Str(w) => w,
            RawValue::Number(n) => n,
            RawValue::Bool(b) => b.to_string(),
            _ => {
                self.error(
                    CompileErrorCode::InvalidRecordValue,
                    span,
                    format!("invalid value for enum column `{}`", field.name),
                );
                return RecordCell::unknown();
            }
        };
        let enum_def = self
            .database
            .enum_def(field.r#type.schema_name.as_deref(), &field.r#type.name);
        match enum_def {
            Some(enum_def) if enum_def.has_value(&text) => {
                if field.r#type.schema_name.is_some() {
                    self.warning(
                        CompileErrorCode::UnqualifiedEnumValue,
                        span,
                        format!(
                            "enum `{}.{}` values should be written qualified",
                            field.r#type.schema_name.as_deref().unwrap_or_default(),
                            field.r#type.name
                        ),
                    );
                }
                RecordCell {
                    r#type: CellType::Enum,
                    value: serde_json::Value::String(text),
                }
            }
            Some(enum_def) => {
                self.warning(
                    CompileErrorCode::EnumValueNotFound,
                    span,
                    format!("`{text}` is not a value of enum `{}`", enum_def.name),
                );
                RecordCell::unknown()
            }
            None => RecordCell::unknown(),
        }
    }

    fn coerce_integer(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let text = raw.text();
        match text.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.is_finite() => RecordCell {
                r#type: CellType::Integer,
                value: serde_json::Value::from(v as i64),
            },
            _ => {
                self.error(
                    CompileErrorCode::InvalidIntegerValue,
                    span,
                    format!("`{text}` is not a valid integer for column `{}`", field.name),
                );
                RecordCell::unknown()
            }
        }
    }

    fn coerce_decimal(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let text = raw.text();
        let Some((total, scale)) = decimal_digits(&text) else {
            self.error(
                CompileErrorCode::InvalidRecordValue,
                span,
                format!("`{text}` is not a valid decimal for column `{}`", field.name),
            );
            return RecordCell::unknown();
        };
        let precision: Option<usize> = field.r#type.args.first().and_then(|a| a.parse().ok());
        let max_scale: usize = field
            .r#type
            .args
            .get(1)
            .and_then(|a| a.parse().ok())
            .unwrap_or(0);
        if let Some(precision) = precision {
            if total > precision {
                self.error(
                    CompileErrorCode::NumericPrecisionExceeded,
                    span,
                    format!("expected at most {precision} total digits, got {total}"),
                );
                return RecordCell::unknown();
            }
            if scale > max_scale {
                self.error(
                    CompileErrorCode::NumericPrecisionExceeded,
                    span,
                    format!("expected at most {max_scale} fractional digits, got {scale}"),
                );
                return RecordCell::unknown();
            }
        }
        RecordCell {
            r#type: CellType::Decimal,
            value: serde_json::Value::String(text),
        }
    }

    fn coerce_float(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let text = raw.text();
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => RecordCell {
                r#type: CellType::Float,
                value: serde_json::Number::from_f64(v)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            },
            _ => {
                self.error(
                    CompileErrorCode::InvalidRecordValue,
                    span,
                    format!("`{text}` is not a valid number for column `{}`", field.name),
                );
                RecordCell::unknown()
            }
        }
    }

    fn coerce_boolean(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let value = match &raw {
            RawValue::Bool(b) => Some(*b),
            RawValue::Number(n) | RawValue::Str(n) | RawValue::Word(n) => {
                let lowered = n.to_lowercase();
                if TRUE_WORDS.contains(&lowered.as_str()) {
                    Some(true)
                } else if FALSE_WORDS.contains(&lowered.as_str()) {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        };
        match value {
            Some(b) => RecordCell {
                r#type: CellType::Boolean,
                value: serde_json::Value::Bool(b),
            },
            None => {
                self.error(
                    CompileErrorCode::InvalidBooleanValue,
                    span,
                    format!(
                        "`{}` is not a valid boolean for column `{}`",
                        raw.text(),
                        field.name
                    ),
                );
                RecordCell::unknown()
            }
        }
    }

    fn coerce_datetime(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let text = raw.text();
        match normalize_datetime(&text) {
            Some(normalized) => RecordCell {
                r#type: CellType::Datetime,
                value: serde_json::Value::String(normalized),
            },
            None => {
                self.error(
                    CompileErrorCode::InvalidDatetimeValue,
                    span,
                    format!("`{text}` is not a valid datetime for column `{}`", field.name),
                );
                RecordCell::unknown()
            }
        }
    }

    fn coerce_date(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let text = raw.text();
        match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
            Ok(date) => RecordCell {
                r#type: CellType::Datetime,
                value: serde_json::Value::String(date.format("%Y-%m-%d").to_string()),
            },
            Err(_) => {
                self.error(
                    CompileErrorCode::InvalidDatetimeValue,
                    span,
                    format!("`{text}` is not a valid date for column `{}`", field.name),
                );
                RecordCell::unknown()
            }
        }
    }

    fn coerce_time(&mut self, raw: RawValue, field: &Field, span: Span) -> RecordCell {
        let text = raw.text();
        match NaiveTime::parse_from_str(&text, TIME_FORMAT) {
            Ok(time) => RecordCell {
                r#type: CellType::Datetime,
                value: serde_json::Value::String(time.format("%H:%M:%S%.f").to_string()),
            },
            Err(_) => {
                self.error(
                    CompileErrorCode::InvalidDatetimeValue,
                    span,
                    format!("`{text}` is not a valid time for column `{}`", field.name),
                );
                RecordCell::unknown()
            }
        }
    }

    fn coerce_sized_string(
        &mut self,
        raw: RawValue,
        field: &Field,
        table: &Table,
        span: Span,
    ) -> RecordCell {
        let text = match raw {
            RawValue::Str(s) | RawValue::Word(s) | RawValue::Number(s) => s,
            RawValue::Bool(b) => b.to_string(),
            _ => {
                self.error(
                    CompileErrorCode::InvalidRecordValue,
                    span,
                    format!("invalid value for column `{}`", field.name),
                );
                return RecordCell::unknown();
            }
        };
        // Length limits count UTF-8 bytes, matching storage engines.
        if let Some(limit) = field.r#type.args.first().and_then(|a| a.parse::<usize>().ok())
            && text.len() > limit
        {
            self.warning(
                CompileErrorCode::StringLengthExceeded,
                span,
                format!(
                    "value for `{}.{}` exceeds {}({limit}): got {} bytes",
                    table.name,
                    field.name,
                    field.r#type.name,
                    text.len()
                ),
            );
        }
        RecordCell {
            r#type: CellType::String,
            value: serde_json::Value::String(text),
        }
    }

    // ---------------------------------------------------------------
    // Constraints
    // ---------------------------------------------------------------

    fn check_primary_key(&mut self, table: &Table, checked: &CheckedTable) {
        let pk = pk_columns(table);
        if pk.is_empty() {
            return;
        }
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        'rows: for (row_idx, span) in checked.row_spans.iter().enumerate() {
            let mut key = Vec::with_capacity(pk.len());
            for column in &pk {
                let part = match self.effective_key(table, checked, row_idx, column) {
                    EffectiveKey::Value(v) => v,
                    EffectiveKey::Null => {
                        // An explicit NULL resolves to the column default for
                        // duplicate comparison when one exists.
                        match default_key(table, column) {
                            Some(EffectiveKey::Value(v)) => v,
                            Some(EffectiveKey::Unknowable) => continue 'rows,
                            _ => {
                                let increment =
                                    table.field(column).map(|f| f.increment).unwrap_or(false);
                                if !increment {
                                    self.warning(
                                        CompileErrorCode::NullInPrimaryKey,
                                        *span,
                                        format!("primary key column `{column}` is NULL"),
                                    );
                                }
                                continue 'rows;
                            }
                        }
                    }
                    EffectiveKey::Unknowable => continue 'rows,
                };
                key.push(part);
            }
            if !seen.insert(key.clone()) {
                self.warning(
                    CompileErrorCode::DuplicatePrimaryKey,
                    *span,
                    format!(
                        "duplicate primary key ({}) in records for table `{}`",
                        key.join(", "),
                        table.qualified_name()
                    ),
                );
            }
        }
    }

    fn check_unique(&mut self, table: &Table, checked: &CheckedTable) {
        let mut keys: Vec<Vec<String>> = table
            .fields
            .iter()
            .filter(|f| f.unique)
            .map(|f| vec![f.name.clone()])
            .collect();
        for index in table.indexes.iter().filter(|i| i.unique) {
            if let Some(columns) = index.column_names() {
                keys.push(columns);
            }
        }
        for columns in keys {
            let mut seen: HashSet<Vec<String>> = HashSet::new();
            'rows: for (row_idx, span) in checked.row_spans.iter().enumerate() {
                let mut key = Vec::with_capacity(columns.len());
                for column in &columns {
                    match self.effective_key(table, checked, row_idx, column) {
                        EffectiveKey::Value(v) => key.push(v),
                        _ => continue 'rows,
                    }
                }
                if !seen.insert(key.clone()) {
                    self.warning(
                        CompileErrorCode::DuplicateUniqueValue,
                        *span,
                        format!(
                            "duplicate value ({}) for unique column(s) ({}) in table `{}`",
                            key.join(", "),
                            columns.join(", "),
                            table.qualified_name()
                        ),
                    );
                }
            }
        }
    }

    /// Only an explicit NULL violates NOT NULL; cells a block never set are
    /// left to the database's own defaulting.
    fn check_not_null(&mut self, table: &Table, checked: &CheckedTable) {
        for field in table.fields.iter().filter(|f| f.not_null) {
            let Some(position) = checked.record.columns.iter().position(|c| *c == field.name)
            else {
                continue;
            };
            for (row_idx, row) in checked.record.values.iter().enumerate() {
                if row[position].r#type == CellType::Null {
                    self.warning(
                        CompileErrorCode::NotNullViolated,
                        checked.row_spans[row_idx],
                        format!("column `{}` is NOT NULL but row sets it to NULL", field.name),
                    );
                }
            }
        }
    }

    fn check_foreign_keys(&mut self, checked: &[CheckedTable]) {
        for reference in &self.database.refs {
            let [ep0, ep1] = &reference.endpoints;
            match reference.relation {
                Relation::ManyToOne => self.check_fk_direction(checked, ep0, ep1),
                Relation::OneToMany => self.check_fk_direction(checked, ep1, ep0),
                Relation::OneToOne | Relation::ManyToMany => {
                    self.check_fk_direction(checked, ep0, ep1);
                    self.check_fk_direction(checked, ep1, ep0);
                }
            }
        }
    }

    fn check_fk_direction(
        &mut self,
        checked: &[CheckedTable],
        child: &crate::database::RefEndpoint,
        parent: &crate::database::RefEndpoint,
    ) {
        let Some(parent_table) = self
            .database
            .table(parent.schema_name.as_deref(), &parent.table_name)
        else {
            return;
        };
        let Some(child_table) = self
            .database
            .table(child.schema_name.as_deref(), &child.table_name)
        else {
            return;
        };
        // A parent with no sample rows cannot be checked against.
        let Some(parent_checked) = find_checked(checked, parent) else {
            return;
        };
        let Some(child_checked) = find_checked(checked, child) else {
            return;
        };

        let mut parent_keys: HashSet<Vec<String>> = HashSet::new();
        'rows: for row_idx in 0..parent_checked.record.values.len() {
            let mut key = Vec::with_capacity(parent.column_names.len());
            for column in &parent.column_names {
                match self.effective_key(parent_table, parent_checked, row_idx, column) {
                    EffectiveKey::Value(v) => key.push(v),
                    _ => continue 'rows,
                }
            }
            parent_keys.insert(key);
        }

        'rows: for (row_idx, span) in child_checked.row_spans.iter().enumerate() {
            let mut key = Vec::with_capacity(child.column_names.len());
            for column in &child.column_names {
                match self.effective_key(child_table, child_checked, row_idx, column) {
                    EffectiveKey::Value(v) => key.push(v),
                    _ => continue 'rows,
                }
            }
            if !parent_keys.contains(&key) {
                self.warning(
                    CompileErrorCode::ForeignKeyViolated,
                    *span,
                    format!(
                        "value ({}) in `{}`.({}) has no match in `{}`.({})",
                        key.join(", "),
                        child.qualified_name(),
                        child.column_names.join(", "),
                        parent.qualified_name(),
                        parent.column_names.join(", ")
                    ),
                );
            }
        }
    }

    /// The comparable key of one cell, falling back to the column default
    /// when the records blocks never set the column.
    fn effective_key(
        &self,
        table: &Table,
        checked: &CheckedTable,
        row_idx: usize,
        column: &str,
    ) -> EffectiveKey {
        if let Some(position) = checked.record.columns.iter().position(|c| c == column) {
            let cell = &checked.record.values[row_idx][position];
            return match cell.r#type {
                CellType::Null => EffectiveKey::Null,
                CellType::Unknown | CellType::Expression => EffectiveKey::Unknowable,
                _ => EffectiveKey::Value(cell.value.to_string()),
            };
        }
        default_key(table, column).unwrap_or(EffectiveKey::Unknowable)
    }
}

/// The comparable key a column default contributes; `None` when the column
/// has no default at all.
fn default_key(table: &Table, column: &str) -> Option<EffectiveKey> {
    let default = table.field(column)?.default.as_ref()?;
    Some(match default.kind {
        DefaultKind::Null => EffectiveKey::Null,
        DefaultKind::Expression => EffectiveKey::Unknowable,
        DefaultKind::String => {
            EffectiveKey::Value(serde_json::Value::String(default.value.clone()).to_string())
        }
        DefaultKind::Number => match default.value.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 => {
                EffectiveKey::Value(serde_json::Value::from(v as i64).to_string())
            }
            Ok(v) => EffectiveKey::Value(
                serde_json::Number::from_f64(v)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
                    .to_string(),
            ),
            Err(_) => EffectiveKey::Unknowable,
        },
        DefaultKind::Boolean => {
            EffectiveKey::Value(serde_json::Value::Bool(default.value == "true").to_string())
        }
    })
}

enum EffectiveKey {
    Value(String),
    Null,
    Unknowable,
}

fn find_checked<'c>(
    checked: &'c [CheckedTable],
    endpoint: &crate::database::RefEndpoint,
) -> Option<&'c CheckedTable> {
    checked.iter().find(|c| {
        c.record.table_name == endpoint.table_name
            && c.record.schema_name.as_deref().unwrap_or(crate::database::DEFAULT_SCHEMA)
                == endpoint
                    .schema_name
                    .as_deref()
                    .unwrap_or(crate::database::DEFAULT_SCHEMA)
    })
}

fn raw_block(element: &ElementNode, top_level: bool) -> RawBlock<'_> {
    let columns = element.args.as_ref().map(|args| {
        args.items
            .iter()
            .filter_map(|arg| match arg {
                Expr::Variable(v) => Some(v.name()),
                _ => None,
            })
            .collect()
    });
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
    RawBlock {
        columns,
        rows,
        span: element.span,
        top_level,
    }
}

fn row_cells(row: &Expr) -> Vec<&Expr> {
    match row {
        Expr::Tuple(tuple) => tuple.items.iter().collect(),
        single => vec![single],
    }
}

/// The composite primary key of a table: `[pk]` columns plus any
/// `indexes { ... [pk] }` columns, deduplicated in field order.
fn pk_columns(table: &Table) -> Vec<String> {
    let mut columns: Vec<String> = table
        .fields
        .iter()
        .filter(|f| f.pk)
        .map(|f| f.name.clone())
        .collect();
    for index in table.indexes.iter().filter(|i| i.pk) {
        if let Some(names) = index.column_names() {
            for name in names {
                if !columns.contains(&name) {
                    columns.push(name);
                }
            }
        }
    }
    columns
}

enum RawValue {
    Number(String),
    Str(String),
    Bool(bool),
    Word(String),
    Backtick(String),
    EnumAccess,
    Null,
}

impl RawValue {
    fn text(&self) -> String {
        match self {
            RawValue::Number(s) | RawValue::Str(s) | RawValue::Word(s) | RawValue::Backtick(s) => {
                s.clone()
            }
            RawValue::Bool(b) => b.to_string(),
            RawValue::EnumAccess => String::new(),
            RawValue::Null => "null".to_owned(),
        }
    }
}

fn raw_value(expr: &Expr) -> Option<RawValue> {
    match expr {
        Expr::Literal(literal) => Some(match literal.kind {
            LiteralKind::Number => RawValue::Number(literal.token.value()),
            LiteralKind::String => RawValue::Str(literal.token.value()),
            LiteralKind::Boolean => RawValue::Bool(literal.token.value() == "true"),
            LiteralKind::Null => RawValue::Null,
        }),
        Expr::Variable(v) => Some(RawValue::Word(v.name())),
        Expr::FunctionLiteral(f) => Some(RawValue::Backtick(f.token.value())),
        Expr::Access(_) => Some(RawValue::EnumAccess),
        Expr::Prefix(prefix) if matches!(prefix.op, Operator::Minus | Operator::Plus) => {
            match prefix.expr.as_ref() {
                Expr::Literal(literal) if literal.kind == LiteralKind::Number => {
                    let sign = if prefix.op == Operator::Minus { "-" } else { "" };
                    Some(RawValue::Number(format!("{sign}{}", literal.token.value())))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn untyped_cell(raw: RawValue) -> RecordCell {
    match raw {
        RawValue::Number(text) => match text.parse::<f64>() {
            Ok(v) if v.fract() == 0.0 && v.is_finite() => RecordCell {
                r#type: CellType::Integer,
                value: serde_json::Value::from(v as i64),
            },
            Ok(v) => RecordCell {
                r#type: CellType::Float,
                value: serde_json::Number::from_f64(v)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            },
            Err(_) => RecordCell {
                r#type: CellType::String,
                value: serde_json::Value::String(text),
            },
        },
        RawValue::Str(text) | RawValue::Word(text) => RecordCell {
            r#type: CellType::String,
            value: serde_json::Value::String(text),
        },
        RawValue::Bool(b) => RecordCell {
            r#type: CellType::Boolean,
            value: serde_json::Value::Bool(b),
        },
        RawValue::Backtick(text) => RecordCell {
            r#type: CellType::Expression,
            value: serde_json::Value::String(text),
        },
        RawValue::EnumAccess | RawValue::Null => RecordCell::null(),
    }
}

/// Total and fractional digit counts of a numeric literal, scientific
/// notation expanded. `1.5e2` is `150`: three total digits, zero fractional.
fn decimal_digits(text: &str) -> Option<(usize, usize)> {
    text.parse::<f64>().ok()?;
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(i) => (&unsigned[..i], unsigned[i + 1..].parse::<i32>().ok()?),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
        None => (mantissa, ""),
    };
    let digits: String = format!("{int_part}{frac_part}");
    let mut dot = int_part.len() as i32 + exponent;
    let mut digits: Vec<u8> = digits.bytes().collect();
    while dot < 0 {
        digits.insert(0, b'0');
        dot += 1;
    }
    while (dot as usize) > digits.len() {
        digits.push(b'0');
    }
    let (int_digits, frac_digits) = digits.split_at(dot as usize);
    let int_trimmed: Vec<u8> = int_digits.iter().copied().skip_while(|b| *b == b'0').collect();
    let frac_trimmed: Vec<u8> = {
        let mut f: Vec<u8> = frac_digits.to_vec();
        while f.last() == Some(&b'0') {
            f.pop();
        }
        f
    };
    Some((int_trimmed.len() + frac_trimmed.len(), frac_trimmed.len()))
}

/// Parses a datetime in RFC 3339 or one of the fallback formats and
/// renders it back as RFC 3339. Naive timestamps are taken as UTC.
fn normalize_datetime(text: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.to_rfc3339());
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.to_rfc3339());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().to_rfc3339());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_time(NaiveTime::MIN).and_utc().to_rfc3339());
        }
    }
    // Time-only values get the epoch date.
    if let Ok(time) = NaiveTime::parse_from_str(text, TIME_FORMAT) {
        return Some(NaiveDate::default().and_time(time).and_utc().to_rfc3339());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_digit_counting_expands_scientific_notation() {
        assert_eq!(decimal_digits("12.34"), Some((4, 2)));
        assert_eq!(decimal_digits("1.5e2"), Some((3, 0)));
        assert_eq!(decimal_digits("1e-2"), Some((2, 2)));
        assert_eq!(decimal_digits("-0.50"), Some((1, 1)));
        assert_eq!(decimal_digits("abc"), None);
    }

    #[test]
    fn datetime_normalization_accepts_fallback_formats() {
        assert_eq!(
            normalize_datetime("2024-01-02T03:04:05Z").as_deref(),
            Some("2024-01-02T03:04:05+00:00")
        );
        assert!(normalize_datetime("2024-01-02 03:04:05 +0100").is_some());
        assert_eq!(
            normalize_datetime("2024-01-02 03:04:05").as_deref(),
            Some("2024-01-02T03:04:05+00:00")
        );
        assert!(normalize_datetime("yesterday").is_none());
    }

    #[test]
    fn datetime_normalization_accepts_date_and_time_only() {
        assert_eq!(
            normalize_datetime("2024-01-02").as_deref(),
            Some("2024-01-02T00:00:00+00:00")
        );
        // Day-first wins for slashed dates; month-first still parses when
        // the day field cannot be a month.
        assert_eq!(
            normalize_datetime("02/03/2024").as_deref(),
            Some("2024-03-02T00:00:00+00:00")
        );
        assert_eq!(
            normalize_datetime("01/13/2024").as_deref(),
            Some("2024-01-13T00:00:00+00:00")
        );
        assert_eq!(
            normalize_datetime("03:04:05").as_deref(),
            Some("1970-01-01T03:04:05+00:00")
        );
    }
}
