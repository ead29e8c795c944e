//! Name resolution and element validation.
//!
//! The binder walks the parsed program twice. The first walk declares
//! symbols (schemas, tables, columns, enums, enum values, table partials)
//! into arena-backed symbol tables. The second walk validates each element's
//! shape and settings, merges table-partial injections into per-table field
//! lists, and resolves every use site (ref endpoints, records columns, enum
//! accesses, table-group members) against the declared symbols. Resolution
//! failures produce diagnostics at the use site and never abort the walk, so
//! a broken name still yields bindings for everything around it.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::arena::{Arena, ArenaIndex};
use crate::ast::{
    BlockItem, BlockNode, ElementBody, ElementKind, ElementNode, Expr, LiteralKind, NodeId,
    Operator, ProgramNode, SettingItem,
};
use crate::database::DEFAULT_SCHEMA;
use crate::diagnostics::{CompileErrorCode, Diagnostic, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
    Schema,
    Table,
    Column,
    Enum,
    EnumValue,
    TablePartial,
    /// Column injected into a table by a `~partial` line.
    InjectedColumn,
}

impl SymbolKind {
    pub fn namespace(&self) -> Namespace {
        match self {
            SymbolKind::Schema => Namespace::Schema,
            SymbolKind::Table => Namespace::Table,
            SymbolKind::Column | SymbolKind::InjectedColumn => Namespace::Column,
            SymbolKind::Enum => Namespace::Enum,
            SymbolKind::EnumValue => Namespace::EnumValue,
            SymbolKind::TablePartial => Namespace::TablePartial,
        }
    }
}

/// Lookup namespace. Tables and enums may share a name inside one schema
/// without clashing, so keys carry the namespace next to the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Namespace {
    Schema,
    Table,
    Enum,
    TablePartial,
    Column,
    EnumValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolKey {
    pub namespace: Namespace,
    pub name: String,
}

impl SymbolKey {
    pub fn new(namespace: Namespace, name: &str) -> Self {
        Self {
            namespace,
            name: name.to_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    /// Enclosing symbol: schema for tables/enums/partials, table for
    /// columns, enum for enum values. `None` only for schemas.
    pub owner: Option<ArenaIndex>,
    /// Syntax node that declared this symbol.
    pub decl_node: Option<NodeId>,
    /// Child symbols, insertion-ordered.
    pub table: IndexMap<SymbolKey, ArenaIndex>,
    /// Use-site nodes (the exact name component) that resolved to this
    /// symbol. Drives rename edits.
    pub references: Vec<NodeId>,
}

impl Symbol {
    fn new(kind: SymbolKind, name: &str, owner: Option<ArenaIndex>, decl_node: Option<NodeId>) -> Self {
        Self {
            kind,
            name: name.to_owned(),
            owner,
            decl_node,
            table: IndexMap::new(),
            references: Vec::new(),
        }
    }
}

/// One entry of a table's merged field list: direct columns and columns
/// injected from partials, in final declaration order.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedField {
    pub name: String,
    /// The column declaration line (in the host table or in the partial).
    pub line_node: NodeId,
    /// False when the definition comes from an injected partial.
    pub from_host: bool,
}

/// Everything later passes need from binding: the symbol graph, the
/// node-to-symbol map for use sites, and per-table merged field lists
/// keyed by the table (or partial) element's node id.
#[derive(Debug, Default)]
pub struct Analysis {
    pub symbols: Arena<Symbol>,
    pub schemas: IndexMap<String, ArenaIndex>,
    pub node_symbols: HashMap<NodeId, ArenaIndex>,
    pub table_fields: HashMap<NodeId, Vec<ResolvedField>>,
}

impl Analysis {
    pub fn symbol_of(&self, node: NodeId) -> Option<&Symbol> {
        self.node_symbols.get(&node).and_then(|&i| self.symbols.get(i))
    }

    pub fn schema_symbol(&self, name: &str) -> Option<ArenaIndex> {
        self.schemas.get(name).copied()
    }

    pub fn find_table(&self, schema: Option<&str>, name: &str) -> Option<ArenaIndex> {
        let schema_idx = self.schema_symbol(schema.unwrap_or(DEFAULT_SCHEMA))?;
        self.symbols[schema_idx]
            .table
            .get(&SymbolKey::new(Namespace::Table, name))
            .copied()
    }

    /// Walks `owner` links up to the schema and returns its name, or
    /// `None` when the schema is the default one.
    pub fn schema_name_of(&self, index: ArenaIndex) -> Option<String> {
        let mut current = self.symbols.get(index)?;
        while let Some(owner) = current.owner {
            current = self.symbols.get(owner)?;
        }
        if current.kind == SymbolKind::Schema && current.name != DEFAULT_SCHEMA {
            Some(current.name.clone())
        } else {
            None
        }
    }
}

pub fn bind(program: &ProgramNode) -> (Analysis, Vec<Diagnostic>) {
    let mut binder = Binder::new(program);
    binder.declare_elements();
    binder.validate_and_resolve();
    log::debug!(
        "bound {} symbols across {} schemas with {} diagnostics",
        binder.analysis.symbols.len(),
        binder.analysis.schemas.len(),
        binder.diagnostics.len()
    );
    (binder.analysis, binder.diagnostics)
}

/// Splits a ref endpoint like `users.id`, `s.users.(a, b)` into the table
/// name path, the column names, and the variable node naming the table.
/// `None` when the expression is not endpoint-shaped.
pub fn destructure_ref_endpoint(expr: &Expr) -> Option<(Vec<String>, Vec<String>, NodeId)> {
    match expr {
        Expr::Access(access) => match access.member.as_ref() {
            Expr::Tuple(tuple) => {
                let table_vars = access.base.path_variables()?;
                if table_vars.is_empty() || table_vars.len() > 2 {
                    return None;
                }
                let columns = tuple
                    .items
                    .iter()
                    .map(|item| item.name_parts().filter(|p| p.len() == 1).map(|mut p| p.remove(0)))
                    .collect::<Option<Vec<_>>>()?;
                if columns.is_empty() {
                    return None;
                }
                let table_node = table_vars.last().map(|v| v.id)?;
                Some((
                    table_vars.iter().map(|v| v.name()).collect(),
                    columns,
                    table_node,
                ))
            }
            Expr::Variable(_) => {
                let vars = expr.path_variables()?;
                if vars.len() < 2 || vars.len() > 3 {
                    return None;
                }
                let column = vars.last()?.name();
                let table_vars = &vars[..vars.len() - 1];
                let table_node = table_vars.last().map(|v| v.id)?;
                Some((
                    table_vars.iter().map(|v| v.name()).collect(),
                    vec![column],
                    table_node,
                ))
            }
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueShape {
    /// Present with no value (`[pk]`).
    Flag,
    /// String literal.
    Str,
    /// `#rrggbb` identifier or a string literal.
    Color,
    /// Default value: literal, backtick expression, or signed number.
    Value,
    /// Inline ref: relation operator followed by an endpoint path.
    RefValue,
    /// Referential action word(s): cascade, restrict, set null, ...
    Action,
    /// Index type name: btree or hash.
    IndexType,
}

struct SettingSpec {
    name: &'static str,
    shape: ValueShape,
}

const fn spec(name: &'static str, shape: ValueShape) -> SettingSpec {
    SettingSpec { name, shape }
}

const TABLE_SETTINGS: &[SettingSpec] = &[
    spec("headercolor", ValueShape::Color),
    spec("note", ValueShape::Str),
];

const COLUMN_SETTINGS: &[SettingSpec] = &[
    spec("pk", ValueShape::Flag),
    spec("primary key", ValueShape::Flag),
    spec("unique", ValueShape::Flag),
    spec("not null", ValueShape::Flag),
    spec("null", ValueShape::Flag),
    spec("increment", ValueShape::Flag),
    spec("note", ValueShape::Str),
    spec("default", ValueShape::Value),
    spec("ref", ValueShape::RefValue),
];

const INDEX_SETTINGS: &[SettingSpec] = &[
    spec("pk", ValueShape::Flag),
    spec("unique", ValueShape::Flag),
    spec("name", ValueShape::Str),
    spec("note", ValueShape::Str),
    spec("type", ValueShape::IndexType),
];

const REF_SETTINGS: &[SettingSpec] = &[
    spec("delete", ValueShape::Action),
    spec("update", ValueShape::Action),
    spec("color", ValueShape::Color),
];

const ENUM_VALUE_SETTINGS: &[SettingSpec] = &[spec("note", ValueShape::Str)];

const TABLE_GROUP_SETTINGS: &[SettingSpec] = &[
    spec("color", ValueShape::Color),
    spec("note", ValueShape::Str),
];

const REF_ACTIONS: &[&str] = &["cascade", "restrict", "set null", "set default", "no action"];

/// (unknown, duplicate, invalid-value) codes for one settings family.
type SettingCodes = (CompileErrorCode, CompileErrorCode, CompileErrorCode);

const TABLE_CODES: SettingCodes = (
    CompileErrorCode::UnknownTableSetting,
    CompileErrorCode::DuplicateTableSetting,
    CompileErrorCode::InvalidTableSettingValue,
);
const COLUMN_CODES: SettingCodes = (
    CompileErrorCode::UnknownColumnSetting,
    CompileErrorCode::DuplicateColumnSetting,
    CompileErrorCode::InvalidColumnSettingValue,
);
const INDEX_CODES: SettingCodes = (
    CompileErrorCode::UnknownIndexSetting,
    CompileErrorCode::DuplicateIndexSetting,
    CompileErrorCode::InvalidIndexSettingValue,
);
const REF_CODES: SettingCodes = (
    CompileErrorCode::UnknownRefSetting,
    CompileErrorCode::DuplicateRefSetting,
    CompileErrorCode::InvalidRefSettingValue,
);
const ENUM_VALUE_CODES: SettingCodes = (
    CompileErrorCode::UnknownEnumValueSetting,
    CompileErrorCode::DuplicateEnumValueSetting,
    CompileErrorCode::InvalidEnumValueSettingValue,
);
const TABLE_GROUP_CODES: SettingCodes = (
    CompileErrorCode::UnknownTableGroupSetting,
    CompileErrorCode::DuplicateTableGroupSetting,
    CompileErrorCode::InvalidTableGroupSettingValue,
);
const TABLE_PARTIAL_CODES: SettingCodes = (
    CompileErrorCode::UnknownTablePartialSetting,
    CompileErrorCode::DuplicateTablePartialSetting,
    CompileErrorCode::InvalidTablePartialSettingValue,
);

struct Binder<'a> {
    program: &'a ProgramNode,
    analysis: Analysis,
    diagnostics: Vec<Diagnostic>,
    project_seen: bool,
}

impl<'a> Binder<'a> {
    fn new(program: &'a ProgramNode) -> Self {
        Self {
            program,
            analysis: Analysis::default(),
            diagnostics: Vec::new(),
            project_seen: false,
        }
    }

    fn error(&mut self, code: CompileErrorCode, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(code, span, message));
    }

    fn schema_index(&mut self, name: &str) -> ArenaIndex {
        if let Some(&index) = self.analysis.schemas.get(name) {
            return index;
        }
        let index = self
            .analysis
            .symbols
            .allocate(Symbol::new(SymbolKind::Schema, name, None, None));
        self.analysis.schemas.insert(name.to_owned(), index);
        index
    }

    fn lookup(&self, owner: ArenaIndex, namespace: Namespace, name: &str) -> Option<ArenaIndex> {
        self.analysis.symbols[owner]
            .table
            .get(&SymbolKey::new(namespace, name))
            .copied()
    }

    /// Declares a child symbol under `owner`. Reports `DUPLICATE_NAME` and
    /// returns `None` when the (namespace, name) slot is taken.
    fn declare(
        &mut self,
        owner: ArenaIndex,
        kind: SymbolKind,
        name: &str,
        decl_node: NodeId,
        span: Span,
    ) -> Option<ArenaIndex> {
        let key = SymbolKey::new(kind.namespace(), name);
        if self.analysis.symbols[owner].table.contains_key(&key) {
            let owner_name = self.analysis.symbols[owner].name.clone();
            self.error(
                CompileErrorCode::DuplicateName,
                span,
                format!("`{name}` is already defined in `{owner_name}`"),
            );
            return None;
        }
        let index = self
            .analysis
            .symbols
            .allocate(Symbol::new(kind, name, Some(owner), Some(decl_node)));
        self.analysis.symbols[owner].table.insert(key, index);
        Some(index)
    }

    fn record_use(&mut self, node: NodeId, symbol: ArenaIndex) {
        self.analysis.node_symbols.insert(node, symbol);
        self.analysis.symbols[symbol].references.push(node);
    }

    /// Element name as (schema, name). Reports shape problems.
    fn element_name(&mut self, element: &ElementNode) -> Option<(Option<String>, String)> {
        let name = match &element.name {
            Some(expr) => expr,
            None => {
                self.error(
                    CompileErrorCode::InvalidName,
                    element.type_token.span(),
                    format!("{} element needs a name", element.kind.keyword()),
                );
                return None;
            }
        };
        match name.name_parts() {
            Some(mut parts) if parts.len() == 1 => Some((None, parts.remove(0))),
            Some(mut parts) if parts.len() == 2 => {
                let table = parts.remove(1);
                Some((Some(parts.remove(0)), table))
            }
            _ => {
                self.error(
                    CompileErrorCode::InvalidName,
                    name.span(),
                    "expected a plain or schema-qualified name",
                );
                None
            }
        }
    }

    // ---------------------------------------------------------------
    // Declaration walk
    // ---------------------------------------------------------------

    fn declare_elements(&mut self) {
        self.schema_index(DEFAULT_SCHEMA);
        for element in &self.program.elements {
            match element.kind {
                ElementKind::Table => self.declare_table(element, SymbolKind::Table),
                ElementKind::TablePartial => self.declare_table(element, SymbolKind::TablePartial),
                ElementKind::Enum => self.declare_enum(element),
                _ => {}
            }
        }
    }

    fn declare_table(&mut self, element: &ElementNode, kind: SymbolKind) {
        let Some((schema, name)) = self.element_name(element) else {
            return;
        };
        let schema_idx = self.schema_index(schema.as_deref().unwrap_or(DEFAULT_SCHEMA));
        let span = element.name.as_ref().map(|n| n.span()).unwrap_or(element.span);
        let Some(table_idx) = self.declare(schema_idx, kind, &name, element.id, span) else {
            return;
        };
        self.analysis.node_symbols.insert(element.id, table_idx);

        if let Some(alias) = &element.alias {
            let alias_name = alias.value();
            let key = SymbolKey::new(Namespace::Table, &alias_name);
            if self.analysis.symbols[schema_idx].table.contains_key(&key) {
                self.error(
                    CompileErrorCode::InvalidAlias,
                    alias.span(),
                    format!("alias `{alias_name}` collides with an existing name"),
                );
            } else {
                self.analysis.symbols[schema_idx].table.insert(key, table_idx);
            }
        }

        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                if let BlockItem::Line(expr) = item
                    && let Some((column, _)) = column_declaration(expr)
                {
                    self.declare(table_idx, SymbolKind::Column, &column, expr.id(), expr.span());
                }
            }
        }
    }

    fn declare_enum(&mut self, element: &ElementNode) {
        let Some((schema, name)) = self.element_name(element) else {
            return;
        };
        let schema_idx = self.schema_index(schema.as_deref().unwrap_or(DEFAULT_SCHEMA));
        let span = element.name.as_ref().map(|n| n.span()).unwrap_or(element.span);
        let Some(enum_idx) = self.declare(schema_idx, SymbolKind::Enum, &name, element.id, span)
        else {
            return;
        };
        self.analysis.node_symbols.insert(element.id, enum_idx);

        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                if let BlockItem::Line(expr) = item
                    && let Some((value, _)) = enum_value_declaration(expr)
                {
                    self.declare(enum_idx, SymbolKind::EnumValue, &value, expr.id(), expr.span());
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Validation and resolution walk
    // ---------------------------------------------------------------

    fn validate_and_resolve(&mut self) {
        // Partials first: tables need their finished field lists to merge.
        for element in &self.program.elements {
            if element.kind == ElementKind::TablePartial {
                self.validate_table(element, true);
            }
        }
        for element in &self.program.elements {
            match element.kind {
                ElementKind::Table => self.validate_table(element, false),
                ElementKind::TablePartial => {}
                ElementKind::Enum => self.validate_enum(element),
                ElementKind::Ref => self.validate_ref(element),
                ElementKind::TableGroup => self.validate_table_group(element),
                ElementKind::Project => self.validate_project(element),
                ElementKind::Note => self.validate_note(element),
                ElementKind::Records => self.validate_records(element, None),
                ElementKind::Function => self.validate_function(element),
                ElementKind::Indexes => self.error(
                    CompileErrorCode::InvalidElementContext,
                    element.type_token.span(),
                    "indexes blocks only appear inside a table",
                ),
                ElementKind::Unknown => {}
            }
        }
    }

    fn validate_table(&mut self, element: &ElementNode, is_partial: bool) {
        if is_partial && element.alias.is_some() {
            let span = element.alias.as_ref().map(|a| a.span()).unwrap_or(element.span);
            self.error(
                CompileErrorCode::InvalidAlias,
                span,
                "table partials cannot have an alias",
            );
        }
        if let Some(args) = &element.args {
            self.error(
                CompileErrorCode::InvalidName,
                args.span,
                format!("unexpected argument list on a {}", element.kind.keyword()),
            );
        }
        let codes = if is_partial { TABLE_PARTIAL_CODES } else { TABLE_CODES };
        self.check_settings(element.settings.as_ref(), TABLE_SETTINGS, codes);

        let block = match &element.body {
            ElementBody::Block(block) => block.clone(),
            ElementBody::Simple(expr) => {
                self.error(
                    CompileErrorCode::InvalidBody,
                    expr.span(),
                    format!("{} body must be a block", element.kind.keyword()),
                );
                return;
            }
            ElementBody::None => return,
        };

        for item in &block.items {
            match item {
                BlockItem::Line(expr) => self.validate_table_line(expr, is_partial),
                BlockItem::Field(field) => {
                    let name = field.name.value().to_lowercase();
                    if name != "note" {
                        self.error(
                            CompileErrorCode::InvalidBody,
                            field.name.span(),
                            format!("`{name}` is not valid inside a table body"),
                        );
                    } else if !is_string_literal(&field.value) {
                        self.error(
                            CompileErrorCode::InvalidBody,
                            field.value.span(),
                            "note must be a string",
                        );
                    }
                }
                BlockItem::SubElement(sub) => match sub.kind {
                    ElementKind::Indexes => self.validate_indexes(sub),
                    ElementKind::Note => self.validate_note(sub),
                    ElementKind::Records => {
                        if is_partial {
                            self.error(
                                CompileErrorCode::InvalidElementContext,
                                sub.type_token.span(),
                                "records blocks are not allowed inside a table partial",
                            );
                        } else {
                            self.validate_records(sub, Some(element));
                        }
                    }
                    _ => self.error(
                        CompileErrorCode::InvalidElementContext,
                        sub.type_token.span(),
                        format!("{} cannot be nested inside a table", sub.kind.keyword()),
                    ),
                },
            }
        }

        self.merge_fields(element, &block, is_partial);
    }

    fn validate_table_line(&mut self, expr: &Expr, is_partial: bool) {
        match expr {
            // `~partial_name` injection; resolved during the merge.
            Expr::Prefix(prefix) if prefix.op == Operator::Tilde => {
                if is_partial {
                    self.error(
                        CompileErrorCode::BindingError,
                        prefix.span,
                        "a table partial cannot inject another partial",
                    );
                } else if prefix.expr.name_parts().is_none() {
                    self.error(
                        CompileErrorCode::InvalidName,
                        prefix.expr.span(),
                        "expected a table partial name after `~`",
                    );
                }
            }
            Expr::Variable(v) => self.error(
                CompileErrorCode::InvalidBody,
                v.span,
                format!("column `{}` is missing a type", v.name()),
            ),
            Expr::FunctionApplication(app) => {
                if !matches!(app.callee.as_ref(), Expr::Variable(_)) {
                    self.error(
                        CompileErrorCode::InvalidName,
                        app.callee.span(),
                        "invalid column name",
                    );
                }
                let mut settings_seen = false;
                for (i, arg) in app.args.iter().enumerate() {
                    match arg {
                        Expr::List(list) => {
                            if settings_seen {
                                self.error(
                                    CompileErrorCode::InvalidBody,
                                    list.span,
                                    "a column takes a single settings list",
                                );
                            }
                            settings_seen = true;
                            self.check_column_settings(list.items.clone());
                        }
                        _ if i == 0 => {
                            if !is_type_expr(arg) {
                                self.error(
                                    CompileErrorCode::InvalidBody,
                                    arg.span(),
                                    "invalid column type",
                                );
                            } else {
                                self.resolve_column_type(arg);
                            }
                        }
                        _ => self.error(
                            CompileErrorCode::InvalidBody,
                            arg.span(),
                            "unexpected token in column declaration",
                        ),
                    }
                }
                if app.args.is_empty() || matches!(app.args.first(), Some(Expr::List(_))) {
                    self.error(
                        CompileErrorCode::InvalidBody,
                        app.span,
                        "column is missing a type",
                    );
                }
            }
            other => self.error(
                CompileErrorCode::InvalidBody,
                other.span(),
                "expected a column declaration",
            ),
        }
    }

    /// Column settings need more than shape checks: the inline `ref:` value
    /// must also resolve its endpoint.
    fn check_column_settings(&mut self, items: Vec<SettingItem>) {
        self.check_setting_items(&items, COLUMN_SETTINGS, COLUMN_CODES);
        for item in &items {
            if item.name == "ref"
                && let Some(Expr::Prefix(prefix)) = &item.value
                && is_relation(prefix.op)
            {
                self.resolve_endpoint(&prefix.expr);
            }
        }
    }

    fn resolve_column_type(&mut self, type_expr: &Expr) {
        // Only name paths can be enum references; `varchar(5)` calls are
        // plain types. Unqualified names fall through silently (any type
        // name is legal), qualified ones must resolve.
        let target = match type_expr {
            Expr::Call(_) => return,
            other => other,
        };
        let Some(parts) = target.name_parts() else {
            return;
        };
        match parts.len() {
            1 => {
                let public = self.schema_index(DEFAULT_SCHEMA);
                if let Some(enum_idx) = self.lookup(public, Namespace::Enum, &parts[0]) {
                    self.record_use(target.id(), enum_idx);
                }
            }
            2 => {
                let schema_idx = self.schema_index(&parts[0]);
                match self.lookup(schema_idx, Namespace::Enum, &parts[1]) {
                    Some(enum_idx) => self.record_use(target.id(), enum_idx),
                    None => self.error(
                        CompileErrorCode::NameNotFound,
                        target.span(),
                        format!("enum `{}.{}` not found", parts[0], parts[1]),
                    ),
                }
            }
            _ => self.error(
                CompileErrorCode::InvalidName,
                target.span(),
                "expected a plain or schema-qualified type name",
            ),
        }
    }

    /// Builds the table's final field list: direct columns and `~partial`
    /// injections, merged in document order. Re-declaring a name moves it to
    /// the end of the ordering; a direct (host) definition always beats an
    /// injected one regardless of which came later.
    fn merge_fields(&mut self, element: &ElementNode, block: &BlockNode, is_partial: bool) {
        let table_idx = self.analysis.node_symbols.get(&element.id).copied();
        let mut merged: IndexMap<String, ResolvedField> = IndexMap::new();

        for item in &block.items {
            let BlockItem::Line(expr) = item else { continue };
            if let Expr::Prefix(prefix) = expr
                && prefix.op == Operator::Tilde
            {
                if is_partial {
                    continue;
                }
                let Some(partial_idx) = self.resolve_partial(&prefix.expr) else {
                    continue;
                };
                let Some(decl_node) = self.analysis.symbols[partial_idx].decl_node else {
                    continue;
                };
                let injected = self
                    .analysis
                    .table_fields
                    .get(&decl_node)
                    .cloned()
                    .unwrap_or_default();
                for field in injected {
                    upsert_field(
                        &mut merged,
                        ResolvedField {
                            from_host: false,
                            ..field
                        },
                    );
                }
            } else if let Some((name, _)) = column_declaration(expr) {
                upsert_field(
                    &mut merged,
                    ResolvedField {
                        name,
                        line_node: expr.id(),
                        from_host: true,
                    },
                );
            }
        }

        // Injected columns become symbols on the host so ref endpoints and
        // records columns can resolve against them.
        if let Some(table_idx) = table_idx {
            for field in merged.values() {
                if !field.from_host
                    && self.lookup(table_idx, Namespace::Column, &field.name).is_none()
                {
                    self.declare(
                        table_idx,
                        SymbolKind::InjectedColumn,
                        &field.name,
                        field.line_node,
                        element.span,
                    );
                }
            }
        }

        self.analysis
            .table_fields
            .insert(element.id, merged.into_values().collect());
    }

    fn resolve_partial(&mut self, name: &Expr) -> Option<ArenaIndex> {
        let parts = name.name_parts()?;
        let (schema, partial) = match parts.len() {
            1 => (DEFAULT_SCHEMA.to_owned(), &parts[0]),
            2 => (parts[0].clone(), &parts[1]),
            _ => {
                self.error(
                    CompileErrorCode::InvalidName,
                    name.span(),
                    "expected a table partial name",
                );
                return None;
            }
        };
        let schema_idx = self.schema_index(&schema);
        match self.lookup(schema_idx, Namespace::TablePartial, partial) {
            Some(idx) => {
                let node = name.path_variables()?.last().map(|v| v.id)?;
                self.record_use(node, idx);
                self.analysis.node_symbols.insert(name.id(), idx);
                Some(idx)
            }
            None => {
                self.error(
                    CompileErrorCode::NameNotFound,
                    name.span(),
                    format!("table partial `{partial}` not found"),
                );
                None
            }
        }
    }

    fn validate_indexes(&mut self, element: &ElementNode) {
        if element.name.is_some() {
            let span = element.name.as_ref().map(|n| n.span()).unwrap_or(element.span);
            self.error(CompileErrorCode::InvalidName, span, "indexes blocks are unnamed");
        }
        let ElementBody::Block(block) = &element.body else {
            if !matches!(element.body, ElementBody::None) {
                self.error(
                    CompileErrorCode::InvalidBody,
                    element.span,
                    "indexes body must be a block",
                );
            }
            return;
        };
        for item in &block.items {
            match item {
                BlockItem::Line(expr) => self.validate_index_entry(expr),
                other => {
                    let span = match other {
                        BlockItem::SubElement(e) => e.span,
                        BlockItem::Field(f) => f.span,
                        BlockItem::Line(_) => unreachable!(),
                    };
                    self.error(
                        CompileErrorCode::InvalidBody,
                        span,
                        "expected an index entry",
                    );
                }
            }
        }
    }

    fn validate_index_entry(&mut self, expr: &Expr) {
        let (target, settings) = match expr {
            Expr::FunctionApplication(app) => {
                let mut settings = None;
                for arg in &app.args {
                    match arg {
                        Expr::List(list) if settings.is_none() => settings = Some(list),
                        other => self.error(
                            CompileErrorCode::InvalidBody,
                            other.span(),
                            "unexpected token in index entry",
                        ),
                    }
                }
                (app.callee.as_ref(), settings)
            }
            other => (other, None),
        };
        match target {
            Expr::Variable(_) | Expr::FunctionLiteral(_) => {}
            Expr::Tuple(tuple) => {
                for member in &tuple.items {
                    if !matches!(member, Expr::Variable(_) | Expr::FunctionLiteral(_)) {
                        self.error(
                            CompileErrorCode::InvalidBody,
                            member.span(),
                            "composite index members are column names or backtick expressions",
                        );
                    }
                }
            }
            other => self.error(
                CompileErrorCode::InvalidBody,
                other.span(),
                "expected a column, composite, or backtick expression index",
            ),
        }
        if let Some(list) = settings {
            self.check_setting_items(&list.items, INDEX_SETTINGS, INDEX_CODES);
        }
    }

    fn validate_enum(&mut self, element: &ElementNode) {
        self.no_alias_no_args(element);
        if element.settings.is_some() {
            let span = element.settings.as_ref().map(|s| s.span).unwrap_or(element.span);
            self.error(
                CompileErrorCode::InvalidBody,
                span,
                "enum elements take no settings",
            );
        }
        let ElementBody::Block(block) = &element.body else {
            if !matches!(element.body, ElementBody::None) {
                self.error(
                    CompileErrorCode::InvalidBody,
                    element.span,
                    "enum body must be a block",
                );
            }
            return;
        };
        for item in &block.items {
            match item {
                BlockItem::Line(expr) => {
                    if let Some((_, settings)) = enum_value_declaration(expr) {
                        if let Some(items) = settings {
                            self.check_setting_items(&items, ENUM_VALUE_SETTINGS, ENUM_VALUE_CODES);
                        }
                    } else {
                        self.error(
                            CompileErrorCode::InvalidBody,
                            expr.span(),
                            "expected an enum value",
                        );
                    }
                }
                BlockItem::Field(field) => {
                    let name = field.name.value().to_lowercase();
                    if name != "note" || !is_string_literal(&field.value) {
                        self.error(
                            CompileErrorCode::InvalidBody,
                            field.span,
                            "only a note line is allowed alongside enum values",
                        );
                    }
                }
                BlockItem::SubElement(sub) => self.error(
                    CompileErrorCode::InvalidElementContext,
                    sub.type_token.span(),
                    format!("{} cannot be nested inside an enum", sub.kind.keyword()),
                ),
            }
        }
    }

    fn validate_ref(&mut self, element: &ElementNode) {
        self.no_alias_no_args(element);
        if let Some(name) = &element.name
            && name.name_parts().map(|p| p.len()) != Some(1)
        {
            self.error(
                CompileErrorCode::InvalidName,
                name.span(),
                "ref names are plain identifiers",
            );
        }
        self.check_settings(element.settings.as_ref(), REF_SETTINGS, REF_CODES);
        match &element.body {
            ElementBody::Simple(expr) => self.validate_ref_line(expr),
            ElementBody::Block(block) => {
                for item in &block.items {
                    match item {
                        BlockItem::Line(expr) => self.validate_ref_line(expr),
                        _ => self.error(
                            CompileErrorCode::InvalidBody,
                            element.span,
                            "ref blocks contain relation lines",
                        ),
                    }
                }
            }
            ElementBody::None => {}
        }
    }

    fn validate_ref_line(&mut self, expr: &Expr) {
        let Expr::Infix(infix) = expr else {
            self.error(
                CompileErrorCode::InvalidBody,
                expr.span(),
                "expected a relation like `a.b > c.d`",
            );
            return;
        };
        if !is_relation(infix.op) {
            self.error(
                CompileErrorCode::InvalidBody,
                infix.span,
                format!("`{}` is not a relation operator", infix.op.as_str()),
            );
            return;
        }
        let left = self.resolve_endpoint(&infix.left);
        let right = self.resolve_endpoint(&infix.right);
        if let (Some(l), Some(r)) = (left, right)
            && l.1 != r.1
        {
            self.error(
                CompileErrorCode::BindingError,
                infix.span,
                format!(
                    "composite ref endpoints have mismatched arity ({} vs {})",
                    l.1, r.1
                ),
            );
        }
    }

    /// Resolves one ref endpoint. Returns the table symbol and the column
    /// count on success.
    fn resolve_endpoint(&mut self, expr: &Expr) -> Option<(ArenaIndex, usize)> {
        let Some((table_path, columns, table_node)) = destructure_ref_endpoint(expr) else {
            self.error(
                CompileErrorCode::InvalidBody,
                expr.span(),
                "expected `table.column` or `table.(col, ...)`",
            );
            return None;
        };
        let (schema, table) = match table_path.len() {
            1 => (DEFAULT_SCHEMA.to_owned(), &table_path[0]),
            _ => (table_path[0].clone(), &table_path[1]),
        };
        let schema_idx = self.schema_index(&schema);
        let Some(table_idx) = self.lookup(schema_idx, Namespace::Table, table) else {
            self.error(
                CompileErrorCode::NameNotFound,
                expr.span(),
                format!("table `{table}` not found"),
            );
            return None;
        };
        self.record_use(table_node, table_idx);
        let mut ok = true;
        for column in &columns {
            if self.lookup(table_idx, Namespace::Column, column).is_none() {
                self.error(
                    CompileErrorCode::NameNotFound,
                    expr.span(),
                    format!("column `{column}` not found in table `{table}`"),
                );
                ok = false;
            }
        }
        ok.then_some((table_idx, columns.len()))
    }

    fn validate_table_group(&mut self, element: &ElementNode) {
        self.no_alias_no_args(element);
        if element.name.is_none() {
            self.error(
                CompileErrorCode::InvalidName,
                element.type_token.span(),
                "tablegroup element needs a name",
            );
        }
        self.check_settings(element.settings.as_ref(), TABLE_GROUP_SETTINGS, TABLE_GROUP_CODES);
        let ElementBody::Block(block) = &element.body else {
            return;
        };
        for item in &block.items {
            match item {
                BlockItem::Line(expr) => {
                    let Some(parts) = expr.name_parts().filter(|p| p.len() <= 2) else {
                        self.error(
                            CompileErrorCode::InvalidName,
                            expr.span(),
                            "expected a table name",
                        );
                        continue;
                    };
                    let (schema, table) = match parts.len() {
                        1 => (DEFAULT_SCHEMA.to_owned(), &parts[0]),
                        _ => (parts[0].clone(), &parts[1]),
                    };
                    let schema_idx = self.schema_index(&schema);
                    match self.lookup(schema_idx, Namespace::Table, table) {
                        Some(table_idx) => {
                            if let Some(node) =
                                expr.path_variables().and_then(|v| v.last().map(|v| v.id))
                            {
                                self.record_use(node, table_idx);
                            }
                        }
                        None => self.error(
                            CompileErrorCode::NameNotFound,
                            expr.span(),
                            format!("table `{table}` not found"),
                        ),
                    }
                }
                BlockItem::Field(field) => {
                    let name = field.name.value().to_lowercase();
                    if name != "note" || !is_string_literal(&field.value) {
                        self.error(
                            CompileErrorCode::InvalidBody,
                            field.span,
                            "tablegroup bodies list table names",
                        );
                    }
                }
                BlockItem::SubElement(sub) => match sub.kind {
                    ElementKind::Note => self.validate_note(sub),
                    _ => self.error(
                        CompileErrorCode::InvalidElementContext,
                        sub.type_token.span(),
                        format!("{} cannot be nested inside a tablegroup", sub.kind.keyword()),
                    ),
                },
            }
        }
    }

    fn validate_project(&mut self, element: &ElementNode) {
        self.no_alias_no_args(element);
        if self.project_seen {
            self.error(
                CompileErrorCode::DuplicateName,
                element.type_token.span(),
                "a file defines at most one project",
            );
        }
        self.project_seen = true;
        let ElementBody::Block(block) = &element.body else {
            if !matches!(element.body, ElementBody::None) {
                self.error(
                    CompileErrorCode::InvalidBody,
                    element.span,
                    "project body must be a block",
                );
            }
            return;
        };
        for item in &block.items {
            match item {
                BlockItem::Field(field) => {
                    if !matches!(field.value, Expr::Literal(_)) {
                        self.error(
                            CompileErrorCode::InvalidBody,
                            field.value.span(),
                            "project fields take literal values",
                        );
                    }
                }
                BlockItem::SubElement(sub) if sub.kind == ElementKind::Note => {
                    self.validate_note(sub);
                }
                BlockItem::SubElement(sub) => self.error(
                    CompileErrorCode::InvalidElementContext,
                    sub.type_token.span(),
                    format!("{} cannot be nested inside a project", sub.kind.keyword()),
                ),
                BlockItem::Line(expr) => self.error(
                    CompileErrorCode::InvalidBody,
                    expr.span(),
                    "expected a `key: value` project field",
                ),
            }
        }
    }

    fn validate_note(&mut self, element: &ElementNode) {
        match &element.body {
            ElementBody::Simple(expr) => {
                if !is_string_literal(expr) {
                    self.error(
                        CompileErrorCode::InvalidBody,
                        expr.span(),
                        "note content must be a string",
                    );
                }
            }
            ElementBody::Block(block) => {
                let ok = block.items.len() == 1
                    && matches!(&block.items[0], BlockItem::Line(expr) if is_string_literal(expr));
                if !ok {
                    self.error(
                        CompileErrorCode::InvalidBody,
                        block.span,
                        "note blocks contain a single string",
                    );
                }
            }
            ElementBody::None => {}
        }
    }

    fn validate_function(&mut self, element: &ElementNode) {
        self.no_alias_no_args(element);
        if element.name.is_none() {
            self.error(
                CompileErrorCode::InvalidName,
                element.type_token.span(),
                "function element needs a name",
            );
        }
        match &element.body {
            ElementBody::Simple(Expr::FunctionLiteral(_)) | ElementBody::None => {}
            ElementBody::Simple(expr) => self.error(
                CompileErrorCode::InvalidBody,
                expr.span(),
                "function body must be a backtick expression",
            ),
            ElementBody::Block(block) => self.error(
                CompileErrorCode::InvalidBody,
                block.span,
                "function body must be a backtick expression",
            ),
        }
    }

    /// Validates a records element and binds its table and column names.
    /// `host` is the enclosing table for nested blocks.
    fn validate_records(&mut self, element: &ElementNode, host: Option<&ElementNode>) {
        if element.settings.is_some() {
            let span = element.settings.as_ref().map(|s| s.span).unwrap_or(element.span);
            self.error(
                CompileErrorCode::InvalidBody,
                span,
                "records elements take no settings",
            );
        }
        let table_idx = match host {
            Some(host_element) => {
                if element.name.is_some() {
                    let span = element.name.as_ref().map(|n| n.span()).unwrap_or(element.span);
                    self.error(
                        CompileErrorCode::InvalidName,
                        span,
                        "nested records blocks are unnamed",
                    );
                }
                self.analysis.node_symbols.get(&host_element.id).copied()
            }
            None => {
                let Some((schema, table)) = self.element_name(element) else {
                    return;
                };
                let schema_idx = self.schema_index(schema.as_deref().unwrap_or(DEFAULT_SCHEMA));
                let resolved = self.lookup(schema_idx, Namespace::Table, &table);
                if resolved.is_none() {
                    let span = element.name.as_ref().map(|n| n.span()).unwrap_or(element.span);
                    self.error(
                        CompileErrorCode::NameNotFound,
                        span,
                        format!("table `{table}` not found"),
                    );
                }
                if let (Some(table_idx), Some(name)) = (resolved, &element.name)
                    && let Some(node) = name.path_variables().and_then(|v| v.last().map(|v| v.id))
                {
                    self.record_use(node, table_idx);
                }
                resolved
            }
        };
        if let Some(table_idx) = table_idx {
            self.analysis.node_symbols.insert(element.id, table_idx);
        }

        if let Some(args) = &element.args {
            for arg in &args.items {
                let Expr::Variable(v) = arg else {
                    self.error(
                        CompileErrorCode::InvalidName,
                        arg.span(),
                        "expected a column name",
                    );
                    continue;
                };
                let Some(table_idx) = table_idx else { continue };
                match self.lookup(table_idx, Namespace::Column, &v.name()) {
                    Some(column_idx) => self.record_use(v.id, column_idx),
                    None => {
                        let table = self.analysis.symbols[table_idx].name.clone();
                        self.error(
                            CompileErrorCode::BindingError,
                            v.span,
                            format!("column `{}` not found in table `{table}`", v.name()),
                        );
                    }
                }
            }
        }

        if let ElementBody::Block(block) = &element.body {
            for item in &block.items {
                match item {
                    BlockItem::Line(expr) => self.resolve_row_accesses(expr),
                    BlockItem::Field(field) => self.error(
                        CompileErrorCode::InvalidBody,
                        field.span,
                        "records blocks contain value rows",
                    ),
                    BlockItem::SubElement(sub) => self.error(
                        CompileErrorCode::InvalidElementContext,
                        sub.type_token.span(),
                        format!("{} cannot be nested inside records", sub.kind.keyword()),
                    ),
                }
            }
        }
    }

    /// Binds `status.active`-style enum accesses inside record rows.
    fn resolve_row_accesses(&mut self, expr: &Expr) {
        let cells: Vec<&Expr> = match expr {
            Expr::Tuple(tuple) => tuple.items.iter().collect(),
            single => vec![single],
        };
        for cell in cells {
            let Expr::Access(_) = cell else { continue };
            let Some(parts) = cell.name_parts() else {
                self.error(
                    CompileErrorCode::BindingError,
                    cell.span(),
                    "expected an enum value access",
                );
                continue;
            };
            let (schema, enum_name, value) = match parts.len() {
                2 => (DEFAULT_SCHEMA.to_owned(), &parts[0], &parts[1]),
                3 => (parts[0].clone(), &parts[1], &parts[2]),
                _ => {
                    self.error(
                        CompileErrorCode::BindingError,
                        cell.span(),
                        "expected `enum.value` or `schema.enum.value`",
                    );
                    continue;
                }
            };
            let schema_idx = self.schema_index(&schema);
            let Some(enum_idx) = self.lookup(schema_idx, Namespace::Enum, enum_name) else {
                self.error(
                    CompileErrorCode::BindingError,
                    cell.span(),
                    format!("enum `{enum_name}` not found"),
                );
                continue;
            };
            match self.lookup(enum_idx, Namespace::EnumValue, value) {
                Some(value_idx) => self.record_use(cell.id(), value_idx),
                None => self.error(
                    CompileErrorCode::EnumValueNotFound,
                    cell.span(),
                    format!("`{value}` is not a value of enum `{enum_name}`"),
                ),
            }
        }
    }

    fn no_alias_no_args(&mut self, element: &ElementNode) {
        if let Some(alias) = &element.alias {
            self.error(
                CompileErrorCode::InvalidAlias,
                alias.span(),
                format!("{} elements cannot have an alias", element.kind.keyword()),
            );
        }
        if let Some(args) = &element.args {
            self.error(
                CompileErrorCode::InvalidName,
                args.span,
                format!("unexpected argument list on a {}", element.kind.keyword()),
            );
        }
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    fn check_settings(
        &mut self,
        settings: Option<&crate::ast::ListExpr>,
        specs: &[SettingSpec],
        codes: SettingCodes,
    ) {
        if let Some(list) = settings {
            self.check_setting_items(&list.items, specs, codes);
        }
    }

    fn check_setting_items(
        &mut self,
        items: &[SettingItem],
        specs: &[SettingSpec],
        codes: SettingCodes,
    ) {
        let (unknown, duplicate, invalid) = codes;
        let mut seen: Vec<&str> = Vec::new();
        for item in items {
            let Some(spec) = specs.iter().find(|s| s.name == item.name) else {
                self.error(unknown, item.name_span, format!("unknown setting `{}`", item.name));
                continue;
            };
            if seen.contains(&spec.name) {
                self.error(
                    duplicate,
                    item.name_span,
                    format!("setting `{}` appears more than once", item.name),
                );
                continue;
            }
            seen.push(spec.name);
            if !setting_value_matches(spec.shape, item.value.as_ref()) {
                self.error(
                    invalid,
                    item.value.as_ref().map(|v| v.span()).unwrap_or(item.span),
                    format!("invalid value for setting `{}`", item.name),
                );
            }
        }
    }
}

fn upsert_field(merged: &mut IndexMap<String, ResolvedField>, field: ResolvedField) {
    if let Some(existing) = merged.shift_remove(&field.name) {
        // A direct declaration outranks an injected one; re-mentioning a
        // name always moves it to the end of the order.
        let kept = if existing.from_host && !field.from_host {
            existing
        } else {
            field
        };
        merged.insert(kept.name.clone(), kept);
    } else {
        merged.insert(field.name.clone(), field);
    }
}

fn is_relation(op: Operator) -> bool {
    matches!(
        op,
        Operator::Less | Operator::Greater | Operator::LessGreater | Operator::Minus
    )
}

fn is_string_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(l) if l.kind == LiteralKind::String)
}

fn is_type_expr(expr: &Expr) -> bool {
    match expr {
        Expr::Variable(_) | Expr::Access(_) => expr.name_parts().is_some(),
        Expr::Call(call) => {
            call.callee.name_parts().is_some()
                && call
                    .args
                    .iter()
                    .all(|a| matches!(a, Expr::Literal(_) | Expr::Variable(_)))
        }
        _ => false,
    }
}

/// `name type [settings]` column line: the declared name plus its settings
/// list if present. `None` when the line is not a column declaration.
fn column_declaration(expr: &Expr) -> Option<(String, Option<Vec<SettingItem>>)> {
    let Expr::FunctionApplication(app) = expr else {
        return None;
    };
    let name = match app.callee.as_ref() {
        Expr::Variable(v) => v.name(),
        _ => return None,
    };
    let settings = app.args.iter().find_map(|arg| match arg {
        Expr::List(list) => Some(list.items.clone()),
        _ => None,
    });
    Some((name, settings))
}

/// `value` or `value [settings]` enum body line.
fn enum_value_declaration(expr: &Expr) -> Option<(String, Option<Vec<SettingItem>>)> {
    match expr {
        Expr::Variable(v) => Some((v.name(), None)),
        Expr::FunctionApplication(app) => {
            let name = match app.callee.as_ref() {
                Expr::Variable(v) => v.name(),
                _ => return None,
            };
            if app.args.len() != 1 {
                return None;
            }
            match &app.args[0] {
                Expr::List(list) => Some((name, Some(list.items.clone()))),
                _ => None,
            }
        }
        _ => None,
    }
}

fn setting_value_matches(shape: ValueShape, value: Option<&Expr>) -> bool {
    match shape {
        ValueShape::Flag => value.is_none(),
        ValueShape::Str => matches!(value, Some(expr) if is_string_literal(expr)),
        ValueShape::Color => match value {
            Some(Expr::Variable(v)) => v.name().starts_with('#'),
            Some(expr) => is_string_literal(expr),
            None => false,
        },
        ValueShape::Value => match value {
            Some(Expr::Literal(_)) | Some(Expr::FunctionLiteral(_)) => true,
            Some(Expr::Prefix(prefix)) => {
                matches!(prefix.op, Operator::Minus | Operator::Plus)
                    && matches!(prefix.expr.as_ref(), Expr::Literal(l) if l.kind == LiteralKind::Number)
            }
            _ => false,
        },
        ValueShape::RefValue => match value {
            Some(Expr::Prefix(prefix)) => {
                is_relation(prefix.op) && destructure_ref_endpoint(&prefix.expr).is_some()
            }
            _ => false,
        },
        ValueShape::Action => normalized_words(value)
            .map(|words| REF_ACTIONS.contains(&words.as_str()))
            .unwrap_or(false),
        ValueShape::IndexType => normalized_words(value)
            .map(|words| words == "btree" || words == "hash")
            .unwrap_or(false),
    }
}

/// Lowercased, space-joined words of a bare-word setting value like
/// `set null` (which parses as a function application).
pub(crate) fn normalized_words(value: Option<&Expr>) -> Option<String> {
    let expr = value?;
    match expr {
        Expr::Variable(v) => Some(v.name().to_lowercase()),
        Expr::FunctionApplication(app) => {
            let mut words = vec![word_of(&app.callee)?];
            for arg in &app.args {
                words.push(word_of(arg)?);
            }
            Some(words.join(" "))
        }
        _ => None,
    }
}

/// A single word of a bare-word value. `null` in `set null` lands here as a
/// null literal, not a variable.
fn word_of(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Variable(v) => Some(v.name().to_lowercase()),
        Expr::Literal(l) if matches!(l.kind, LiteralKind::Null | LiteralKind::Boolean) => {
            Some(l.token.value().to_lowercase())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_tokens;
    use crate::scanner::Scanner;

    fn bind_source(source: &str) -> (Analysis, Vec<Diagnostic>) {
        let (tokens, scan_diags) = Scanner::new(source).scan();
        assert!(scan_diags.is_empty(), "unexpected scan diagnostics");
        let (program, parse_diags) = parse_tokens(&tokens);
        assert!(parse_diags.is_empty(), "unexpected parse diagnostics");
        bind(&program)
    }

    fn field_names(fields: &HashMap<NodeId, Vec<ResolvedField>>) -> Vec<Vec<String>> {
        fields
            .values()
            .map(|fields| fields.iter().map(|f| f.name.clone()).collect())
            .collect()
    }

    #[test]
    fn partial_injection_moves_shared_column_to_end() {
        let source = "\
TablePartial P {
  a int
  shared int
}

Table T {
  ~P
  x int
  shared varchar
}
";
        let (analysis, diags) = bind_source(source);
        assert!(diags.is_empty(), "{diags:?}");
        let names = field_names(&analysis.table_fields);
        assert!(names.contains(&vec!["a".into(), "x".into(), "shared".into()]));
    }

    #[test]
    fn host_column_definition_wins_over_partial() {
        let source = "\
Table T {
  shared varchar
  ~P
}

TablePartial P {
  shared int
}
";
        let (analysis, diags) = bind_source(source);
        assert!(diags.is_empty(), "{diags:?}");
        let table_fields: Vec<_> = analysis
            .table_fields
            .values()
            .find(|fields| fields.len() == 1)
            .expect("table fields")
            .to_vec();
        assert!(table_fields[0].from_host);
    }

    #[test]
    fn duplicate_table_name_is_reported() {
        let (_, diags) = bind_source("Table a { id int }\nTable a { id int }\n");
        assert!(diags.iter().any(|d| d.code == CompileErrorCode::DuplicateName));
    }

    #[test]
    fn unresolved_ref_endpoint_is_reported() {
        let (_, diags) = bind_source("Table a { id int }\nRef: a.id > missing.id\n");
        assert!(diags.iter().any(|d| d.code == CompileErrorCode::NameNotFound));
    }

    #[test]
    fn partial_inside_partial_is_rejected() {
        let (_, diags) = bind_source("TablePartial P { a int }\nTablePartial Q { ~P\n b int }\n");
        assert!(diags.iter().any(|d| d.code == CompileErrorCode::BindingError));
    }

    #[test]
    fn unknown_column_setting_is_reported() {
        let (_, diags) = bind_source("Table a { id int [primary_key] }\n");
        assert!(
            diags
                .iter()
                .any(|d| d.code == CompileErrorCode::UnknownColumnSetting)
        );
    }

    #[test]
    fn records_columns_resolve_against_injected_fields() {
        let source = "\
TablePartial Base {
  created_at timestamp
}

Table t {
  id int [pk]
  ~Base
}

records t(id, created_at) {
  1, '2024-01-01 00:00:00'
}
";
        let (_, diags) = bind_source(source);
        assert!(diags.is_empty(), "{diags:?}");
    }
}
