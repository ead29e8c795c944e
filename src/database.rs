use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEMA: &str = "public";

/// Plain semantic value produced by the interpreter. Everything here is
/// fully resolved: no node ids, no symbols, serializable as-is.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Database {
    pub tables: Vec<Table>,
    pub enums: Vec<Enum>,
    pub refs: Vec<Ref>,
    pub table_groups: Vec<TableGroup>,
    pub project: Option<Project>,
    pub table_partials: Vec<TablePartial>,
    pub records: Vec<TableRecord>,
}

impl Database {
    pub fn table(&self, schema_name: Option<&str>, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name && schema_of(&t.schema_name) == schema_of_opt(schema_name))
    }

    pub fn record_for(&self, schema_name: Option<&str>, name: &str) -> Option<&TableRecord> {
        self.records.iter().find(|r| {
            r.table_name == name && schema_of(&r.schema_name) == schema_of_opt(schema_name)
        })
    }

    pub fn enum_def(&self, schema_name: Option<&str>, name: &str) -> Option<&Enum> {
        self.enums
            .iter()
            .find(|e| e.name == name && schema_of(&e.schema_name) == schema_of_opt(schema_name))
    }
}

fn schema_of(schema_name: &Option<String>) -> &str {
    schema_name.as_deref().unwrap_or(DEFAULT_SCHEMA)
}

fn schema_of_opt(schema_name: Option<&str>) -> &str {
    schema_name.unwrap_or(DEFAULT_SCHEMA)
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub schema_name: Option<String>,
    pub name: String,
    pub alias: Option<String>,
    pub note: Option<String>,
    pub header_color: Option<String>,
    pub fields: Vec<Field>,
    pub indexes: Vec<IndexDef>,
}

impl Table {
    pub fn qualified_name(&self) -> String {
        match &self.schema_name {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub name: String,
    pub r#type: ColumnType,
    pub pk: bool,
    pub unique: bool,
    pub not_null: bool,
    pub increment: bool,
    pub default: Option<DefaultValue>,
    pub note: Option<String>,
}

/// A column's declared type. `name` is the lowercased base name
/// (`varchar`, `decimal`, or the enum's name); `args` holds the
/// parenthesized arguments as written (`["5"]`, `["10", "2"]`).
#[derive(Debug, Clone, Serialize)]
pub struct ColumnType {
    pub name: String,
    pub args: Vec<String>,
    /// Schema qualifier as written in the source (`myschema.status`).
    pub schema_name: Option<String>,
    pub raw: String,
    /// The binder resolved this type to an `Enum` declaration.
    pub is_enum: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultKind {
    Number,
    String,
    Boolean,
    Expression,
    Null,
}

#[derive(Debug, Clone, Serialize)]
pub struct DefaultValue {
    pub kind: DefaultKind,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexDef {
    pub columns: Vec<IndexColumn>,
    pub pk: bool,
    pub unique: bool,
    pub name: Option<String>,
    pub note: Option<String>,
    /// Index access method (`btree`, `hash`) when given.
    pub r#type: Option<String>,
}

impl IndexDef {
    /// Plain column names, `None` if any member is an expression index.
    pub fn column_names(&self) -> Option<Vec<String>> {
        self.columns
            .iter()
            .map(|c| match c.kind {
                IndexColumnKind::Column => Some(c.value.clone()),
                IndexColumnKind::Expression => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexColumnKind {
    Column,
    Expression,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexColumn {
    pub kind: IndexColumnKind,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Enum {
    pub schema_name: Option<String>,
    pub name: String,
    pub values: Vec<EnumValue>,
}

impl Enum {
    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumValue {
    pub name: String,
    pub note: Option<String>,
}

/// `<` one-to-many, `>` many-to-one, `-` one-to-one, `<>` many-to-many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "<")]
    OneToMany,
    #[serde(rename = ">")]
    ManyToOne,
    #[serde(rename = "-")]
    OneToOne,
    #[serde(rename = "<>")]
    ManyToMany,
}

impl Relation {
    pub fn as_op(&self) -> &'static str {
        match self {
            Relation::OneToMany => "<",
            Relation::ManyToOne => ">",
            Relation::OneToOne => "-",
            Relation::ManyToMany => "<>",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefEndpoint {
    pub schema_name: Option<String>,
    pub table_name: String,
    pub column_names: Vec<String>,
}

impl RefEndpoint {
    pub fn qualified_name(&self) -> String {
        match &self.schema_name {
            Some(schema) => format!("{}.{}", schema, self.table_name),
            None => self.table_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Ref {
    pub name: Option<String>,
    pub endpoints: [RefEndpoint; 2],
    pub relation: Relation,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableGroupMember {
    pub schema_name: Option<String>,
    pub table_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableGroup {
    pub name: String,
    pub note: Option<String>,
    pub color: Option<String>,
    pub members: Vec<TableGroupMember>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub name: Option<String>,
    pub note: Option<String>,
    pub fields: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablePartial {
    pub name: String,
    pub note: Option<String>,
    pub header_color: Option<String>,
    pub fields: Vec<Field>,
    pub indexes: Vec<IndexDef>,
}

/// Merged, constraint-checked sample data for one table. `columns` is the
/// union of every column referenced by any records block for the table,
/// ordered by the table's field declaration order; every row carries one
/// cell per merged column.
#[derive(Debug, Clone, Serialize)]
pub struct TableRecord {
    pub schema_name: Option<String>,
    pub table_name: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<RecordCell>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Integer,
    Decimal,
    Float,
    Boolean,
    String,
    Datetime,
    Enum,
    Expression,
    Null,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordCell {
    pub r#type: CellType,
    pub value: serde_json::Value,
}

impl RecordCell {
    /// Canonical placeholder for a cell a records block never specified.
    pub fn unknown() -> Self {
        Self {
            r#type: CellType::Unknown,
            value: serde_json::Value::Null,
        }
    }

    pub fn null() -> Self {
        Self {
            r#type: CellType::Null,
            value: serde_json::Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.r#type, CellType::Null | CellType::Unknown)
    }

    /// Canonical comparison key for duplicate/FK checks; `None` for NULLs.
    pub fn key(&self) -> Option<String> {
        if self.is_null() {
            None
        } else {
            Some(self.value.to_string())
        }
    }
}
