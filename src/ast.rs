use serde::{Deserialize, Serialize};
use strum_macros::EnumDiscriminants;

use crate::diagnostics::Span;

/// Monotonic per-compilation syntax node id. Symbols refer back to nodes
/// through these ids instead of owning references.
pub type NodeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriviaKind {
    Space,
    Tab,
    Newline,
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub value: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(TokenKindVariant), derive(Hash))]
pub enum TokenKind {
    /// Bare identifier. May start with a digit (`1abc` is a valid name).
    Identifier(String),
    /// Double-quoted variable/identifier.
    QuotedVariable(String),
    /// Single-quoted (or triple-single-quoted) string literal.
    StringLiteral(String),
    /// Backtick-delimited function/expression literal.
    FunctionLiteral(String),
    /// Numeric literal, kept as written for digit-precision checks.
    Number(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Tilde,
    Less,
    Greater,
    LessGreater,
    Minus,
    Plus,
    Star,
    Slash,
    Percent,
    Bang,
    Equal,
    /// Unrecognized or malformed input. Always paired with a diagnostic.
    Invalid(String),
    Eof,
}

impl TokenKindVariant {
    pub fn variant_str(&self) -> &'static str {
        match self {
            TokenKindVariant::Identifier => "identifier",
            TokenKindVariant::QuotedVariable => "quoted identifier",
            TokenKindVariant::StringLiteral => "string",
            TokenKindVariant::FunctionLiteral => "function expression",
            TokenKindVariant::Number => "number",
            TokenKindVariant::LParen => "(",
            TokenKindVariant::RParen => ")",
            TokenKindVariant::LBracket => "[",
            TokenKindVariant::RBracket => "]",
            TokenKindVariant::LBrace => "{",
            TokenKindVariant::RBrace => "}",
            TokenKindVariant::Comma => ",",
            TokenKindVariant::Colon => ":",
            TokenKindVariant::Semicolon => ";",
            TokenKindVariant::Dot => ".",
            TokenKindVariant::Tilde => "~",
            TokenKindVariant::Less => "<",
            TokenKindVariant::Greater => ">",
            TokenKindVariant::LessGreater => "<>",
            TokenKindVariant::Minus => "-",
            TokenKindVariant::Plus => "+",
            TokenKindVariant::Star => "*",
            TokenKindVariant::Slash => "/",
            TokenKindVariant::Percent => "%",
            TokenKindVariant::Bang => "!",
            TokenKindVariant::Equal => "=",
            TokenKindVariant::Invalid => "invalid token",
            TokenKindVariant::Eof => "eof",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
    pub length: usize,
    pub leading_trivia: Vec<Trivia>,
    pub trailing_trivia: Vec<Trivia>,
}

impl Token {
    pub fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.length)
    }

    /// Cooked value for payload-carrying tokens, operator text otherwise.
    pub fn value(&self) -> String {
        use strum::IntoDiscriminant;
        match &self.kind {
            TokenKind::Identifier(s)
            | TokenKind::QuotedVariable(s)
            | TokenKind::StringLiteral(s)
            | TokenKind::FunctionLiteral(s)
            | TokenKind::Number(s)
            | TokenKind::Invalid(s) => s.clone(),
            other => other.discriminant().variant_str().to_owned(),
        }
    }

    /// A newline sits in this token's leading trivia. Because trailing
    /// trivia swallows the first newline after a token, "does the next token
    /// start a fresh line" needs both this and [`Token::has_newline_after`]
    /// of the previous token; the parser combines the two.
    pub fn has_newline_before(&self) -> bool {
        Self::trivia_has_newline(&self.leading_trivia)
    }

    pub fn has_newline_after(&self) -> bool {
        Self::trivia_has_newline(&self.trailing_trivia)
    }

    fn trivia_has_newline(trivia: &[Trivia]) -> bool {
        trivia.iter().any(|t| {
            t.kind == TriviaKind::Newline
                || (t.kind == TriviaKind::BlockComment && t.value.contains('\n'))
        })
    }
}

/// Element kinds, dispatched by the normalized lowercase keyword of the
/// element's type token. A closed enum: every consumer matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Table,
    Enum,
    Ref,
    TableGroup,
    Project,
    Note,
    TablePartial,
    Function,
    Records,
    Indexes,
    /// Keyword not recognized; reported at parse time, skipped by the binder.
    Unknown,
}

impl ElementKind {
    pub fn from_keyword(keyword: &str) -> ElementKind {
        match keyword.to_lowercase().as_str() {
            "table" => ElementKind::Table,
            "enum" => ElementKind::Enum,
            "ref" => ElementKind::Ref,
            "tablegroup" => ElementKind::TableGroup,
            "project" => ElementKind::Project,
            "note" => ElementKind::Note,
            "tablepartial" => ElementKind::TablePartial,
            "function" => ElementKind::Function,
            "records" => ElementKind::Records,
            "indexes" => ElementKind::Indexes,
            _ => ElementKind::Unknown,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ElementKind::Table => "table",
            ElementKind::Enum => "enum",
            ElementKind::Ref => "ref",
            ElementKind::TableGroup => "tablegroup",
            ElementKind::Project => "project",
            ElementKind::Note => "note",
            ElementKind::TablePartial => "tablepartial",
            ElementKind::Function => "function",
            ElementKind::Records => "records",
            ElementKind::Indexes => "indexes",
            ElementKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramNode {
    pub id: NodeId,
    pub span: Span,
    pub elements: Vec<ElementNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementNode {
    pub id: NodeId,
    pub span: Span,
    pub kind: ElementKind,
    pub type_token: Token,
    pub name: Option<Expr>,
    pub alias: Option<Token>,
    /// Parenthesized argument list after the name; used by `records t(a, b)`.
    pub args: Option<TupleExpr>,
    pub settings: Option<ListExpr>,
    pub body: ElementBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElementBody {
    Block(BlockNode),
    /// `: <expr>` short body (`Note: 'x'`, `Ref: a.b > c.d`).
    Simple(Expr),
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockNode {
    pub id: NodeId,
    pub span: Span,
    pub items: Vec<BlockItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BlockItem {
    /// Nested element (`indexes { ... }`, `records (a, b) { ... }`, `Note { .. }`).
    SubElement(ElementNode),
    /// `key: value` line (project fields, `note: 'x'` inside a table).
    Field(FieldDeclarationNode),
    /// Everything else: column lines, enum values, record rows, `~Partial`.
    Line(Expr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDeclarationNode {
    pub id: NodeId,
    pub span: Span,
    pub name: Token,
    pub value: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(ExprVariant), derive(Hash))]
pub enum Expr {
    Literal(LiteralExpr),
    Variable(VariableExpr),
    FunctionLiteral(FunctionLiteralExpr),
    Prefix(PrefixExpr),
    Infix(InfixExpr),
    Access(AccessExpr),
    Call(CallExpr),
    List(ListExpr),
    Tuple(TupleExpr),
    Block(BlockExprNode),
    FunctionApplication(FunctionApplicationExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    Number,
    String,
    Boolean,
    Null,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: LiteralKind,
    pub token: Token,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableExpr {
    pub id: NodeId,
    pub span: Span,
    pub token: Token,
}

impl VariableExpr {
    pub fn name(&self) -> String {
        self.token.value()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionLiteralExpr {
    pub id: NodeId,
    pub span: Span,
    pub token: Token,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Less,
    Greater,
    LessGreater,
    Minus,
    Plus,
    Bang,
    Tilde,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessGreater => "<>",
            Operator::Minus => "-",
            Operator::Plus => "+",
            Operator::Bang => "!",
            Operator::Tilde => "~",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixExpr {
    pub id: NodeId,
    pub span: Span,
    pub op: Operator,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfixExpr {
    pub id: NodeId,
    pub span: Span,
    pub op: Operator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

/// Dotted access `a.b`; `member` is a variable or, for composite ref
/// endpoints like `orders.(merchant_id, country)`, a tuple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessExpr {
    pub id: NodeId,
    pub span: Span,
    pub base: Box<Expr>,
    pub member: Box<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub id: NodeId,
    pub span: Span,
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListExpr {
    pub id: NodeId,
    pub span: Span,
    pub items: Vec<SettingItem>,
}

/// One `name` or `name: value` entry of a settings list. Multi-word names
/// (`not null`, `primary key`) are normalized to lowercase, space-joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingItem {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub name_span: Span,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleExpr {
    pub id: NodeId,
    pub span: Span,
    pub items: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockExprNode {
    pub id: NodeId,
    pub span: Span,
    pub items: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionApplicationExpr {
    pub id: NodeId,
    pub span: Span,
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Literal(e) => e.id,
            Expr::Variable(e) => e.id,
            Expr::FunctionLiteral(e) => e.id,
            Expr::Prefix(e) => e.id,
            Expr::Infix(e) => e.id,
            Expr::Access(e) => e.id,
            Expr::Call(e) => e.id,
            Expr::List(e) => e.id,
            Expr::Tuple(e) => e.id,
            Expr::Block(e) => e.id,
            Expr::FunctionApplication(e) => e.id,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Variable(e) => e.span,
            Expr::FunctionLiteral(e) => e.span,
            Expr::Prefix(e) => e.span,
            Expr::Infix(e) => e.span,
            Expr::Access(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::List(e) => e.span,
            Expr::Tuple(e) => e.span,
            Expr::Block(e) => e.span,
            Expr::FunctionApplication(e) => e.span,
        }
    }

    /// Flattens a (possibly quoted) dotted name like `myschema."my table"`
    /// into its string parts, outermost first. Returns `None` for
    /// expressions that are not plain name paths.
    pub fn name_parts(&self) -> Option<Vec<String>> {
        Some(self.path_variables()?.iter().map(|v| v.name()).collect())
    }

    /// The variable nodes of a dotted name path, outermost first. Used to
    /// attach symbol references to the exact name component a use site
    /// mentions (e.g. the table part of `users.id`).
    pub fn path_variables(&self) -> Option<Vec<&VariableExpr>> {
        match self {
            Expr::Variable(v) => Some(vec![v]),
            Expr::Access(a) => {
                let mut parts = a.base.path_variables()?;
                match a.member.as_ref() {
                    Expr::Variable(v) => parts.push(v),
                    _ => return None,
                }
                Some(parts)
            }
            _ => None,
        }
    }
}
