use strum::IntoDiscriminant;

use crate::ast::{
    AccessExpr, BlockExprNode, BlockItem, BlockNode, ElementBody, ElementKind, ElementNode, Expr,
    FieldDeclarationNode, FunctionApplicationExpr, FunctionLiteralExpr, ListExpr, LiteralExpr,
    LiteralKind, NodeId, Operator, PrefixExpr, InfixExpr, ProgramNode, SettingItem, Token,
    TokenKind, TokenKindVariant, TupleExpr, VariableExpr,
};
use crate::diagnostics::{CompileErrorCode, Diagnostic, Span};

/// Recovery signal. The diagnostic for the offending token has already been
/// recorded when this is raised; catching loops consult the parsing-context
/// stack to decide whether to resynchronize locally or propagate outward.
#[derive(Debug, Clone, Copy)]
pub struct Recover;

type PResult<T> = Result<T, Recover>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParsingContext {
    ElementList,
    BlockBody,
    SettingList,
    TupleGroup,
}

impl ParsingContext {
    /// Can a loop running under this context resume at `token`?
    fn handles(&self, token: &Token, starts_line: bool) -> bool {
        match self {
            ParsingContext::ElementList => matches!(token.kind, TokenKind::Eof)
                || (starts_line && matches!(token.kind, TokenKind::Identifier(_))),
            ParsingContext::BlockBody => {
                starts_line || matches!(token.kind, TokenKind::RBrace | TokenKind::Eof)
            }
            ParsingContext::SettingList => matches!(
                token.kind,
                TokenKind::RBracket | TokenKind::Comma | TokenKind::Eof
            ),
            ParsingContext::TupleGroup => matches!(
                token.kind,
                TokenKind::RParen | TokenKind::Comma | TokenKind::Eof
            ),
        }
    }
}

enum SyncOutcome {
    /// The current (innermost) context handles the token; resume its loop.
    Resume,
    /// An enclosing context handles the token; unwind one level.
    Propagate,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    curr: usize,
    contexts: Vec<ParsingContext>,
    diagnostics: Vec<Diagnostic>,
    next_id: NodeId,
}

pub fn parse_tokens(tokens: &[Token]) -> (ProgramNode, Vec<Diagnostic>) {
    Parser::new(tokens).parse()
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        Self {
            tokens,
            curr: 0,
            contexts: vec![],
            diagnostics: vec![],
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> NodeId {
        self.next_id += 1;
        self.next_id
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.curr.min(self.tokens.len() - 1)]
    }

    fn peek_next_i(&self, i: usize) -> &Token {
        &self.tokens[(self.curr + i).min(self.tokens.len() - 1)]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.curr += 1;
        }
        token
    }

    fn check(&self, variant: TokenKindVariant) -> bool {
        self.peek().kind.discriminant() == variant
    }

    fn match_kind(&mut self, variant: TokenKindVariant) -> bool {
        if self.check(variant) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, variant: TokenKindVariant) -> PResult<Token> {
        if self.check(variant) {
            Ok(self.advance())
        } else {
            Err(self.raise(
                CompileErrorCode::UnexpectedToken,
                format!("Expected `{}`.", variant.variant_str()),
            ))
        }
    }

    fn raise(&mut self, code: CompileErrorCode, message: impl Into<String>) -> Recover {
        let token = self.peek();
        self.diagnostics.push(Diagnostic::error(
            code,
            token.span(),
            format!("{} Found `{}`.", message.into(), token.value()),
        ));
        Recover
    }

    /// Does the token at `idx` begin a fresh source line? The previous
    /// token's trailing trivia owns the first newline, so both sides are
    /// consulted.
    fn starts_line(&self, idx: usize) -> bool {
        if idx == 0 {
            return true;
        }
        let idx = idx.min(self.tokens.len() - 1);
        self.tokens[idx - 1].has_newline_after() || self.tokens[idx].has_newline_before()
    }

    fn at_line_start(&self) -> bool {
        self.starts_line(self.curr)
    }

    /// Core of error recovery: skip tokens until one that some context on
    /// the stack can handle. Returns whether the innermost context is the
    /// handler (resume) or an enclosing one is (propagate one level out).
    /// Always terminates: every non-handled token is skipped and `Eof` is
    /// handled by every context.
    fn synchronize(&mut self) -> SyncOutcome {
        loop {
            let starts_line = self.at_line_start();
            let token = self.peek();
            if matches!(token.kind, TokenKind::Eof) {
                return SyncOutcome::Resume;
            }
            let top = self.contexts.len() - 1;
            if self.contexts[top].handles(token, starts_line) {
                return SyncOutcome::Resume;
            }
            if self.contexts[..top]
                .iter()
                .any(|ctx| ctx.handles(token, starts_line))
            {
                return SyncOutcome::Propagate;
            }
            self.curr += 1;
        }
    }

    /// Parses the whole token stream. Never gives up on the file: malformed
    /// elements are reported and skipped, everything after them is parsed.
    pub fn parse(mut self) -> (ProgramNode, Vec<Diagnostic>) {
        // Token slices from the scanner always end in `Eof`, but the API is
        // public and an empty slice must not panic in `peek`.
        if self.tokens.is_empty() {
            let id = self.next_id();
            return (
                ProgramNode {
                    id,
                    span: Span::new(0, 0),
                    elements: vec![],
                },
                self.diagnostics,
            );
        }
        self.contexts.push(ParsingContext::ElementList);
        let mut elements = vec![];
        while !self.is_at_end() {
            let iter_start = self.curr;
            match self.parse_element() {
                Ok(element) => elements.push(element),
                Err(Recover) => {
                    // Depth 0: synchronize never propagates past here.
                    let _ = self.synchronize();
                    if self.curr == iter_start {
                        self.advance();
                    }
                }
            }
        }
        let end = self.peek().offset;
        let id = self.next_id();
        (
            ProgramNode {
                id,
                span: Span::new(0, end),
                elements,
            },
            self.diagnostics,
        )
    }

    fn parse_element(&mut self) -> PResult<ElementNode> {
        let type_token = self.consume(TokenKindVariant::Identifier)?;
        let kind = ElementKind::from_keyword(&type_token.value());
        if kind == ElementKind::Unknown {
            self.diagnostics.push(Diagnostic::error(
                CompileErrorCode::UnknownElementKind,
                type_token.span(),
                format!("Unknown element type `{}`", type_token.value()),
            ));
        }

        let name = if (self.check(TokenKindVariant::Identifier)
            || self.check(TokenKindVariant::QuotedVariable))
            && !self.check_keyword("as")
        {
            Some(self.parse_name_path()?)
        } else {
            None
        };

        let args = if self.check(TokenKindVariant::LParen) {
            Some(self.parse_tuple()?)
        } else {
            None
        };

        let alias = if self.check_keyword("as") {
            self.advance();
            Some(self.consume_name_token()?)
        } else {
            None
        };

        let mut settings = if self.check(TokenKindVariant::LBracket) {
            Some(self.parse_setting_list()?)
        } else {
            None
        };

        let body = if self.check(TokenKindVariant::LBrace) {
            ElementBody::Block(self.parse_block()?)
        } else if self.match_kind(TokenKindVariant::Colon) {
            ElementBody::Simple(self.parse_expression()?)
        } else {
            self.diagnostics.push(Diagnostic::error(
                CompileErrorCode::MissingElementBody,
                type_token.span(),
                format!(
                    "Element `{}` has no body: expected `{{` or `:`",
                    type_token.value()
                ),
            ));
            ElementBody::None
        };

        // `Ref: a.b > c.d [delete: cascade]` puts the settings after the body.
        if settings.is_none()
            && matches!(body, ElementBody::Simple(_))
            && self.check(TokenKindVariant::LBracket)
            && !self.at_line_start()
        {
            settings = Some(self.parse_setting_list()?);
        }

        let end = match (&body, &settings) {
            (ElementBody::Simple(expr), Some(list)) if list.span.end > expr.span().end => {
                list.span.end
            }
            (ElementBody::Block(block), _) => block.span.end,
            (ElementBody::Simple(expr), _) => expr.span().end,
            (ElementBody::None, _) => type_token.span().end,
        };
        Ok(ElementNode {
            id: self.next_id(),
            span: type_token.span().cover(Span::point(end)),
            kind,
            type_token,
            name,
            alias,
            args,
            settings,
            body,
        })
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        match &self.peek().kind {
            TokenKind::Identifier(ident) => ident.to_lowercase() == keyword,
            _ => false,
        }
    }

    fn consume_name_token(&mut self) -> PResult<Token> {
        if self.check(TokenKindVariant::Identifier) || self.check(TokenKindVariant::QuotedVariable)
        {
            Ok(self.advance())
        } else {
            Err(self.raise(CompileErrorCode::UnexpectedToken, "Expected a name."))
        }
    }

    /// `name`, `schema.name`, possibly quoted components.
    fn parse_name_path(&mut self) -> PResult<Expr> {
        let first = self.consume_name_token()?;
        let mut expr = self.variable(first);
        while self.check(TokenKindVariant::Dot) {
            self.advance();
            let member_token = self.consume_name_token()?;
            let member = self.variable(member_token);
            let span = expr.span().cover(member.span());
            expr = Expr::Access(AccessExpr {
                id: self.next_id(),
                span,
                base: Box::new(expr),
                member: Box::new(member),
            });
        }
        Ok(expr)
    }

    fn variable(&mut self, token: Token) -> Expr {
        Expr::Variable(VariableExpr {
            id: self.next_id(),
            span: token.span(),
            token,
        })
    }

    fn parse_block(&mut self) -> PResult<BlockNode> {
        let lbrace = self.consume(TokenKindVariant::LBrace)?;
        self.contexts.push(ParsingContext::BlockBody);
        let mut items = vec![];
        let end;
        loop {
            if self.check(TokenKindVariant::RBrace) {
                end = self.advance().span().end;
                break;
            }
            if self.is_at_end() {
                self.diagnostics.push(Diagnostic::error(
                    CompileErrorCode::UnexpectedToken,
                    self.peek().span(),
                    "Expected `}`.",
                ));
                end = self.peek().offset;
                break;
            }
            let iter_start = self.curr;
            match self.parse_block_item() {
                Ok(item) => items.push(item),
                Err(Recover) => match self.synchronize() {
                    SyncOutcome::Resume => {
                        if self.curr == iter_start {
                            self.advance();
                        }
                    }
                    SyncOutcome::Propagate => {
                        self.contexts.pop();
                        return Err(Recover);
                    }
                },
            }
        }
        self.contexts.pop();
        Ok(BlockNode {
            id: self.next_id(),
            span: lbrace.span().cover(Span::point(end)),
            items,
        })
    }

    fn parse_block_item(&mut self) -> PResult<BlockItem> {
        if self.check(TokenKindVariant::Identifier) {
            let kind = ElementKind::from_keyword(&self.peek().value());
            let next = self.peek_next_i(1);
            // Nested `indexes { ... }` / `records (a, b) { ... }` / `Note { .. }`.
            if matches!(
                kind,
                ElementKind::Note | ElementKind::Indexes | ElementKind::Records
            ) && matches!(next.kind, TokenKind::LBrace | TokenKind::LParen)
            {
                return Ok(BlockItem::SubElement(self.parse_element()?));
            }
            // `key: value` field line (project fields, `note: 'x'`).
            if matches!(next.kind, TokenKind::Colon) {
                let name = self.advance();
                self.advance();
                let value = self.parse_expression()?;
                let span = name.span().cover(value.span());
                return Ok(BlockItem::Field(FieldDeclarationNode {
                    id: self.next_id(),
                    span,
                    name,
                    value,
                }));
            }
        }
        Ok(BlockItem::Line(self.parse_line()?))
    }

    /// One source line inside a block: a column definition (function
    /// application), an enum value, a record row, or a `~Partial` injection.
    fn parse_line(&mut self) -> PResult<Expr> {
        let first = self.parse_expression()?;

        // Bare comma-separated record row: `1, 'Alice', null`.
        if self.check(TokenKindVariant::Comma) {
            let mut items = vec![first];
            while self.match_kind(TokenKindVariant::Comma) {
                if self.line_ended() {
                    break;
                }
                items.push(self.parse_expression()?);
            }
            let span = items[0].span().cover(items[items.len() - 1].span());
            return Ok(Expr::Tuple(TupleExpr {
                id: self.next_id(),
                span,
                items,
            }));
        }

        let mut args = vec![];
        while !self.line_ended() {
            args.push(self.parse_expression()?);
        }
        if args.is_empty() {
            return Ok(first);
        }
        let span = first.span().cover(args[args.len() - 1].span());
        Ok(Expr::FunctionApplication(FunctionApplicationExpr {
            id: self.next_id(),
            span,
            callee: Box::new(first),
            args,
        }))
    }

    fn line_ended(&self) -> bool {
        matches!(self.peek().kind, TokenKind::RBrace | TokenKind::Eof) || self.at_line_start()
    }

    fn parse_expression(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_unary()?;
        // Relation infixes (`>`, `<`, `-`, `<>`) never span lines.
        while !self.at_line_start()
            && matches!(
                self.peek().kind,
                TokenKind::Less | TokenKind::Greater | TokenKind::LessGreater | TokenKind::Minus
            )
        {
            let op_token = self.advance();
            let op = operator_of(&op_token.kind);
            let right = self.parse_unary()?;
            let span = expr.span().cover(right.span());
            expr = Expr::Infix(InfixExpr {
                id: self.next_id(),
                span,
                op,
                left: Box::new(expr),
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        match self.peek().kind {
            TokenKind::Minus | TokenKind::Plus | TokenKind::Bang | TokenKind::Tilde => {
                let op_token = self.advance();
                let op = operator_of(&op_token.kind);
                let operand = self.parse_unary()?;
                let span = op_token.span().cover(operand.span());
                Ok(Expr::Prefix(PrefixExpr {
                    id: self.next_id(),
                    span,
                    op,
                    expr: Box::new(operand),
                }))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.check(TokenKindVariant::Dot) {
                self.advance();
                let member = if self.check(TokenKindVariant::LParen) {
                    Expr::Tuple(self.parse_tuple()?)
                } else {
                    let token = self.consume_name_token()?;
                    self.variable(token)
                };
                let span = expr.span().cover(member.span());
                expr = Expr::Access(AccessExpr {
                    id: self.next_id(),
                    span,
                    base: Box::new(expr),
                    member: Box::new(member),
                });
            } else if self.check(TokenKindVariant::LParen) && !self.at_line_start() {
                let tuple = self.parse_tuple()?;
                let span = expr.span().cover(tuple.span);
                expr = Expr::Call(crate::ast::CallExpr {
                    id: self.next_id(),
                    span,
                    callee: Box::new(expr),
                    args: tuple.items,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::Number(_) => {
                self.advance();
                Ok(self.literal(token, LiteralKind::Number))
            }
            TokenKind::StringLiteral(_) => {
                self.advance();
                Ok(self.literal(token, LiteralKind::String))
            }
            TokenKind::Identifier(ident) => {
                let lowered = ident.to_lowercase();
                self.advance();
                match lowered.as_str() {
                    "true" | "false" => Ok(self.literal(token, LiteralKind::Boolean)),
                    "null" => Ok(self.literal(token, LiteralKind::Null)),
                    _ => Ok(self.variable(token)),
                }
            }
            TokenKind::QuotedVariable(_) => {
                self.advance();
                Ok(self.variable(token))
            }
            TokenKind::Star => {
                self.advance();
                Ok(self.variable(token))
            }
            TokenKind::FunctionLiteral(_) => {
                self.advance();
                Ok(Expr::FunctionLiteral(FunctionLiteralExpr {
                    id: self.next_id(),
                    span: token.span(),
                    token,
                }))
            }
            TokenKind::LBracket => Ok(Expr::List(self.parse_setting_list()?)),
            TokenKind::LParen => Ok(Expr::Tuple(self.parse_tuple()?)),
            TokenKind::LBrace => self.parse_expr_block(),
            _ => Err(self.raise(
                CompileErrorCode::UnexpectedToken,
                "Expected an expression.",
            )),
        }
    }

    fn literal(&mut self, token: Token, kind: LiteralKind) -> Expr {
        Expr::Literal(LiteralExpr {
            id: self.next_id(),
            span: token.span(),
            kind,
            token,
        })
    }

    /// A stray `{ ... }` in expression position. Parsed for error tolerance
    /// so one bad line cannot desynchronize the enclosing element.
    fn parse_expr_block(&mut self) -> PResult<Expr> {
        let lbrace = self.consume(TokenKindVariant::LBrace)?;
        self.contexts.push(ParsingContext::BlockBody);
        let mut items = vec![];
        let end;
        loop {
            if self.check(TokenKindVariant::RBrace) {
                end = self.advance().span().end;
                break;
            }
            if self.is_at_end() {
                self.diagnostics.push(Diagnostic::error(
                    CompileErrorCode::UnexpectedToken,
                    self.peek().span(),
                    "Expected `}`.",
                ));
                end = self.peek().offset;
                break;
            }
            let iter_start = self.curr;
            match self.parse_line() {
                Ok(expr) => items.push(expr),
                Err(Recover) => match self.synchronize() {
                    SyncOutcome::Resume => {
                        if self.curr == iter_start {
                            self.advance();
                        }
                    }
                    SyncOutcome::Propagate => {
                        self.contexts.pop();
                        return Err(Recover);
                    }
                },
            }
        }
        self.contexts.pop();
        Ok(Expr::Block(BlockExprNode {
            id: self.next_id(),
            span: lbrace.span().cover(Span::point(end)),
            items,
        }))
    }

    fn parse_setting_list(&mut self) -> PResult<ListExpr> {
        let lbracket = self.consume(TokenKindVariant::LBracket)?;
        self.contexts.push(ParsingContext::SettingList);
        let mut items = vec![];
        let end;
        loop {
            if self.check(TokenKindVariant::RBracket) {
                end = self.advance().span().end;
                break;
            }
            if self.is_at_end() {
                self.diagnostics.push(Diagnostic::error(
                    CompileErrorCode::UnexpectedToken,
                    self.peek().span(),
                    "Expected `]`.",
                ));
                end = self.peek().offset;
                break;
            }
            let iter_start = self.curr;
            match self.parse_setting_item() {
                Ok(item) => {
                    items.push(item);
                    if !self.match_kind(TokenKindVariant::Comma)
                        && !self.check(TokenKindVariant::RBracket)
                    {
                        let _ = self.raise(
                            CompileErrorCode::UnexpectedToken,
                            "Expected `,` or `]` after setting.",
                        );
                        match self.synchronize() {
                            SyncOutcome::Resume => {
                                self.match_kind(TokenKindVariant::Comma);
                            }
                            SyncOutcome::Propagate => {
                                self.contexts.pop();
                                return Err(Recover);
                            }
                        }
                    }
                }
                Err(Recover) => match self.synchronize() {
                    SyncOutcome::Resume => {
                        self.match_kind(TokenKindVariant::Comma);
                        if self.curr == iter_start {
                            self.advance();
                        }
                    }
                    SyncOutcome::Propagate => {
                        self.contexts.pop();
                        return Err(Recover);
                    }
                },
            }
        }
        self.contexts.pop();
        Ok(ListExpr {
            id: self.next_id(),
            span: lbracket.span().cover(Span::point(end)),
            items,
        })
    }

    fn parse_setting_item(&mut self) -> PResult<SettingItem> {
        let name_start = self.peek().span();
        let mut words = vec![];
        while self.check(TokenKindVariant::Identifier)
            || self.check(TokenKindVariant::QuotedVariable)
        {
            words.push(self.advance());
        }
        if words.is_empty() {
            return Err(self.raise(
                CompileErrorCode::UnexpectedToken,
                "Expected a setting name.",
            ));
        }
        let name_span = name_start.cover(words[words.len() - 1].span());
        let name = words
            .iter()
            .map(|t| t.value().to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let value = if self.match_kind(TokenKindVariant::Colon) {
            Some(self.parse_setting_value()?)
        } else {
            None
        };
        let span = match &value {
            Some(v) => name_span.cover(v.span()),
            None => name_span,
        };
        Ok(SettingItem {
            id: self.next_id(),
            span,
            name,
            name_span,
            value,
        })
    }

    /// A setting value: `ref: > users.id` uses a relation-op prefix,
    /// `delete: set null` is a multi-word application, anything else is a
    /// plain expression.
    fn parse_setting_value(&mut self) -> PResult<Expr> {
        if matches!(
            self.peek().kind,
            TokenKind::Less | TokenKind::Greater | TokenKind::LessGreater
        ) {
            let op_token = self.advance();
            let op = operator_of(&op_token.kind);
            let operand = self.parse_expression()?;
            let span = op_token.span().cover(operand.span());
            return Ok(Expr::Prefix(PrefixExpr {
                id: self.next_id(),
                span,
                op,
                expr: Box::new(operand),
            }));
        }
        let first = self.parse_expression()?;
        let mut args = vec![];
        while matches!(
            self.peek().kind,
            TokenKind::Identifier(_) | TokenKind::QuotedVariable(_)
        ) && !self.at_line_start()
        {
            args.push(self.parse_expression()?);
        }
        if args.is_empty() {
            return Ok(first);
        }
        let span = first.span().cover(args[args.len() - 1].span());
        Ok(Expr::FunctionApplication(FunctionApplicationExpr {
            id: self.next_id(),
            span,
            callee: Box::new(first),
            args,
        }))
    }

    fn parse_tuple(&mut self) -> PResult<TupleExpr> {
        let lparen = self.consume(TokenKindVariant::LParen)?;
        self.contexts.push(ParsingContext::TupleGroup);
        let mut items = vec![];
        let end;
        loop {
            if self.check(TokenKindVariant::RParen) {
                end = self.advance().span().end;
                break;
            }
            if self.is_at_end() {
                self.diagnostics.push(Diagnostic::error(
                    CompileErrorCode::UnexpectedToken,
                    self.peek().span(),
                    "Expected `)`.",
                ));
                end = self.peek().offset;
                break;
            }
            let iter_start = self.curr;
            match self.parse_expression() {
                Ok(expr) => {
                    items.push(expr);
                    if !self.match_kind(TokenKindVariant::Comma)
                        && !self.check(TokenKindVariant::RParen)
                    {
                        let _ = self.raise(
                            CompileErrorCode::UnexpectedToken,
                            "Expected `,` or `)` in group.",
                        );
                        match self.synchronize() {
                            SyncOutcome::Resume => {
                                self.match_kind(TokenKindVariant::Comma);
                            }
                            SyncOutcome::Propagate => {
                                self.contexts.pop();
                                return Err(Recover);
                            }
                        }
                    }
                }
                Err(Recover) => match self.synchronize() {
                    SyncOutcome::Resume => {
                        self.match_kind(TokenKindVariant::Comma);
                        if self.curr == iter_start {
                            self.advance();
                        }
                    }
                    SyncOutcome::Propagate => {
                        self.contexts.pop();
                        return Err(Recover);
                    }
                },
            }
        }
        self.contexts.pop();
        Ok(TupleExpr {
            id: self.next_id(),
            span: lparen.span().cover(Span::point(end)),
            items,
        })
    }
}

fn operator_of(kind: &TokenKind) -> Operator {
    match kind {
        TokenKind::Less => Operator::Less,
        TokenKind::Greater => Operator::Greater,
        TokenKind::LessGreater => Operator::LessGreater,
        TokenKind::Minus => Operator::Minus,
        TokenKind::Plus => Operator::Plus,
        TokenKind::Bang => Operator::Bang,
        TokenKind::Tilde => Operator::Tilde,
        other => unreachable!("not an operator token: {:?}", other),
    }
}
