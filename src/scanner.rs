use std::mem;

use crate::ast::{Token, TokenKind, Trivia, TriviaKind};
use crate::diagnostics::{CompileErrorCode, Diagnostic, Span};

/// Char-cursor lexer. Never fails as a whole: unrecognized or malformed
/// input becomes `Invalid` tokens paired with diagnostics, and scanning
/// always reaches `Eof`.
///
/// Whitespace and comments are preserved as trivia: a token's trailing
/// trivia runs up to and including the first newline after it, everything
/// else becomes leading trivia of the next token.
pub struct Scanner {
    chars: Vec<(usize, char)>,
    source_len: usize,
    start: usize,
    current: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    pending_trivia: Vec<Trivia>,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.char_indices().collect(),
            source_len: source.len(),
            start: 0,
            current: 0,
            tokens: vec![],
            diagnostics: vec![],
            pending_trivia: vec![],
        }
    }

    pub fn scan(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while !self.is_at_end() {
            self.scan_token();
        }
        let leading = mem::take(&mut self.pending_trivia);
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            offset: self.source_len,
            length: 0,
            leading_trivia: leading,
            trailing_trivia: vec![],
        });
        (self.tokens, self.diagnostics)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn byte_offset(&self, char_idx: usize) -> usize {
        self.chars
            .get(char_idx)
            .map(|(off, _)| *off)
            .unwrap_or(self.source_len)
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).map(|(_, c)| *c).unwrap_or('\0')
    }

    fn peek_next_i(&self, i: usize) -> char {
        self.chars
            .get(self.current + i)
            .map(|(_, c)| *c)
            .unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn text(&self, from: usize, to: usize) -> String {
        self.chars[from..to].iter().map(|(_, c)| *c).collect()
    }

    fn current_span(&self) -> Span {
        Span::new(self.byte_offset(self.start), self.byte_offset(self.current))
    }

    fn push_token(&mut self, kind: TokenKind) {
        let offset = self.byte_offset(self.start);
        let length = self.byte_offset(self.current) - offset;
        let leading_trivia = mem::take(&mut self.pending_trivia);
        let mut trailing_trivia = vec![];
        // Trailing trivia extends up to and including the first newline.
        loop {
            match self.scan_one_trivia() {
                None => break,
                Some(trivia) => {
                    let ends_line = trivia.kind == TriviaKind::Newline
                        || (trivia.kind == TriviaKind::BlockComment
                            && trivia.value.contains('\n'));
                    trailing_trivia.push(trivia);
                    if ends_line {
                        break;
                    }
                }
            }
        }
        self.tokens.push(Token {
            kind,
            offset,
            length,
            leading_trivia,
            trailing_trivia,
        });
    }

    fn scan_one_trivia(&mut self) -> Option<Trivia> {
        let start = self.current;
        let kind = match self.peek() {
            ' ' => {
                while self.peek() == ' ' {
                    self.advance();
                }
                TriviaKind::Space
            }
            '\t' => {
                while self.peek() == '\t' {
                    self.advance();
                }
                TriviaKind::Tab
            }
            '\n' => {
                self.advance();
                TriviaKind::Newline
            }
            '\r' => {
                self.advance();
                self.match_char('\n');
                TriviaKind::Newline
            }
            '/' if self.peek_next_i(1) == '/' => {
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
                TriviaKind::LineComment
            }
            '/' if self.peek_next_i(1) == '*' => {
                self.advance();
                self.advance();
                while !self.is_at_end() && !(self.peek() == '*' && self.peek_next_i(1) == '/') {
                    self.advance();
                }
                self.advance();
                self.advance();
                TriviaKind::BlockComment
            }
            _ => return None,
        };
        Some(Trivia {
            kind,
            value: self.text(start, self.current.min(self.chars.len())),
            offset: self.byte_offset(start),
        })
    }

    fn scan_token(&mut self) {
        if let Some(trivia) = self.scan_one_trivia() {
            self.pending_trivia.push(trivia);
            return;
        }
        self.start = self.current;
        let c = self.advance();
        match c {
            '(' => self.push_token(TokenKind::LParen),
            ')' => self.push_token(TokenKind::RParen),
            '[' => self.push_token(TokenKind::LBracket),
            ']' => self.push_token(TokenKind::RBracket),
            '{' => self.push_token(TokenKind::LBrace),
            '}' => self.push_token(TokenKind::RBrace),
            ',' => self.push_token(TokenKind::Comma),
            ':' => self.push_token(TokenKind::Colon),
            ';' => self.push_token(TokenKind::Semicolon),
            '~' => self.push_token(TokenKind::Tilde),
            '+' => self.push_token(TokenKind::Plus),
            '*' => self.push_token(TokenKind::Star),
            '/' => self.push_token(TokenKind::Slash),
            '%' => self.push_token(TokenKind::Percent),
            '!' => self.push_token(TokenKind::Bang),
            '=' => self.push_token(TokenKind::Equal),
            '-' => self.push_token(TokenKind::Minus),
            '>' => self.push_token(TokenKind::Greater),
            '<' => {
                if self.match_char('>') {
                    self.push_token(TokenKind::LessGreater);
                } else {
                    self.push_token(TokenKind::Less);
                }
            }
            '.' => {
                if self.peek().is_ascii_digit() {
                    self.scan_word();
                } else {
                    self.push_token(TokenKind::Dot);
                }
            }
            '\'' => {
                if self.peek() == '\'' && self.peek_next_i(1) == '\'' {
                    self.advance();
                    self.advance();
                    self.scan_string(true);
                } else {
                    self.scan_string(false);
                }
            }
            '#' => {
                // Color literal like `#3498DB`; kept as an identifier.
                while self.peek().is_ascii_alphanumeric() {
                    self.advance();
                }
                self.push_token(TokenKind::Identifier(self.text(self.start, self.current)));
            }
            '"' => self.scan_quoted_name('"', TokenKind::QuotedVariable as fn(String) -> _),
            '`' => self.scan_quoted_name('`', TokenKind::FunctionLiteral as fn(String) -> _),
            c if c.is_alphanumeric() || c == '_' => self.scan_word(),
            other => {
                self.diagnostics.push(Diagnostic::error(
                    CompileErrorCode::UnknownToken,
                    self.current_span(),
                    format!("Unexpected character `{}`", other),
                ));
                self.push_token(TokenKind::Invalid(other.to_string()));
            }
        }
    }

    fn scan_escape(&mut self, cooked: &mut String) {
        // The backslash itself has already been consumed.
        let escaped = self.advance();
        match escaped {
            'n' => cooked.push('\n'),
            't' => cooked.push('\t'),
            'r' => cooked.push('\r'),
            '0' => cooked.push('\0'),
            '\0' => {}
            other => cooked.push(other),
        }
    }

    /// Single- or triple-quoted string literal; the opening delimiter has
    /// been consumed.
    fn scan_string(&mut self, multiline: bool) {
        let mut cooked = String::new();
        loop {
            if self.is_at_end() {
                self.diagnostics.push(Diagnostic::error(
                    CompileErrorCode::UnterminatedString,
                    self.current_span(),
                    "Found unterminated string",
                ));
                self.push_token(TokenKind::Invalid(cooked));
                return;
            }
            if self.peek() == '\\' {
                self.advance();
                self.scan_escape(&mut cooked);
                continue;
            }
            if multiline {
                if self.peek() == '\'' && self.peek_next_i(1) == '\'' && self.peek_next_i(2) == '\''
                {
                    self.advance();
                    self.advance();
                    self.advance();
                    break;
                }
            } else if self.match_char('\'') {
                break;
            }
            cooked.push(self.advance());
        }
        self.push_token(TokenKind::StringLiteral(cooked));
    }

    /// Double-quoted variable or backtick function literal; the opening
    /// delimiter has been consumed.
    fn scan_quoted_name(&mut self, delimiter: char, make: fn(String) -> TokenKind) {
        let mut cooked = String::new();
        loop {
            if self.is_at_end() {
                self.diagnostics.push(Diagnostic::error(
                    CompileErrorCode::UnterminatedString,
                    self.current_span(),
                    format!("Found unterminated `{}`-quoted value", delimiter),
                ));
                self.push_token(TokenKind::Invalid(cooked));
                return;
            }
            if self.peek() == '\\' {
                self.advance();
                self.scan_escape(&mut cooked);
                continue;
            }
            if self.match_char(delimiter) {
                break;
            }
            cooked.push(self.advance());
        }
        self.push_token(make(cooked));
    }

    fn word_first_char(&self) -> char {
        self.chars[self.start].1
    }

    /// Scans an identifier/number run. Identifiers may start with a digit,
    /// so the run is consumed first and classified afterwards:
    /// `1e3` is a number, `1e` and `1abc` are identifiers, and a run with
    /// two dots (`1.2.3`) is a single UNKNOWN_TOKEN lexical error.
    fn scan_word(&mut self) {
        let digit_led = self.word_first_char().is_ascii_digit() || self.word_first_char() == '.';
        loop {
            let p = self.peek();
            if p.is_alphanumeric() || p == '_' {
                self.advance();
            } else if p == '.'
                && digit_led
                && (self.peek_next_i(1).is_ascii_digit() || self.peek_next_i(1) == '.')
            {
                self.advance();
            } else {
                break;
            }
        }
        let mut text = self.text(self.start, self.current);
        // `1e+5`: the sign and exponent digits belong to the number, but
        // only if digits actually follow the sign (`1e+` stays `1e`, `+`).
        if digit_led
            && (text.ends_with('e') || text.ends_with('E'))
            && is_number(&format!("{}0", text))
            && (self.peek() == '+' || self.peek() == '-')
            && self.peek_next_i(1).is_ascii_digit()
        {
            text.push(self.advance());
            while self.peek().is_ascii_digit() {
                text.push(self.advance());
            }
        }
        if is_number(&text) {
            self.push_token(TokenKind::Number(text));
        } else if text.contains('.') {
            self.diagnostics.push(Diagnostic::error(
                CompileErrorCode::UnknownToken,
                self.current_span(),
                format!("Malformed numeric literal `{}`", text),
            ));
            self.push_token(TokenKind::Invalid(text));
        } else {
            self.push_token(TokenKind::Identifier(text));
        }
    }
}

/// `digits`, `digits.digits`, `digits.`, `.digits`, each with an optional
/// `e`/`E` exponent that must carry at least one digit.
fn is_number(text: &str) -> bool {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(i) => (&text[..i], Some(&text[i + 1..])),
        None => (text, None),
    };
    if let Some(exp) = exponent {
        let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
        if exp.is_empty() || !exp.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(i) => (&mantissa[..i], Some(&mantissa[i + 1..])),
        None => (mantissa, None),
    };
    if !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match frac_part {
        Some(frac) => {
            if !frac.bytes().all(|b| b.is_ascii_digit()) {
                return false;
            }
            !(int_part.is_empty() && frac.is_empty())
        }
        None => !int_part.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TokenKind;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = Scanner::new(source).scan();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn digit_leading_identifier() {
        assert_eq!(
            kinds("1abc"),
            vec![TokenKind::Identifier("1abc".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn exponent_requires_digits_after_sign() {
        assert_eq!(
            kinds("1e+"),
            vec![
                TokenKind::Identifier("1e".into()),
                TokenKind::Plus,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("1e+5"),
            vec![TokenKind::Number("1e+5".into()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("32.1E4"),
            vec![TokenKind::Number("32.1E4".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn two_dots_is_one_unknown_token() {
        let (tokens, diagnostics) = Scanner::new("1.2.3").scan();
        assert_eq!(tokens[0].kind, TokenKind::Invalid("1.2.3".into()));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, CompileErrorCode::UnknownToken);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn trivia_attaches_leading_and_trailing() {
        let (tokens, _) = Scanner::new("a // c\nb").scan();
        assert!(matches!(tokens[0].kind, TokenKind::Identifier(_)));
        // `a` owns the space, the comment and the newline as trailing trivia.
        assert_eq!(tokens[0].trailing_trivia.len(), 3);
        assert!(tokens[0].has_newline_after());
        assert!(tokens[1].leading_trivia.is_empty());
    }

    #[test]
    fn string_kinds() {
        assert_eq!(
            kinds(r#"'s' "v" `now()`"#),
            vec![
                TokenKind::StringLiteral("s".into()),
                TokenKind::QuotedVariable("v".into()),
                TokenKind::FunctionLiteral("now()".into()),
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("'''multi\nline'''"),
            vec![
                TokenKind::StringLiteral("multi\nline".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn hash_color_is_an_identifier() {
        assert_eq!(
            kinds("#3498DB"),
            vec![TokenKind::Identifier("#3498DB".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unknown_character_keeps_scanning() {
        let (tokens, diagnostics) = Scanner::new("a § b").scan();
        assert_eq!(diagnostics.len(), 1);
        let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
        assert!(matches!(kinds[0], TokenKind::Identifier(_)));
        assert!(matches!(kinds[1], TokenKind::Invalid(_)));
        assert!(matches!(kinds[2], TokenKind::Identifier(_)));
    }
}
