//! Pipeline driver: scan, parse, bind, interpret, evaluate records.
//!
//! Each stage consumes the previous one's output and appends to a shared
//! diagnostics list; no stage aborts the pipeline, so a file with errors
//! still produces tokens, a syntax tree, and as much of the database as
//! could be built.

use crate::ast::{ProgramNode, Token};
use crate::binder::{self, Analysis};
use crate::database::Database;
use crate::diagnostics::Diagnostic;
use crate::interpreter;
use crate::parser;
use crate::records;
use crate::scanner::Scanner;

pub struct Compilation {
    pub source: String,
    pub tokens: Vec<Token>,
    pub program: ProgramNode,
    pub analysis: Analysis,
    pub database: Database,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    /// All diagnostics rendered against this compilation's source, in
    /// source order.
    pub fn render_diagnostics(&self) -> Vec<String> {
        let mut sorted: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        sorted.sort_by_key(|d| d.span.map(|s| s.start).unwrap_or(usize::MAX));
        sorted.iter().map(|d| d.render(&self.source)).collect()
    }
}

/// Owning wrapper for editor-style callers that recompile on every edit.
/// Node and symbol ids are fresh per [`Compiler::set_source`] call.
#[derive(Default)]
pub struct Compiler {
    compilation: Option<Compilation>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source(&mut self, source: &str) {
        self.compilation = Some(compile(source));
    }

    pub fn compilation(&self) -> Option<&Compilation> {
        self.compilation.as_ref()
    }

    pub fn tokens(&self) -> &[Token] {
        self.compilation.as_ref().map(|c| c.tokens.as_slice()).unwrap_or(&[])
    }

    pub fn ast(&self) -> Option<&ProgramNode> {
        self.compilation.as_ref().map(|c| &c.program)
    }

    pub fn errors(&self) -> &[Diagnostic] {
        self.compilation
            .as_ref()
            .map(|c| c.diagnostics.as_slice())
            .unwrap_or(&[])
    }

    pub fn raw_db(&self) -> Option<&Database> {
        self.compilation.as_ref().map(|c| &c.database)
    }
}

pub fn compile(source: &str) -> Compilation {
    let (tokens, mut diagnostics) = Scanner::new(source).scan();
    let (program, parse_diagnostics) = parser::parse_tokens(&tokens);
    diagnostics.extend(parse_diagnostics);

    let (analysis, bind_diagnostics) = binder::bind(&program);
    diagnostics.extend(bind_diagnostics);

    let mut database = interpreter::interpret(&program, &analysis, source);
    let (table_records, record_diagnostics) =
        records::evaluate_records(&program, &analysis, &database);
    database.records = table_records;
    diagnostics.extend(record_diagnostics);

    Compilation {
        source: source.to_owned(),
        tokens,
        program,
        analysis,
        database,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CompileErrorCode;

    #[test]
    fn errors_do_not_stop_the_pipeline() {
        let source = "\
Table users {
  id int [pk]
  name varchar %
}

Table posts {
  id int [pk]
}
";
        let compilation = compile(source);
        assert!(compilation.has_errors());
        // Both tables still come out the other end.
        assert_eq!(compilation.database.tables.len(), 2);
    }

    #[test]
    fn clean_source_compiles_without_diagnostics() {
        let source = "\
Table users {
  id int [pk, increment]
  email varchar(120) [unique, not null]
}

records users(id, email) {
  1, 'a@example.com'
  2, 'b@example.com'
}
";
        let compilation = compile(source);
        assert!(compilation.diagnostics.is_empty(), "{:?}", compilation.diagnostics);
        assert_eq!(compilation.database.records.len(), 1);
        assert_eq!(compilation.database.records[0].values.len(), 2);
    }

    #[test]
    fn record_constraints_surface_as_diagnostics() {
        let source = "\
Table users {
  id int [pk]
}

records users(id) {
  1
  1
}
";
        let compilation = compile(source);
        assert!(
            compilation
                .diagnostics
                .iter()
                .any(|d| d.code == CompileErrorCode::DuplicatePrimaryKey)
        );
    }
}
