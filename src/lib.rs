//! # dbmlc
//!
//! A compiler front end for DBML, the database-markup schema language:
//! source text in, a validated semantic database model out.
//!
//! # Features
//!
//! - Error-recovering scanner and parser: one pass always yields a token
//!   stream, a syntax tree and diagnostics, no matter how broken the input.
//! - Arena-backed symbol binding with schema/table/enum scoping, table
//!   partial injection, and cross-reference resolution.
//! - Two-pass interpretation into a serializable [`database::Database`]:
//!   tables, columns, enums, refs, groups, project metadata, and
//!   constraint-checked sample records.
//! - Editor services: source-text mutation helpers ([`edit`]) and a
//!   cursor-position completion provider ([`suggest`]).
//!
//! # Example
//!
//! ```rust
//! let source = r#"
//!     Table users {
//!       id int [pk, increment]
//!       email varchar(120) [unique, not null]
//!     }
//!
//!     records users(id, email) {
//!       1, 'a@example.com'
//!     }
//! "#;
//!
//! let compilation = dbmlc::compiler::compile(source);
//! assert!(!compilation.has_errors());
//! let users = compilation.database.table(None, "users").unwrap();
//! assert_eq!(users.fields.len(), 2);
//! assert_eq!(compilation.database.records[0].values.len(), 1);
//! ```
pub mod arena;
pub mod ast;
pub mod binder;
pub mod compiler;
pub mod database;
pub mod diagnostics;
pub mod edit;
pub mod interpreter;
pub mod parser;
pub mod records;
pub mod scanner;
pub mod suggest;
