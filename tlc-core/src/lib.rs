//! Core compiler for the TLC teaching language.
//!
//! The pipeline is a single pass:
//!
//!   source text
//!     -> lexer       (tokens, fail-fast)
//!     -> parser      (recursive descent, calls the translator per rule)
//!     -> translator  (type checks on an operand stack, label stack)
//!     -> codegen     (CIL text for `ilasm`)
//!
//! Front ends (the CLI, an editor) should depend on this crate rather than
//! reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod grammar;
pub mod parser;

// ---------------------------------------------------------------------
// Semantic layers: types, symbols, translation
// ---------------------------------------------------------------------

pub mod types;
pub mod symbols;
pub mod translator;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, CompileOptions, compile, compile_with_options, scan};
pub use error::CoreError;
pub use lexer::{Token, TokenKind};
pub use translator::Warning;
