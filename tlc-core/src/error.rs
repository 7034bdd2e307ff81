use thiserror::Error;

/// Fatal outcome of a compilation.
///
/// The first three variants are user-facing diagnostics and always carry the
/// 1-based source line. `Internal` means the translator broke one of its own
/// invariants and should be reported as a compiler bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("linha {line}: {message}")]
    Lexical { line: usize, message: String },
    #[error("linha {line}: encontrado {found} esperado {expected}")]
    Syntax {
        line: usize,
        found: String,
        expected: String,
    },
    #[error("linha {line}: {message}")]
    Semantic { line: usize, message: String },
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn semantic(line: usize, message: impl Into<String>) -> Self {
        CoreError::Semantic {
            line,
            message: message.into(),
        }
    }

    /// Source line of a user-facing diagnostic.
    pub fn line(&self) -> Option<usize> {
        match self {
            CoreError::Lexical { line, .. }
            | CoreError::Syntax { line, .. }
            | CoreError::Semantic { line, .. } => Some(*line),
            CoreError::Internal(_) => None,
        }
    }

    /// Short category name, used by front ends when labelling the message.
    pub fn category(&self) -> &'static str {
        match self {
            CoreError::Lexical { .. } => "erro léxico",
            CoreError::Syntax { .. } => "erro sintático",
            CoreError::Semantic { .. } => "erro semântico",
            CoreError::Internal(_) => "erro interno",
        }
    }
}
