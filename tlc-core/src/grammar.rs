//! Grammar rule classification and expected-token descriptions used in
//! syntax diagnostics.

use std::collections::BTreeSet;

use crate::lexer::TokenKind;

/// Rules of the recursive-descent parser, tracked on a rule stack while
/// parsing so diagnostics know which construct was being recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarRule {
    Program,
    Commands,
    Declaration,
    Type,
    Primitive,
    Assignment,
    Print,
    Read,
    If,
    DoUntil,
    ListAdd,
    ListDelete,
    Expression,
    Relational,
    Additive,
    Multiplicative,
    Unary,
    Primary,
}

impl GrammarRule {
    pub fn is_expression(self) -> bool {
        match self {
            GrammarRule::Expression
            | GrammarRule::Relational
            | GrammarRule::Additive
            | GrammarRule::Multiplicative
            | GrammarRule::Unary
            | GrammarRule::Primary => true,
            GrammarRule::Program
            | GrammarRule::Commands
            | GrammarRule::Declaration
            | GrammarRule::Type
            | GrammarRule::Primitive
            | GrammarRule::Assignment
            | GrammarRule::Print
            | GrammarRule::Read
            | GrammarRule::If
            | GrammarRule::DoUntil
            | GrammarRule::ListAdd
            | GrammarRule::ListDelete => false,
        }
    }
}

pub const PRIMITIVE_TYPES: [TokenKind; 4] = [
    TokenKind::Int,
    TokenKind::Float,
    TokenKind::Bool,
    TokenKind::Str,
];

pub const ALL_TYPES: [TokenKind; 5] = [
    TokenKind::Int,
    TokenKind::Float,
    TokenKind::Bool,
    TokenKind::Str,
    TokenKind::List,
];

/// Render the "esperado" part of a syntax error from the set of tokens the
/// parser would have accepted.
pub fn describe_expected(expected: &[TokenKind], in_expression: bool) -> String {
    let set: BTreeSet<TokenKind> = expected.iter().copied().collect();

    if set.is_empty() {
        return "fim de expressão".to_string();
    }

    if ALL_TYPES.iter().all(|kind| set.contains(kind)) {
        let mut names: Vec<&str> = set
            .iter()
            .filter(|kind| !ALL_TYPES.contains(*kind))
            .map(|kind| kind.display_name())
            .collect();
        names.push("tipo");
        return names.join(" ");
    }

    if set.len() == PRIMITIVE_TYPES.len() && PRIMITIVE_TYPES.iter().all(|kind| set.contains(kind))
    {
        return "tipo primitivo".to_string();
    }

    if in_expression {
        return "expressão".to_string();
    }

    set.iter()
        .map(|kind| kind.display_name())
        .collect::<Vec<_>>()
        .join(" ")
}
