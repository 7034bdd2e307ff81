//! Lexical scanner.
//!
//! Turns raw source text into a flat vector of [`Token`]s terminated by
//! [`TokenKind::Eof`]. Scanning is fail-fast: the first ill-formed lexeme
//! aborts with [`CoreError::Lexical`].

use crate::error::CoreError;

/// Kind of a token produced by the lexer.
///
/// The declaration order is significant: diagnostics list expected tokens
/// sorted by it (keywords, then symbols, then literal classes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    // Keywords
    Begin,
    End,
    If,
    Else,
    Do,
    Until,
    Read,
    Print,
    Int,
    Float,
    Bool,
    Str,
    List,
    True,
    False,
    Not,
    And,
    Or,
    Add,
    Delete,
    Count,
    Size,
    ElementOf,

    // Punctuation and operators
    Semi,    // ;
    Comma,   // ,
    LParen,  // (
    RParen,  // )
    Equal,   // =
    Arrow,   // <-
    EqEq,    // ==
    NotEq,   // ~=
    Less,    // <
    Greater, // >
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /

    // Identifiers and literals
    Ident,
    IntLiteral,
    FloatLiteral,
    StringLiteral,

    Eof,
}

impl TokenKind {
    /// User-facing name of the token kind, as shown in syntax diagnostics.
    pub fn display_name(self) -> &'static str {
        match self {
            TokenKind::Begin => "begin",
            TokenKind::End => "end",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Do => "do",
            TokenKind::Until => "until",
            TokenKind::Read => "read",
            TokenKind::Print => "print",
            TokenKind::Int => "int",
            TokenKind::Float => "float",
            TokenKind::Bool => "bool",
            TokenKind::Str => "string",
            TokenKind::List => "list",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Not => "not",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Add => "add",
            TokenKind::Delete => "delete",
            TokenKind::Count => "count",
            TokenKind::Size => "size",
            TokenKind::ElementOf => "elementOf",
            TokenKind::Semi => ";",
            TokenKind::Comma => ",",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Equal => "=",
            TokenKind::Arrow => "<-",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "~=",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Ident => "identificador",
            TokenKind::IntLiteral => "constante_int",
            TokenKind::FloatLiteral => "constante_float",
            TokenKind::StringLiteral => "constante_string",
            TokenKind::Eof => "EOF",
        }
    }
}

/// A single token. String literal lexemes keep their surrounding quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

impl Token {
    /// Surface text reported as "found" by the parser.
    pub fn found_text(&self) -> &str {
        match self.kind {
            TokenKind::Eof => "EOF",
            TokenKind::StringLiteral => "constante_string",
            _ => &self.lexeme,
        }
    }
}

/// Lex a source string into tokens, stopping at the first invalid lexeme.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        index: 0,
        line: 1,
    };
    lexer.run()
}

/// Size of the backward window inspected when classifying a failure.
const CONTEXT_WINDOW: usize = 30;

/// Category of a lexical failure, decided from the text preceding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexicalFault {
    Identifier,
    StringConstant,
    Comment,
    Symbol,
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    index: usize,
    line: usize,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }

            let start = self.index;
            let kind = match ch {
                b'#' => {
                    self.skip_line_comment();
                    continue;
                }
                b'{' => {
                    self.skip_block_comment(start)?;
                    continue;
                }
                b'"' => {
                    self.lex_string(start)?;
                    TokenKind::StringLiteral
                }
                b'0'..=b'9' => self.lex_number(start)?,
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_ident_or_keyword(start)?,
                b';' => self.single(TokenKind::Semi),
                b',' => self.single(TokenKind::Comma),
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'+' => self.single(TokenKind::Plus),
                b'-' => self.single(TokenKind::Minus),
                b'*' => self.single(TokenKind::Star),
                b'/' => self.single(TokenKind::Slash),
                b'>' => self.single(TokenKind::Greater),
                b'=' => {
                    self.consume_char();
                    if self.peek_char() == Some(b'=') {
                        self.consume_char();
                        TokenKind::EqEq
                    } else {
                        TokenKind::Equal
                    }
                }
                b'<' => {
                    self.consume_char();
                    if self.peek_char() == Some(b'-') {
                        self.consume_char();
                        TokenKind::Arrow
                    } else {
                        TokenKind::Less
                    }
                }
                b'~' if self.peek_next() == Some(b'=') => {
                    self.consume_char();
                    self.consume_char();
                    TokenKind::NotEq
                }
                _ => return Err(self.fail(start, self.line)),
            };

            tokens.push(Token {
                kind,
                lexeme: self.source[start..self.index].to_string(),
                line: self.line,
            });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            line: self.line,
        });
        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.consume_char();
        kind
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                break;
            }
            self.consume_char();
        }
    }

    /// Block comments run from `{` to the next `}` and do not nest.
    fn skip_block_comment(&mut self, start: usize) -> Result<(), CoreError> {
        let opened_at = self.line;
        self.consume_char();
        while let Some(ch) = self.peek_char() {
            match ch {
                b'}' => {
                    self.consume_char();
                    return Ok(());
                }
                b'{' => break,
                _ => self.consume_char(),
            }
        }
        Err(self.fail(start, opened_at))
    }

    fn lex_string(&mut self, start: usize) -> Result<(), CoreError> {
        let opened_at = self.line;
        self.consume_char();
        while let Some(ch) = self.peek_char() {
            match ch {
                b'"' => {
                    self.consume_char();
                    return Ok(());
                }
                b'\n' => break,
                _ => self.consume_char(),
            }
        }
        Err(self.fail(start, opened_at))
    }

    fn lex_number(&mut self, start: usize) -> Result<TokenKind, CoreError> {
        self.consume_digits();

        let mut kind = TokenKind::IntLiteral;
        if self.peek_char() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            self.consume_char();
            self.consume_digits();
            kind = TokenKind::FloatLiteral;
        }

        // `123abc` is a malformed identifier rather than a number and a name.
        if self.peek_char().is_some_and(is_ident_continue) {
            self.consume_ident_run();
            return Err(self.fail(start, self.line));
        }

        // Integer constants are loaded with `ldc.i8`.
        let text = &self.source[start..self.index];
        if kind == TokenKind::IntLiteral && text.parse::<i64>().is_err() {
            return Err(CoreError::Lexical {
                line: self.line,
                message: format!("{text} constante_int fora do intervalo"),
            });
        }
        Ok(kind)
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Result<TokenKind, CoreError> {
        self.consume_ident_run();
        let text = &self.source[start..self.index];

        if let Some(kind) = keyword(text) {
            return Ok(kind);
        }
        if is_valid_identifier(text) {
            Ok(TokenKind::Ident)
        } else {
            Err(self.fail(start, self.line))
        }
    }

    fn consume_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }
    }

    fn consume_ident_run(&mut self) {
        while self.peek_char().is_some_and(is_ident_continue) {
            self.consume_char();
        }
    }

    /// Build the diagnostic for a lexeme that starts at byte `start`.
    fn fail(&self, start: usize, line: usize) -> CoreError {
        let offending = if self.index > start {
            &self.source[start..self.index]
        } else {
            self.source[start..]
                .chars()
                .next()
                .map(|c| &self.source[start..start + c.len_utf8()])
                .unwrap_or("")
        };
        let context = context_before(self.source, start, offending);

        let message = match classify(context, offending) {
            LexicalFault::Identifier => format!("{offending} identificador inválido"),
            LexicalFault::StringConstant => "constante_string inválida".to_string(),
            LexicalFault::Comment => "comentário inválido ou não finalizado".to_string(),
            LexicalFault::Symbol => format!("{offending} símbolo inválido"),
        };
        CoreError::Lexical { line, message }
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if let Some(&ch) = self.chars.get(self.index) {
            if ch == b'\n' {
                self.line += 1;
            }
            self.index += 1;
        }
    }
}

/// Up to [`CONTEXT_WINDOW`] characters before `start`, plus the first
/// character of the offending lexeme.
fn context_before<'a>(source: &'a str, start: usize, offending: &str) -> &'a str {
    let window_start = source[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_WINDOW - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = start + offending.chars().next().map_or(0, char::len_utf8);
    &source[window_start..end]
}

fn classify(context: &str, offending: &str) -> LexicalFault {
    if offending
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return LexicalFault::Identifier;
    }
    if context.ends_with('"') {
        return LexicalFault::StringConstant;
    }
    if context.rfind('{') > context.rfind('}') {
        return LexicalFault::Comment;
    }
    LexicalFault::Symbol
}

fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "begin" => TokenKind::Begin,
        "end" => TokenKind::End,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "do" => TokenKind::Do,
        "until" => TokenKind::Until,
        "read" => TokenKind::Read,
        "print" => TokenKind::Print,
        "int" => TokenKind::Int,
        "float" => TokenKind::Float,
        "bool" => TokenKind::Bool,
        "string" => TokenKind::Str,
        "list" => TokenKind::List,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "not" => TokenKind::Not,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "add" => TokenKind::Add,
        "delete" => TokenKind::Delete,
        "count" => TokenKind::Count,
        "size" => TokenKind::Size,
        "elementOf" => TokenKind::ElementOf,
        _ => return None,
    };
    Some(kind)
}

/// `[a-z][a-z0-9]*(_[0-9]+)?`
fn is_valid_identifier(text: &str) -> bool {
    let (head, suffix) = match text.split_once('_') {
        Some((head, digits)) => (head, Some(digits)),
        None => (text, None),
    };

    let mut head_chars = head.bytes();
    let starts_lower = head_chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let head_ok =
        starts_lower && head_chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let suffix_ok = suffix.is_none_or(|digits| {
        !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit())
    });

    head_ok && suffix_ok
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}
