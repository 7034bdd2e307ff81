//! Recursive-descent parser driving the translator.
//!
//! There is no syntax tree: every rule function calls the [`Translator`] as
//! soon as the construct it recognises is complete, so parsing and code
//! generation happen in a single pass over the tokens. The first error of any
//! kind stops the compilation.

use crate::compiler::CompileOptions;
use crate::error::CoreError;
use crate::grammar::{ALL_TYPES, GrammarRule, PRIMITIVE_TYPES, describe_expected};
use crate::lexer::{Token, TokenKind};
use crate::translator::{
    ArithmeticOp, LogicalOp, RelationalOp, Translation, Translator, UnaryOp,
};
use crate::types::Type;

const COMMAND_START: [TokenKind; 12] = [
    TokenKind::Int,
    TokenKind::Float,
    TokenKind::Bool,
    TokenKind::Str,
    TokenKind::List,
    TokenKind::Ident,
    TokenKind::Print,
    TokenKind::Read,
    TokenKind::If,
    TokenKind::Do,
    TokenKind::Add,
    TokenKind::Delete,
];

const EXPRESSION_START: [TokenKind; 13] = [
    TokenKind::True,
    TokenKind::False,
    TokenKind::Not,
    TokenKind::Count,
    TokenKind::Size,
    TokenKind::ElementOf,
    TokenKind::LParen,
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Ident,
    TokenKind::IntLiteral,
    TokenKind::FloatLiteral,
    TokenKind::StringLiteral,
];

/// Parse and translate a token stream produced by [`crate::lexer::tokenize`].
pub fn parse(tokens: &[Token], options: &CompileOptions) -> Result<Translation, CoreError> {
    if tokens.last().map(|token| token.kind) != Some(TokenKind::Eof) {
        return Err(CoreError::Internal(
            "token stream is not terminated by EOF".to_string(),
        ));
    }

    let mut parser = Parser {
        tokens,
        position: 0,
        rules: Vec::new(),
        tx: Translator::new(options),
    };
    parser.program()?;
    parser.tx.finish()
}

struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    rules: Vec<GrammarRule>,
    tx: Translator,
}

impl<'a> Parser<'a> {
    // -----------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------

    fn current(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[self.position.min(tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    /// Consume the current token. The trailing EOF is never consumed.
    fn advance(&mut self) -> &'a Token {
        let token = self.current();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, CoreError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&[kind]))
        }
    }

    fn unexpected(&self, expected: &[TokenKind]) -> CoreError {
        let token = self.current();
        let in_expression = self.rules.iter().any(|rule| rule.is_expression());
        CoreError::Syntax {
            line: token.line,
            found: token.found_text().to_string(),
            expected: describe_expected(expected, in_expression),
        }
    }

    fn within<T>(
        &mut self,
        rule: GrammarRule,
        body: impl FnOnce(&mut Self) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        self.rules.push(rule);
        let result = body(self);
        self.rules.pop();
        result
    }

    /// `,` continues a list of items, `)` closes it.
    fn comma_or_close(&mut self) -> Result<bool, CoreError> {
        match self.current().kind {
            TokenKind::Comma => {
                self.advance();
                Ok(true)
            }
            TokenKind::RParen => {
                self.advance();
                Ok(false)
            }
            _ => Err(self.unexpected(&[TokenKind::Comma, TokenKind::RParen])),
        }
    }

    // -----------------------------------------------------------------
    // Program and commands
    // -----------------------------------------------------------------

    fn program(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Program, |p| {
            p.expect(TokenKind::Begin)?;
            p.commands(&[TokenKind::End])?;
            p.expect(TokenKind::End)?;
            p.expect(TokenKind::Eof)?;
            Ok(())
        })
    }

    /// Parse commands until one of `terminators` is reached. The terminator
    /// itself is left for the caller.
    fn commands(&mut self, terminators: &[TokenKind]) -> Result<(), CoreError> {
        self.within(GrammarRule::Commands, |p| {
            loop {
                let kind = p.current().kind;
                if terminators.contains(&kind) {
                    return Ok(());
                }
                if !COMMAND_START.contains(&kind) {
                    let mut expected = COMMAND_START.to_vec();
                    expected.extend_from_slice(terminators);
                    return Err(p.unexpected(&expected));
                }
                p.command()?;
                p.tx.end_statement()?;
            }
        })
    }

    fn command(&mut self) -> Result<(), CoreError> {
        match self.current().kind {
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Bool
            | TokenKind::Str
            | TokenKind::List => self.declaration(),
            TokenKind::Ident => self.assignment(),
            TokenKind::Print => self.print(),
            TokenKind::Read => self.read(),
            TokenKind::If => self.if_statement(),
            TokenKind::Do => self.do_until(),
            TokenKind::Add => self.list_add(),
            TokenKind::Delete => self.list_delete(),
            _ => Err(self.unexpected(&COMMAND_START)),
        }
    }

    fn declaration(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Declaration, |p| {
            let (ty, element) = p.type_name()?;
            loop {
                let name = p.expect(TokenKind::Ident)?;
                p.tx.declare_variable(&name.lexeme, ty, element, name.line)?;
                match p.current().kind {
                    TokenKind::Comma => {
                        p.advance();
                    }
                    TokenKind::Semi => {
                        p.advance();
                        return Ok(());
                    }
                    _ => return Err(p.unexpected(&[TokenKind::Semi, TokenKind::Comma])),
                }
            }
        })
    }

    fn type_name(&mut self) -> Result<(Type, Option<Type>), CoreError> {
        self.within(GrammarRule::Type, |p| {
            if p.at(TokenKind::List) {
                p.advance();
                p.expect(TokenKind::LParen)?;
                let element = p.primitive()?;
                p.expect(TokenKind::RParen)?;
                return Ok((Type::List, Some(element)));
            }
            match primitive_type(p.current().kind) {
                Some(ty) => {
                    p.advance();
                    Ok((ty, None))
                }
                None => Err(p.unexpected(&ALL_TYPES)),
            }
        })
    }

    fn primitive(&mut self) -> Result<Type, CoreError> {
        self.within(GrammarRule::Primitive, |p| {
            match primitive_type(p.current().kind) {
                Some(ty) => {
                    p.advance();
                    Ok(ty)
                }
                None => Err(p.unexpected(&PRIMITIVE_TYPES)),
            }
        })
    }

    fn assignment(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Assignment, |p| {
            let target = p.expect(TokenKind::Ident)?;
            p.tx.begin_assignment(&target.lexeme, target.line)?;
            match p.current().kind {
                TokenKind::Equal | TokenKind::Arrow => {
                    p.advance();
                }
                _ => return Err(p.unexpected(&[TokenKind::Equal, TokenKind::Arrow])),
            }
            p.expression()?;
            p.tx.assign(&target.lexeme, target.line)?;
            p.expect(TokenKind::Semi)?;
            Ok(())
        })
    }

    fn print(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Print, |p| {
            p.expect(TokenKind::Print)?;
            p.expect(TokenKind::LParen)?;
            loop {
                let line = p.current().line;
                p.expression()?;
                p.tx.write_value(line)?;
                if !p.comma_or_close()? {
                    break;
                }
            }
            p.tx.write_new_line();
            p.expect(TokenKind::Semi)?;
            Ok(())
        })
    }

    fn read(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Read, |p| {
            p.expect(TokenKind::Read)?;
            p.expect(TokenKind::LParen)?;
            loop {
                let prompt = if p.at(TokenKind::StringLiteral) {
                    let prompt = p.advance();
                    p.expect(TokenKind::Comma)?;
                    Some(prompt.lexeme.as_str())
                } else {
                    None
                };
                if !p.at(TokenKind::Ident) {
                    let expected: &[TokenKind] = if prompt.is_some() {
                        &[TokenKind::Ident]
                    } else {
                        &[TokenKind::Ident, TokenKind::StringLiteral]
                    };
                    return Err(p.unexpected(expected));
                }
                let target = p.advance();
                p.tx.read_into(&target.lexeme, prompt, target.line)?;
                if !p.comma_or_close()? {
                    break;
                }
            }
            p.expect(TokenKind::Semi)?;
            Ok(())
        })
    }

    fn if_statement(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::If, |p| {
            p.expect(TokenKind::If)?;
            let line = p.current().line;
            p.expression()?;
            p.tx.begin_if(line)?;
            p.commands(&[TokenKind::Else, TokenKind::End])?;
            if p.at(TokenKind::Else) {
                p.advance();
                p.tx.begin_else()?;
                p.commands(&[TokenKind::End])?;
            }
            p.expect(TokenKind::End)?;
            p.tx.end_if()
        })
    }

    fn do_until(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::DoUntil, |p| {
            p.expect(TokenKind::Do)?;
            p.tx.begin_do();
            p.commands(&[TokenKind::Until])?;
            p.expect(TokenKind::Until)?;
            let line = p.current().line;
            p.expression()?;
            p.tx.end_do(line)
        })
    }

    fn list_add(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::ListAdd, |p| {
            p.expect(TokenKind::Add)?;
            p.expect(TokenKind::LParen)?;
            let list = p.expect(TokenKind::Ident)?;
            let element = p.tx.begin_list_call(&list.lexeme, list.line)?;
            p.expect(TokenKind::Comma)?;
            p.expression()?;
            p.tx.list_add(&list.lexeme, element, list.line)?;
            p.expect(TokenKind::RParen)?;
            p.expect(TokenKind::Semi)?;
            Ok(())
        })
    }

    fn list_delete(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::ListDelete, |p| {
            p.expect(TokenKind::Delete)?;
            p.expect(TokenKind::LParen)?;
            let list = p.expect(TokenKind::Ident)?;
            let element = p.tx.begin_list_call(&list.lexeme, list.line)?;
            p.expect(TokenKind::Comma)?;
            p.expression()?;
            p.tx.list_delete(element, list.line)?;
            p.expect(TokenKind::RParen)?;
            p.expect(TokenKind::Semi)?;
            Ok(())
        })
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn expression(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Expression, |p| {
            p.relational()?;
            loop {
                let op = match p.current().kind {
                    TokenKind::And => LogicalOp::And,
                    TokenKind::Or => LogicalOp::Or,
                    _ => return Ok(()),
                };
                let line = p.advance().line;
                p.relational()?;
                p.tx.logical(op, line)?;
            }
        })
    }

    /// Relational operators do not chain: `a < b < c` is a syntax error.
    fn relational(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Relational, |p| {
            p.additive()?;
            let op = match p.current().kind {
                TokenKind::EqEq => RelationalOp::Equal,
                TokenKind::NotEq => RelationalOp::NotEqual,
                TokenKind::Less => RelationalOp::Less,
                TokenKind::Greater => RelationalOp::Greater,
                _ => return Ok(()),
            };
            let line = p.advance().line;
            p.additive()?;
            p.tx.relational(op, line)
        })
    }

    fn additive(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Additive, |p| {
            p.multiplicative()?;
            loop {
                let op = match p.current().kind {
                    TokenKind::Plus => ArithmeticOp::Add,
                    TokenKind::Minus => ArithmeticOp::Subtract,
                    _ => return Ok(()),
                };
                let line = p.advance().line;
                p.multiplicative()?;
                p.tx.arithmetic(op, line)?;
            }
        })
    }

    fn multiplicative(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Multiplicative, |p| {
            p.unary()?;
            loop {
                let op = match p.current().kind {
                    TokenKind::Star => ArithmeticOp::Multiply,
                    TokenKind::Slash => ArithmeticOp::Divide,
                    _ => return Ok(()),
                };
                let line = p.advance().line;
                p.unary()?;
                p.tx.arithmetic(op, line)?;
            }
        })
    }

    fn unary(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Unary, |p| {
            let op = match p.current().kind {
                TokenKind::Plus => UnaryOp::Plus,
                TokenKind::Minus => UnaryOp::Minus,
                TokenKind::Not => UnaryOp::Not,
                _ => return p.primary(),
            };
            let line = p.advance().line;
            p.unary()?;
            p.tx.unary(op, line)
        })
    }

    fn primary(&mut self) -> Result<(), CoreError> {
        self.within(GrammarRule::Primary, |p| {
            let token = p.current();
            match token.kind {
                TokenKind::IntLiteral => {
                    p.advance();
                    p.tx.load_integer(&token.lexeme);
                }
                TokenKind::FloatLiteral => {
                    p.advance();
                    p.tx.load_float(&token.lexeme);
                }
                TokenKind::StringLiteral => {
                    p.advance();
                    p.tx.load_string(&token.lexeme);
                }
                TokenKind::True | TokenKind::False => {
                    p.advance();
                    p.tx.load_bool(token.kind == TokenKind::True);
                }
                TokenKind::Ident => {
                    p.advance();
                    p.tx.load_variable(&token.lexeme, token.line)?;
                }
                TokenKind::LParen => {
                    p.advance();
                    p.expression()?;
                    p.expect(TokenKind::RParen)?;
                }
                TokenKind::Size => {
                    p.advance();
                    p.expect(TokenKind::LParen)?;
                    let list = p.expect(TokenKind::Ident)?;
                    p.expect(TokenKind::RParen)?;
                    p.tx.list_size(&list.lexeme, list.line)?;
                }
                TokenKind::Count => {
                    p.advance();
                    p.expect(TokenKind::LParen)?;
                    let list = p.expect(TokenKind::Ident)?;
                    let element = p.tx.list_element(&list.lexeme, list.line)?;
                    p.expect(TokenKind::Comma)?;
                    p.expression()?;
                    p.expect(TokenKind::RParen)?;
                    p.tx.list_count(&list.lexeme, element, list.line)?;
                }
                TokenKind::ElementOf => {
                    p.advance();
                    p.expect(TokenKind::LParen)?;
                    let list = p.expect(TokenKind::Ident)?;
                    let element = p.tx.begin_list_call(&list.lexeme, list.line)?;
                    p.expect(TokenKind::Comma)?;
                    p.expression()?;
                    p.expect(TokenKind::RParen)?;
                    p.tx.list_element_of(element, list.line)?;
                }
                _ => return Err(p.unexpected(&EXPRESSION_START)),
            }
            Ok(())
        })
    }
}

fn primitive_type(kind: TokenKind) -> Option<Type> {
    match kind {
        TokenKind::Int => Some(Type::Int),
        TokenKind::Float => Some(Type::Float),
        TokenKind::Bool => Some(Type::Bool),
        TokenKind::Str => Some(Type::String),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn translate(source: &str) -> Result<Translation, CoreError> {
        let tokens = tokenize(source)?;
        parse(&tokens, &CompileOptions::default())
    }

    fn error_text(source: &str) -> String {
        translate(source).unwrap_err().to_string()
    }

    #[test]
    fn translates_minimal_program() {
        let translation = translate("begin end").expect("translate");
        assert!(translation.code.contains(".entrypoint"));
        assert!(translation.warnings.is_empty());
    }

    #[test]
    fn missing_close_paren_in_print_lists_separators() {
        let source = "begin\nint x;\nx = 1;\nprint(x\nprint(x);\nend";
        assert_eq!(error_text(source), "linha 5: encontrado print esperado , )");
    }

    #[test]
    fn bad_list_element_type_expects_primitive() {
        assert_eq!(
            error_text("begin\nlist(x) nums;\nend"),
            "linha 2: encontrado x esperado tipo primitivo"
        );
    }

    #[test]
    fn missing_operand_collapses_to_expression() {
        assert_eq!(
            error_text("begin int x;\nx = ;\nend"),
            "linha 2: encontrado ; esperado expressão"
        );
        assert_eq!(
            error_text("begin print((1 + 2;); end"),
            "linha 1: encontrado ; esperado expressão"
        );
    }

    #[test]
    fn unexpected_command_lists_command_starters() {
        assert_eq!(
            error_text("begin\n5;\nend"),
            "linha 2: encontrado 5 esperado end if do read print add delete identificador tipo"
        );
    }

    #[test]
    fn missing_end_reports_eof() {
        assert_eq!(
            error_text("begin\nprint(1);"),
            "linha 2: encontrado EOF esperado end if do read print add delete identificador tipo"
        );
    }

    #[test]
    fn trailing_tokens_after_end_are_rejected() {
        assert_eq!(
            error_text("begin end end"),
            "linha 1: encontrado end esperado EOF"
        );
    }

    #[test]
    fn string_found_is_reported_by_class() {
        assert_eq!(
            error_text("begin \"oi\"; end"),
            "linha 1: encontrado constante_string esperado end if do read print add delete identificador tipo"
        );
    }

    #[test]
    fn relational_operators_do_not_chain() {
        let err = translate("begin print(1 < 2 < 3); end").unwrap_err();
        assert!(matches!(err, CoreError::Syntax { .. }));
    }

    #[test]
    fn undeclared_variable_reports_its_line() {
        assert_eq!(
            error_text("begin\n\nprint(y);\nend"),
            "linha 3: variável 'y' não declarada."
        );
    }

    #[test]
    fn duplicate_declaration_reports_second_line() {
        assert_eq!(
            error_text("begin\nint a;\nint a;\nend"),
            "linha 3: variável 'a' já declarada."
        );
    }

    #[test]
    fn arrow_assignment_is_accepted() {
        let code = translate("begin float f; f <- 2; end").expect("translate").code;
        assert!(code.contains("    ldc.i8 2\n    conv.r8\n    conv.r8\n    stloc f\n"));
    }

    #[test]
    fn read_with_prompt_writes_prompt_first() {
        let code = translate("begin int n; read(\"n? \", n); end")
            .expect("translate")
            .code;
        let prompt = code.find("ldstr \"n? \"").expect("prompt");
        let read = code.find("ReadLine").expect("read");
        assert!(prompt < read);
        assert!(code.contains("System.Int64::Parse(string)"));
    }

    #[test]
    fn read_item_expects_identifier() {
        assert_eq!(
            error_text("begin read(1); end"),
            "linha 1: encontrado 1 esperado identificador constante_string"
        );
    }

    #[test]
    fn if_without_end_expects_else_or_end() {
        assert_eq!(
            error_text("begin if true print(1); until"),
            "linha 1: encontrado until esperado end if else do read print add delete identificador tipo"
        );
    }

    #[test]
    fn conditions_are_reported_on_their_own_line() {
        assert_eq!(
            error_text("begin if\n1 + 1\nprint(1);\nend\nend"),
            "linha 2: expressão incompatível em comando de seleção"
        );
        assert_eq!(
            error_text("begin do print(1); until\n\n2\nend"),
            "linha 3: expressão incompatível em comando de repetição"
        );
    }

    #[test]
    fn list_declaration_constructs_list() {
        let code = translate("begin list(int) nums; add(nums, 1); end")
            .expect("translate")
            .code;
        assert!(code.contains(".locals init (class [mscorlib]System.Collections.Generic.List`1<float64> nums)"));
        assert!(code.contains("newobj instance void"));
        assert!(code.contains("::Add(!0)"));
    }

    #[test]
    fn uninitialized_read_is_only_a_warning() {
        let translation = translate("begin\nint x;\nprint(x);\nend").expect("translate");
        assert_eq!(translation.warnings.len(), 1);
        assert_eq!(
            translation.warnings[0].to_string(),
            "linha 3: variável 'x' usada sem ter sido inicializada."
        );
    }
}
