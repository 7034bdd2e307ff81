use crate::error::CoreError;
use crate::lexer::{Token, tokenize};
use crate::parser::parse;
use crate::translator::Warning;

/// Settings that shape the generated listing header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Name used for the `.assembly` directive and the `.module` file.
    pub assembly_name: String,
    /// Value of the `.maxstack` directive.
    pub max_stack: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            assembly_name: "program".to_string(),
            max_stack: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationArtifact {
    /// Complete CIL listing, ready for `ilasm`.
    pub code: String,
    pub warnings: Vec<Warning>,
}

/// Compile `source` with the default options.
pub fn compile(source: &str) -> Result<CompilationArtifact, CoreError> {
    compile_with_options(source, &CompileOptions::default())
}

pub fn compile_with_options(
    source: &str,
    options: &CompileOptions,
) -> Result<CompilationArtifact, CoreError> {
    let tokens = scan(source)?;

    let translation = parse(&tokens, options)?;
    tracing::debug!(
        lines = translation.code.lines().count(),
        warnings = translation.warnings.len(),
        "generated listing"
    );

    Ok(CompilationArtifact {
        code: translation.code,
        warnings: translation.warnings,
    })
}

/// Run only the scanner. Used by front ends that dump tokens.
pub fn scan(source: &str) -> Result<Vec<Token>, CoreError> {
    let tokens = tokenize(source)?;
    tracing::debug!(tokens = tokens.len(), "scanned source");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn compiles_program_with_single_header_and_footer() {
        let artifact = compile("begin int x; x = 10; print(x); end").expect("compile");
        assert_eq!(artifact.code.matches(".assembly extern mscorlib").count(), 1);
        assert_eq!(artifact.code.matches(".entrypoint").count(), 1);
        assert_eq!(artifact.code.matches("    ret\n").count(), 1);
        assert!(artifact.code.ends_with("  }\n}\n"));
        assert!(artifact.warnings.is_empty());
    }

    #[test_log::test]
    fn emits_expression_in_evaluation_order() {
        let artifact = compile("begin print(2 + 3 * 4); end").expect("compile");
        let expected = [
            "    ldc.i8 2",
            "    conv.r8",
            "    ldc.i8 3",
            "    conv.r8",
            "    ldc.i8 4",
            "    conv.r8",
            "    mul",
            "    add",
            "    conv.r8",
            "    call void [mscorlib]System.Console::Write(float64)",
        ]
        .join("\n");
        assert!(artifact.code.contains(&expected), "{}", artifact.code);
    }

    #[test_log::test]
    fn string_equality_uses_value_comparison() {
        let artifact = compile("begin print(\"a\" ~= \"b\"); end").expect("compile");
        assert!(artifact.code.contains(
            "    call bool [mscorlib]System.String::op_Equality(string, string)\n    ldc.i4.0\n    ceq\n"
        ));
    }

    #[test_log::test]
    fn honours_options() {
        let options = CompileOptions {
            assembly_name: "hello".to_string(),
            max_stack: 16,
        };
        let artifact = compile_with_options("begin end", &options).expect("compile");
        assert!(artifact.code.contains(".assembly hello {}"));
        assert!(artifact.code.contains(".maxstack 16"));
    }

    #[test_log::test]
    fn lexical_error_reports_quote_line() {
        let err = compile("begin\nprint(\"oops end").unwrap_err();
        assert!(matches!(err, CoreError::Lexical { line: 2, .. }));
        assert_eq!(err.to_string(), "linha 2: constante_string inválida");
    }

    #[test_log::test]
    fn division_result_is_not_boolean() {
        let err = compile("begin int i; i = 1; print(i / 2 and true); end").unwrap_err();
        assert_eq!(
            err.to_string(),
            "linha 1: tipos incompatíveis para operação lógica."
        );
    }

    #[test_log::test]
    fn semantic_errors_stop_compilation() {
        let err = compile("begin\nx = 1;\nend").unwrap_err();
        assert_eq!(err.category(), "erro semântico");
        assert_eq!(err.line(), Some(2));
    }

    #[test_log::test]
    fn scan_stops_at_eof() {
        let tokens = scan("begin end").expect("scan");
        assert_eq!(tokens.len(), 3);
    }
}
