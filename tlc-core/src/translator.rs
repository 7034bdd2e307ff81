//! Semantic analysis and translation.
//!
//! The [`Translator`] is the translation context threaded through the
//! recursive-descent parser. Each parser rule calls into it as soon as the
//! construct it recognises is complete: operand types are checked on the
//! operand type stack, branch targets are tracked on the label stack, and
//! instructions go straight to the [`IlGenerator`].
//!
//! Stack underflows and leftovers are translator bugs and surface as
//! [`CoreError::Internal`], never as user diagnostics.

use core::fmt;

use crate::codegen::IlGenerator;
use crate::compiler::CompileOptions;
use crate::error::CoreError;
use crate::symbols::SymbolTable;
use crate::types::{Type, arithmetic_result, list_il_type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalOp {
    Equal,
    NotEqual,
    Less,
    Greater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

/// Non-fatal finding reported next to the generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "linha {}: {}", self.line, self.message)
    }
}

/// Finished output of a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub code: String,
    pub warnings: Vec<Warning>,
}

#[derive(Debug)]
pub struct Translator {
    il: IlGenerator,
    symbols: SymbolTable,
    operands: Vec<Type>,
    labels: Vec<String>,
    warnings: Vec<Warning>,
}

impl Translator {
    pub fn new(options: &CompileOptions) -> Self {
        Translator {
            il: IlGenerator::new(options),
            symbols: SymbolTable::new(),
            operands: Vec::new(),
            labels: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check the end-of-program invariants and produce the listing.
    pub fn finish(self) -> Result<Translation, CoreError> {
        if !self.labels.is_empty() {
            return Err(CoreError::Internal(format!(
                "unresolved labels at end of program: {:?}",
                self.labels
            )));
        }
        if !self.operands.is_empty() {
            return Err(CoreError::Internal(format!(
                "operand stack not empty at end of program: {:?}",
                self.operands
            )));
        }
        tracing::debug!(
            symbols = self.symbols.len(),
            lines = self.il.instruction_count(),
            "translation finished"
        );
        Ok(Translation {
            code: self.il.finish(),
            warnings: self.warnings,
        })
    }

    /// Every statement must consume all the operands it produced.
    pub fn end_statement(&self) -> Result<(), CoreError> {
        if self.operands.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Internal(format!(
                "operand stack not empty after statement: {:?}",
                self.operands
            )))
        }
    }

    fn push_operand(&mut self, ty: Type) {
        self.operands.push(ty);
    }

    fn pop_operand(&mut self) -> Result<Type, CoreError> {
        self.operands
            .pop()
            .ok_or_else(|| CoreError::Internal("operand stack underflow".to_string()))
    }

    fn pop_label(&mut self) -> Result<String, CoreError> {
        self.labels
            .pop()
            .ok_or_else(|| CoreError::Internal("label stack underflow".to_string()))
    }

    fn warn(&mut self, line: usize, message: String) {
        tracing::debug!(line, "{message}");
        self.warnings.push(Warning { line, message });
    }

    // -----------------------------------------------------------------
    // Operands
    // -----------------------------------------------------------------

    pub fn load_integer(&mut self, lexeme: &str) {
        self.push_operand(Type::Int);
        self.il.load_integer_constant(lexeme);
    }

    pub fn load_float(&mut self, lexeme: &str) {
        self.push_operand(Type::Float);
        self.il.load_float_constant(lexeme);
    }

    /// `literal` includes its quotes.
    pub fn load_string(&mut self, literal: &str) {
        self.push_operand(Type::String);
        self.il.load_string_constant(literal);
    }

    pub fn load_bool(&mut self, value: bool) {
        self.push_operand(Type::Bool);
        if value {
            self.il.load_true();
        } else {
            self.il.load_false();
        }
    }

    pub fn load_variable(&mut self, name: &str, line: usize) -> Result<(), CoreError> {
        let symbol = self
            .symbols
            .lookup(name)
            .ok_or_else(|| undeclared(name, line))?;
        let (ty, initialized) = (symbol.ty, symbol.initialized);

        if !initialized {
            self.warn(
                line,
                format!("variável '{name}' usada sem ter sido inicializada."),
            );
        }
        self.push_operand(ty);
        self.il.load_variable(name);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------

    /// `+ - * /` on the two topmost operands.
    pub fn arithmetic(&mut self, op: ArithmeticOp, line: usize) -> Result<(), CoreError> {
        let right = self.pop_operand()?;
        let left = self.pop_operand()?;

        let result = match op {
            ArithmeticOp::Divide if left.is_numeric() && right.is_numeric() => Type::Float,
            ArithmeticOp::Divide => {
                return Err(CoreError::semantic(
                    line,
                    "tipos incompatíveis para operação de divisão.",
                ));
            }
            _ => arithmetic_result(left, right).ok_or_else(|| {
                CoreError::semantic(line, "tipos incompatíveis para operação aritmética.")
            })?,
        };
        self.push_operand(result);
        match op {
            ArithmeticOp::Add => self.il.add(),
            ArithmeticOp::Subtract => self.il.subtract(),
            ArithmeticOp::Multiply => self.il.multiply(),
            ArithmeticOp::Divide => self.il.divide(),
        }
        Ok(())
    }

    pub fn relational(&mut self, op: RelationalOp, line: usize) -> Result<(), CoreError> {
        let right = self.pop_operand()?;
        let left = self.pop_operand()?;
        let comparable = |ty: Type| ty.is_numeric() || ty == Type::String;
        let incompatible =
            || CoreError::semantic(line, "tipos incompatíveis para operação relacional.");

        if !comparable(left) || !comparable(right) {
            return Err(incompatible());
        }
        let strings = left == Type::String || right == Type::String;
        if strings && left != right {
            return Err(incompatible());
        }
        if strings && matches!(op, RelationalOp::Less | RelationalOp::Greater) {
            return Err(incompatible());
        }

        self.push_operand(Type::Bool);
        match (op, strings) {
            (RelationalOp::Equal, true) => self.il.compare_strings_equal(),
            (RelationalOp::NotEqual, true) => {
                self.il.compare_strings_equal();
                self.il.logical_not();
            }
            (RelationalOp::Equal, false) => self.il.compare_equal(),
            (RelationalOp::NotEqual, false) => self.il.compare_not_equal(),
            (RelationalOp::Less, _) => self.il.compare_less_than(),
            (RelationalOp::Greater, _) => self.il.compare_greater_than(),
        }
        Ok(())
    }

    pub fn logical(&mut self, op: LogicalOp, line: usize) -> Result<(), CoreError> {
        let right = self.pop_operand()?;
        let left = self.pop_operand()?;
        if left != Type::Bool || right != Type::Bool {
            return Err(CoreError::semantic(
                line,
                "tipos incompatíveis para operação lógica.",
            ));
        }
        self.push_operand(Type::Bool);
        match op {
            LogicalOp::And => self.il.logical_and(),
            LogicalOp::Or => self.il.logical_or(),
        }
        Ok(())
    }

    /// Unary plus only checks its operand.
    pub fn unary(&mut self, op: UnaryOp, line: usize) -> Result<(), CoreError> {
        let operand = self.pop_operand()?;
        match op {
            UnaryOp::Plus | UnaryOp::Minus if !operand.is_numeric() => {
                let symbol = if op == UnaryOp::Plus { '+' } else { '-' };
                return Err(CoreError::semantic(
                    line,
                    format!("operador unário '{symbol}' aplicado a tipo inválido."),
                ));
            }
            UnaryOp::Not if operand != Type::Bool => {
                return Err(CoreError::semantic(
                    line,
                    "operador lógico NOT aplicado a tipo inválido.",
                ));
            }
            UnaryOp::Plus => {}
            UnaryOp::Minus => self.il.negate(),
            UnaryOp::Not => self.il.logical_not(),
        }
        self.push_operand(operand);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Declarations, assignment and I/O
    // -----------------------------------------------------------------

    /// `element` is the element type of a list declaration.
    pub fn declare_variable(
        &mut self,
        name: &str,
        ty: Type,
        element: Option<Type>,
        line: usize,
    ) -> Result<(), CoreError> {
        if !self.symbols.declare(name, ty, element, line) {
            return Err(CoreError::semantic(
                line,
                format!("variável '{name}' já declarada."),
            ));
        }

        match (ty, element) {
            (Type::List, Some(element)) => {
                self.il.declare_local(name, &list_il_type(element));
                self.il.new_list(element);
                self.il.store_variable(name);
                self.symbols.mark_initialized(name);
            }
            (Type::List, None) => {
                return Err(CoreError::Internal(format!(
                    "list '{name}' declared without an element type"
                )));
            }
            (ty, _) => self.il.declare_local(name, ty.il_name()),
        }
        Ok(())
    }

    /// The assignment target must exist before its value is translated.
    pub fn begin_assignment(&self, name: &str, line: usize) -> Result<(), CoreError> {
        self.symbols
            .lookup(name)
            .map(|_| ())
            .ok_or_else(|| undeclared(name, line))
    }

    /// Store the translated value into `name`.
    pub fn assign(&mut self, name: &str, line: usize) -> Result<(), CoreError> {
        let value = self.pop_operand()?;
        let target = self
            .symbols
            .lookup(name)
            .map(|symbol| symbol.ty)
            .ok_or_else(|| undeclared(name, line))?;

        if !target.accepts(value) {
            return Err(CoreError::semantic(
                line,
                format!("tipos incompatíveis em atribuição à variável '{name}'."),
            ));
        }
        if value == Type::Int {
            self.il.convert_to_float64();
        }
        self.il.store_variable(name);
        self.symbols.mark_initialized(name);
        Ok(())
    }

    /// Write the value on top of the stack.
    pub fn write_value(&mut self, line: usize) -> Result<(), CoreError> {
        let mut ty = self.pop_operand()?;
        if matches!(ty, Type::List | Type::Void) {
            return Err(CoreError::semantic(
                line,
                "lista não pode ser escrita em comando de saída.",
            ));
        }
        if ty == Type::Int {
            self.il.convert_to_float64();
            ty = Type::Float;
        }
        self.il.write_value(ty);
        Ok(())
    }

    /// One newline per print statement.
    pub fn write_new_line(&mut self) {
        self.il.write_new_line();
    }

    /// Optional prompt, then read, convert and store.
    pub fn read_into(
        &mut self,
        name: &str,
        prompt: Option<&str>,
        line: usize,
    ) -> Result<(), CoreError> {
        let ty = self
            .symbols
            .lookup(name)
            .map(|symbol| symbol.ty)
            .ok_or_else(|| undeclared(name, line))?;
        match ty {
            Type::Bool => {
                return Err(CoreError::semantic(
                    line,
                    "lógico inválido para comando de entrada.",
                ));
            }
            Type::List | Type::Void => {
                return Err(CoreError::semantic(
                    line,
                    "lista inválida para comando de entrada.",
                ));
            }
            Type::Int | Type::Float | Type::String => {}
        }

        if let Some(prompt) = prompt {
            self.il.load_string_constant(prompt);
            self.il.write_value(Type::String);
        }
        self.il.read_line();
        match ty {
            Type::Int => {
                self.il.parse_int64();
                self.il.convert_to_float64();
            }
            Type::Float => self.il.parse_float64(),
            _ => {}
        }
        self.il.store_variable(name);
        self.symbols.mark_initialized(name);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------

    /// The `if` condition is complete.
    pub fn begin_if(&mut self, line: usize) -> Result<(), CoreError> {
        self.expect_condition(line, "expressão incompatível em comando de seleção")?;
        let skip = self.il.create_label();
        self.il.branch_if_false(&skip);
        self.labels.push(skip);
        Ok(())
    }

    pub fn begin_else(&mut self) -> Result<(), CoreError> {
        let exit = self.il.create_label();
        self.il.branch(&exit);
        let skip = self.pop_label()?;
        self.il.emit_label(&skip);
        self.labels.push(exit);
        Ok(())
    }

    /// Closes the whole `if` statement.
    pub fn end_if(&mut self) -> Result<(), CoreError> {
        let pending = self.pop_label()?;
        self.il.emit_label(&pending);
        Ok(())
    }

    pub fn begin_do(&mut self) {
        let start = self.il.create_label();
        self.il.emit_label(&start);
        self.labels.push(start);
    }

    /// The `until` condition is complete; loop back while it is false.
    pub fn end_do(&mut self, line: usize) -> Result<(), CoreError> {
        self.expect_condition(line, "expressão incompatível em comando de repetição")?;
        let start = self.pop_label()?;
        self.il.branch_if_false(&start);
        Ok(())
    }

    fn expect_condition(&mut self, line: usize, message: &str) -> Result<(), CoreError> {
        if self.pop_operand()? == Type::Bool {
            Ok(())
        } else {
            Err(CoreError::semantic(line, message))
        }
    }

    // -----------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------

    /// Element type of the list variable `name`.
    pub fn list_element(&self, name: &str, line: usize) -> Result<Type, CoreError> {
        let symbol = self
            .symbols
            .lookup(name)
            .ok_or_else(|| undeclared(name, line))?;
        match (symbol.ty, symbol.element) {
            (Type::List, Some(element)) => Ok(element),
            _ => Err(CoreError::semantic(
                line,
                format!("variável '{name}' não é uma lista."),
            )),
        }
    }

    /// Load the list receiver ahead of its arguments.
    pub fn begin_list_call(&mut self, name: &str, line: usize) -> Result<Type, CoreError> {
        let element = self.list_element(name, line)?;
        self.il.load_variable(name);
        Ok(element)
    }

    /// `add(list, value)`, after `value` has been translated.
    pub fn list_add(&mut self, name: &str, element: Type, line: usize) -> Result<(), CoreError> {
        self.pop_element(name, element, line)?;
        self.il.list_add(element);
        Ok(())
    }

    /// `delete(list, index)`, after `index` has been translated.
    pub fn list_delete(&mut self, element: Type, line: usize) -> Result<(), CoreError> {
        self.pop_index(line)?;
        self.il.list_remove_at(element);
        Ok(())
    }

    /// `size(list)`.
    pub fn list_size(&mut self, name: &str, line: usize) -> Result<(), CoreError> {
        let element = self.begin_list_call(name, line)?;
        self.il.list_count(element);
        self.il.convert_to_float64();
        self.push_operand(Type::Int);
        Ok(())
    }

    /// `elementOf(list, index)`, after `index` has been translated.
    pub fn list_element_of(&mut self, element: Type, line: usize) -> Result<(), CoreError> {
        self.pop_index(line)?;
        self.il.list_get_item(element);
        self.push_operand(element);
        Ok(())
    }

    /// `count(list, value)`, after `value` has been translated.
    ///
    /// Expands to an inline loop over three compiler-generated locals and
    /// leaves the number of matching elements on the stack.
    pub fn list_count(&mut self, name: &str, element: Type, line: usize) -> Result<(), CoreError> {
        self.pop_element(name, element, line)?;

        let needle = self.il.create_temp("cv");
        let index = self.il.create_temp("ci");
        let total = self.il.create_temp("cn");
        self.il.declare_local(&needle, element.il_name());
        self.il.declare_local(&index, "int32");
        self.il.declare_local(&total, "int32");

        self.il.add_comment(&format!("count({name})"));
        self.il.store_variable(&needle);
        self.il.load_int32(0);
        self.il.store_variable(&total);
        self.il.load_int32(0);
        self.il.store_variable(&index);

        let start = self.il.create_label();
        let next = self.il.create_label();
        let done = self.il.create_label();

        self.il.emit_label(&start);
        self.il.load_variable(&index);
        self.il.load_variable(name);
        self.il.list_count(element);
        self.il.compare_less_than();
        self.il.branch_if_false(&done);

        self.il.load_variable(name);
        self.il.load_variable(&index);
        self.il.list_get_item(element);
        self.il.load_variable(&needle);
        if element == Type::String {
            self.il.compare_strings_equal();
        } else {
            self.il.compare_equal();
        }
        self.il.branch_if_false(&next);
        increment(&mut self.il, &total);

        self.il.emit_label(&next);
        increment(&mut self.il, &index);
        self.il.branch(&start);

        self.il.emit_label(&done);
        self.il.load_variable(&total);
        self.il.convert_to_float64();
        self.push_operand(Type::Int);
        Ok(())
    }

    fn pop_element(&mut self, name: &str, element: Type, line: usize) -> Result<(), CoreError> {
        let value = self.pop_operand()?;
        if !element.accepts(value) {
            return Err(CoreError::semantic(
                line,
                format!("tipo incompatível com os elementos da lista '{name}'."),
            ));
        }
        if value == Type::Int {
            self.il.convert_to_float64();
        }
        Ok(())
    }

    fn pop_index(&mut self, line: usize) -> Result<(), CoreError> {
        if self.pop_operand()? != Type::Int {
            return Err(CoreError::semantic(
                line,
                "índice de lista deve ser inteiro.",
            ));
        }
        self.il.convert_to_int32();
        Ok(())
    }
}

fn increment(il: &mut IlGenerator, local: &str) {
    il.load_variable(local);
    il.load_int32(1);
    il.add();
    il.store_variable(local);
}

fn undeclared(name: &str, line: usize) -> CoreError {
    CoreError::semantic(line, format!("variável '{name}' não declarada."))
}
