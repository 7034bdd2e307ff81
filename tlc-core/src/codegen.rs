//! CIL text backend.
//!
//! [`IlGenerator`] is an append-only instruction buffer. It exposes one
//! method per instruction category and performs no validation of the order
//! in which they are called; keeping the evaluation stack consistent is the
//! translator's job. The program header and footer are produced by
//! [`IlGenerator::finish`], which consumes the generator.

use crate::compiler::CompileOptions;
use crate::types::{Type, list_il_type};

const INDENT: &str = "    ";

#[derive(Debug)]
pub struct IlGenerator {
    assembly_name: String,
    max_stack: u32,
    locals: Vec<String>,
    code: Vec<String>,
    label_counter: usize,
    temp_counter: usize,
}

impl IlGenerator {
    pub fn new(options: &CompileOptions) -> Self {
        IlGenerator {
            assembly_name: options.assembly_name.clone(),
            max_stack: options.max_stack,
            locals: Vec::new(),
            code: Vec::new(),
            label_counter: 0,
            temp_counter: 0,
        }
    }

    /// Declare a local slot. Declarations are gathered ahead of the code.
    pub fn declare_local(&mut self, name: &str, il_type: &str) {
        self.locals
            .push(format!("{INDENT}.locals init ({il_type} {name})"));
    }

    /// Fresh name for a compiler-generated local, e.g. `__cv0`.
    ///
    /// Source identifiers cannot start with an underscore, so these never
    /// collide with user variables.
    pub fn create_temp(&mut self, prefix: &str) -> String {
        let name = format!("__{prefix}{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    // -----------------------------------------------------------------
    // Constants and variables
    // -----------------------------------------------------------------

    /// Integer constants are pushed as int64 and widened right away.
    pub fn load_integer_constant(&mut self, lexeme: &str) {
        self.emit(format!("ldc.i8 {lexeme}"));
        self.emit("conv.r8");
    }

    pub fn load_float_constant(&mut self, lexeme: &str) {
        self.emit(format!("ldc.r8 {lexeme}"));
    }

    /// `literal` includes its surrounding quotes.
    pub fn load_string_constant(&mut self, literal: &str) {
        self.emit(format!("ldstr {literal}"));
    }

    pub fn load_true(&mut self) {
        self.emit("ldc.i4.1");
    }

    pub fn load_false(&mut self) {
        self.emit("ldc.i4.0");
    }

    pub fn load_int32(&mut self, value: i32) {
        self.emit(format!("ldc.i4 {value}"));
    }

    pub fn load_variable(&mut self, name: &str) {
        self.emit(format!("ldloc {name}"));
    }

    pub fn store_variable(&mut self, name: &str) {
        self.emit(format!("stloc {name}"));
    }

    pub fn convert_to_float64(&mut self) {
        self.emit("conv.r8");
    }

    pub fn convert_to_int32(&mut self) {
        self.emit("conv.i4");
    }

    // -----------------------------------------------------------------
    // Arithmetic, comparison and logic
    // -----------------------------------------------------------------

    pub fn add(&mut self) {
        self.emit("add");
    }

    pub fn subtract(&mut self) {
        self.emit("sub");
    }

    pub fn multiply(&mut self) {
        self.emit("mul");
    }

    pub fn divide(&mut self) {
        self.emit("div");
    }

    pub fn negate(&mut self) {
        self.emit("neg");
    }

    pub fn compare_equal(&mut self) {
        self.emit("ceq");
    }

    pub fn compare_not_equal(&mut self) {
        self.emit("ceq");
        self.emit("ldc.i4.0");
        self.emit("ceq");
    }

    pub fn compare_less_than(&mut self) {
        self.emit("clt");
    }

    pub fn compare_greater_than(&mut self) {
        self.emit("cgt");
    }

    /// Value equality for strings; `ceq` would compare references.
    pub fn compare_strings_equal(&mut self) {
        self.emit("call bool [mscorlib]System.String::op_Equality(string, string)");
    }

    pub fn logical_and(&mut self) {
        self.emit("and");
    }

    pub fn logical_or(&mut self) {
        self.emit("or");
    }

    pub fn logical_not(&mut self) {
        self.emit("ldc.i4.0");
        self.emit("ceq");
    }

    // -----------------------------------------------------------------
    // Console I/O
    // -----------------------------------------------------------------

    pub fn write_value(&mut self, ty: Type) {
        self.emit(format!(
            "call void [mscorlib]System.Console::Write({})",
            ty.il_name()
        ));
    }

    pub fn write_new_line(&mut self) {
        self.emit("ldstr \"\\n\"");
        self.emit("call void [mscorlib]System.Console::Write(string)");
    }

    pub fn read_line(&mut self) {
        self.emit("call string [mscorlib]System.Console::ReadLine()");
    }

    pub fn parse_int64(&mut self) {
        self.emit("call int64 [mscorlib]System.Int64::Parse(string)");
    }

    pub fn parse_float64(&mut self) {
        self.emit("call float64 [mscorlib]System.Double::Parse(string)");
    }

    // -----------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------

    pub fn new_list(&mut self, element: Type) {
        self.emit(format!(
            "newobj instance void {}::.ctor()",
            list_il_type(element)
        ));
    }

    pub fn list_add(&mut self, element: Type) {
        self.emit(format!(
            "callvirt instance void {}::Add(!0)",
            list_il_type(element)
        ));
    }

    pub fn list_remove_at(&mut self, element: Type) {
        self.emit(format!(
            "callvirt instance void {}::RemoveAt(int32)",
            list_il_type(element)
        ));
    }

    pub fn list_count(&mut self, element: Type) {
        self.emit(format!(
            "callvirt instance int32 {}::get_Count()",
            list_il_type(element)
        ));
    }

    pub fn list_get_item(&mut self, element: Type) {
        self.emit(format!(
            "callvirt instance !0 {}::get_Item(int32)",
            list_il_type(element)
        ));
    }

    // -----------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------

    pub fn create_label(&mut self) -> String {
        let label = format!("L{}", self.label_counter);
        self.label_counter += 1;
        tracing::trace!(%label, "allocated label");
        label
    }

    pub fn emit_label(&mut self, label: &str) {
        self.code.push(format!("  {label}:"));
    }

    pub fn branch(&mut self, label: &str) {
        self.emit(format!("br {label}"));
    }

    pub fn branch_if_false(&mut self, label: &str) {
        self.emit(format!("brfalse {label}"));
    }

    pub fn add_comment(&mut self, comment: &str) {
        self.emit(format!("// {comment}"));
    }

    /// Number of instruction and label lines emitted so far.
    pub fn instruction_count(&self) -> usize {
        self.code.len()
    }

    /// Assemble header, locals, body and footer into the final listing.
    pub fn finish(self) -> String {
        let mut out = String::new();
        self.write_header(&mut out);
        for line in self.locals.iter().chain(self.code.iter()) {
            out.push_str(line);
            out.push('\n');
        }
        write_footer(&mut out);
        out
    }

    fn write_header(&self, out: &mut String) {
        let name = &self.assembly_name;
        out.push_str(".assembly extern mscorlib {}\n");
        out.push_str(&format!(".assembly {name} {{}}\n"));
        out.push_str(&format!(".module {name}.exe\n"));
        out.push('\n');
        out.push_str(".class public Program extends [mscorlib]System.Object {\n");
        out.push_str("  .method public static void Main() cil managed {\n");
        out.push_str(&format!("{INDENT}.entrypoint\n"));
        out.push_str(&format!("{INDENT}.maxstack {}\n", self.max_stack));
    }

    fn emit(&mut self, instruction: impl AsRef<str>) {
        self.code
            .push(format!("{INDENT}{}", instruction.as_ref()));
    }
}

fn write_footer(out: &mut String) {
    out.push_str(&format!("{INDENT}ret\n"));
    out.push_str("  }\n");
    out.push_str("}\n");
}
