//! Source-level types and their target representations.
//!
//! `Int` exists only at the source level: the target stores and computes
//! every numeric value as `float64`, so an Int operand is always widened
//! before it is stored or written.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    List,
    /// Type of constructs that leave nothing on the evaluation stack.
    Void,
}

impl Type {
    /// Returns true for Int and Float.
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Target type used for storage and for typed console calls.
    ///
    /// Lists need their element type and are named by [`list_il_type`].
    pub fn il_name(self) -> &'static str {
        match self {
            Type::Int | Type::Float => "float64",
            Type::String => "string",
            Type::Bool => "bool",
            Type::List => "object",
            Type::Void => "void",
        }
    }

    /// Whether a value of type `value` may be stored in a slot of this type.
    ///
    /// Numeric values are interchangeable because both share the `float64`
    /// representation.
    pub fn accepts(self, value: Type) -> bool {
        match (self, value) {
            (Type::List, _) | (_, Type::List) | (Type::Void, _) | (_, Type::Void) => false,
            (target, value) if target.is_numeric() && value.is_numeric() => true,
            (target, value) => target == value,
        }
    }
}

/// Generic list type holding elements of `element`.
pub fn list_il_type(element: Type) -> String {
    format!(
        "class [mscorlib]System.Collections.Generic.List`1<{}>",
        element.il_name()
    )
}

/// Result type of `+`, `-` and `*`, or `None` when an operand is not numeric.
pub fn arithmetic_result(left: Type, right: Type) -> Option<Type> {
    match (left, right) {
        (Type::Int, Type::Int) => Some(Type::Int),
        (l, r) if l.is_numeric() && r.is_numeric() => Some(Type::Float),
        _ => None,
    }
}
