//! Minimal interpreter for the CIL subset emitted by the compiler, so tests
//! can check program behaviour without an external runtime.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Null,
}

impl Value {
    fn as_int(&self) -> i64 {
        match self {
            Value::Int(v) => *v,
            other => panic!("expected integer on stack, got {other:?}"),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            other => panic!("expected string on stack, got {other:?}"),
        }
    }

    fn as_list(&self) -> Rc<RefCell<Vec<Value>>> {
        match self {
            Value::List(items) => Rc::clone(items),
            other => panic!("expected list on stack, got {other:?}"),
        }
    }
}

fn default_for(il_type: &str) -> Value {
    match il_type {
        "float64" => Value::Float(0.0),
        "bool" | "int32" => Value::Int(0),
        _ => Value::Null,
    }
}

/// Run a generated listing, feeding `input` lines to `ReadLine`, and return
/// everything written to the console.
pub fn run(listing: &str, input: &[&str]) -> String {
    let mut locals: HashMap<String, Value> = HashMap::new();
    let mut body: Vec<&str> = Vec::new();
    let mut labels: HashMap<&str, usize> = HashMap::new();
    let mut in_body = false;

    for line in listing.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with(".maxstack") {
            in_body = true;
            continue;
        }
        if !in_body || trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if let Some(decl) = trimmed.strip_prefix(".locals init (") {
            let decl = decl.trim_end_matches(')');
            let (il_type, name) = decl.rsplit_once(' ').expect("local declaration");
            locals.insert(name.to_string(), default_for(il_type));
            continue;
        }
        if trimmed == "ret" {
            break;
        }
        if let Some(label) = trimmed.strip_suffix(':') {
            labels.insert(label, body.len());
            continue;
        }
        body.push(trimmed);
    }

    let mut stack: Vec<Value> = Vec::new();
    let mut output = String::new();
    let mut input = input.iter();
    let mut pc = 0;
    let mut steps = 0;

    while pc < body.len() {
        steps += 1;
        assert!(steps < 1_000_000, "program did not terminate");

        let instruction = body[pc];
        pc += 1;
        let (opcode, operand) = instruction
            .split_once(' ')
            .unwrap_or((instruction, ""));

        match opcode {
            "ldc.i8" | "ldc.i4" => stack.push(Value::Int(operand.parse().expect("int operand"))),
            "ldc.i4.0" => stack.push(Value::Int(0)),
            "ldc.i4.1" => stack.push(Value::Int(1)),
            "ldc.r8" => stack.push(Value::Float(operand.parse().expect("float operand"))),
            "ldstr" => {
                let text = operand
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .expect("quoted string");
                stack.push(Value::Str(text.replace("\\n", "\n")));
            }
            "ldloc" => stack.push(locals.get(operand).cloned().expect("known local")),
            "stloc" => {
                let value = stack.pop().expect("value to store");
                locals.insert(operand.to_string(), value);
            }
            "conv.r8" => {
                let value = match stack.pop().expect("operand") {
                    Value::Int(v) => Value::Float(v as f64),
                    other => other,
                };
                stack.push(value);
            }
            "conv.i4" => {
                let value = match stack.pop().expect("operand") {
                    Value::Float(v) => Value::Int(v as i64),
                    other => other,
                };
                stack.push(value);
            }
            "add" | "sub" | "mul" | "div" => {
                let right = stack.pop().expect("right operand");
                let left = stack.pop().expect("left operand");
                let result = match (left, right) {
                    (Value::Float(l), Value::Float(r)) => Value::Float(match opcode {
                        "add" => l + r,
                        "sub" => l - r,
                        "mul" => l * r,
                        _ => l / r,
                    }),
                    (Value::Int(l), Value::Int(r)) => Value::Int(match opcode {
                        "add" => l + r,
                        "sub" => l - r,
                        "mul" => l * r,
                        _ => l / r,
                    }),
                    (l, r) => panic!("mismatched arithmetic operands {l:?} {r:?}"),
                };
                stack.push(result);
            }
            "neg" => {
                let value = match stack.pop().expect("operand") {
                    Value::Float(v) => Value::Float(-v),
                    Value::Int(v) => Value::Int(-v),
                    other => panic!("cannot negate {other:?}"),
                };
                stack.push(value);
            }
            "ceq" | "clt" | "cgt" => {
                let right = stack.pop().expect("right operand");
                let left = stack.pop().expect("left operand");
                let ordering = match (left, right) {
                    (Value::Float(l), Value::Float(r)) => l.partial_cmp(&r),
                    (Value::Int(l), Value::Int(r)) => Some(l.cmp(&r)),
                    (l, r) => panic!("mismatched comparison operands {l:?} {r:?}"),
                };
                let wanted = match opcode {
                    "ceq" => std::cmp::Ordering::Equal,
                    "clt" => std::cmp::Ordering::Less,
                    _ => std::cmp::Ordering::Greater,
                };
                stack.push(Value::Int(i64::from(ordering == Some(wanted))));
            }
            "and" | "or" => {
                let right = stack.pop().expect("right operand").as_int();
                let left = stack.pop().expect("left operand").as_int();
                stack.push(Value::Int(if opcode == "and" { left & right } else { left | right }));
            }
            "br" => pc = labels[operand],
            "brfalse" => {
                if stack.pop().expect("condition").as_int() == 0 {
                    pc = labels[operand];
                }
            }
            "newobj" => stack.push(Value::List(Rc::new(RefCell::new(Vec::new())))),
            "call" => call(operand, &mut stack, &mut output, &mut input),
            "callvirt" => call_list(operand, &mut stack),
            other => panic!("unsupported instruction {other}"),
        }
    }

    assert!(stack.is_empty(), "evaluation stack not empty: {stack:?}");
    output
}

fn call(
    target: &str,
    stack: &mut Vec<Value>,
    output: &mut String,
    input: &mut std::slice::Iter<'_, &str>,
) {
    if target.contains("Console::Write(") {
        let value = stack.pop().expect("value to write");
        match (target.contains("Write(bool)"), value) {
            (true, Value::Int(v)) => output.push_str(if v != 0 { "True" } else { "False" }),
            (_, Value::Float(v)) => output.push_str(&v.to_string()),
            (_, Value::Str(s)) => output.push_str(&s),
            (_, other) => panic!("cannot write {other:?}"),
        }
    } else if target.contains("Console::ReadLine") {
        let line = input.next().expect("input line");
        stack.push(Value::Str((*line).to_string()));
    } else if target.contains("Int64::Parse") {
        let text = stack.pop().expect("text");
        stack.push(Value::Int(text.as_str().trim().parse().expect("int64 text")));
    } else if target.contains("Double::Parse") {
        let text = stack.pop().expect("text");
        stack.push(Value::Float(text.as_str().trim().parse().expect("float64 text")));
    } else if target.contains("op_Equality") {
        let right = stack.pop().expect("right string");
        let left = stack.pop().expect("left string");
        stack.push(Value::Int(i64::from(left.as_str() == right.as_str())));
    } else {
        panic!("unsupported call {target}");
    }
}

fn call_list(target: &str, stack: &mut Vec<Value>) {
    if target.ends_with("::Add(!0)") {
        let value = stack.pop().expect("element");
        stack.pop().expect("list").as_list().borrow_mut().push(value);
    } else if target.ends_with("::RemoveAt(int32)") {
        let index = stack.pop().expect("index").as_int() as usize;
        stack.pop().expect("list").as_list().borrow_mut().remove(index);
    } else if target.ends_with("::get_Count()") {
        let len = stack.pop().expect("list").as_list().borrow().len();
        stack.push(Value::Int(len as i64));
    } else if target.ends_with("::get_Item(int32)") {
        let index = stack.pop().expect("index").as_int() as usize;
        let item = stack.pop().expect("list").as_list().borrow()[index].clone();
        stack.push(item);
    } else {
        panic!("unsupported list call {target}");
    }
}
