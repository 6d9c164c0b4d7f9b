//! The stack machine.
//!
//! A [`Vm`] runs one call at a time on its own operand stack and call
//! stack; calls between compiled methods push a frame instead of recursing,
//! so deep recursion in a script ends in [`RuntimeError::StackOverflow`]
//! rather than exhausting the native stack.

use dyncode_compiler::OpCode;
use dyncode_compiler::bytecode::ArrayElement;
use dyncode_core::{RuntimeError, Value};

use super::arith;
use crate::module::LoadedModule;

struct Frame {
    method: usize,
    ip: usize,
    locals: Vec<Value>,
    /// Operand stack height when the frame was entered.
    base: usize,
}

pub(crate) struct Vm<'m> {
    module: &'m LoadedModule,
    frames: Vec<Frame>,
    stack: Vec<Value>,
    max_depth: usize,
    /// Offset of the instruction being executed.
    offset: usize,
}

impl<'m> Vm<'m> {
    pub(crate) fn new(module: &'m LoadedModule, max_depth: usize) -> Self {
        Self {
            module,
            frames: Vec::new(),
            stack: Vec::with_capacity(64),
            max_depth,
            offset: 0,
        }
    }

    /// Run `method` with `args` and return what it returned, `None` for
    /// `void` methods.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn run(&mut self, method: usize, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        self.frames.clear();
        self.stack.clear();
        self.push_frame(method, args)?;
        let result = self.execute();
        if result.is_err() {
            tracing::trace!(
                method = %self.module.method_name(method),
                depth = self.frames.len(),
                offset = self.offset,
                "execution failed"
            );
        }
        result
    }

    fn push_frame(&mut self, method: usize, mut args: Vec<Value>) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.max_depth {
            return Err(RuntimeError::StackOverflow { limit: self.max_depth });
        }
        let frame_size = self.module.method(method).frame_size;
        if args.len() < frame_size {
            args.resize(frame_size, Value::Null);
        }
        self.frames.push(Frame {
            method,
            ip: 0,
            locals: args,
            base: self.stack.len(),
        });
        Ok(())
    }

    fn execute(&mut self) -> Result<Option<Value>, RuntimeError> {
        let module = self.module;
        loop {
            let frame = self.frame()?;
            let code = module.method(frame.method).code.as_slice();
            let offset = frame.ip;
            self.offset = offset;

            let byte = *code
                .get(offset)
                .ok_or_else(|| self.invalid("execution ran past the end of the method"))?;
            let op = OpCode::try_from(byte).map_err(|_| self.invalid(format!("unknown opcode {byte:#04x}")))?;
            let next = offset + 1 + op.operand_size();
            let operands = code
                .get(offset + 1..next)
                .ok_or_else(|| self.invalid("truncated operands"))?;
            self.frame_mut()?.ip = next;

            match op {
                OpCode::Constant | OpCode::ConstantWide => {
                    let index = if op == OpCode::Constant {
                        usize::from(operands[0])
                    } else {
                        read_u16(operands)
                    };
                    let value = module
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or_else(|| self.invalid(format!("constant {index} out of range")))?;
                    self.stack.push(value);
                }
                OpCode::PushNull => self.stack.push(Value::Null),
                OpCode::PushTrue => self.stack.push(Value::Bool(true)),
                OpCode::PushFalse => self.stack.push(Value::Bool(false)),
                OpCode::PushZero => self.stack.push(Value::Int32(0)),
                OpCode::PushOne => self.stack.push(Value::Int32(1)),

                OpCode::Pop => {
                    self.pop()?;
                }
                OpCode::Dup => {
                    let top = self.peek()?.clone();
                    self.stack.push(top);
                }
                OpCode::GetLocal => {
                    let slot = usize::from(operands[0]);
                    let value = self
                        .frame()?
                        .locals
                        .get(slot)
                        .cloned()
                        .ok_or_else(|| self.invalid(format!("local {slot} out of range")))?;
                    self.stack.push(value);
                }
                OpCode::SetLocal => {
                    let slot = usize::from(operands[0]);
                    let value = self.pop()?;
                    match self.frame_mut()?.locals.get_mut(slot) {
                        Some(local) => *local = value,
                        None => {
                            return Err(RuntimeError::InvalidBytecode {
                                offset,
                                detail: format!("local {slot} out of range"),
                            });
                        }
                    }
                }

                OpCode::AddI32
                | OpCode::SubI32
                | OpCode::MulI32
                | OpCode::DivI32
                | OpCode::ModI32
                | OpCode::AddI64
                | OpCode::SubI64
                | OpCode::MulI64
                | OpCode::DivI64
                | OpCode::ModI64
                | OpCode::AddF32
                | OpCode::SubF32
                | OpCode::MulF32
                | OpCode::DivF32
                | OpCode::ModF32
                | OpCode::AddF64
                | OpCode::SubF64
                | OpCode::MulF64
                | OpCode::DivF64
                | OpCode::ModF64 => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(arith::binary(op, a, b, offset)?);
                }
                OpCode::NegI32 | OpCode::NegI64 | OpCode::NegF32 | OpCode::NegF64 => {
                    let value = self.pop()?;
                    self.stack.push(arith::negate(op, value, offset)?);
                }
                OpCode::Concat => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let mut joined = a.to_display_string();
                    joined.push_str(&b.to_display_string());
                    self.stack.push(Value::string(joined));
                }

                OpCode::Equal | OpCode::NotEqual => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let equal = arith::equals(&a, &b);
                    self.stack.push(Value::Bool(equal == (op == OpCode::Equal)));
                }
                OpCode::Less | OpCode::LessEqual | OpCode::Greater | OpCode::GreaterEqual => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.stack.push(Value::Bool(arith::compare(op, &a, &b, offset)?));
                }
                OpCode::Not => {
                    let value = match self.pop()? {
                        Value::Bool(v) => Value::Bool(!v),
                        Value::Null => Value::Null,
                        other => return Err(self.invalid(format!("NOT on {}", other.type_name()))),
                    };
                    self.stack.push(value);
                }

                OpCode::I32ToI64
                | OpCode::I32ToF32
                | OpCode::I32ToF64
                | OpCode::I32ToChar
                | OpCode::I64ToI32
                | OpCode::I64ToF32
                | OpCode::I64ToF64
                | OpCode::F32ToI32
                | OpCode::F32ToI64
                | OpCode::F32ToF64
                | OpCode::F64ToI32
                | OpCode::F64ToI64
                | OpCode::F64ToF32
                | OpCode::CharToI32 => {
                    let value = self.pop()?;
                    self.stack.push(arith::convert(op, value, offset)?);
                }
                OpCode::ToString => {
                    let value = self.pop()?;
                    self.stack.push(Value::string(value.to_display_string()));
                }

                OpCode::IsNull => {
                    let value = self.pop()?;
                    self.stack.push(Value::Bool(value.is_null()));
                }
                OpCode::Unwrap => {
                    if self.peek()?.is_null() {
                        return Err(RuntimeError::NullableHasNoValue);
                    }
                }

                OpCode::NewArray => {
                    let element = ArrayElement::try_from(operands[0])
                        .map_err(|_| self.invalid(format!("unknown array element kind {}", operands[0])))?;
                    let length = self.pop_index()?;
                    let length = usize::try_from(length).map_err(|_| RuntimeError::NegativeArraySize(length))?;
                    self.stack.push(Value::array(vec![element_default(element); length]));
                }
                OpCode::ArrayLiteral => {
                    let count = read_u16(operands);
                    let items = self.pop_n(count)?;
                    self.stack.push(Value::array(items));
                }
                OpCode::GetIndex => {
                    let index = self.pop_index()?;
                    let target = self.pop()?;
                    self.stack.push(get_index(target, index).map_err(|error| self.locate(error))?);
                }
                OpCode::SetIndex => {
                    let value = self.pop()?;
                    let index = self.pop_index()?;
                    match self.pop()? {
                        Value::Array(items) => {
                            let mut items = items.write();
                            let length = items.len();
                            let slot = checked_index(index, length).and_then(|i| items.get_mut(i));
                            match slot {
                                Some(slot) => *slot = value,
                                None => return Err(RuntimeError::IndexOutOfRange { index, length }),
                            }
                        }
                        Value::Null => return Err(RuntimeError::NullReference),
                        other => return Err(self.invalid(format!("SET_INDEX on {}", other.type_name()))),
                    }
                }
                OpCode::Length => {
                    let length = match self.pop()? {
                        Value::Array(items) => items.len(),
                        Value::String(text) => text.chars().count(),
                        Value::Null => return Err(RuntimeError::NullReference),
                        other => return Err(self.invalid(format!("LENGTH on {}", other.type_name()))),
                    };
                    let length = i32::try_from(length).map_err(|_| RuntimeError::Overflow)?;
                    self.stack.push(Value::Int32(length));
                }

                OpCode::Call => {
                    let method = read_u16(operands);
                    let argc = usize::from(operands[2]);
                    if method >= module.methods.len() {
                        return Err(self.invalid(format!("method {method} out of range")));
                    }
                    let args = self.pop_n(argc)?;
                    self.push_frame(method, args)?;
                }
                OpCode::CallHost => {
                    let import = read_u16(operands);
                    let argc = usize::from(operands[2]);
                    let function = module
                        .imports
                        .get(import)
                        .ok_or_else(|| self.invalid(format!("import {import} out of range")))?;
                    let args = self.pop_n(argc)?;
                    let result = function.call(&args)?;
                    if !function.return_type().is_void() {
                        self.stack.push(result);
                    }
                }

                OpCode::Jump => {
                    self.frame_mut()?.ip = next + read_u16(operands);
                }
                OpCode::JumpIfFalse => {
                    let condition = match self.pop()? {
                        Value::Bool(v) => v,
                        other => return Err(self.invalid(format!("JUMP_IF_FALSE on {}", other.type_name()))),
                    };
                    if !condition {
                        self.frame_mut()?.ip = next + read_u16(operands);
                    }
                }
                OpCode::Loop => {
                    let distance = read_u16(operands);
                    let target = next
                        .checked_sub(distance)
                        .ok_or_else(|| self.invalid("loop before the start of the method"))?;
                    self.frame_mut()?.ip = target;
                }
                OpCode::Return => {
                    let value = self.pop()?;
                    if let Some(done) = self.leave_frame(Some(value))? {
                        return Ok(done);
                    }
                }
                OpCode::ReturnVoid => {
                    if let Some(done) = self.leave_frame(None)? {
                        return Ok(done);
                    }
                }
            }
        }
    }

    /// Pop the current frame. Returns the call's result once the outermost
    /// frame is gone.
    fn leave_frame(&mut self, value: Option<Value>) -> Result<Option<Option<Value>>, RuntimeError> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| self.invalid("return without a frame"))?;
        self.stack.truncate(frame.base);
        if self.frames.is_empty() {
            return Ok(Some(value));
        }
        if let Some(value) = value {
            self.stack.push(value);
        }
        Ok(None)
    }

    fn frame(&self) -> Result<&Frame, RuntimeError> {
        self.frames.last().ok_or_else(|| self.invalid("no active frame"))
    }

    fn frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        let offset = self.offset;
        self.frames.last_mut().ok_or_else(|| RuntimeError::InvalidBytecode {
            offset,
            detail: "no active frame".to_string(),
        })
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        let floor = self.frames.last().map_or(0, |frame| frame.base);
        if self.stack.len() <= floor {
            return Err(self.invalid("operand stack underflow"));
        }
        self.stack.pop().ok_or_else(|| self.invalid("operand stack underflow"))
    }

    fn peek(&self) -> Result<&Value, RuntimeError> {
        self.stack.last().ok_or_else(|| self.invalid("operand stack underflow"))
    }

    /// Pop `count` values, first pushed first.
    fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let floor = self.frames.last().map_or(0, |frame| frame.base);
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .filter(|&start| start >= floor)
            .ok_or_else(|| self.invalid("operand stack underflow"))?;
        Ok(self.stack.split_off(start))
    }

    /// Pop an `int` or `long` index or length.
    fn pop_index(&mut self) -> Result<i64, RuntimeError> {
        match self.pop()? {
            Value::Int32(v) => Ok(i64::from(v)),
            Value::Int64(v) => Ok(v),
            other => Err(self.invalid(format!("{} used as an index", other.type_name()))),
        }
    }

    fn invalid(&self, detail: impl Into<String>) -> RuntimeError {
        RuntimeError::InvalidBytecode {
            offset: self.offset,
            detail: detail.into(),
        }
    }

    /// Give an operand error from a helper the current offset.
    fn locate(&self, error: RuntimeError) -> RuntimeError {
        match error {
            RuntimeError::InvalidBytecode { detail, .. } => self.invalid(detail),
            other => other,
        }
    }
}

fn read_u16(operands: &[u8]) -> usize {
    usize::from(u16::from_be_bytes([operands[0], operands[1]]))
}

fn checked_index(index: i64, length: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < length)
}

fn element_default(element: ArrayElement) -> Value {
    match element {
        ArrayElement::Reference => Value::Null,
        ArrayElement::Bool => Value::Bool(false),
        ArrayElement::Char => Value::Char('\0'),
        ArrayElement::Int32 => Value::Int32(0),
        ArrayElement::Int64 => Value::Int64(0),
        ArrayElement::Single => Value::Single(0.0),
        ArrayElement::Double => Value::Double(0.0),
    }
}

/// Element `index` of an array, or the char at `index` of a string.
fn get_index(target: Value, index: i64) -> Result<Value, RuntimeError> {
    match target {
        Value::Array(items) => {
            let items = items.read();
            checked_index(index, items.len())
                .map(|i| items[i].clone())
                .ok_or(RuntimeError::IndexOutOfRange {
                    index,
                    length: items.len(),
                })
        }
        Value::String(text) => {
            let length = text.chars().count();
            checked_index(index, length)
                .and_then(|i| text.chars().nth(i))
                .map(Value::Char)
                .ok_or(RuntimeError::IndexOutOfRange { index, length })
        }
        Value::Null => Err(RuntimeError::NullReference),
        other => Err(RuntimeError::InvalidBytecode {
            offset: 0,
            detail: format!("GET_INDEX on {}", other.type_name()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use dyncode_compiler::BytecodeCompiler;

    use super::*;
    use crate::references::ReferenceSet;

    /// Compile `class C { <members> }` and run `M` with `args`.
    fn run_with_depth(members: &str, args: Vec<Value>, depth: usize) -> Result<Option<Value>, RuntimeError> {
        let references = ReferenceSet::standard();
        let source = format!("using System;\nclass C {{ {members} }}");
        let image = BytecodeCompiler::new()
            .compile_image(&source, &references.signatures())
            .unwrap();
        let module = LoadedModule::from_image(image, &references).unwrap();
        let method = module.methods.iter().position(|method| method.name == "M").unwrap();
        Vm::new(&module, depth).run(method, args)
    }

    fn run(members: &str, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        run_with_depth(members, args, 64)
    }

    fn value(members: &str, args: Vec<Value>) -> Value {
        run(members, args).unwrap().unwrap()
    }

    #[test]
    fn arithmetic_and_widening() {
        assert_eq!(value("static int M(int a, int b) => a * b + 1;", vec![Value::Int32(6), Value::Int32(7)]), Value::Int32(43));
        assert_eq!(value("static double M(int a) => a / 2.0;", vec![Value::Int32(3)]), Value::Double(1.5));
        assert_eq!(value("static long M(int a) => a + 1L;", vec![Value::Int32(i32::MAX)]), Value::Int64(2_147_483_648));
    }

    #[test]
    fn loops_and_locals() {
        let source = "static int M(int n) { int total = 0; for (int i = 1; i <= n; i++) { if (i % 2 == 0) continue; total += i; } return total; }";
        assert_eq!(value(source, vec![Value::Int32(10)]), Value::Int32(25));

        let source = "static int M(int n) { int steps = 0; while (n != 1) { n = n % 2 == 0 ? n / 2 : 3 * n + 1; steps++; } return steps; }";
        assert_eq!(value(source, vec![Value::Int32(6)]), Value::Int32(8));
    }

    #[test]
    fn recursion_between_methods() {
        let source = "static int M(int n) => n <= 1 ? 1 : n * M(n - 1);";
        assert_eq!(value(source, vec![Value::Int32(5)]), Value::Int32(120));
    }

    #[test]
    fn runaway_recursion_overflows() {
        let source = "static int M(int n) => M(n + 1);";
        assert_eq!(
            run_with_depth(source, vec![Value::Int32(0)], 16),
            Err(RuntimeError::StackOverflow { limit: 16 })
        );
    }

    #[test]
    fn strings_and_host_calls() {
        let source = "static string M(string a, int b) => a + \" \" + Math.Max(b, 3) + string.Concat(\"!\", null);";
        assert_eq!(value(source, vec![Value::string("n"), Value::Int32(1)]), Value::string("n 3!"));
        assert_eq!(value("static int M(string s) => s.Length;", vec![Value::string("héllo")]), Value::Int32(5));
        assert_eq!(value("static char M(string s) => s[1];", vec![Value::string("héllo")]), Value::Char('é'));
    }

    #[test]
    fn arrays() {
        let source = "static int M(int n) { int[] xs = new int[n]; for (int i = 0; i < n; i++) xs[i] = i * i; return xs[n - 1] + xs.Length; }";
        assert_eq!(value(source, vec![Value::Int32(4)]), Value::Int32(13));

        let literal = "static int M(int i) { int[] xs = new int[] { 1, 2, 3 }; return xs[i]; }";
        assert_eq!(
            run(literal, vec![Value::Int32(3)]),
            Err(RuntimeError::IndexOutOfRange { index: 3, length: 3 })
        );
        assert_eq!(
            run("static int[] M(int n) => new int[n];", vec![Value::Int32(-1)]),
            Err(RuntimeError::NegativeArraySize(-1))
        );
    }

    #[test]
    fn nullables() {
        let source = "static int M(int? a) => a ?? -1;";
        assert_eq!(value(source, vec![Value::Null]), Value::Int32(-1));
        assert_eq!(value(source, vec![Value::Int32(4)]), Value::Int32(4));
        assert_eq!(value("static int? M(int? a) => a + 1;", vec![Value::Null]), Value::Null);
        assert_eq!(
            run("static int M(int? a) => a.Value;", vec![Value::Null]),
            Err(RuntimeError::NullableHasNoValue)
        );
    }

    #[test]
    fn runtime_errors() {
        assert_eq!(run("static int M(int a) => 10 / a;", vec![Value::Int32(0)]), Err(RuntimeError::DivideByZero));
        assert_eq!(run("static int M(string s) => s.Length;", vec![Value::Null]), Err(RuntimeError::NullReference));
        assert_eq!(run("static int M(int a) => Math.Abs(a);", vec![Value::Int32(i32::MIN)]), Err(RuntimeError::Overflow));
    }

    #[test]
    fn void_methods_return_nothing() {
        assert_eq!(run("static void M(int a) { int b = a; }", vec![Value::Int32(1)]), Ok(None));
    }
}
