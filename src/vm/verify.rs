//! Load-time code verification.
//!
//! Every method is walked once. Opcodes must decode, operands must be in
//! bounds for the module, calls must pass as many arguments as the callee
//! takes, and every jump must land on the start of an instruction.

use dyncode_compiler::OpCode;
use dyncode_compiler::bytecode::ArrayElement;

use crate::backend::LoadError;
use crate::module::LoadedModule;

pub(super) fn verify_module(module: &LoadedModule) -> Result<(), LoadError> {
    for index in 0..module.methods.len() {
        verify_method(module, index).map_err(|(offset, detail)| LoadError::InvalidCode {
            method: module.method_name(index),
            offset,
            detail,
        })?;
    }
    Ok(())
}

type Failure = (usize, String);

fn verify_method(module: &LoadedModule, index: usize) -> Result<(), Failure> {
    let method = module.method(index);
    let code = &method.code;
    if method.params.len() > method.frame_size {
        return Err((0, format!("{} parameters in a frame of {}", method.params.len(), method.frame_size)));
    }
    if code.is_empty() {
        return Err((0, "empty method body".to_string()));
    }

    let mut starts = vec![false; code.len()];
    let mut targets = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        starts[offset] = true;
        let op = OpCode::try_from(code[offset])
            .map_err(|_| (offset, format!("unknown opcode {:#04x}", code[offset])))?;
        let next = offset + 1 + op.operand_size();
        let operands = code
            .get(offset + 1..next)
            .ok_or_else(|| (offset, format!("{} operands run past the end", op.name())))?;

        match op {
            OpCode::Constant | OpCode::ConstantWide => {
                let constant = operand(operands, op);
                if constant >= module.constants.len() {
                    return Err((offset, format!("constant {constant} out of range")));
                }
            }
            OpCode::GetLocal | OpCode::SetLocal => {
                let slot = operand(operands, op);
                if slot >= method.frame_size {
                    return Err((offset, format!("local {slot} outside a frame of {}", method.frame_size)));
                }
            }
            OpCode::NewArray => {
                ArrayElement::try_from(operands[0])
                    .map_err(|_| (offset, format!("unknown array element kind {}", operands[0])))?;
            }
            OpCode::Call => {
                let (callee, argc) = call_operands(operands);
                let params = module
                    .methods
                    .get(callee)
                    .map(|callee| callee.params.len())
                    .ok_or_else(|| (offset, format!("method {callee} out of range")))?;
                if params != argc {
                    return Err((offset, format!("call passes {argc} arguments to a method taking {params}")));
                }
            }
            OpCode::CallHost => {
                let (import, argc) = call_operands(operands);
                let params = module
                    .imports
                    .get(import)
                    .map(|import| import.params().len())
                    .ok_or_else(|| (offset, format!("import {import} out of range")))?;
                if params != argc {
                    return Err((offset, format!("call passes {argc} arguments to a host function taking {params}")));
                }
            }
            OpCode::Jump | OpCode::JumpIfFalse => {
                targets.push((offset, next + operand(operands, op)));
            }
            OpCode::Loop => {
                let distance = operand(operands, op);
                let target = next
                    .checked_sub(distance)
                    .ok_or_else(|| (offset, format!("loop distance {distance} runs before the start")))?;
                targets.push((offset, target));
            }
            _ => {}
        }
        offset = next;
    }

    for (offset, target) in targets {
        if !starts.get(target).copied().unwrap_or(false) {
            return Err((offset, format!("jump target {target} is not an instruction")));
        }
    }
    Ok(())
}

/// The single u8 or u16 operand of `op`.
fn operand(operands: &[u8], op: OpCode) -> usize {
    match op.operand_size() {
        1 => usize::from(operands[0]),
        _ => usize::from(u16::from_be_bytes([operands[0], operands[1]])),
    }
}

fn call_operands(operands: &[u8]) -> (usize, usize) {
    (
        usize::from(u16::from_be_bytes([operands[0], operands[1]])),
        usize::from(operands[2]),
    )
}
