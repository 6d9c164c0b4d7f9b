//! Bytecode chunk for compiled methods.
//!
//! A `BytecodeChunk` holds the code for a single method along with the source
//! line of every byte, used to place runtime errors.

use super::{BytecodeError, OpCode};

/// Compiled bytecode for a single method.
///
/// Constants live in the module's [`ConstantPool`](super::ConstantPool) so
/// identical literals are shared across methods.
#[derive(Debug, Clone, Default)]
pub struct BytecodeChunk {
    code: Vec<u8>,
    /// Parallel to `code`.
    lines: Vec<u32>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a chunk from decoded code. Line information is not kept in
    /// module images, so every byte maps to line 0.
    pub fn from_code(code: Vec<u8>) -> Self {
        let lines = vec![0; code.len()];
        Self { code, lines }
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op.into());
        self.lines.push(line);
    }

    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Current code offset, for jump patching.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a forward jump and return the operand offset to patch later.
    ///
    /// The operand is initialized to 0xFFFF as a placeholder.
    pub fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.write_op(op, line);
        let offset = self.code.len();
        self.write_u16(0xFFFF, line);
        offset
    }

    /// Patch the jump whose operand sits at `offset` to land on the current
    /// position.
    pub fn patch_jump(&mut self, offset: usize) -> Result<(), BytecodeError> {
        let distance = self.code.len() - offset - 2;
        let encoded = u16::try_from(distance).map_err(|_| BytecodeError::JumpTooFar(distance))?;
        let [hi, lo] = encoded.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
        Ok(())
    }

    /// Emit a `Loop` that jumps back to `loop_start`.
    pub fn emit_loop(&mut self, loop_start: usize, line: u32) -> Result<(), BytecodeError> {
        self.write_op(OpCode::Loop, line);
        // +2 for the operand bytes about to be written
        let distance = self.code.len() - loop_start + 2;
        let encoded = u16::try_from(distance).map_err(|_| BytecodeError::JumpTooFar(distance))?;
        self.write_u16(encoded, line);
        Ok(())
    }

    /// Remove and return everything from `offset` on.
    ///
    /// Jumps are relative, so a split-off fragment whose jumps stay inside it
    /// can be appended elsewhere unchanged.
    pub fn split_off(&mut self, offset: usize) -> BytecodeChunk {
        BytecodeChunk {
            code: self.code.split_off(offset),
            lines: self.lines.split_off(offset),
        }
    }

    pub fn append(&mut self, mut other: BytecodeChunk) {
        self.code.append(&mut other.code);
        self.lines.append(&mut other.lines);
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn into_code(self) -> Vec<u8> {
        self.code
    }

    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.code.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// All opcodes in the chunk, operands skipped.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            if let Some(op) = self.read_op(offset) {
                ops.push(op);
                offset += 1 + op.operand_size();
            } else {
                offset += 1;
            }
        }

        ops
    }

    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut offset = 0;
        while offset < self.code.len() {
            let Some(op) = self.read_op(offset) else {
                out.push_str(&format!("{offset:04} ??? {:#04x}\n", self.code[offset]));
                offset += 1;
                continue;
            };
            let operands = &self.code[(offset + 1).min(self.code.len())
                ..(offset + 1 + op.operand_size()).min(self.code.len())];
            out.push_str(&format!("{offset:04} {}", op.name()));
            for byte in operands {
                out.push_str(&format!(" {byte}"));
            }
            out.push('\n');
            offset += 1 + op.operand_size();
        }
        out
    }

    /// Assert the chunk holds exactly this opcode sequence, operands ignored.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Assert the chunk contains these opcodes in order, not necessarily
    /// contiguous.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_is_empty() {
        let chunk = BytecodeChunk::new();
        assert!(chunk.is_empty());
        assert_eq!(chunk.len(), 0);
    }

    #[test]
    fn write_op_and_operand() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(42, 1);

        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.read_op(0), Some(OpCode::Constant));
        assert_eq!(chunk.read_byte(1), Some(42));
        assert_eq!(chunk.line_at(1), Some(1));
    }

    #[test]
    fn write_u16_is_big_endian() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_u16(0x1234, 5);
        assert_eq!(chunk.code(), &[0x12, 0x34]);
        assert_eq!(chunk.read_u16(0), Some(0x1234));
        assert_eq!(chunk.read_u16(1), None);
    }

    #[test]
    fn emit_and_patch_jump() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::PushTrue, 1);
        let jump = chunk.emit_jump(OpCode::JumpIfFalse, 2);
        chunk.write_op(OpCode::PushOne, 3);
        chunk.write_op(OpCode::PushZero, 3);
        chunk.patch_jump(jump).unwrap();

        // skips PushOne and PushZero
        assert_eq!(chunk.read_u16(jump), Some(2));
    }

    #[test]
    fn emit_loop() {
        let mut chunk = BytecodeChunk::new();
        let loop_start = chunk.current_offset();
        chunk.write_op(OpCode::PushOne, 1);
        chunk.write_op(OpCode::Pop, 1);
        chunk.emit_loop(loop_start, 2).unwrap();

        assert_eq!(chunk.len(), 5);
        assert_eq!(chunk.read_op(2), Some(OpCode::Loop));
        // 2 body bytes + 3 for the loop instruction
        assert_eq!(chunk.read_u16(3), Some(5));
    }

    #[test]
    fn fragments_move_with_their_jumps() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::PushTrue, 1);
        let start = chunk.current_offset();
        let jump = chunk.emit_jump(OpCode::JumpIfFalse, 1);
        chunk.write_op(OpCode::PushOne, 1);
        chunk.patch_jump(jump).unwrap();

        let fragment = chunk.split_off(start);
        assert_eq!(chunk.len(), 1);
        chunk.write_op(OpCode::Not, 1);
        chunk.append(fragment);
        chunk.assert_opcodes(&[OpCode::PushTrue, OpCode::Not, OpCode::JumpIfFalse, OpCode::PushOne]);
        assert_eq!(chunk.read_u16(3), Some(1));
    }

    #[test]
    fn oversized_jump_is_an_error() {
        let mut chunk = BytecodeChunk::new();
        let jump = chunk.emit_jump(OpCode::Jump, 1);
        for _ in 0..70_000 {
            chunk.write_op(OpCode::Pop, 1);
        }
        assert!(matches!(chunk.patch_jump(jump), Err(BytecodeError::JumpTooFar(_))));
    }

    #[test]
    fn opcodes_skip_operands() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Call, 1);
        chunk.write_u16(3, 1);
        chunk.write_byte(2, 1);
        chunk.write_op(OpCode::Return, 1);

        assert_eq!(chunk.opcodes(), vec![OpCode::Call, OpCode::Return]);
        chunk.assert_opcodes(&[OpCode::Call, OpCode::Return]);
        assert!(chunk.disassemble().starts_with("0000 CALL 0 3 2"));
    }

    #[test]
    #[should_panic(expected = "Bytecode mismatch")]
    fn assert_opcodes_failure() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(0, 1);
        chunk.assert_opcodes(&[OpCode::GetLocal]);
    }

    #[test]
    #[should_panic(expected = "Missing opcodes")]
    fn assert_contains_opcodes_failure() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(0, 1);
        chunk.assert_contains_opcodes(&[OpCode::Constant, OpCode::SubI32]);
    }
}
