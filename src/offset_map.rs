use rangemap::RangeMap;

use crate::dex::error::DexError;
use crate::dex::instructions::Instruction;
use crate::fail;

/// Maps between an instruction's position in the method and its code-unit offset.
#[derive(Debug)]
pub struct InstructionOffsetMap {
    offsets: Vec<u32>,
    // [start, start + size) -> position, for lookups that land mid-instruction
    spans: RangeMap<u32, usize>,
    code_size: u32,
}

impl InstructionOffsetMap {
    pub fn new(instructions: &[Instruction]) -> Result<Self, DexError> {
        let mut offsets = Vec::with_capacity(instructions.len());
        let mut spans = RangeMap::new();
        let mut code_offset: u32 = 0;

        for (i, instruction) in instructions.iter().enumerate() {
            if instruction.code_units == 0 {
                fail!(MalformedInstruction, "Instruction {} ({}) has no code units", i, instruction.opcode);
            }
            let Some(end) = code_offset.checked_add(instruction.code_units) else {
                fail!(MalformedInstruction, "Instruction {} extends past the addressable code range", i);
            };
            offsets.push(code_offset);
            spans.insert(code_offset..end, i);
            code_offset = end;
        }

        Ok(InstructionOffsetMap { offsets, spans, code_size: code_offset })
    }

    /// Offset of the last instruction plus its size.
    pub fn code_size(&self) -> u32 {
        self.code_size
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn get_instruction_code_offset(&self, index: usize) -> Result<u32, DexError> {
        match self.offsets.get(index) {
            Some(offset) => Ok(*offset),
            None => fail!(NoInstructionAtOffset, "No instruction at index {}", index),
        }
    }

    /// Position of the instruction at `code_offset`.
    ///
    /// With `exact` the offset must be an instruction boundary. Otherwise the position of
    /// the last instruction starting at or before `code_offset` is returned, which also
    /// covers offsets at or past the end of the code.
    pub fn get_instruction_index_at_code_offset(&self, code_offset: u32, exact: bool) -> Result<usize, DexError> {
        if exact {
            return match self.offsets.binary_search(&code_offset) {
                Ok(index) => Ok(index),
                Err(_) => fail!(NoInstructionAtOffset, "No instruction at offset {:#x}", code_offset),
            };
        }

        if let Some(index) = self.spans.get(&code_offset) {
            return Ok(*index);
        }
        if code_offset >= self.code_size && !self.offsets.is_empty() {
            return Ok(self.offsets.len() - 1);
        }
        fail!(NoInstructionAtOffset, "No instruction at or before offset {:#x}", code_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::InstructionOffsetMap;
    use crate::dex::error::DexErrorKind;
    use crate::dex::instructions::Instruction;
    use crate::dex::opcodes::Opcode;

    fn sized(units: &[u32]) -> Vec<Instruction> {
        units.iter().map(|u| Instruction::new(Opcode::Nop).with_code_units(*u)).collect()
    }

    #[test]
    fn offsets_accumulate() {
        let map = InstructionOffsetMap::new(&sized(&[1, 3, 2, 5])).unwrap();
        let offsets: Vec<u32> = (0..map.len()).map(|i| map.get_instruction_code_offset(i).unwrap()).collect();
        assert_eq!(offsets, vec![0, 1, 4, 6]);
        assert_eq!(map.code_size(), 11);
        assert_eq!(map.get_instruction_code_offset(4).unwrap_err().kind(), DexErrorKind::NoInstructionAtOffset);
    }

    #[test]
    fn exact_lookup_is_left_inverse() {
        let map = InstructionOffsetMap::new(&sized(&[2, 1, 4, 1, 3])).unwrap();
        for i in 0..map.len() {
            let offset = map.get_instruction_code_offset(i).unwrap();
            assert_eq!(map.get_instruction_index_at_code_offset(offset, true).unwrap(), i);
        }
        let e = map.get_instruction_index_at_code_offset(4, true).unwrap_err();
        assert_eq!(e.kind(), DexErrorKind::NoInstructionAtOffset);
        assert!(map.get_instruction_index_at_code_offset(11, true).is_err());
    }

    #[test]
    fn floor_lookup() {
        // offsets 0, 2, 3, 7, 8; code size 11
        let map = InstructionOffsetMap::new(&sized(&[2, 1, 4, 1, 3])).unwrap();
        let expected = [0, 0, 1, 2, 2, 2, 2, 3, 4, 4, 4];
        for (x, p) in expected.iter().enumerate() {
            assert_eq!(map.get_instruction_index_at_code_offset(x as u32, false).unwrap(), *p, "offset {}", x);
        }
        // one past the end resolves to the last instruction
        assert_eq!(map.get_instruction_index_at_code_offset(11, false).unwrap(), 4);
    }

    #[test]
    fn rejects_zero_width() {
        let e = InstructionOffsetMap::new(&sized(&[1, 0, 1])).unwrap_err();
        assert_eq!(e.kind(), DexErrorKind::MalformedInstruction);
    }

    #[test]
    fn empty_method() {
        let map = InstructionOffsetMap::new(&[]).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.code_size(), 0);
        assert!(map.get_instruction_index_at_code_offset(0, false).is_err());
    }
}
