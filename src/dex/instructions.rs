//! Decoded representation of a method body: instructions, try blocks and debug records.

use serde::{Deserialize, Serialize};

use crate::dex::debug::DebugItem;
use crate::dex::opcodes::Opcode;

/// Data table embedded in the instruction stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload
{
    /// Targets are relative to the originating packed-switch instruction.
    PackedSwitch { first_key: i32, targets: Vec<i32> },
    /// `(key, relative target)` pairs.
    SparseSwitch { entries: Vec<(i32, i32)> },
    ArrayData { element_width: u16, elements: Vec<i64> },
}

impl Payload
{
    pub fn opcode(&self) -> Opcode
    {
        match self
        {
            Payload::PackedSwitch { .. } => Opcode::PackedSwitchPayload,
            Payload::SparseSwitch { .. } => Opcode::SparseSwitchPayload,
            Payload::ArrayData { .. } => Opcode::ArrayPayload,
        }
    }

    /// Encoded size in code units, header included.
    pub fn code_units(&self) -> u32
    {
        match self
        {
            Payload::PackedSwitch { targets, .. } => targets.len() as u32 * 2 + 4,
            Payload::SparseSwitch { entries } => entries.len() as u32 * 4 + 2,
            Payload::ArrayData { element_width, elements } =>
            {
                let bytes = elements.len() as u32 * *element_width as u32;
                (bytes + 1) / 2 + 4
            }
        }
    }
}

/// One decoded instruction. Operands arrive already decoded; pool references are
/// pre-rendered text such as `Ljava/lang/String;->length()I`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction
{
    pub opcode: Opcode,
    pub code_units: u32,
    #[serde(default)]
    pub registers: Vec<u16>,
    #[serde(default)]
    pub literal: Option<i64>,
    #[serde(default)]
    pub reference: Option<String>,
    /// Signed code-unit offset relative to this instruction (branch and switch families).
    #[serde(default)]
    pub code_offset: Option<i32>,
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl Instruction
{
    /// Instruction of a fixed-size format. Payload opcodes get a size of one code unit
    /// until a table is attached with [`Instruction::payload`].
    pub fn new(opcode: Opcode) -> Self
    {
        Instruction {
            opcode,
            code_units: opcode.format().code_units().unwrap_or(1),
            registers: vec![],
            literal: None,
            reference: None,
            code_offset: None,
            payload: None,
        }
    }

    pub fn payload(payload: Payload) -> Self
    {
        let mut i = Instruction::new(payload.opcode());
        i.code_units = payload.code_units();
        i.payload = Some(payload);
        i
    }

    pub fn with_registers(mut self, registers: &[u16]) -> Self
    {
        self.registers = registers.to_vec();
        self
    }

    pub fn with_literal(mut self, literal: i64) -> Self
    {
        self.literal = Some(literal);
        self
    }

    pub fn with_reference(mut self, reference: &str) -> Self
    {
        self.reference = Some(reference.to_string());
        self
    }

    pub fn with_code_offset(mut self, code_offset: i32) -> Self
    {
        self.code_offset = Some(code_offset);
        self
    }

    /// Override the decoded size, e.g. for padded or odd encodings.
    pub fn with_code_units(mut self, code_units: u32) -> Self
    {
        self.code_units = code_units;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionHandler
{
    /// `None` for a catch-all handler.
    pub exception_type: Option<String>,
    pub handler_code_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryBlock
{
    pub start_code_offset: u32,
    pub code_unit_count: u32,
    pub handlers: Vec<ExceptionHandler>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodImplementation
{
    pub register_count: u16,
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub try_blocks: Vec<TryBlock>,
    #[serde(default)]
    pub debug_items: Vec<DebugItem>,
}
