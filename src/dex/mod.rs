//! Decoded Dalvik method data consumed by the disassembler.

#[macro_use]
pub mod error;

pub mod debug;
pub mod instructions;
pub mod opcodes;
