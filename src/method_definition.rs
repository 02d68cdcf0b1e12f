//! Reconstruction of one method body as smali text.
//!
//! [`MethodDefinition::new`] validates the switch structure of the body up front. Every
//! call to [`MethodDefinition::write_to`] then collects a fresh set of method items and
//! labels, sorts them and writes them, so the definition itself never changes.

use std::collections::BTreeMap;

use log::debug;

use crate::debug_items::debug_method_item;
use crate::dex::error::DexError;
use crate::dex::instructions::{Instruction, MethodImplementation, Payload};
use crate::dex::opcodes::Opcode;
use crate::fail;
use crate::label_cache::{LabelCache, LabelId, LabelKind, LabelRef};
use crate::method_items::{CatchItem, InstructionItem, MethodItem, MethodItemKind, MethodItemList, RenderContext};
use crate::offset_map::InstructionOffsetMap;
use crate::options::BaksmaliOptions;
use crate::register_format::{parameter_register_count, RegisterFormatter};
use crate::smali_write::{write_access_flags, write_annotations, write_parameters, IndentingWriter};
use crate::types::Method;

/// Absolute address of a branch target.
fn branch_target(address: u32, relative: i32) -> Result<u32, DexError> {
    match u32::try_from(address as i64 + relative as i64) {
        Ok(target) => Ok(target),
        Err(_) => fail!(NoInstructionAtOffset, "Branch at {:#x} targets {:+} outside the code", address, relative),
    }
}

#[derive(Debug)]
pub struct MethodDefinition<'a> {
    method: &'a Method,
    implementation: &'a MethodImplementation,
    options: &'a BaksmaliOptions,
    offset_map: InstructionOffsetMap,
    registers: RegisterFormatter,
    // switch address -> resolved payload address
    switch_payloads: BTreeMap<u32, u32>,
    // payload address -> address of the first switch using it
    packed_switch_map: BTreeMap<u32, u32>,
    sparse_switch_map: BTreeMap<u32, u32>,
}

impl<'a> MethodDefinition<'a> {
    pub fn new(
        method: &'a Method,
        implementation: &'a MethodImplementation,
        options: &'a BaksmaliOptions,
    ) -> Result<Self, DexError> {
        Self::build(method, implementation, options).map_err(|e| in_method(e, method))
    }

    fn build(
        method: &'a Method,
        implementation: &'a MethodImplementation,
        options: &'a BaksmaliOptions,
    ) -> Result<Self, DexError> {
        let offset_map = InstructionOffsetMap::new(&implementation.instructions)?;
        let registers = RegisterFormatter::new(
            implementation.register_count,
            parameter_register_count(method)?,
            options.parameter_registers,
        );

        let mut definition = MethodDefinition {
            method,
            implementation,
            options,
            offset_map,
            registers,
            switch_payloads: BTreeMap::new(),
            packed_switch_map: BTreeMap::new(),
            sparse_switch_map: BTreeMap::new(),
        };

        for (index, instruction) in implementation.instructions.iter().enumerate() {
            let Some(payload_type) = instruction.opcode.switch_payload() else {
                continue;
            };
            let address = definition.offset_map.get_instruction_code_offset(index)?;
            let Some(relative) = instruction.code_offset else {
                fail!(MalformedInstruction, "{} at {:#x} has no code offset", instruction.opcode, address);
            };
            let payload_address = definition.find_switch_payload(address as i64 + relative as i64, payload_type)?;

            definition.switch_payloads.insert(address, payload_address);
            let map = match payload_type {
                Opcode::PackedSwitchPayload => &mut definition.packed_switch_map,
                _ => &mut definition.sparse_switch_map,
            };
            map.entry(payload_address).or_insert(address);
        }

        Ok(definition)
    }

    /// Address of the `payload_type` table a switch targeting `target_offset` uses.
    /// A single nop at the target is skipped, since payloads are 4-byte aligned.
    pub(crate) fn find_switch_payload(&self, target_offset: i64, payload_type: Opcode) -> Result<u32, DexError> {
        let instructions = &self.implementation.instructions;
        let index = u32::try_from(target_offset)
            .ok()
            .and_then(|offset| self.offset_map.get_instruction_index_at_code_offset(offset, true).ok());
        let Some(index) = index else {
            fail!(MissingSwitchPayload, "No switch payload at offset {:#x}", target_offset);
        };

        match instructions[index].opcode {
            opcode if opcode == payload_type => self.offset_map.get_instruction_code_offset(index),
            Opcode::Nop => match instructions.get(index + 1) {
                Some(next) if next.opcode == payload_type => {
                    let address = self.offset_map.get_instruction_code_offset(index + 1)?;
                    debug!("switch payload at {:#x} is preceded by nop padding", address);
                    Ok(address)
                }
                _ => fail!(MissingSwitchPayload, "No switch payload at offset {:#x}", target_offset),
            },
            _ => fail!(MissingSwitchPayload, "No switch payload at offset {:#x}", target_offset),
        }
    }

    /// Address of the packed-switch instruction whose table is at `payload_address`.
    pub fn packed_switch_base_address(&self, payload_address: u32) -> Option<u32> {
        self.packed_switch_map.get(&payload_address).copied()
    }

    /// Address of the sparse-switch instruction whose table is at `payload_address`.
    pub fn sparse_switch_base_address(&self, payload_address: u32) -> Option<u32> {
        self.sparse_switch_map.get(&payload_address).copied()
    }

    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn offset_map(&self) -> &InstructionOffsetMap {
        &self.offset_map
    }

    pub fn register_formatter(&self) -> &RegisterFormatter {
        &self.registers
    }

    /// All items of the body in output order, with the labels they refer to.
    pub fn method_items(&self) -> Result<(Vec<MethodItem>, LabelCache), DexError> {
        self.collect_method_items().map_err(|e| in_method(e, self.method))
    }

    fn collect_method_items(&self) -> Result<(Vec<MethodItem>, LabelCache), DexError> {
        let mut labels = LabelCache::new();
        let mut items = MethodItemList::new();

        self.add_instruction_method_items(&mut items, &mut labels)?;
        self.add_tries(&mut items, &mut labels)?;
        if self.options.emit_debug_info {
            self.add_debug_info(&mut items);
        }

        if self.options.sequential_labels {
            labels.assign_sequential_numbers();
        }
        for label in labels.sorted_labels() {
            items.push(MethodItem::new(labels.label(label).address(), MethodItemKind::Label(label)));
        }

        Ok((items.into_sorted(), labels))
    }

    fn add_instruction_method_items(&self, items: &mut MethodItemList, labels: &mut LabelCache) -> Result<(), DexError> {
        let instructions = &self.implementation.instructions;
        for (index, instruction) in instructions.iter().enumerate() {
            let address = self.offset_map.get_instruction_code_offset(index)?;
            if instruction.opcode.format().is_register_range() && !RegisterFormatter::is_contiguous(&instruction.registers) {
                fail!(
                    MalformedInstruction,
                    "{} at {:#x} has non-consecutive registers {:?}",
                    instruction.opcode,
                    address,
                    instruction.registers
                );
            }
            let target = self.instruction_target(address, instruction, labels)?;
            let cases = self.payload_cases(address, instruction, labels)?;

            items.push(MethodItem::new(
                address,
                MethodItemKind::Instruction(InstructionItem { index, target, cases }),
            ));
            if index + 1 != instructions.len() {
                items.push(MethodItem::new(address, MethodItemKind::Blank));
            }
            if self.options.emit_code_offset_comments {
                items.push(MethodItem::new(address, MethodItemKind::CodeOffset));
            }
        }
        Ok(())
    }

    fn instruction_target(
        &self,
        address: u32,
        instruction: &Instruction,
        labels: &mut LabelCache,
    ) -> Result<Option<LabelRef>, DexError> {
        let Some(kind) = instruction.opcode.target_label_kind() else {
            return Ok(None);
        };
        let Some(relative) = instruction.code_offset else {
            fail!(MalformedInstruction, "{} at {:#x} has no code offset", instruction.opcode, address);
        };
        let target = match self.switch_payloads.get(&address) {
            Some(payload_address) => *payload_address,
            None => branch_target(address, relative)?,
        };
        Ok(Some(labels.intern(LabelId::new(kind, target))))
    }

    /// Case labels for a switch table, relative to the switch that owns it. `None` when no
    /// switch references the table.
    fn payload_cases(
        &self,
        address: u32,
        instruction: &Instruction,
        labels: &mut LabelCache,
    ) -> Result<Option<Vec<LabelRef>>, DexError> {
        let (base, kind, targets): (Option<u32>, LabelKind, Vec<i32>) = match &instruction.payload {
            Some(Payload::PackedSwitch { targets, .. }) => {
                (self.packed_switch_base_address(address), LabelKind::PackedSwitch, targets.clone())
            }
            Some(Payload::SparseSwitch { entries }) => (
                self.sparse_switch_base_address(address),
                LabelKind::SparseSwitch,
                entries.iter().map(|(_, target)| *target).collect(),
            ),
            _ => return Ok(None),
        };
        let Some(base) = base else {
            return Ok(None);
        };

        let mut cases = Vec::with_capacity(targets.len());
        for relative in targets {
            let target = branch_target(base, relative)?;
            cases.push(labels.intern(LabelId::new(kind, target)));
        }
        Ok(Some(cases))
    }

    fn add_tries(&self, items: &mut MethodItemList, labels: &mut LabelCache) -> Result<(), DexError> {
        let code_size = self.offset_map.code_size();

        for try_block in &self.implementation.try_blocks {
            let start_address = try_block.start_code_offset;
            let end_address = start_address as u64 + try_block.code_unit_count as u64;

            if start_address >= code_size {
                fail!(
                    TryRegionOutOfBounds,
                    "Try start offset {} is past the end of the code block of size {}",
                    start_address,
                    code_size
                );
            }
            if end_address > code_size as u64 {
                fail!(
                    TryRegionOutOfBounds,
                    "Try end offset {} is past the end of the code block of size {}",
                    end_address,
                    code_size
                );
            }
            let end_address = end_address as u32;

            // the end offset may point into the middle of the last covered instruction; an
            // empty block anchors at the instruction before its start
            let Some(last_offset) = end_address.checked_sub(1) else {
                fail!(TryRegionOutOfBounds, "Empty try block at offset {} has no preceding instruction", start_address);
            };
            let last_index = self.offset_map.get_instruction_index_at_code_offset(last_offset, false)?;
            let last_covered_address = self.offset_map.get_instruction_code_offset(last_index)?;

            for handler in &try_block.handlers {
                let handler_address = handler.handler_code_offset;
                if handler_address >= code_size {
                    fail!(
                        HandlerOffsetOutOfBounds,
                        "Exception handler offset {} is past the end of the code block of size {}",
                        handler_address,
                        code_size
                    );
                }
                let catch = CatchItem::new(
                    labels,
                    handler.exception_type.clone(),
                    start_address,
                    end_address,
                    handler_address,
                );
                items.push(MethodItem::new(last_covered_address, MethodItemKind::Catch(catch)));
            }
        }
        Ok(())
    }

    fn add_debug_info(&self, items: &mut MethodItemList) {
        for debug_item in &self.implementation.debug_items {
            items.push(debug_method_item(debug_item));
        }
    }

    /// Writes the complete `.method` ... `.end method` block.
    ///
    /// Items are collected before anything is written, so a failing method leaves the
    /// writer untouched.
    pub fn write_to(&self, writer: &mut IndentingWriter) -> Result<(), DexError> {
        let (items, labels) = self.method_items()?;

        write_method_header(writer, self.method);
        writer.indent(4);
        if self.options.emit_locals_directive {
            writeln!(writer, ".locals {}", self.registers.local_register_count());
        } else {
            writeln!(writer, ".registers {}", self.registers.register_count);
        }
        write_parameters(writer, &self.method.parameters, receiver_register_count(self.method));
        write_annotations(writer, &self.method.annotations);
        writer.write_char('\n');

        let ctx = RenderContext {
            instructions: &self.implementation.instructions,
            labels: &labels,
            registers: &self.registers,
        };
        for item in &items {
            if item.write_to(writer, &ctx) {
                writer.write_char('\n');
            }
        }
        writer.deindent(4);
        writer.write(".end method\n");

        debug!("disassembled {} ({} items)", self.method.full_method_string(), items.len());
        Ok(())
    }

    /// `.method` block for a method without code, such as an abstract or native method.
    pub fn write_empty_method_to(writer: &mut IndentingWriter, method: &Method) -> Result<(), DexError> {
        parameter_register_count(method).map_err(|e| in_method(e, method))?;

        write_method_header(writer, method);
        writer.indent(4);
        write_parameters(writer, &method.parameters, receiver_register_count(method));
        write_annotations(writer, &method.annotations);
        writer.deindent(4);
        writer.write(".end method\n");
        Ok(())
    }
}

fn in_method(error: DexError, method: &Method) -> DexError {
    DexError::with_context(error, format!("method {}", method.full_method_string()))
}

fn receiver_register_count(method: &Method) -> u16 {
    if method.is_static() {
        0
    } else {
        1
    }
}

fn write_method_header(writer: &mut IndentingWriter, method: &Method) {
    writer.write(".method ");
    write_access_flags(writer, method.access_flags);
    writer.write(&method.name);
    writer.write(&method.descriptor());
    writer.write_char('\n');
}

#[cfg(test)]
mod tests {
    use super::{branch_target, MethodDefinition};
    use crate::dex::error::DexErrorKind;
    use crate::dex::instructions::{Instruction, MethodImplementation, Payload};
    use crate::dex::opcodes::Opcode;
    use crate::options::BaksmaliOptions;
    use crate::types::{AccessFlags, Method};

    #[test]
    fn branch_targets() {
        assert_eq!(branch_target(10, -4).unwrap(), 6);
        assert_eq!(branch_target(10, 6).unwrap(), 16);
        assert_eq!(branch_target(2, -4).unwrap_err().kind(), DexErrorKind::NoInstructionAtOffset);
    }

    #[test]
    fn first_switch_keeps_shared_payload() {
        let method = Method::new("LFoo;", "f", AccessFlags::STATIC, "(I)V").unwrap();
        let implementation = MethodImplementation {
            register_count: 1,
            instructions: vec![
                Instruction::new(Opcode::PackedSwitch).with_registers(&[0]).with_code_offset(7),
                Instruction::new(Opcode::PackedSwitch).with_registers(&[0]).with_code_offset(4),
                Instruction::new(Opcode::ReturnVoid),
                Instruction::payload(Payload::PackedSwitch { first_key: 0, targets: vec![6] }),
            ],
            ..Default::default()
        };
        let options = BaksmaliOptions::default();
        let def = MethodDefinition::new(&method, &implementation, &options).unwrap();
        assert_eq!(def.packed_switch_base_address(7), Some(0));
        assert_eq!(def.packed_switch_base_address(0), None);
        assert_eq!(def.sparse_switch_base_address(7), None);
    }

    #[test]
    fn missing_branch_offset_is_malformed() {
        let method = Method::new("LFoo;", "f", AccessFlags::STATIC, "()V").unwrap();
        let implementation = MethodImplementation {
            register_count: 0,
            instructions: vec![Instruction::new(Opcode::Goto), Instruction::new(Opcode::ReturnVoid)],
            ..Default::default()
        };
        let options = BaksmaliOptions::default();
        let def = MethodDefinition::new(&method, &implementation, &options).unwrap();
        let err = def.method_items().unwrap_err();
        assert_eq!(err.kind(), DexErrorKind::MalformedInstruction);
        assert_eq!(err.contexts(), &["method LFoo;->f()V".to_string()]);
    }
}
