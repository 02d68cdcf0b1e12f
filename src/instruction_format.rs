//! Text of instruction lines and payload tables.
//!
//! Operands are printed in a fixed order (registers, literal, reference, target label),
//! which matches the smali syntax of every standard Dalvik format.

use crate::dex::instructions::{Instruction, Payload};
use crate::label_cache::{LabelCache, LabelRef};
use crate::register_format::RegisterFormatter;
use crate::smali_write::IndentingWriter;

pub(crate) fn format_literal(value: i64, suffix: &str) -> String {
    if value < 0 {
        format!("-{:#x}{}", value.unsigned_abs(), suffix)
    } else {
        format!("{:#x}{}", value, suffix)
    }
}

fn format_relative(offset: i32) -> String {
    if offset < 0 {
        format!("-{:#x}", offset.unsigned_abs())
    } else {
        format!("+{:#x}", offset)
    }
}

fn format_array_element(value: i64, element_width: u16) -> String {
    match element_width {
        1 => format_literal(value as i8 as i64, "t"),
        2 => format_literal(value as i16 as i64, "s"),
        4 => format_literal(value as i32 as i64, ""),
        8 => format_literal(value, "L"),
        _ => format_literal(value, ""),
    }
}

pub(crate) fn write_instruction(
    writer: &mut IndentingWriter,
    instruction: &Instruction,
    target: Option<LabelRef>,
    labels: &LabelCache,
    registers: &RegisterFormatter,
) {
    let format = instruction.opcode.format();
    let mut operands: Vec<String> = vec![];

    if format.is_register_list() {
        operands.push(registers.format_list(&instruction.registers));
    } else if format.is_register_range() {
        operands.push(registers.format_range(&instruction.registers));
    } else {
        operands.extend(instruction.registers.iter().map(|r| registers.format(*r)));
    }
    if let Some(literal) = instruction.literal {
        let suffix = if instruction.opcode.has_wide_literal() { "L" } else { "" };
        operands.push(format_literal(literal, suffix));
    }
    if let Some(reference) = &instruction.reference {
        operands.push(reference.clone());
    }
    if let Some(target) = target {
        operands.push(labels.label(target).to_string());
    }

    writer.write(instruction.opcode.name());
    if !operands.is_empty() {
        writer.write_char(' ');
        writer.write(&operands.join(", "));
    }
}

/// Writes a payload table. `cases` holds the case labels, or `None` when no switch
/// instruction references the table, in which case the raw relative targets are
/// written as comments.
pub(crate) fn write_payload(
    writer: &mut IndentingWriter,
    payload: &Payload,
    cases: Option<&[LabelRef]>,
    labels: &LabelCache,
) {
    match payload {
        Payload::PackedSwitch { first_key, targets } => {
            writeln!(writer, ".packed-switch {}", format_literal(*first_key as i64, ""));
            writer.indent(4);
            match cases {
                Some(cases) => {
                    for case in cases {
                        writeln!(writer, "{}", labels.label(*case));
                    }
                }
                None => {
                    for target in targets {
                        writeln!(writer, "# {}", format_relative(*target));
                    }
                }
            }
            writer.deindent(4);
            writer.write(".end packed-switch");
        }
        Payload::SparseSwitch { entries } => {
            writer.write(".sparse-switch\n");
            writer.indent(4);
            for (i, (key, target)) in entries.iter().enumerate() {
                let key = format_literal(*key as i64, "");
                match cases.and_then(|c| c.get(i)) {
                    Some(case) => writeln!(writer, "{} -> {}", key, labels.label(*case)),
                    None => writeln!(writer, "# {} -> {}", key, format_relative(*target)),
                }
            }
            writer.deindent(4);
            writer.write(".end sparse-switch");
        }
        Payload::ArrayData { element_width, elements } => {
            writeln!(writer, ".array-data {}", element_width);
            writer.indent(4);
            for element in elements {
                writeln!(writer, "{}", format_array_element(*element, *element_width));
            }
            writer.deindent(4);
            writer.write(".end array-data");
        }
    }
}
