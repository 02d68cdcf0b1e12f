use crate::dex::debug::{DebugItem, DebugItemKind};
use crate::method_items::{MethodItem, MethodItemKind};
use crate::register_format::RegisterFormatter;
use crate::smali_write::{escape_smali_string, IndentingWriter};

/// Wraps a debug record as a method item anchored at the record's code address.
pub fn debug_method_item(item: &DebugItem) -> MethodItem {
    MethodItem::new(item.code_address, MethodItemKind::Debug(item.kind.clone()))
}

/// Writes the directive for one debug record. Returns false when the record has no
/// textual form.
pub(crate) fn write_debug_item(writer: &mut IndentingWriter, kind: &DebugItemKind, registers: &RegisterFormatter) -> bool {
    match kind {
        DebugItemKind::LineNumber(line) => write!(writer, ".line {}", line),
        DebugItemKind::StartLocal { register, name, type_desc, signature } => {
            write!(writer, ".local {}, ", registers.format(*register));
            match name {
                Some(name) => write!(writer, "\"{}\"", escape_smali_string(name)),
                None => writer.write("null"),
            }
            writer.write_char(':');
            writer.write(type_desc.as_deref().unwrap_or("V"));
            if let Some(signature) = signature {
                write!(writer, ", \"{}\"", escape_smali_string(signature));
            }
        }
        DebugItemKind::EndLocal { register } => write!(writer, ".end local {}", registers.format(*register)),
        DebugItemKind::RestartLocal { register } => write!(writer, ".restart local {}", registers.format(*register)),
        DebugItemKind::PrologueEnd => writer.write(".prologue"),
        DebugItemKind::EpilogueBegin => writer.write(".epilogue"),
        DebugItemKind::SetSourceFile(Some(file)) => write!(writer, ".source \"{}\"", escape_smali_string(file)),
        DebugItemKind::SetSourceFile(None) => return false,
    }
    true
}
