//! Renderable units of a method body.
//!
//! Every line of a method body (instruction, label, catch directive, debug directive,
//! offset comment, blank separator) is a [`MethodItem`] anchored at a code address. The
//! body is the list of items sorted by address, then [`Priority`], then insertion order.

use crate::debug_items::write_debug_item;
use crate::dex::debug::DebugItemKind;
use crate::dex::instructions::Instruction;
use crate::instruction_format::{write_instruction, write_payload};
use crate::label_cache::{LabelCache, LabelId, LabelKind, LabelRef};
use crate::register_format::RegisterFormatter;
use crate::smali_write::IndentingWriter;

/// Order of items sharing an address. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    CodeOffset,
    Label,
    Catch,
    Instruction,
    Blank,
    Debug,
}

/// `.catch` / `.catchall` directive for one handler of a try block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchItem {
    pub exception_type: Option<String>,
    pub try_start: LabelRef,
    pub try_end: LabelRef,
    pub handler: LabelRef,
}

impl CatchItem {
    /// Interns the try boundary labels and the handler label. A handler without an
    /// exception type gets a `catchall_` label.
    pub fn new(
        labels: &mut LabelCache,
        exception_type: Option<String>,
        start_address: u32,
        end_address: u32,
        handler_address: u32,
    ) -> Self {
        let handler_kind = if exception_type.is_some() { LabelKind::Catch } else { LabelKind::CatchAll };
        CatchItem {
            try_start: labels.intern(LabelId::new(LabelKind::TryStart, start_address)),
            try_end: labels.intern(LabelId::new(LabelKind::TryEnd, end_address)),
            handler: labels.intern(LabelId::new(handler_kind, handler_address)),
            exception_type,
        }
    }

    fn write_to(&self, writer: &mut IndentingWriter, labels: &LabelCache) {
        match &self.exception_type {
            Some(exception_type) => write!(writer, ".catch {} ", exception_type),
            None => writer.write(".catchall "),
        }
        write!(
            writer,
            "{{{} .. {}}} {}",
            labels.label(self.try_start),
            labels.label(self.try_end),
            labels.label(self.handler)
        );
    }
}

/// An instruction by its position in the method, with resolved labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionItem {
    pub index: usize,
    /// Branch, switch or array-data target.
    pub target: Option<LabelRef>,
    /// Case labels of a switch payload that is referenced by a switch instruction.
    pub cases: Option<Vec<LabelRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodItemKind {
    CodeOffset,
    Label(LabelRef),
    Catch(CatchItem),
    Instruction(InstructionItem),
    Blank,
    Debug(DebugItemKind),
}

impl MethodItemKind {
    pub fn priority(&self) -> Priority {
        match self {
            MethodItemKind::CodeOffset => Priority::CodeOffset,
            MethodItemKind::Label(_) => Priority::Label,
            MethodItemKind::Catch(_) => Priority::Catch,
            MethodItemKind::Instruction(_) => Priority::Instruction,
            MethodItemKind::Blank => Priority::Blank,
            MethodItemKind::Debug(_) => Priority::Debug,
        }
    }
}

/// What items need to write themselves.
pub struct RenderContext<'a> {
    pub instructions: &'a [Instruction],
    pub labels: &'a LabelCache,
    pub registers: &'a RegisterFormatter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodItem {
    address: u32,
    priority: Priority,
    kind: MethodItemKind,
}

impl MethodItem {
    pub fn new(address: u32, kind: MethodItemKind) -> Self {
        MethodItem { address, priority: kind.priority(), kind }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn kind(&self) -> &MethodItemKind {
        &self.kind
    }

    /// Writes the item without a trailing newline. Returns whether anything was written,
    /// so the caller knows whether to end the line.
    pub fn write_to(&self, writer: &mut IndentingWriter, ctx: &RenderContext) -> bool {
        match &self.kind {
            MethodItemKind::CodeOffset => write!(writer, "#@{:x}", self.address),
            MethodItemKind::Label(label) => write!(writer, "{}", ctx.labels.label(*label)),
            MethodItemKind::Catch(catch) => catch.write_to(writer, ctx.labels),
            MethodItemKind::Instruction(item) => {
                let Some(instruction) = ctx.instructions.get(item.index) else {
                    return false;
                };
                match &instruction.payload {
                    Some(payload) => write_payload(writer, payload, item.cases.as_deref(), ctx.labels),
                    None => write_instruction(writer, instruction, item.target, ctx.labels, ctx.registers),
                }
            }
            MethodItemKind::Blank => {}
            MethodItemKind::Debug(kind) => return write_debug_item(writer, kind, ctx.registers),
        }
        true
    }
}

/// Items in insertion order; the insertion sequence breaks ties between items with the
/// same address and priority.
#[derive(Debug, Default)]
pub struct MethodItemList {
    items: Vec<MethodItem>,
}

impl MethodItemList {
    pub fn new() -> Self {
        MethodItemList::default()
    }

    pub fn push(&mut self, item: MethodItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_sorted(self) -> Vec<MethodItem> {
        let mut items = self.items;
        // stable sort keeps insertion order within equal keys
        items.sort_by_key(|item| (item.address, item.priority));
        items
    }
}
