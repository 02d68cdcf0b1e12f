use serde::{Deserialize, Serialize};

/// A decoded debug_info state-machine event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugItemKind
{
    LineNumber(u32),
    StartLocal
    {
        register: u16,
        name: Option<String>,
        type_desc: Option<String>,
        signature: Option<String>,
    },
    EndLocal { register: u16 },
    RestartLocal { register: u16 },
    PrologueEnd,
    EpilogueBegin,
    SetSourceFile(Option<String>),
}

/// A debug event together with the code address it takes effect at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugItem
{
    pub code_address: u32,
    pub kind: DebugItemKind,
}

impl DebugItem
{
    pub fn new(code_address: u32, kind: DebugItemKind) -> Self
    {
        DebugItem { code_address, kind }
    }
}
