use serde::{Deserialize, Serialize};

/// Output switches for method disassembly.
///
/// Field names are kebab-case when deserialized, and every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BaksmaliOptions {
    /// Print `.locals` (non-parameter registers) instead of `.registers`.
    pub emit_locals_directive: bool,
    pub emit_debug_info: bool,
    /// Name labels `cond_0, cond_1 ...` instead of by address.
    pub sequential_labels: bool,
    /// Add a `#@<offset>` comment before every instruction.
    pub emit_code_offset_comments: bool,
    /// Name incoming argument registers `pN`.
    pub parameter_registers: bool,
}

impl Default for BaksmaliOptions {
    fn default() -> Self {
        BaksmaliOptions {
            emit_locals_directive: false,
            emit_debug_info: true,
            sequential_labels: false,
            emit_code_offset_comments: false,
            parameter_registers: true,
        }
    }
}
