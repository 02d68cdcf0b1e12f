//! The Dalvik instruction set, as far as method reconstruction needs to know it:
//! the smali mnemonic, the encoding format and the opcode value.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::label_cache::LabelKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Format10t,
    Format10x,
    Format11n,
    Format11x,
    Format12x,
    Format20t,
    Format21c,
    Format21ih,
    Format21lh,
    Format21s,
    Format21t,
    Format22b,
    Format22c,
    Format22s,
    Format22t,
    Format22x,
    Format23x,
    Format30t,
    Format31c,
    Format31i,
    Format31t,
    Format32x,
    Format35c,
    Format3rc,
    Format45cc,
    Format4rcc,
    Format51l,
    ArrayPayload,
    PackedSwitchPayload,
    SparseSwitchPayload,
}

impl Format {
    /// Size in code units, `None` for the variable-size payload formats.
    pub const fn code_units(&self) -> Option<u32> {
        match self {
            Format::Format10t
            | Format::Format10x
            | Format::Format11n
            | Format::Format11x
            | Format::Format12x => Some(1),

            Format::Format20t
            | Format::Format21c
            | Format::Format21ih
            | Format::Format21lh
            | Format::Format21s
            | Format::Format21t
            | Format::Format22b
            | Format::Format22c
            | Format::Format22s
            | Format::Format22t
            | Format::Format22x
            | Format::Format23x => Some(2),

            Format::Format30t
            | Format::Format31c
            | Format::Format31i
            | Format::Format31t
            | Format::Format32x
            | Format::Format35c
            | Format::Format3rc => Some(3),

            Format::Format45cc | Format::Format4rcc => Some(4),

            Format::Format51l => Some(5),

            Format::ArrayPayload
            | Format::PackedSwitchPayload
            | Format::SparseSwitchPayload => None,
        }
    }

    pub const fn is_payload_format(&self) -> bool {
        matches!(
            self,
            Format::ArrayPayload | Format::PackedSwitchPayload | Format::SparseSwitchPayload
        )
    }

    /// Formats that carry a signed code-unit offset relative to the instruction.
    pub const fn has_code_offset(&self) -> bool {
        matches!(
            self,
            Format::Format10t
                | Format::Format20t
                | Format::Format30t
                | Format::Format21t
                | Format::Format22t
                | Format::Format31t
        )
    }

    /// Invoke style `{vC, vD, ...}` register lists.
    pub const fn is_register_list(&self) -> bool {
        matches!(self, Format::Format35c | Format::Format45cc)
    }

    /// Invoke style `{vCCCC .. vNNNN}` register ranges.
    pub const fn is_register_range(&self) -> bool {
        matches!(self, Format::Format3rc | Format::Format4rcc)
    }
}

macro_rules! opcodes {
    ($( $variant:ident = $value:literal, $name:literal, $format:ident; )*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum Opcode {
            $( $variant, )*
        }

        static ALL_OPCODES: &[Opcode] = &[ $( Opcode::$variant, )* ];

        impl Opcode {
            /// The smali mnemonic, e.g. `move-result-wide`.
            pub const fn name(&self) -> &'static str {
                match self { $( Opcode::$variant => $name, )* }
            }

            /// Opcode value; payload pseudo-instructions use their 16 bit ident.
            pub const fn value(&self) -> u16 {
                match self { $( Opcode::$variant => $value, )* }
            }

            pub const fn format(&self) -> Format {
                match self { $( Opcode::$variant => Format::$format, )* }
            }
        }
    };
}

opcodes! {
    Nop = 0x00, "nop", Format10x;
    Move = 0x01, "move", Format12x;
    MoveFrom16 = 0x02, "move/from16", Format22x;
    Move16 = 0x03, "move/16", Format32x;
    MoveWide = 0x04, "move-wide", Format12x;
    MoveWideFrom16 = 0x05, "move-wide/from16", Format22x;
    MoveWide16 = 0x06, "move-wide/16", Format32x;
    MoveObject = 0x07, "move-object", Format12x;
    MoveObjectFrom16 = 0x08, "move-object/from16", Format22x;
    MoveObject16 = 0x09, "move-object/16", Format32x;
    MoveResult = 0x0a, "move-result", Format11x;
    MoveResultWide = 0x0b, "move-result-wide", Format11x;
    MoveResultObject = 0x0c, "move-result-object", Format11x;
    MoveException = 0x0d, "move-exception", Format11x;
    ReturnVoid = 0x0e, "return-void", Format10x;
    Return = 0x0f, "return", Format11x;
    ReturnWide = 0x10, "return-wide", Format11x;
    ReturnObject = 0x11, "return-object", Format11x;
    Const4 = 0x12, "const/4", Format11n;
    Const16 = 0x13, "const/16", Format21s;
    Const = 0x14, "const", Format31i;
    ConstHigh16 = 0x15, "const/high16", Format21ih;
    ConstWide16 = 0x16, "const-wide/16", Format21s;
    ConstWide32 = 0x17, "const-wide/32", Format31i;
    ConstWide = 0x18, "const-wide", Format51l;
    ConstWideHigh16 = 0x19, "const-wide/high16", Format21lh;
    ConstString = 0x1a, "const-string", Format21c;
    ConstStringJumbo = 0x1b, "const-string/jumbo", Format31c;
    ConstClass = 0x1c, "const-class", Format21c;
    MonitorEnter = 0x1d, "monitor-enter", Format11x;
    MonitorExit = 0x1e, "monitor-exit", Format11x;
    CheckCast = 0x1f, "check-cast", Format21c;
    InstanceOf = 0x20, "instance-of", Format22c;
    ArrayLength = 0x21, "array-length", Format12x;
    NewInstance = 0x22, "new-instance", Format21c;
    NewArray = 0x23, "new-array", Format22c;
    FilledNewArray = 0x24, "filled-new-array", Format35c;
    FilledNewArrayRange = 0x25, "filled-new-array/range", Format3rc;
    FillArrayData = 0x26, "fill-array-data", Format31t;
    Throw = 0x27, "throw", Format11x;
    Goto = 0x28, "goto", Format10t;
    Goto16 = 0x29, "goto/16", Format20t;
    Goto32 = 0x2a, "goto/32", Format30t;
    PackedSwitch = 0x2b, "packed-switch", Format31t;
    SparseSwitch = 0x2c, "sparse-switch", Format31t;
    CmplFloat = 0x2d, "cmpl-float", Format23x;
    CmpgFloat = 0x2e, "cmpg-float", Format23x;
    CmplDouble = 0x2f, "cmpl-double", Format23x;
    CmpgDouble = 0x30, "cmpg-double", Format23x;
    CmpLong = 0x31, "cmp-long", Format23x;
    IfEq = 0x32, "if-eq", Format22t;
    IfNe = 0x33, "if-ne", Format22t;
    IfLt = 0x34, "if-lt", Format22t;
    IfGe = 0x35, "if-ge", Format22t;
    IfGt = 0x36, "if-gt", Format22t;
    IfLe = 0x37, "if-le", Format22t;
    IfEqz = 0x38, "if-eqz", Format21t;
    IfNez = 0x39, "if-nez", Format21t;
    IfLtz = 0x3a, "if-ltz", Format21t;
    IfGez = 0x3b, "if-gez", Format21t;
    IfGtz = 0x3c, "if-gtz", Format21t;
    IfLez = 0x3d, "if-lez", Format21t;
    Aget = 0x44, "aget", Format23x;
    AgetWide = 0x45, "aget-wide", Format23x;
    AgetObject = 0x46, "aget-object", Format23x;
    AgetBoolean = 0x47, "aget-boolean", Format23x;
    AgetByte = 0x48, "aget-byte", Format23x;
    AgetChar = 0x49, "aget-char", Format23x;
    AgetShort = 0x4a, "aget-short", Format23x;
    Aput = 0x4b, "aput", Format23x;
    AputWide = 0x4c, "aput-wide", Format23x;
    AputObject = 0x4d, "aput-object", Format23x;
    AputBoolean = 0x4e, "aput-boolean", Format23x;
    AputByte = 0x4f, "aput-byte", Format23x;
    AputChar = 0x50, "aput-char", Format23x;
    AputShort = 0x51, "aput-short", Format23x;
    Iget = 0x52, "iget", Format22c;
    IgetWide = 0x53, "iget-wide", Format22c;
    IgetObject = 0x54, "iget-object", Format22c;
    IgetBoolean = 0x55, "iget-boolean", Format22c;
    IgetByte = 0x56, "iget-byte", Format22c;
    IgetChar = 0x57, "iget-char", Format22c;
    IgetShort = 0x58, "iget-short", Format22c;
    Iput = 0x59, "iput", Format22c;
    IputWide = 0x5a, "iput-wide", Format22c;
    IputObject = 0x5b, "iput-object", Format22c;
    IputBoolean = 0x5c, "iput-boolean", Format22c;
    IputByte = 0x5d, "iput-byte", Format22c;
    IputChar = 0x5e, "iput-char", Format22c;
    IputShort = 0x5f, "iput-short", Format22c;
    Sget = 0x60, "sget", Format21c;
    SgetWide = 0x61, "sget-wide", Format21c;
    SgetObject = 0x62, "sget-object", Format21c;
    SgetBoolean = 0x63, "sget-boolean", Format21c;
    SgetByte = 0x64, "sget-byte", Format21c;
    SgetChar = 0x65, "sget-char", Format21c;
    SgetShort = 0x66, "sget-short", Format21c;
    Sput = 0x67, "sput", Format21c;
    SputWide = 0x68, "sput-wide", Format21c;
    SputObject = 0x69, "sput-object", Format21c;
    SputBoolean = 0x6a, "sput-boolean", Format21c;
    SputByte = 0x6b, "sput-byte", Format21c;
    SputChar = 0x6c, "sput-char", Format21c;
    SputShort = 0x6d, "sput-short", Format21c;
    InvokeVirtual = 0x6e, "invoke-virtual", Format35c;
    InvokeSuper = 0x6f, "invoke-super", Format35c;
    InvokeDirect = 0x70, "invoke-direct", Format35c;
    InvokeStatic = 0x71, "invoke-static", Format35c;
    InvokeInterface = 0x72, "invoke-interface", Format35c;
    InvokeVirtualRange = 0x74, "invoke-virtual/range", Format3rc;
    InvokeSuperRange = 0x75, "invoke-super/range", Format3rc;
    InvokeDirectRange = 0x76, "invoke-direct/range", Format3rc;
    InvokeStaticRange = 0x77, "invoke-static/range", Format3rc;
    InvokeInterfaceRange = 0x78, "invoke-interface/range", Format3rc;
    NegInt = 0x7b, "neg-int", Format12x;
    NotInt = 0x7c, "not-int", Format12x;
    NegLong = 0x7d, "neg-long", Format12x;
    NotLong = 0x7e, "not-long", Format12x;
    NegFloat = 0x7f, "neg-float", Format12x;
    NegDouble = 0x80, "neg-double", Format12x;
    IntToLong = 0x81, "int-to-long", Format12x;
    IntToFloat = 0x82, "int-to-float", Format12x;
    IntToDouble = 0x83, "int-to-double", Format12x;
    LongToInt = 0x84, "long-to-int", Format12x;
    LongToFloat = 0x85, "long-to-float", Format12x;
    LongToDouble = 0x86, "long-to-double", Format12x;
    FloatToInt = 0x87, "float-to-int", Format12x;
    FloatToLong = 0x88, "float-to-long", Format12x;
    FloatToDouble = 0x89, "float-to-double", Format12x;
    DoubleToInt = 0x8a, "double-to-int", Format12x;
    DoubleToLong = 0x8b, "double-to-long", Format12x;
    DoubleToFloat = 0x8c, "double-to-float", Format12x;
    IntToByte = 0x8d, "int-to-byte", Format12x;
    IntToChar = 0x8e, "int-to-char", Format12x;
    IntToShort = 0x8f, "int-to-short", Format12x;
    AddInt = 0x90, "add-int", Format23x;
    SubInt = 0x91, "sub-int", Format23x;
    MulInt = 0x92, "mul-int", Format23x;
    DivInt = 0x93, "div-int", Format23x;
    RemInt = 0x94, "rem-int", Format23x;
    AndInt = 0x95, "and-int", Format23x;
    OrInt = 0x96, "or-int", Format23x;
    XorInt = 0x97, "xor-int", Format23x;
    ShlInt = 0x98, "shl-int", Format23x;
    ShrInt = 0x99, "shr-int", Format23x;
    UshrInt = 0x9a, "ushr-int", Format23x;
    AddLong = 0x9b, "add-long", Format23x;
    SubLong = 0x9c, "sub-long", Format23x;
    MulLong = 0x9d, "mul-long", Format23x;
    DivLong = 0x9e, "div-long", Format23x;
    RemLong = 0x9f, "rem-long", Format23x;
    AndLong = 0xa0, "and-long", Format23x;
    OrLong = 0xa1, "or-long", Format23x;
    XorLong = 0xa2, "xor-long", Format23x;
    ShlLong = 0xa3, "shl-long", Format23x;
    ShrLong = 0xa4, "shr-long", Format23x;
    UshrLong = 0xa5, "ushr-long", Format23x;
    AddFloat = 0xa6, "add-float", Format23x;
    SubFloat = 0xa7, "sub-float", Format23x;
    MulFloat = 0xa8, "mul-float", Format23x;
    DivFloat = 0xa9, "div-float", Format23x;
    RemFloat = 0xaa, "rem-float", Format23x;
    AddDouble = 0xab, "add-double", Format23x;
    SubDouble = 0xac, "sub-double", Format23x;
    MulDouble = 0xad, "mul-double", Format23x;
    DivDouble = 0xae, "div-double", Format23x;
    RemDouble = 0xaf, "rem-double", Format23x;
    AddInt2Addr = 0xb0, "add-int/2addr", Format12x;
    SubInt2Addr = 0xb1, "sub-int/2addr", Format12x;
    MulInt2Addr = 0xb2, "mul-int/2addr", Format12x;
    DivInt2Addr = 0xb3, "div-int/2addr", Format12x;
    RemInt2Addr = 0xb4, "rem-int/2addr", Format12x;
    AndInt2Addr = 0xb5, "and-int/2addr", Format12x;
    OrInt2Addr = 0xb6, "or-int/2addr", Format12x;
    XorInt2Addr = 0xb7, "xor-int/2addr", Format12x;
    ShlInt2Addr = 0xb8, "shl-int/2addr", Format12x;
    ShrInt2Addr = 0xb9, "shr-int/2addr", Format12x;
    UshrInt2Addr = 0xba, "ushr-int/2addr", Format12x;
    AddLong2Addr = 0xbb, "add-long/2addr", Format12x;
    SubLong2Addr = 0xbc, "sub-long/2addr", Format12x;
    MulLong2Addr = 0xbd, "mul-long/2addr", Format12x;
    DivLong2Addr = 0xbe, "div-long/2addr", Format12x;
    RemLong2Addr = 0xbf, "rem-long/2addr", Format12x;
    AndLong2Addr = 0xc0, "and-long/2addr", Format12x;
    OrLong2Addr = 0xc1, "or-long/2addr", Format12x;
    XorLong2Addr = 0xc2, "xor-long/2addr", Format12x;
    ShlLong2Addr = 0xc3, "shl-long/2addr", Format12x;
    ShrLong2Addr = 0xc4, "shr-long/2addr", Format12x;
    UshrLong2Addr = 0xc5, "ushr-long/2addr", Format12x;
    AddFloat2Addr = 0xc6, "add-float/2addr", Format12x;
    SubFloat2Addr = 0xc7, "sub-float/2addr", Format12x;
    MulFloat2Addr = 0xc8, "mul-float/2addr", Format12x;
    DivFloat2Addr = 0xc9, "div-float/2addr", Format12x;
    RemFloat2Addr = 0xca, "rem-float/2addr", Format12x;
    AddDouble2Addr = 0xcb, "add-double/2addr", Format12x;
    SubDouble2Addr = 0xcc, "sub-double/2addr", Format12x;
    MulDouble2Addr = 0xcd, "mul-double/2addr", Format12x;
    DivDouble2Addr = 0xce, "div-double/2addr", Format12x;
    RemDouble2Addr = 0xcf, "rem-double/2addr", Format12x;
    AddIntLit16 = 0xd0, "add-int/lit16", Format22s;
    RsubInt = 0xd1, "rsub-int", Format22s;
    MulIntLit16 = 0xd2, "mul-int/lit16", Format22s;
    DivIntLit16 = 0xd3, "div-int/lit16", Format22s;
    RemIntLit16 = 0xd4, "rem-int/lit16", Format22s;
    AndIntLit16 = 0xd5, "and-int/lit16", Format22s;
    OrIntLit16 = 0xd6, "or-int/lit16", Format22s;
    XorIntLit16 = 0xd7, "xor-int/lit16", Format22s;
    AddIntLit8 = 0xd8, "add-int/lit8", Format22b;
    RsubIntLit8 = 0xd9, "rsub-int/lit8", Format22b;
    MulIntLit8 = 0xda, "mul-int/lit8", Format22b;
    DivIntLit8 = 0xdb, "div-int/lit8", Format22b;
    RemIntLit8 = 0xdc, "rem-int/lit8", Format22b;
    AndIntLit8 = 0xdd, "and-int/lit8", Format22b;
    OrIntLit8 = 0xde, "or-int/lit8", Format22b;
    XorIntLit8 = 0xdf, "xor-int/lit8", Format22b;
    ShlIntLit8 = 0xe0, "shl-int/lit8", Format22b;
    ShrIntLit8 = 0xe1, "shr-int/lit8", Format22b;
    UshrIntLit8 = 0xe2, "ushr-int/lit8", Format22b;
    InvokePolymorphic = 0xfa, "invoke-polymorphic", Format45cc;
    InvokePolymorphicRange = 0xfb, "invoke-polymorphic/range", Format4rcc;
    InvokeCustom = 0xfc, "invoke-custom", Format35c;
    InvokeCustomRange = 0xfd, "invoke-custom/range", Format3rc;
    ConstMethodHandle = 0xfe, "const-method-handle", Format21c;
    ConstMethodType = 0xff, "const-method-type", Format21c;
    PackedSwitchPayload = 0x100, "packed-switch-payload", PackedSwitchPayload;
    SparseSwitchPayload = 0x200, "sparse-switch-payload", SparseSwitchPayload;
    ArrayPayload = 0x300, "array-payload", ArrayPayload;
}

static OPCODES_BY_NAME: Lazy<HashMap<&'static str, Opcode>> =
    Lazy::new(|| ALL_OPCODES.iter().map(|op| (op.name(), *op)).collect());

static OPCODES_BY_VALUE: Lazy<HashMap<u16, Opcode>> =
    Lazy::new(|| ALL_OPCODES.iter().map(|op| (op.value(), *op)).collect());

impl Opcode {
    pub fn from_value(value: u16) -> Option<Opcode> {
        OPCODES_BY_VALUE.get(&value).copied()
    }

    pub fn is_payload(&self) -> bool {
        self.format().is_payload_format()
    }

    /// The label kind an instruction of this opcode creates at its branch target,
    /// or `None` for opcodes without a code offset.
    pub fn target_label_kind(&self) -> Option<LabelKind> {
        match self {
            Opcode::Goto | Opcode::Goto16 | Opcode::Goto32 => Some(LabelKind::Goto),
            Opcode::PackedSwitch => Some(LabelKind::PackedSwitchData),
            Opcode::SparseSwitch => Some(LabelKind::SparseSwitchData),
            Opcode::FillArrayData => Some(LabelKind::ArrayData),
            op if matches!(op.format(), Format::Format21t | Format::Format22t) => Some(LabelKind::Cond),
            _ => None,
        }
    }

    /// Payload kind a switch opcode must point at.
    pub fn switch_payload(&self) -> Option<Opcode> {
        match self {
            Opcode::PackedSwitch => Some(Opcode::PackedSwitchPayload),
            Opcode::SparseSwitch => Some(Opcode::SparseSwitchPayload),
            _ => None,
        }
    }

    /// Literals of these opcodes are printed with the `L` suffix.
    pub fn has_wide_literal(&self) -> bool {
        matches!(
            self,
            Opcode::ConstWide16 | Opcode::ConstWide32 | Opcode::ConstWide | Opcode::ConstWideHigh16
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Opcode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OPCODES_BY_NAME
            .get(s)
            .copied()
            .ok_or_else(|| format!("Unknown opcode {}", s))
    }
}

impl TryFrom<String> for Opcode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Opcode> for &'static str {
    fn from(op: Opcode) -> Self {
        op.name()
    }
}

#[cfg(test)]
mod tests {
    use super::{Format, Opcode};
    use crate::label_cache::LabelKind;

    #[test]
    fn names_round_trip() {
        for op in super::ALL_OPCODES {
            assert_eq!(op.name().parse::<Opcode>(), Ok(*op));
            assert_eq!(Opcode::from_value(op.value()), Some(*op));
        }
        assert!("move-exception-wide".parse::<Opcode>().is_err());
    }

    #[test]
    fn classification() {
        assert_eq!(Opcode::IfLez.target_label_kind(), Some(LabelKind::Cond));
        assert_eq!(Opcode::IfEq.target_label_kind(), Some(LabelKind::Cond));
        assert_eq!(Opcode::Goto32.target_label_kind(), Some(LabelKind::Goto));
        assert_eq!(Opcode::ReturnVoid.target_label_kind(), None);
        assert_eq!(Opcode::SparseSwitch.switch_payload(), Some(Opcode::SparseSwitchPayload));
        assert!(Opcode::ArrayPayload.is_payload());
        assert!(!Opcode::Nop.is_payload());
        assert_eq!(Opcode::InvokeStaticRange.format(), Format::Format3rc);
        assert_eq!(Opcode::ConstWide.format().code_units(), Some(5));
        assert_eq!(Opcode::PackedSwitchPayload.format().code_units(), None);
    }
}
