use std::fmt;

/// Early-return a [`DexError`] of the given kind from the enclosing function.
#[macro_export]
macro_rules! fail {
    ($kind:ident, $msg:literal) => {
        return Err($crate::dex::error::DexError::new(
            $crate::dex::error::DexErrorKind::$kind,
            $msg,
        ))
    };
    ($kind:ident, $fmtstr:literal, $($args:tt)*) => {
        return Err($crate::dex::error::DexError::new(
            $crate::dex::error::DexErrorKind::$kind,
            &format!($fmtstr, $($args)*),
        ))
    };
}

/// Structural failures that abort the reconstruction of a single method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DexErrorKind
{
    /// A switch points at something other than its payload (or a single nop before it).
    MissingSwitchPayload,
    /// A try block starts or ends past the end of the code.
    TryRegionOutOfBounds,
    /// An exception handler lies past the end of the code.
    HandlerOffsetOutOfBounds,
    /// An exact offset lookup did not land on an instruction boundary.
    NoInstructionAtOffset,
    /// Zero-width instruction, or a branch without its relative offset.
    MalformedInstruction,
    /// A type or method descriptor could not be parsed.
    InvalidDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexError
{
    kind: DexErrorKind,
    msg: String,
    contexts: Vec<String>,
}

impl DexError
{
    pub(crate) fn new(kind: DexErrorKind, msg: &str) -> Self
    {
        DexError {
            kind,
            msg: msg.to_string(),
            contexts: Vec::new(),
        }
    }

    pub(crate) fn with_context(base: DexError, context: String) -> Self
    {
        let mut contexts = base.contexts;
        contexts.push(context);
        DexError { kind: base.kind, msg: base.msg, contexts }
    }

    pub fn kind(&self) -> DexErrorKind
    {
        self.kind
    }

    pub fn message(&self) -> &str
    {
        &self.msg
    }

    /// Contexts in the order they were attached, innermost first.
    pub fn contexts(&self) -> &[String]
    {
        &self.contexts
    }
}

impl fmt::Display for DexError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.msg)?;
        let mut connector = " for ";
        for context in &self.contexts
        {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for DexError {}
