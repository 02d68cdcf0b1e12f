//! # Smali method
//!
//! Reconstructs the smali text of Dalvik methods from their decoded form: instructions,
//! try blocks and debug records. Branch targets, switch tables and exception regions are
//! turned into labels and directives so the output can be assembled again.
//!
//! # Examples
//!
//! ```
//!  use smali_method::dex::instructions::{Instruction, MethodImplementation};
//!  use smali_method::dex::opcodes::Opcode;
//!  use smali_method::types::{AccessFlags, Method};
//!  use smali_method::{disassemble_method, BaksmaliOptions, EncodedMethod};
//!
//!  let method = Method::new("LFoo;", "run", AccessFlags::PUBLIC | AccessFlags::STATIC, "()V").unwrap();
//!  let implementation = MethodImplementation {
//!      register_count: 0,
//!      instructions: vec![Instruction::new(Opcode::ReturnVoid)],
//!      ..Default::default()
//!  };
//!  let encoded = EncodedMethod { method, implementation: Some(implementation) };
//!  let smali = disassemble_method(&encoded, &BaksmaliOptions::default()).unwrap();
//!  assert_eq!(smali, ".method public static run()V\n    .registers 0\n\n    return-void\n.end method\n");
//! ```

use log::warn;
use rayon::prelude::*;

use crate::dex::error::DexError;
use crate::dex::instructions::MethodImplementation;
use crate::smali_write::IndentingWriter;
use crate::types::Method;

pub mod debug_items;
pub mod dex;
mod instruction_format;
pub mod label_cache;
pub mod method_definition;
pub mod method_items;
pub mod offset_map;
pub mod options;
pub mod register_format;
pub mod smali_write;
mod tests;
pub mod types;

pub use method_definition::MethodDefinition;
pub use options::BaksmaliOptions;

/// A method as found in a class definition. Abstract and native methods have no
/// implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMethod {
    pub method: Method,
    pub implementation: Option<MethodImplementation>,
}

/// Smali text of a single method, from `.method` to `.end method`.
pub fn disassemble_method(encoded: &EncodedMethod, options: &BaksmaliOptions) -> Result<String, DexError> {
    let mut writer = IndentingWriter::new();
    match &encoded.implementation {
        Some(implementation) => {
            MethodDefinition::new(&encoded.method, implementation, options)?.write_to(&mut writer)?
        }
        None => MethodDefinition::write_empty_method_to(&mut writer, &encoded.method)?,
    }
    Ok(writer.into_string())
}

/// Disassembles every method in parallel. Results are in input order; a method that
/// fails is logged and does not affect the others.
pub fn disassemble_methods(methods: &[EncodedMethod], options: &BaksmaliOptions) -> Vec<Result<String, DexError>> {
    methods
        .par_iter()
        .map(|encoded| {
            let result = disassemble_method(encoded, options);
            if let Err(e) = &result {
                warn!("{}", e);
            }
            result
        })
        .collect()
}
