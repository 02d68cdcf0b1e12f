/* Method signature data as supplied by class level disassembly. */
/* Types are kept in their JNI descriptor form e.g. Ljava/lang/Object; */

use std::fmt;

use bitflags::bitflags;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, one_of};
use nom::combinator::{all_consuming, map};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated};
use nom::IResult;

use crate::dex::error::{DexError, DexErrorKind};

/// A field or parameter type descriptor.
///
/// # Examples
///
/// ```
///  use smali_method::types::TypeDescriptor;
///
///  let t = TypeDescriptor::from_jni("[J").unwrap();
///  assert_eq!(t.to_jni(), "[J");
///  assert!(!t.is_wide());
///  assert!(TypeDescriptor::Long.is_wide());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Void,
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    /// Internal class name without the `L` and `;`, e.g. `java/lang/String`
    Object(String),
    Array(Box<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn from_jni(s: &str) -> Result<TypeDescriptor, DexError> {
        all_consuming(parse_type_descriptor)(s)
            .map(|(_, t)| t)
            .map_err(|_| DexError::new(DexErrorKind::InvalidDescriptor, &format!("Invalid type descriptor {}", s)))
    }

    pub fn to_jni(&self) -> String {
        match self {
            TypeDescriptor::Void => "V".to_string(),
            TypeDescriptor::Boolean => "Z".to_string(),
            TypeDescriptor::Byte => "B".to_string(),
            TypeDescriptor::Short => "S".to_string(),
            TypeDescriptor::Char => "C".to_string(),
            TypeDescriptor::Int => "I".to_string(),
            TypeDescriptor::Long => "J".to_string(),
            TypeDescriptor::Float => "F".to_string(),
            TypeDescriptor::Double => "D".to_string(),
            TypeDescriptor::Object(o) => format!("L{};", o),
            TypeDescriptor::Array(a) => format!("[{}", a.to_jni()),
        }
    }

    /// Long and double values occupy a register pair.
    pub fn is_wide(&self) -> bool {
        matches!(self, TypeDescriptor::Long | TypeDescriptor::Double)
    }

    /// Number of registers a value of this type occupies.
    pub fn register_count(&self) -> u16 {
        if self.is_wide() { 2 } else { 1 }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_jni())
    }
}

fn parse_primitive(smali: &str) -> IResult<&str, TypeDescriptor> {
    map(one_of("VZBSCIJFD"), |c| match c {
        'Z' => TypeDescriptor::Boolean,
        'B' => TypeDescriptor::Byte,
        'S' => TypeDescriptor::Short,
        'C' => TypeDescriptor::Char,
        'I' => TypeDescriptor::Int,
        'J' => TypeDescriptor::Long,
        'F' => TypeDescriptor::Float,
        'D' => TypeDescriptor::Double,
        _ => TypeDescriptor::Void,
    })(smali)
}

fn parse_object(smali: &str) -> IResult<&str, TypeDescriptor> {
    map(
        delimited(char('L'), take_while1(|c: char| c != ';' && c != '(' && c != ')'), char(';')),
        |name: &str| TypeDescriptor::Object(name.to_string()),
    )(smali)
}

fn parse_array(smali: &str) -> IResult<&str, TypeDescriptor> {
    map(preceded(char('['), parse_type_descriptor), |t| {
        TypeDescriptor::Array(Box::new(t))
    })(smali)
}

pub(crate) fn parse_type_descriptor(smali: &str) -> IResult<&str, TypeDescriptor> {
    alt((parse_primitive, parse_object, parse_array))(smali)
}

/// Parses `(<params>)<return>` into the parameter types and the return type.
pub(crate) fn parse_method_descriptor(smali: &str) -> IResult<&str, (Vec<TypeDescriptor>, TypeDescriptor)> {
    pair(
        preceded(char('('), terminated(many0(parse_type_descriptor), char(')'))),
        parse_type_descriptor,
    )(smali)
}

bitflags! {
    /// Access flags as stored in `encoded_method.access_flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const BRIDGE = 0x40;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const ABSTRACT = 0x400;
        const STRICTFP = 0x800;
        const SYNTHETIC = 0x1000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

const METHOD_KEYWORDS: [(AccessFlags, &str); 14] = [
    (AccessFlags::PUBLIC, "public"),
    (AccessFlags::PRIVATE, "private"),
    (AccessFlags::PROTECTED, "protected"),
    (AccessFlags::STATIC, "static"),
    (AccessFlags::FINAL, "final"),
    (AccessFlags::SYNCHRONIZED, "synchronized"),
    (AccessFlags::BRIDGE, "bridge"),
    (AccessFlags::VARARGS, "varargs"),
    (AccessFlags::NATIVE, "native"),
    (AccessFlags::ABSTRACT, "abstract"),
    (AccessFlags::STRICTFP, "strictfp"),
    (AccessFlags::SYNTHETIC, "synthetic"),
    (AccessFlags::CONSTRUCTOR, "constructor"),
    (AccessFlags::DECLARED_SYNCHRONIZED, "declared-synchronized"),
];

impl AccessFlags {
    /// Smali keywords for the method flags that are set, in canonical order.
    pub fn method_keywords(&self) -> Vec<&'static str> {
        METHOD_KEYWORDS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, keyword)| *keyword)
            .collect()
    }
}

/// Simple enum to represent annotation visibility: build, runtime, system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationVisibility {
    Build,
    Runtime,
    System,
}

impl AnnotationVisibility {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Build => "build",
            Self::Runtime => "runtime",
            Self::System => "system",
        }
    }
}

/// Annotation values can be a Single value, Array, Enum or another Annotation
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Single(String),
    Array(Vec<String>),
    SubAnnotation(Annotation),
    /// Enum type descriptor and constant name
    Enum(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationElement {
    pub name: String,
    pub value: AnnotationValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub visibility: AnnotationVisibility,
    pub annotation_type: String,
    pub elements: Vec<AnnotationElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodParameter {
    pub type_desc: TypeDescriptor,
    pub name: Option<String>,
    pub annotations: Vec<Annotation>,
}

/// Signature side of a method: everything but the code.
///
/// # Examples
///
/// ```
///  use smali_method::types::{AccessFlags, Method};
///
///  let m = Method::new("Lcom/example/Foo;", "sum", AccessFlags::PUBLIC, "(IJ)J").unwrap();
///  assert_eq!(m.full_method_string(), "Lcom/example/Foo;->sum(IJ)J");
///  assert!(!m.is_static());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub defining_class: String,
    pub name: String,
    pub access_flags: AccessFlags,
    pub parameters: Vec<MethodParameter>,
    pub return_type: TypeDescriptor,
    pub annotations: Vec<Annotation>,
}

impl Method {
    pub fn new(defining_class: &str, name: &str, access_flags: AccessFlags, descriptor: &str) -> Result<Method, DexError> {
        let (parameters, return_type) = all_consuming(parse_method_descriptor)(descriptor)
            .map(|(_, d)| d)
            .map_err(|_| {
                DexError::new(
                    DexErrorKind::InvalidDescriptor,
                    &format!("Invalid method descriptor {}", descriptor),
                )
            })?;

        Ok(Method {
            defining_class: defining_class.to_string(),
            name: name.to_string(),
            access_flags,
            parameters: parameters
                .into_iter()
                .map(|type_desc| MethodParameter { type_desc, name: None, annotations: vec![] })
                .collect(),
            return_type,
            annotations: vec![],
        })
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(AccessFlags::STATIC)
    }

    /// `(<params>)<return>`
    pub fn descriptor(&self) -> String {
        let mut s = String::from("(");
        for p in &self.parameters {
            s.push_str(&p.type_desc.to_jni());
        }
        s.push(')');
        s.push_str(&self.return_type.to_jni());
        s
    }

    /// `Lclass;->name(<params>)<return>`, used to identify the method in errors.
    pub fn full_method_string(&self) -> String {
        format!("{}->{}{}", self.defining_class, self.name, self.descriptor())
    }
}
