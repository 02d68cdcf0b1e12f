use std::fmt;

use crate::types::{AccessFlags, Annotation, AnnotationValue, MethodParameter};

/// String sink that prefixes every non-empty line with the current indentation.
#[derive(Debug)]
pub struct IndentingWriter
{
    out: String,
    indent: usize,
    at_line_start: bool,
}

impl Default for IndentingWriter
{
    fn default() -> Self
    {
        IndentingWriter { out: String::new(), indent: 0, at_line_start: true }
    }
}

impl IndentingWriter
{
    pub fn new() -> Self
    {
        IndentingWriter::default()
    }

    pub fn write(&mut self, s: &str)
    {
        for ch in s.chars()
        {
            self.write_char(ch);
        }
    }

    pub fn write_char(&mut self, ch: char)
    {
        if ch == '\n'
        {
            self.out.push('\n');
            self.at_line_start = true;
            return;
        }
        if self.at_line_start
        {
            self.out.extend(std::iter::repeat(' ').take(self.indent));
            self.at_line_start = false;
        }
        self.out.push(ch);
    }

    /// Target of the `write!` macro.
    pub fn write_fmt(&mut self, args: fmt::Arguments<'_>)
    {
        match args.as_str()
        {
            Some(s) => self.write(s),
            None => self.write(&args.to_string()),
        }
    }

    pub fn indent(&mut self, amount: usize)
    {
        self.indent += amount;
    }

    pub fn deindent(&mut self, amount: usize)
    {
        self.indent = self.indent.saturating_sub(amount);
    }

    pub fn as_str(&self) -> &str
    {
        &self.out
    }

    pub fn into_string(self) -> String
    {
        self.out
    }
}

pub(crate) fn escape_smali_string(s: &str) -> String
{
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars()
    {
        match ch
        {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // C0 and C1 control blocks
            c if (c as u32) < 0x20 || (0x7F..=0x9F).contains(&(c as u32)) => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if c.is_whitespace() && c != ' ' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn write_access_flags(writer: &mut IndentingWriter, flags: AccessFlags)
{
    for keyword in flags.method_keywords()
    {
        writer.write(keyword);
        writer.write_char(' ');
    }
}

fn write_annotation_body(writer: &mut IndentingWriter, ann: &Annotation)
{
    writer.write(&ann.annotation_type);
    writer.write_char('\n');
    writer.indent(4);

    for element in &ann.elements
    {
        write!(writer, "{} = ", element.name);
        match &element.value
        {
            AnnotationValue::Array(values) =>
            {
                writer.write("{\n");
                writer.indent(4);
                for (i, v) in values.iter().enumerate()
                {
                    writer.write(v);
                    if i + 1 < values.len() { writer.write_char(','); }
                    writer.write_char('\n');
                }
                writer.deindent(4);
                writer.write("}\n");
            }
            AnnotationValue::SubAnnotation(sub) =>
            {
                writer.write(".subannotation ");
                write_annotation_body(writer, sub);
                writer.write(".end subannotation\n");
            }
            AnnotationValue::Enum(enum_type, name) =>
            {
                writeln!(writer, ".enum {}->{}:{}", enum_type, name, enum_type);
            }
            AnnotationValue::Single(s) =>
            {
                writer.write(s);
                writer.write_char('\n');
            }
        }
    }

    writer.deindent(4);
}

pub(crate) fn write_annotations(writer: &mut IndentingWriter, annotations: &[Annotation])
{
    for (i, ann) in annotations.iter().enumerate()
    {
        if i > 0 { writer.write_char('\n'); }
        write!(writer, ".annotation {} ", ann.visibility.to_str());
        write_annotation_body(writer, ann);
        writer.write(".end annotation\n");
    }
}

/// `.param` directives for every named or annotated parameter. `first_register` is the
/// register of the first declared parameter, i.e. after the implicit `this`.
pub(crate) fn write_parameters(writer: &mut IndentingWriter, parameters: &[MethodParameter], first_register: u16)
{
    let mut register = first_register as u32;
    for parameter in parameters
    {
        let name = parameter.name.as_deref().filter(|n| !n.is_empty());
        if name.is_some() || !parameter.annotations.is_empty()
        {
            write!(writer, ".param p{}", register);
            if let Some(name) = name
            {
                write!(writer, ", \"{}\"", escape_smali_string(name));
            }
            writer.write_char('\n');
            if !parameter.annotations.is_empty()
            {
                writer.indent(4);
                write_annotations(writer, &parameter.annotations);
                writer.deindent(4);
                writer.write(".end param\n");
            }
        }
        register += parameter.type_desc.register_count() as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::{escape_smali_string, write_annotations, write_parameters, IndentingWriter};
    use crate::types::{
        AccessFlags, Annotation, AnnotationElement, AnnotationValue, AnnotationVisibility, Method,
    };

    #[test]
    fn indents_non_empty_lines() {
        let mut w = IndentingWriter::new();
        w.write("a\n");
        w.indent(4);
        write!(w, "b {}\n\nc\n", 1);
        w.deindent(4);
        w.write("d\n");
        assert_eq!(w.into_string(), "a\n    b 1\n\n    c\nd\n");
    }

    #[test]
    fn escapes() {
        assert_eq!(escape_smali_string("a\"b\\c\n\u{1}"), "a\\\"b\\\\c\\n\\u0001");
    }

    #[test]
    fn annotation_block() {
        let ann = Annotation {
            visibility: AnnotationVisibility::Runtime,
            annotation_type: "Lcom/example/Tag;".to_string(),
            elements: vec![
                AnnotationElement { name: "value".to_string(), value: AnnotationValue::Single("\"x\"".to_string()) },
                AnnotationElement {
                    name: "ids".to_string(),
                    value: AnnotationValue::Array(vec!["0x1".to_string(), "0x2".to_string()]),
                },
                AnnotationElement {
                    name: "mode".to_string(),
                    value: AnnotationValue::Enum("Lcom/example/Mode;".to_string(), "FAST".to_string()),
                },
            ],
        };
        let mut w = IndentingWriter::new();
        write_annotations(&mut w, &[ann]);
        assert_eq!(
            w.as_str(),
            ".annotation runtime Lcom/example/Tag;\n\
             \x20   value = \"x\"\n\
             \x20   ids = {\n\
             \x20       0x1,\n\
             \x20       0x2\n\
             \x20   }\n\
             \x20   mode = .enum Lcom/example/Mode;->FAST:Lcom/example/Mode;\n\
             .end annotation\n"
        );
    }

    #[test]
    fn parameter_registers_skip_wide_pairs() {
        let mut m = Method::new("LFoo;", "f", AccessFlags::empty(), "(JLjava/lang/String;I)V").unwrap();
        m.parameters[1].name = Some("name".to_string());
        m.parameters[2].name = Some(String::new());
        let mut w = IndentingWriter::new();
        write_parameters(&mut w, &m.parameters, 1);
        assert_eq!(w.as_str(), ".param p3, \"name\"\n");
    }
}
