use crate::dex::error::DexError;
use crate::fail;
use crate::types::Method;

/// Registers used by the incoming arguments: the implicit `this` for instance methods,
/// plus one register per parameter, two for long and double.
pub fn parameter_register_count(method: &Method) -> Result<u16, DexError> {
    let mut count: u16 = if method.is_static() { 0 } else { 1 };
    for parameter in &method.parameters {
        let Some(next) = count.checked_add(parameter.type_desc.register_count()) else {
            fail!(InvalidDescriptor, "Parameters of {} need more than {} registers", method.name, u16::MAX);
        };
        count = next;
    }
    Ok(count)
}

/// Maps raw Dalvik register numbers to smali-style names (vN / pN)
/// based on a method's total register count and its parameter registers.
#[derive(Debug, Clone, Copy)]
pub struct RegisterFormatter {
    pub register_count: u16,
    pub parameter_register_count: u16,
    parameter_registers: bool,
}

impl RegisterFormatter {
    pub fn new(register_count: u16, parameter_register_count: u16, parameter_registers: bool) -> Self {
        RegisterFormatter { register_count, parameter_register_count, parameter_registers }
    }

    fn params_base(&self) -> u16 {
        self.register_count.saturating_sub(self.parameter_register_count)
    }

    fn is_parameter(&self, register: u16) -> bool {
        self.parameter_registers && register >= self.params_base()
    }

    #[inline]
    pub fn format(&self, register: u16) -> String {
        if self.is_parameter(register) {
            format!("p{}", register - self.params_base())
        } else {
            format!("v{}", register)
        }
    }

    /// `{v0, v1, p0}`
    pub fn format_list(&self, registers: &[u16]) -> String {
        let names: Vec<String> = registers.iter().map(|r| self.format(*r)).collect();
        format!("{{{}}}", names.join(", "))
    }

    /// `{v0 .. v3}`. A range is `registers.len()` consecutive registers from the first
    /// one, and uses the naming of its first register.
    pub fn format_range(&self, registers: &[u16]) -> String {
        let Some(first) = registers.first() else {
            return String::from("{}");
        };
        let first = *first as u32;
        let last = first + (registers.len() as u32 - 1);
        if self.is_parameter(first as u16) {
            let base = self.params_base() as u32;
            format!("{{p{} .. p{}}}", first - base, last - base)
        } else {
            format!("{{v{} .. v{}}}", first, last)
        }
    }

    /// Whether `registers` are consecutive and ascending, as a range instruction requires.
    pub fn is_contiguous(registers: &[u16]) -> bool {
        registers.windows(2).all(|pair| pair[0].checked_add(1) == Some(pair[1]))
    }

    /// Value for the `.locals` directive; negative when the declared count is inconsistent.
    pub fn local_register_count(&self) -> i32 {
        self.register_count as i32 - self.parameter_register_count as i32
    }
}

#[cfg(test)]
mod tests {
    use super::{parameter_register_count, RegisterFormatter};
    use crate::dex::error::DexErrorKind;
    use crate::types::{AccessFlags, Method};

    #[test]
    fn wide_parameters_take_two_registers() {
        let m = Method::new("LFoo;", "f", AccessFlags::STATIC, "(IJI)V").unwrap();
        assert_eq!(parameter_register_count(&m).unwrap(), 4);
        let m = Method::new("LFoo;", "f", AccessFlags::PUBLIC, "(IJI)V").unwrap();
        assert_eq!(parameter_register_count(&m).unwrap(), 5);
        let m = Method::new("LFoo;", "f", AccessFlags::STATIC, "()V").unwrap();
        assert_eq!(parameter_register_count(&m).unwrap(), 0);
        let m = Method::new("LFoo;", "f", AccessFlags::empty(), "(D[D)V").unwrap();
        assert_eq!(parameter_register_count(&m).unwrap(), 4);
    }

    #[test]
    fn names() {
        let f = RegisterFormatter::new(5, 2, true);
        assert_eq!(f.format(0), "v0");
        assert_eq!(f.format(2), "v2");
        assert_eq!(f.format(3), "p0");
        assert_eq!(f.format(4), "p1");
        assert_eq!(f.format_list(&[0, 3]), "{v0, p0}");
        assert_eq!(f.format_list(&[]), "{}");
        assert_eq!(f.format_range(&[3, 4]), "{p0 .. p1}");
        assert_eq!(f.format_range(&[1, 2, 3]), "{v1 .. v3}");
        assert_eq!(f.format_range(&[]), "{}");
        assert_eq!(f.local_register_count(), 3);

        let raw = RegisterFormatter::new(5, 2, false);
        assert_eq!(raw.format(4), "v4");
        assert_eq!(raw.format_range(&[3, 4]), "{v3 .. v4}");
    }

    #[test]
    fn oversized_parameter_list() {
        let descriptor = format!("({})V", "J".repeat(40000));
        let m = Method::new("LFoo;", "f", AccessFlags::STATIC, &descriptor).unwrap();
        let err = parameter_register_count(&m).unwrap_err();
        assert_eq!(err.kind(), DexErrorKind::InvalidDescriptor);
    }

    #[test]
    fn ranges_follow_the_first_register() {
        let f = RegisterFormatter::new(4, 2, true);
        // out of order input never underflows
        assert_eq!(f.format_range(&[3, 1]), "{p1 .. p2}");
        assert_eq!(f.format_range(&[u16::MAX, 0]), "{p65533 .. p65534}");
        assert!(RegisterFormatter::is_contiguous(&[1, 2, 3]));
        assert!(RegisterFormatter::is_contiguous(&[7]));
        assert!(!RegisterFormatter::is_contiguous(&[3, 1]));
        assert!(!RegisterFormatter::is_contiguous(&[u16::MAX, 0]));
    }
}
