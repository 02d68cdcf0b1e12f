
#[cfg(test)]
pub(crate) fn body(register_count: u16, instructions: Vec<crate::dex::instructions::Instruction>) -> crate::dex::instructions::MethodImplementation {
    crate::dex::instructions::MethodImplementation { register_count, instructions, ..Default::default() }
}

#[cfg(test)]
mod tests {
    use super::body;
    use crate::dex::error::DexErrorKind;
    use crate::dex::instructions::Instruction;
    use crate::dex::opcodes::Opcode;
    use crate::types::{AccessFlags, Method};
    use crate::{disassemble_method, disassemble_methods, BaksmaliOptions, EncodedMethod};

    fn encoded(name: &str, instructions: Vec<Instruction>) -> EncodedMethod {
        EncodedMethod {
            method: Method::new("Lcom/example/Batch;", name, AccessFlags::STATIC, "(I)V").unwrap(),
            implementation: Some(body(1, instructions)),
        }
    }

    #[test]
    fn batch_continues_past_failures() {
        let methods = vec![
            encoded("a", vec![Instruction::new(Opcode::ReturnVoid)]),
            // switch pointing at a return-void instead of a payload
            encoded(
                "b",
                vec![
                    Instruction::new(Opcode::PackedSwitch).with_registers(&[0]).with_code_offset(3),
                    Instruction::new(Opcode::ReturnVoid),
                ],
            ),
            encoded("c", vec![Instruction::new(Opcode::ReturnVoid)]),
        ];
        let options = BaksmaliOptions::default();
        let results = disassemble_methods(&methods, &options);

        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().starts_with(".method static a(I)V\n"));
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), DexErrorKind::MissingSwitchPayload);
        assert_eq!(
            err.to_string(),
            "No switch payload at offset 0x3 for method Lcom/example/Batch;->b(I)V"
        );
        assert!(results[2].as_ref().unwrap().starts_with(".method static c(I)V\n"));
    }

    #[test]
    fn batch_matches_single_runs() {
        let methods: Vec<EncodedMethod> = (0..16)
            .map(|i| {
                encoded(
                    &format!("m{}", i),
                    vec![Instruction::new(Opcode::Const16).with_registers(&[0]).with_literal(i), Instruction::new(Opcode::ReturnVoid)],
                )
            })
            .collect();
        let options = BaksmaliOptions { sequential_labels: true, ..Default::default() };
        let results = disassemble_methods(&methods, &options);
        for (method, result) in methods.iter().zip(results) {
            assert_eq!(result.unwrap(), disassemble_method(method, &options).unwrap());
        }
    }

    #[test]
    fn malformed_signatures_and_ranges_fail_per_method() {
        let range = Method::new("Lcom/example/Batch;", "r", AccessFlags::STATIC, "(II)V").unwrap();
        let huge = format!("({})V", "J".repeat(40000));
        let methods = vec![
            EncodedMethod {
                method: range,
                implementation: Some(body(
                    4,
                    vec![
                        Instruction::new(Opcode::InvokeStaticRange).with_registers(&[3, 1]).with_reference("LFoo;->q(II)V"),
                        Instruction::new(Opcode::ReturnVoid),
                    ],
                )),
            },
            EncodedMethod {
                method: Method::new("Lcom/example/Batch;", "wide", AccessFlags::STATIC, &huge).unwrap(),
                implementation: Some(body(4, vec![Instruction::new(Opcode::ReturnVoid)])),
            },
            EncodedMethod {
                method: Method::new("Lcom/example/Batch;", "wide", AccessFlags::ABSTRACT, &huge).unwrap(),
                implementation: None,
            },
            encoded("ok", vec![Instruction::new(Opcode::ReturnVoid)]),
        ];
        let results = disassemble_methods(&methods, &BaksmaliOptions::default());

        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.kind(), DexErrorKind::MalformedInstruction);
        assert_eq!(
            err.to_string(),
            "invoke-static/range at 0x0 has non-consecutive registers [3, 1] for method Lcom/example/Batch;->r(II)V"
        );
        assert_eq!(results[1].as_ref().unwrap_err().kind(), DexErrorKind::InvalidDescriptor);
        assert_eq!(results[2].as_ref().unwrap_err().kind(), DexErrorKind::InvalidDescriptor);
        assert!(results[3].is_ok());
    }

    #[test]
    fn default_options() {
        let options = BaksmaliOptions::default();
        assert!(options.emit_debug_info);
        assert!(options.parameter_registers);
        assert!(!options.sequential_labels);
        assert!(!options.emit_locals_directive);
        assert!(!options.emit_code_offset_comments);
    }
}
