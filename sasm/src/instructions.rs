use crate::data::is_identifier;
use crate::error::Error;
use crate::{Program, Result, Word};
use simg::{Opcode, Value};

/// Instruction operand as written in the source. The resolution pass rewrites
/// every symbolic form into `Resolved` or fails the translation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Operand {
    Resolved(Value),
    Symbolic(String),
    Indirect(String),
}

const CONTROL_FLOW: [Opcode; 4] = [Opcode::JMP, Opcode::JZ, Opcode::JNZ, Opcode::CALL];

pub(crate) fn translate_section_text(block: &[&str], program: &mut Program) -> Result<()> {
    for line in block {
        let mut rest = *line;

        if let Some((label, remainder)) = split_label(rest) {
            program.labels.insert(label.to_owned(), program.current_addr);
            if remainder.is_empty() {
                continue;
            }
            rest = remainder;
        }

        let mut tokens = rest.split_whitespace();
        let mnemonic = match tokens.next() {
            Some(token) => token,
            None => continue,
        };
        let opcode: Opcode = mnemonic.parse()?;
        let operand = tokens.next().map(|text| parse_operand(opcode, text));
        if tokens.next().is_some() {
            return Err(Error::Syntax((*line).to_owned()));
        }

        program.push_instr(opcode, operand);
    }
    Ok(())
}

// `name:` opens a label; the rest of the line may still hold an instruction.
fn split_label(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let name = line[..colon].trim();
    if !is_identifier(name) {
        return None;
    }
    Some((name, line[colon + 1..].trim()))
}

fn parse_operand(opcode: Opcode, text: &str) -> Operand {
    if let Some(name) = indirect_name(text) {
        return Operand::Indirect(name.to_owned());
    }
    if CONTROL_FLOW.contains(&opcode) {
        // Jump targets stay symbolic until every label is known.
        return Operand::Symbolic(text.to_owned());
    }
    if let Ok(number) = text.parse::<Value>() {
        return Operand::Resolved(number);
    }
    Operand::Symbolic(text.to_owned())
}

fn indirect_name(text: &str) -> Option<&str> {
    if text.len() >= 3 && text.starts_with('[') && text.ends_with(']') {
        let name = &text[1..text.len() - 1];
        if is_identifier(name) {
            return Some(name);
        }
    }
    None
}

/// Second pass: rewrites every symbolic operand to a plain address.
///
/// Lookup order is labels, then variables, then numeric literals; an indirect
/// operand resolves to the value stored in the named variable's cell.
pub(crate) fn resolve_addresses(program: &mut Program) -> Result<()> {
    let Program {
        words,
        labels,
        variables,
        ..
    } = program;

    for word in words.iter_mut() {
        let arg = match word {
            Word::Instr { arg: Some(arg), .. } => arg,
            _ => continue,
        };

        let resolved = match arg {
            Operand::Resolved(value) => *value,
            Operand::Symbolic(name) => {
                if let Some(&addr) = labels.get(name.as_str()) {
                    addr as Value
                } else if let Some(variable) = variables.get(name.as_str()) {
                    variable.addr as Value
                } else if let Ok(number) = name.parse::<Value>() {
                    number
                } else {
                    return Err(Error::VariableOrLabelNotDefined(name.clone()));
                }
            }
            Operand::Indirect(name) => match variables.get(name.as_str()) {
                Some(variable) => variable.value,
                None => {
                    return Err(Error::VariableOrLabelNotDefined(format!("[{}]", name)));
                }
            },
        };

        *arg = Operand::Resolved(resolved);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::translate_section_data;
    use matches::assert_matches;

    fn translate(data: &[&str], text: &[&str]) -> Result<Program> {
        let mut program = Program::new();
        translate_section_data(data, &mut program)?;
        translate_section_text(text, &mut program)?;
        resolve_addresses(&mut program)?;
        Ok(program)
    }

    fn resolved_args(program: &Program) -> Vec<(Opcode, Option<Value>)> {
        program
            .words
            .iter()
            .filter_map(|word| match word {
                Word::Instr { opcode, arg, .. } => Some((
                    *opcode,
                    arg.as_ref().map(|operand| match operand {
                        Operand::Resolved(value) => *value,
                        other => panic!("unresolved operand {:?}", other),
                    }),
                )),
                Word::Data { .. } => None,
            })
            .collect()
    }

    #[test]
    fn labels_bind_the_next_address() {
        let program = translate(&[], &["start:", "lit 1", "jmp start", "halt"]).unwrap();

        assert_eq!(program.labels["start"], 1);
        assert_eq!(
            resolved_args(&program),
            vec![
                (Opcode::LIT, Some(1)),
                (Opcode::JMP, Some(1)),
                (Opcode::HALT, None),
            ]
        );
    }

    #[test]
    fn label_may_share_a_line_with_an_instruction() {
        let program = translate(&[], &["loop: lit 1", "jnz loop"]).unwrap();

        assert_eq!(program.labels["loop"], 1);
        assert_eq!(
            resolved_args(&program),
            vec![(Opcode::LIT, Some(1)), (Opcode::JNZ, Some(1))]
        );
    }

    #[test]
    fn forward_jump_targets_resolve() {
        let program = translate(&[], &["jmp end", "lit 0", "end: halt"]).unwrap();

        assert_eq!(resolved_args(&program)[0], (Opcode::JMP, Some(3)));
    }

    #[test]
    fn variable_operands_resolve_to_their_address() {
        let program = translate(&["n: 42"], &["push n", "pop n", "halt"]).unwrap();

        assert_eq!(
            resolved_args(&program),
            vec![
                (Opcode::PUSH, Some(1)),
                (Opcode::POP, Some(1)),
                (Opcode::HALT, None),
            ]
        );
    }

    #[test]
    fn labels_shadow_variables() {
        let program = translate(&["x: 42"], &["x: jmp x"]).unwrap();

        assert_eq!(resolved_args(&program)[0], (Opcode::JMP, Some(2)));
    }

    #[test]
    fn indirect_operands_resolve_through_the_stored_value() {
        let program = translate(
            &["buf: bf 4", "p: buf"],
            &["lit 42", "pop [p]", "push [p]", "halt"],
        )
        .unwrap();

        // p lives at address 5 and holds 1, the start of the buffer.
        assert_eq!(
            resolved_args(&program),
            vec![
                (Opcode::LIT, Some(42)),
                (Opcode::POP, Some(1)),
                (Opcode::PUSH, Some(1)),
                (Opcode::HALT, None),
            ]
        );
    }

    #[test]
    fn numeric_control_flow_targets_pass_through() {
        let program = translate(&[], &["jmp 7", "halt"]).unwrap();

        assert_eq!(resolved_args(&program)[0], (Opcode::JMP, Some(7)));
    }

    #[test]
    fn unknown_symbols_fail_resolution() {
        assert_eq!(
            translate(&[], &["jmp nowhere"]).unwrap_err(),
            Error::VariableOrLabelNotDefined("nowhere".to_owned())
        );
        assert_eq!(
            translate(&[], &["push [nowhere]"]).unwrap_err(),
            Error::VariableOrLabelNotDefined("[nowhere]".to_owned())
        );
    }

    #[test]
    fn unknown_mnemonics_are_rejected() {
        assert_matches!(
            translate(&[], &["frob 1"]),
            Err(Error::UnknownOpcode(_))
        );
    }

    #[test]
    fn trailing_tokens_are_a_syntax_error() {
        assert_matches!(
            translate(&[], &["lit 1 2"]),
            Err(Error::Syntax(_))
        );
    }
}
