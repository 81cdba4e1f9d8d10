use crate::error::MachineError;
use simg::{Opcode, Value};

/// Pure arithmetic unit.
///
/// The Z flag keeps the inverted convention of the machine: it reads 0 when
/// the last result was zero and 1 otherwise. The conditional jumps are written
/// against exactly this polarity.
pub struct Alu {
    z_flag: u8,
}

impl Alu {
    pub fn new() -> Alu {
        Alu { z_flag: 0 }
    }

    pub fn z_flag(&self) -> u8 {
        self.z_flag
    }

    /// Computes one ALU operation and refreshes the Z flag from the result.
    ///
    /// Division truncates toward zero and the remainder follows the dividend.
    /// Unary operations take `left` and ignore `right`.
    pub fn calculate(
        &mut self,
        left: Value,
        right: Value,
        opcode: Opcode,
    ) -> Result<Value, MachineError> {
        let result = match opcode {
            Opcode::ADD => left.wrapping_add(right),
            Opcode::SUB | Opcode::CMP => left.wrapping_sub(right),
            Opcode::MUL => left.wrapping_mul(right),
            Opcode::DIV => {
                if right == 0 {
                    return Err(MachineError::DivisionByZero);
                }
                left.wrapping_div(right)
            }
            Opcode::MOD => {
                if right == 0 {
                    return Err(MachineError::DivisionByZero);
                }
                left.wrapping_rem(right)
            }
            Opcode::INC => left.wrapping_add(1),
            Opcode::DEC => left.wrapping_sub(1),
            other => unreachable!("{} is not an ALU operation", other),
        };

        self.set_flags(result);
        Ok(result)
    }

    fn set_flags(&mut self, value: Value) {
        self.z_flag = if value == 0 { 0 } else { 1 };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn z_flag_reads_zero_for_zero_result() {
        let mut alu = Alu::new();

        alu.calculate(21, 21, Opcode::SUB).unwrap();
        assert_eq!(alu.z_flag(), 0);

        alu.calculate(21, 20, Opcode::SUB).unwrap();
        assert_eq!(alu.z_flag(), 1);
    }

    #[test]
    fn division_truncates_toward_zero() {
        let mut alu = Alu::new();

        assert_eq!(alu.calculate(7, 2, Opcode::DIV).unwrap(), 3);
        assert_eq!(alu.calculate(-7, 2, Opcode::DIV).unwrap(), -3);
        assert_eq!(alu.calculate(-7, 2, Opcode::MOD).unwrap(), -1);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let mut alu = Alu::new();

        assert_eq!(
            alu.calculate(1, 0, Opcode::DIV),
            Err(MachineError::DivisionByZero)
        );
        assert_eq!(
            alu.calculate(1, 0, Opcode::MOD),
            Err(MachineError::DivisionByZero)
        );
    }

    #[test]
    fn unary_operations_ignore_right() {
        let mut alu = Alu::new();

        assert_eq!(alu.calculate(41, 999, Opcode::INC).unwrap(), 42);
        assert_eq!(alu.calculate(1, 999, Opcode::DEC).unwrap(), 0);
        assert_eq!(alu.z_flag(), 0);
    }
}
