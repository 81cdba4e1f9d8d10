use simg::{Opcode, Value};
use std::error::Error as StdError;
use std::fmt;

/// Fatal machine faults. Any of these aborts the simulation; a clean HALT is
/// not an error and is reported through the control unit's tick result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MachineError {
    MemoryAccess(Value),
    DataStackOverflow,
    DataStackUnderflow,
    AddressStackOverflow,
    AddressStackUnderflow,
    UndefinedPort(Value),
    EmptyPort(Value),
    DivisionByZero,
    IllegalFetch(Value),
    NoPayload(Value),
    MissingOperand(Opcode),
    ProgramTooLarge { cells: usize, memory: usize },
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MachineError::MemoryAccess(addr) => {
                write!(f, "Memory access fault, cell with address {} does not exist", addr)
            }
            MachineError::DataStackOverflow => f.write_str("Data stack is overflowed"),
            MachineError::DataStackUnderflow => f.write_str("Data stack is empty"),
            MachineError::AddressStackOverflow => f.write_str("Address stack is overflowed"),
            MachineError::AddressStackUnderflow => f.write_str("Address stack is empty"),
            MachineError::UndefinedPort(port) => write!(f, "Undefined port {}", port),
            MachineError::EmptyPort(port) => write!(f, "Reading from empty port {}", port),
            MachineError::DivisionByZero => f.write_str("Division by zero"),
            MachineError::IllegalFetch(addr) => {
                write!(f, "Cell with address {} is not an instruction", addr)
            }
            MachineError::NoPayload(addr) => {
                write!(f, "Cell with address {} holds no value", addr)
            }
            MachineError::MissingOperand(opcode) => {
                write!(f, "Instruction {} requires an operand", opcode)
            }
            MachineError::ProgramTooLarge { cells, memory } => {
                write!(f, "Image of {} cells does not fit into memory of {}", cells, memory)
            }
        }
    }
}

impl StdError for MachineError {}
