//! Program image format shared by the [sasm](../sasm/index.html) assembler and the
//! [scpu](../scpu/index.html) machine.
//!
//! An image is a JSON array of memory cells. Cell 0 is the header, a data-shaped
//! cell whose `value` names the address of the first instruction. Data cells follow
//! the header, instruction cells come last, and after loading the position of every
//! cell in the array equals its `addr` field.
//!
//! Cells are distinguished by which keys they carry:
//!
//! ```json
//! {"addr": 0, "value": 4}
//! {"opcode": "halt", "addr": 5}
//! {"opcode": "lit", "addr": 4, "arg": 42}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// Machine word as held in data cells, on the stacks and in I/O port queues.
pub type Value = i64;

/// Position of a cell in memory.
pub type Addr = usize;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Opcode {
    //  Mnemonic | Operand      | Effect
    //-----------+--------------+--------------------------------------------------
    // Arithmetic|              |
    ADD,    // |      -       | pop b, pop a, push a + b
    SUB,    // |      -       | pop b, pop a, push a - b
    MUL,    // |      -       | pop b, pop a, push a * b
    DIV,    // |      -       | pop b, pop a, push a / b (truncating)
    MOD,    // |      -       | pop b, pop a, push a % b
    CMP,    // |      -       | pop b, pop a, set Z from a - b, push both back
    INC,    // |      -       | pop a, push a + 1
    DEC,    // |      -       | pop a, push a - 1
    //-----------+--------------+--------------------------------------------------
    // Stack     |              |
    LIT,    // | value        | push the operand
    DUP,    // |      -       | duplicate the top of the data stack
    SWITCH, // |      -       | swap the two topmost data stack entries
    DROP,   // |      -       | discard the top of the data stack
    //-----------+--------------+--------------------------------------------------
    // Memory    |              |
    PUSH,   // | address      | push the payload of the addressed cell
    POP,    // | address      | pop and store into the addressed cell
    //-----------+--------------+--------------------------------------------------
    // I/O       |              |
    IN,     // | port         | read one word from the port, push it
    OUT,    // | port         | pop one word, write it to the port
    //-----------+--------------+--------------------------------------------------
    // Control   |              |
    JMP,    // | address      | jump
    JZ,     // | address      | jump when the Z flag reads "zero"
    JNZ,    // | address      | jump when the Z flag reads "non-zero"
    CALL,   // | address      | push the return address, jump
    RET,    // |      -       | jump to the popped return address
    HALT,   // |      -       | stop the machine
}

impl Opcode {
    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::ADD => "add",
            Opcode::SUB => "sub",
            Opcode::MUL => "mul",
            Opcode::DIV => "div",
            Opcode::MOD => "mod",
            Opcode::CMP => "cmp",
            Opcode::INC => "inc",
            Opcode::DEC => "dec",
            Opcode::LIT => "lit",
            Opcode::DUP => "dup",
            Opcode::SWITCH => "switch",
            Opcode::DROP => "drop",
            Opcode::PUSH => "push",
            Opcode::POP => "pop",
            Opcode::IN => "in",
            Opcode::OUT => "out",
            Opcode::JMP => "jmp",
            Opcode::JZ => "jz",
            Opcode::JNZ => "jnz",
            Opcode::CALL => "call",
            Opcode::RET => "ret",
            Opcode::HALT => "halt",
        }
    }

    /// Whether executing this opcode consumes an operand.
    pub fn takes_operand(self) -> bool {
        match self {
            Opcode::LIT
            | Opcode::PUSH
            | Opcode::POP
            | Opcode::IN
            | Opcode::OUT
            | Opcode::JMP
            | Opcode::JZ
            | Opcode::JNZ
            | Opcode::CALL => true,
            _ => false,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseOpcodeError {
    pub mnemonic: String,
}

impl fmt::Display for ParseOpcodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown opcode {}", self.mnemonic)
    }
}

impl std::error::Error for ParseOpcodeError {}

impl FromStr for Opcode {
    type Err = ParseOpcodeError;

    fn from_str(s: &str) -> Result<Opcode, ParseOpcodeError> {
        Ok(match s.to_lowercase().as_str() {
            "add" => Opcode::ADD,
            "sub" => Opcode::SUB,
            "mul" => Opcode::MUL,
            "div" => Opcode::DIV,
            "mod" => Opcode::MOD,
            "cmp" => Opcode::CMP,
            "inc" => Opcode::INC,
            "dec" => Opcode::DEC,
            "lit" => Opcode::LIT,
            "dup" => Opcode::DUP,
            "switch" => Opcode::SWITCH,
            "drop" => Opcode::DROP,
            "push" => Opcode::PUSH,
            "pop" => Opcode::POP,
            "in" => Opcode::IN,
            "out" => Opcode::OUT,
            "jmp" => Opcode::JMP,
            "jz" => Opcode::JZ,
            "jnz" => Opcode::JNZ,
            "call" => Opcode::CALL,
            "ret" => Opcode::RET,
            "halt" => Opcode::HALT,
            _ => {
                return Err(ParseOpcodeError {
                    mnemonic: s.to_owned(),
                })
            }
        })
    }
}

/// One memory slot of the loaded machine.
///
/// The header is a data-shaped cell pinned to position 0; keeping it a separate
/// variant lets the loader and the control unit state "the entry cell exists"
/// as a type-level fact instead of an index comparison.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum MemoryCell {
    Header { addr: Addr, value: Value },
    Data { addr: Addr, value: Value },
    Instr {
        addr: Addr,
        opcode: Opcode,
        arg: Option<Value>,
    },
}

impl MemoryCell {
    pub fn header(value: Value) -> MemoryCell {
        MemoryCell::Header { addr: 0, value }
    }

    pub fn data(addr: Addr, value: Value) -> MemoryCell {
        MemoryCell::Data { addr, value }
    }

    pub fn instr(addr: Addr, opcode: Opcode, arg: Option<Value>) -> MemoryCell {
        MemoryCell::Instr { addr, opcode, arg }
    }

    pub fn addr(&self) -> Addr {
        match *self {
            MemoryCell::Header { addr, .. }
            | MemoryCell::Data { addr, .. }
            | MemoryCell::Instr { addr, .. } => addr,
        }
    }

    /// The word a memory load yields from this cell.
    ///
    /// Data and header cells carry their value; an instruction cell exposes its
    /// operand, or nothing when it has none.
    pub fn payload(&self) -> Option<Value> {
        match *self {
            MemoryCell::Header { value, .. } | MemoryCell::Data { value, .. } => Some(value),
            MemoryCell::Instr { arg, .. } => arg,
        }
    }
}

/// Loaded program: header first, then data cells, then instruction cells.
pub type Image = Vec<MemoryCell>;

// On-disk cell shape. Which optional keys are present decides the cell kind,
// exactly as the JSON contract states it.
#[derive(Serialize, Deserialize)]
struct RawCell {
    #[serde(skip_serializing_if = "Option::is_none")]
    opcode: Option<Opcode>,
    addr: Addr,
    #[serde(skip_serializing_if = "Option::is_none")]
    arg: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}

#[derive(Debug)]
pub enum ImageError {
    Io(std::io::Error),
    Json(serde_json::Error),
    MissingHeader,
    MalformedCell(usize),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ImageError::Io(err) => write!(f, "Image file access failed: {}", err),
            ImageError::Json(err) => write!(f, "Image is not valid JSON: {}", err),
            ImageError::MissingHeader => {
                f.write_str("Image has no header cell with the entry address")
            }
            ImageError::MalformedCell(index) => {
                write!(f, "Image cell {} carries neither an opcode nor a value", index)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> ImageError {
        ImageError::Io(err)
    }
}

impl From<serde_json::Error> for ImageError {
    fn from(err: serde_json::Error) -> ImageError {
        ImageError::Json(err)
    }
}

pub fn read<R: Read>(reader: &mut R) -> Result<Image, ImageError> {
    let raw: Vec<RawCell> = serde_json::from_reader(reader)?;
    let mut image = Vec::with_capacity(raw.len());

    for (index, cell) in raw.into_iter().enumerate() {
        image.push(match (cell.opcode, cell.value) {
            (Some(opcode), _) => MemoryCell::Instr {
                addr: cell.addr,
                opcode,
                arg: cell.arg,
            },
            (None, Some(value)) if index == 0 => MemoryCell::Header {
                addr: cell.addr,
                value,
            },
            (None, Some(value)) => MemoryCell::Data {
                addr: cell.addr,
                value,
            },
            (None, None) => return Err(ImageError::MalformedCell(index)),
        });
    }

    match image.first() {
        Some(MemoryCell::Header { .. }) => Ok(image),
        _ => Err(ImageError::MissingHeader),
    }
}

pub fn write<W: Write>(writer: &mut W, image: &[MemoryCell]) -> Result<(), ImageError> {
    let raw: Vec<RawCell> = image
        .iter()
        .map(|cell| match *cell {
            MemoryCell::Header { addr, value } | MemoryCell::Data { addr, value } => RawCell {
                opcode: None,
                addr,
                arg: None,
                value: Some(value),
            },
            MemoryCell::Instr { addr, opcode, arg } => RawCell {
                opcode: Some(opcode),
                addr,
                arg,
                value: None,
            },
        })
        .collect();

    serde_json::to_writer_pretty(writer, &raw)?;
    Ok(())
}

pub trait ReadImageExt: Read + Sized {
    fn read_image(&mut self) -> Result<Image, ImageError> {
        read(self)
    }
}

impl<R: Read + Sized> ReadImageExt for R {}

pub trait WriteImageExt: Write + Sized {
    fn write_image(&mut self, image: &[MemoryCell]) -> Result<(), ImageError> {
        write(self, image)
    }
}

impl<W: Write + Sized> WriteImageExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    BufReader::new(File::open(path)?).read_image()
}

pub fn write_file<P: AsRef<Path>>(path: P, image: &[MemoryCell]) -> Result<(), ImageError> {
    BufWriter::new(File::create(path)?).write_image(image)
}
