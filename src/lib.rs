//! Tick-accurate interpreter for a two-stack educational machine.
//!
//! The machine executes a program image produced by the
//! [sasm](../sasm/index.html) assembler: a word-addressed memory of tagged
//! cells, a bounded data stack for operands, a bounded address stack for
//! returns, and two memory-mapped I/O ports. [`simulation`](fn.simulation.html)
//! is the main entry point; it runs an image against an input stream and
//! reports the output stream together with the instruction and tick counters.

pub mod alu;
pub mod constants;
pub mod control;
pub mod datapath;
pub mod error;
pub mod io;

pub use crate::constants::MachineConfig;
pub use crate::control::{simulation, ControlUnit, SimulationResult, TickResult};
pub use crate::datapath::DataPath;
pub use crate::error::MachineError;
pub use crate::io::{Io, Port, STDIN, STDOUT};
pub use simg::{MemoryCell, Opcode, Value};
