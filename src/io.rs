use crate::error::MachineError;
use log::debug;
use simg::Value;
use std::collections::{HashMap, VecDeque};

/// Identifier of one memory-mapped I/O queue.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Port(pub Value);

pub const STDIN: Port = Port(0);
pub const STDOUT: Port = Port(1);

/// Port map. Every port is a FIFO of words: the input port is drained from the
/// front by `IN`, the output port collects everything `OUT` appends.
pub struct Io {
    ports: HashMap<Port, VecDeque<Value>>,
}

impl Io {
    pub fn new(input: Vec<Value>) -> Io {
        let mut ports = HashMap::new();
        ports.insert(STDIN, input.into_iter().collect());
        ports.insert(STDOUT, VecDeque::new());
        Io { ports }
    }

    pub fn read(&mut self, port: Port) -> Result<Value, MachineError> {
        let queue = self
            .ports
            .get_mut(&port)
            .ok_or(MachineError::UndefinedPort(port.0))?;
        let value = queue.pop_front().ok_or(MachineError::EmptyPort(port.0))?;

        match printable(value) {
            Some(symbol) => debug!("IN: {} - {}", value, symbol),
            None => debug!("IN: {}", value),
        }

        Ok(value)
    }

    pub fn write(&mut self, port: Port, value: Value) -> Result<(), MachineError> {
        let queue = self
            .ports
            .get_mut(&port)
            .ok_or(MachineError::UndefinedPort(port.0))?;
        queue.push_back(value);

        let text: Option<String> = queue.iter().map(|&word| printable(word)).collect();
        match (text, printable(value)) {
            (Some(text), Some(symbol)) => debug!("OUT: {} << {} - {}", text, value, symbol),
            _ => debug!("OUT: {:?} << {}", queue, value),
        }

        Ok(())
    }

    /// Removes and returns everything buffered on `port`.
    pub fn drain(&mut self, port: Port) -> Vec<Value> {
        self.ports
            .get_mut(&port)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }
}

fn printable(value: Value) -> Option<char> {
    if value < 0 || value > Value::from(u32::max_value()) {
        return None;
    }
    std::char::from_u32(value as u32).filter(|symbol| !symbol.is_control())
}
