//! Driver glue between the outside world and the [scpu](../scpu/index.html)
//! machine: turns an input file into the STDIN stream and renders the STDOUT
//! stream back to text.

use simg::Value;
use std::fs;
use std::io;
use std::path::Path;

/// Encodes program input: one word per character, with the character count
/// prepended so programs can read the length first.
pub fn encode_input(text: &str) -> Vec<Value> {
    let mut data: Vec<Value> = text.chars().map(|symbol| Value::from(symbol as u32)).collect();
    data.insert(0, data.len() as Value);
    data
}

pub fn read_input<P: AsRef<Path>>(path: P) -> io::Result<Vec<Value>> {
    Ok(encode_input(&fs::read_to_string(path)?))
}

/// Renders the output stream as a string when every word is a valid character
/// code, and as one numeric line per word otherwise.
pub fn render_output(values: &[Value]) -> String {
    let text: Option<String> = values.iter().map(|&value| symbol(value)).collect();

    match text {
        Some(text) => text,
        None => values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn symbol(value: Value) -> Option<char> {
    if value < 0 || value > Value::from(u32::max_value()) {
        return None;
    }
    std::char::from_u32(value as u32)
}
