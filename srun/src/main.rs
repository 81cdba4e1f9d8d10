#[macro_use]
extern crate clap;

use clap::Arg;
use scpu::{simulation, MachineConfig};
use std::process;

#[derive(Debug)]
enum Error {
    Image(simg::ImageError),
    Input(std::io::Error),
    Machine(scpu::MachineError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Image(err) => write!(f, "Loading image failed: {}", err),
            Error::Input(err) => write!(f, "Reading input failed: {}", err),
            Error::Machine(err) => write!(f, "Machine fault: {}", err),
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("IMAGE")
                .help("Sets the program image to execute")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the file streamed to the input port")
                .required(true)
                .index(2),
        )
        .get_matches();

    let image = matches.value_of("IMAGE").unwrap();
    let input = matches.value_of("INPUT").unwrap();

    if let Err(err) = run(image, input) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run(image_path: &str, input_path: &str) -> Result<(), Error> {
    let image = simg::read_file(image_path).map_err(Error::Image)?;
    let input = srun::read_input(input_path).map_err(Error::Input)?;

    let result = simulation(&image, input, &MachineConfig::default()).map_err(Error::Machine)?;

    if !result.output.is_empty() {
        println!("{}", srun::render_output(&result.output));
    }
    println!(
        "instruction_count: {}, ticks: {}",
        result.instructions, result.ticks
    );
    Ok(())
}
