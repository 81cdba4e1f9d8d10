#[macro_use]
extern crate clap;

use clap::Arg;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug)]
enum Error {
    Io(std::io::Error, PathBuf),
    Assemble(sasm::Error),
    Image(simg::ImageError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, path) => {
                write!(f, "Reading source file \"{}\" failed: {}", path.display(), err)
            }
            Error::Assemble(err) => {
                writeln!(f, "Translating source failed:")?;
                write!(f, "{}", err)
            }
            Error::Image(err) => {
                writeln!(f, "Writing image failed:")?;
                write!(f, "{}", err)
            }
        }
    }
}

fn main() {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("SOURCE")
                .help("Sets the assembly source file to translate")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("TARGET")
                .help("Sets the image file to write")
                .required(true)
                .index(2),
        )
        .get_matches();

    let source = matches.value_of("SOURCE").unwrap();
    let target = matches.value_of("TARGET").unwrap();

    if let Err(err) = translate(source, target) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn translate(source: &str, target: &str) -> Result<(), Error> {
    let source_path = Path::new(source);
    let text = fs::read_to_string(source_path)
        .map_err(|err| Error::Io(err, source_path.to_owned()))?;

    let assembly = sasm::assemble(&text).map_err(Error::Assemble)?;

    simg::write_file(target, &assembly.image).map_err(Error::Image)?;

    println!("source LoC: {} code instr: {}", assembly.loc, assembly.instructions);
    Ok(())
}
