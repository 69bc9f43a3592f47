use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use color_print::cprintln;

use minipascal::codegen::Compiler;
use minipascal::parser;

#[derive(Parser, Debug)]
#[clap(
    name = "minipascal",
    version,
    about = "Compiler for a Pascal subset targeting MIPS assembly"
)]
struct AppArgs {
    /// Source file; reads standard input when omitted
    input: Option<PathBuf>,
    /// Write assembly here instead of standard output
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,
    /// Dump the symbols of every scope as it closes
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let args = AppArgs::parse();
    let source = match read_source(args.input.as_deref()) {
        Ok(text) => text,
        Err(message) => {
            cprintln!("<red,bold>error</>: {}", message);
            process::exit(1);
        }
    };
    let result = parser::parse(&source)
        .and_then(|program| Ok(Compiler::new(args.verbose).compile(&program)?));
    match result {
        Ok(asm) => {
            if let Some(path) = args.output {
                if let Err(e) = fs::write(&path, asm) {
                    cprintln!("<red,bold>error</>: cannot write {}: {}", path.display(), e);
                    process::exit(1);
                }
            } else {
                print!("{asm}");
            }
        }
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", e);
            process::exit(1);
        }
    }
}

fn read_source(path: Option<&Path>) -> Result<String, String> {
    match path {
        Some(p) => fs::read_to_string(p).map_err(|e| format!("cannot read {}: {e}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("cannot read standard input: {e}"))?;
            Ok(buf)
        }
    }
}
