// ovis-vm - Stack-based bytecode virtual machine for the Ovis language
// Copyright (c) 2025 the ovis-vm authors. MIT licensed.

use std::env;
use std::path::Path;
use std::process;

use ovis_vm::{Bytefile, Engine, Result};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("usage: ovis-vm <bytecode-file>");
        process::exit(1);
    }

    // All faults are fatal: surface the diagnostic and exit non-zero.
    if let Err(e) = run_file(&args[1]) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn run_file(path: &str) -> Result<()> {
    let bf = Bytefile::read(Path::new(path))?;
    let mut engine = Engine::new(&bf)?;
    engine.run()
}
