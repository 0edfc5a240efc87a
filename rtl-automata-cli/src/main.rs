//! `rtl-automata` command line tool.
//!
//! Reads one machine description, renders every requested artifact in
//! memory, and only then writes them out. Any failure is reported on stderr
//! with a non-zero exit status and leaves no output files behind.

mod args;

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use rtl_automata::{write_artifacts, Artifact, Error, Machine, Result};

use args::Args;

fn run(args: &Args) -> Result<()> {
    let text = fs::read_to_string(&args.input).map_err(|source| Error::Resource {
        path: args.input.clone(),
        source,
    })?;
    let machine = Machine::from_yaml(&text)?;

    let artifacts = args
        .emitters()
        .into_iter()
        .map(|(emitter, path)| Artifact::render(emitter, &machine, path))
        .collect::<Result<Vec<_>>>()?;
    write_artifacts(&artifacts)?;

    for artifact in &artifacts {
        log::info!("wrote {}", artifact.path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
