//! Cycle-accurate pipeline simulator CLI.
//!
//! Loads a processor/ISA configuration document and a program file, runs
//! the simulation to completion or to a stall, and prints the resulting
//! utilization table.

use clap::Parser;
use pipesim::common::error::SimError;
use pipesim::{compile_program, load_config};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "pipesim",
    author,
    version,
    about = "Cycle-accurate in-order pipeline simulator"
)]
struct Cli {
    /// Processor + ISA configuration document (YAML, or JSON with `--json`).
    #[arg(short, long)]
    config: PathBuf,

    /// Program text file (`dest <- op src, src` per line).
    #[arg(short, long)]
    program: PathBuf,

    /// Parse `--config` as JSON instead of YAML.
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("pipesim: {err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    let text = std::fs::read_to_string(&cli.config).map_err(|source| {
        SimError::Config(pipesim::config::ConfigError::Io {
            path: cli.config.display().to_string(),
            source,
        })
    })?;
    let raw = if cli.json {
        pipesim::config::parse_config_json(&text)?
    } else {
        pipesim::config::parse_config_yaml(&text)?
    };
    let loaded = load_config(&raw)?;

    let program_text = std::fs::read_to_string(&cli.program).map_err(|source| {
        SimError::Config(pipesim::config::ConfigError::Io {
            path: cli.program.display().to_string(),
            source,
        })
    })?;
    let program = compile_program(&loaded, &program_text)?;

    match pipesim::simulate(&loaded, &program) {
        Ok(table) => {
            for (cycle, _) in table.iter().enumerate() {
                let occupancy = table.display_cycle(cycle, &loaded.processor);
                print!("cycle {cycle}: ");
                for (unit, instrs) in &occupancy {
                    print!("{unit}=[");
                    for (i, state) in instrs.iter().enumerate() {
                        if i > 0 {
                            print!(", ");
                        }
                        print!("{state}");
                    }
                    print!("] ");
                }
                println!();
            }
            Ok(())
        }
        Err(SimError::Stall { processor_state }) => {
            eprintln!("simulation stalled after {} cycle(s):", processor_state.len());
            for (cycle, _) in processor_state.iter().enumerate() {
                let occupancy = processor_state.display_cycle(cycle, &loaded.processor);
                eprintln!("  cycle {cycle}: {occupancy:?}");
            }
            process::exit(1)
        }
        Err(other) => Err(other),
    }
}
