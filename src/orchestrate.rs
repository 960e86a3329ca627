//! Top-level entry point: loads a configuration document and a program,
//! and runs the simulation end to end.

use crate::common::error::SimError;
use crate::config::{self, RawConfig};
use crate::isa::IsaMap;
use crate::microarch::{self, ProcessorDesc};
use crate::planner::build_access_plan;
use crate::program::{self, HwInstruction};
use crate::sim::{Simulator, UtilizationTable};
use std::path::Path;

/// Everything derived from a configuration document, ready to run
/// programs against without re-parsing the microarchitecture or ISA.
#[derive(Debug, Clone)]
pub struct LoadedProcessor {
    /// The validated processor graph.
    pub processor: ProcessorDesc,
    /// The resolved mnemonic table.
    pub isa: IsaMap,
}

/// Parses and validates a configuration document (microarchitecture plus
/// ISA) in one pass.
pub fn load_config(raw: &RawConfig) -> Result<LoadedProcessor, SimError> {
    let processor = microarch::parse(&raw.microarch)?;
    let isa = IsaMap::build(&raw.isa, &processor)?;
    Ok(LoadedProcessor { processor, isa })
}

/// Compiles program text against an already-loaded processor's ISA.
pub fn compile_program(loaded: &LoadedProcessor, program_text: &str) -> Result<Vec<HwInstruction>, SimError> {
    let source = program::parse_program_text(program_text)?;
    program::compile(&source, &loaded.isa)
}

/// Runs `program` against `loaded`'s processor, returning the complete
/// per-cycle utilization table, or the [`SimError`] that stopped it.
pub fn simulate(loaded: &LoadedProcessor, program: &[HwInstruction]) -> Result<UtilizationTable, SimError> {
    let acc_queues = build_access_plan(program);
    Simulator::new(&loaded.processor, program, acc_queues).run()
}

/// Loads a YAML configuration document and a program text file from
/// disk, then runs the simulation, returning the utilization table.
pub fn run_from_files(config_path: impl AsRef<Path>, program_path: impl AsRef<Path>) -> Result<UtilizationTable, SimError> {
    let raw = config::load_config_yaml(config_path)?;
    let loaded = load_config(&raw)?;
    let program_text = std::fs::read_to_string(program_path.as_ref()).map_err(|source| {
        SimError::Config(config::ConfigError::Io {
            path: program_path.as_ref().display().to_string(),
            source,
        })
    })?;
    let program = compile_program(&loaded, &program_text)?;
    simulate(&loaded, &program)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
microarch:
  units:
    - name: fullSys
      width: 1
      capabilities: [ALU]
      readLock: true
      writeLock: true
  dataPath: []
ISA:
  ADD: ALU
"#;

    #[test]
    fn end_to_end_run_produces_a_utilization_table() {
        let raw = config::parse_config_yaml(CONFIG).unwrap();
        let loaded = load_config(&raw).unwrap();
        let program = compile_program(&loaded, "R1 <- ADD\n").unwrap();
        let table = simulate(&loaded, &program).unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn undefined_mnemonic_is_rejected_at_compile_time() {
        let raw = config::parse_config_yaml(CONFIG).unwrap();
        let loaded = load_config(&raw).unwrap();
        let err = compile_program(&loaded, "R1 <- MUL\n").unwrap_err();
        assert!(matches!(err, SimError::UndefElem { .. }));
    }
}
