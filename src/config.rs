//! Loading the processor/ISA/program description from YAML or JSON, and
//! serializing a validated processor back into the same shape.
//!
//! This module is the crate's only dependency on a concrete
//! serialization format: everything downstream (the parser, the ISA
//! loader) consumes the typed [`RawProcessor`]/[`RawConfig`] records,
//! never `serde_yaml::Value` or `serde_json::Value` directly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A unit record as written in the processor description.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawUnit {
    /// The unit's name, as written.
    pub name: String,
    /// The declared width.
    pub width: i64,
    /// The declared capability names.
    pub capabilities: Vec<String>,
    /// Whether the unit gates reads. Defaults to `false`.
    #[serde(default, rename = "readLock")]
    pub read_lock: bool,
    /// Whether the unit gates writes. Defaults to `false`.
    #[serde(default, rename = "writeLock")]
    pub write_lock: bool,
    /// Which capabilities require memory access, if any.
    #[serde(default, rename = "memoryAccess")]
    pub memory_access: Vec<String>,
}

/// The `microarch` section: units and their connections.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawProcessor {
    /// Every declared unit.
    pub units: Vec<RawUnit>,
    /// Directed edges, each a `[from, to]` pair of unit names.
    #[serde(rename = "dataPath")]
    pub data_path: Vec<Vec<String>>,
}

/// The full top-level document: `microarch` plus the `ISA` mnemonic
/// table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawConfig {
    /// The processor's functional-unit graph.
    pub microarch: RawProcessor,
    /// Mnemonic-to-capability mapping.
    #[serde(rename = "ISA")]
    pub isa: HashMap<String, String>,
}

/// Failures deserializing a configuration document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document wasn't valid YAML, or didn't match the documented
    /// shape.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The document wasn't valid JSON, or didn't match the documented
    /// shape.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// The configuration file could not be read from disk.
    #[error("could not read configuration file {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Parses a YAML document into the typed configuration record.
pub fn parse_config_yaml(text: &str) -> Result<RawConfig, ConfigError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Parses a JSON document into the typed configuration record.
pub fn parse_config_json(text: &str) -> Result<RawConfig, ConfigError> {
    Ok(serde_json::from_str(text)?)
}

/// Renders a processor description back into a YAML `microarch` document
/// fragment (no surrounding `ISA` section — the caller supplies that
/// separately, since a [`RawProcessor`] never carries it).
pub fn processor_to_yaml(processor: &RawProcessor) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(processor)?)
}

/// Reads and parses a YAML configuration file.
pub fn load_config_yaml(path: impl AsRef<Path>) -> Result<RawConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config_yaml(&text)
}

/// Reads and parses a JSON configuration file.
pub fn load_config_json(path: impl AsRef<Path>) -> Result<RawConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config_json(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
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
    fn parses_documented_shape() {
        let cfg = parse_config_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.microarch.units.len(), 1);
        assert_eq!(cfg.microarch.units[0].name, "fullSys");
        assert!(cfg.microarch.units[0].read_lock);
        assert_eq!(cfg.isa.get("ADD").map(String::as_str), Some("ALU"));
    }

    #[test]
    fn processor_to_yaml_round_trips_through_serde_yaml() {
        let raw = RawProcessor {
            units: vec![RawUnit {
                name: "fullSys".to_string(),
                width: 1,
                capabilities: vec!["ALU".to_string()],
                read_lock: true,
                write_lock: true,
                memory_access: Vec::new(),
            }],
            data_path: vec![],
        };
        let yaml = processor_to_yaml(&raw).unwrap();
        let reparsed: RawProcessor = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(raw, reparsed);
    }

    #[test]
    fn locks_default_to_false() {
        let yaml = r"
microarch:
  units:
    - name: u
      width: 1
      capabilities: [ALU]
  dataPath: []
ISA: {}
";
        let cfg = parse_config_yaml(yaml).unwrap();
        assert!(!cfg.microarch.units[0].read_lock);
        assert!(!cfg.microarch.units[0].write_lock);
        assert!(cfg.microarch.units[0].memory_access.is_empty());
    }
}
