//! The program: text parsing, and resolving each instruction's mnemonic
//! into a capability via the ISA map.

use crate::common::error::SimError;
use crate::common::ident::Capability;
use crate::isa::IsaMap;

/// An instruction as read from program text, before its mnemonic is
/// resolved against the ISA map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInstruction {
    /// Source register names, in order.
    pub sources: Vec<String>,
    /// The destination register name.
    pub destination: String,
    /// The raw mnemonic, not yet resolved to a capability.
    pub mnemonic: String,
}

/// One instruction in the compiled program: its register operands and
/// its resolved capability category. Its position in the enclosing
/// `Vec` is its program index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwInstruction {
    /// Source register names, in order.
    pub sources: Vec<String>,
    /// The destination register name.
    pub destination: String,
    /// The capability this instruction requires.
    pub category: Capability,
}

/// Resolves every instruction's mnemonic through `isa`, in program order.
pub fn compile(source: &[SourceInstruction], isa: &IsaMap) -> Result<Vec<HwInstruction>, SimError> {
    source
        .iter()
        .map(|instr| {
            let category = isa
                .resolve(&instr.mnemonic)
                .cloned()
                .ok_or_else(|| SimError::UndefElem {
                    element: instr.mnemonic.clone(),
                })?;
            Ok(HwInstruction {
                sources: instr.sources.clone(),
                destination: instr.destination.clone(),
                category,
            })
        })
        .collect()
}

/// Parses the line-oriented program text format: one instruction per
/// line, `DEST <- MNEMONIC SRC1, SRC2, ...` (sources may be empty).
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_program_text(text: &str) -> Result<Vec<SourceInstruction>, SimError> {
    let mut program = Vec::new();
    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        program.push(parse_line(lineno + 1, line)?);
    }
    Ok(program)
}

fn parse_line(line_no: usize, line: &str) -> Result<SourceInstruction, SimError> {
    let malformed = || SimError::ProgramParse {
        line: line_no,
        text: line.to_string(),
    };

    let (dest_part, rhs_part) = line.split_once("<-").ok_or_else(malformed)?;
    let destination = dest_part.trim().to_string();
    if destination.is_empty() {
        return Err(malformed());
    }

    let rhs = rhs_part.trim();
    let (mnemonic, operand_str) = rhs.split_once(char::is_whitespace).unwrap_or((rhs, ""));
    if mnemonic.is_empty() {
        return Err(malformed());
    }

    let sources = operand_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(SourceInstruction {
        sources,
        destination,
        mnemonic: mnemonic.to_string(),
    })
}
