//! Maps instruction mnemonics to capability categories, case-normalized
//! against the processor's already-canonicalized capability spellings.

use crate::common::error::SimError;
use crate::common::ident::Capability;
use crate::microarch::ProcessorDesc;
use std::collections::HashMap;

/// The mnemonic-to-capability table resolved for one processor.
#[derive(Debug, Clone, Default)]
pub struct IsaMap {
    by_mnemonic: HashMap<String, (String, Capability)>,
}

impl IsaMap {
    /// Builds the table, rejecting case-insensitively duplicate
    /// mnemonics.
    pub fn build(
        isa: &HashMap<String, String>,
        processor: &ProcessorDesc,
    ) -> Result<Self, SimError> {
        let mut canon: HashMap<String, Capability> = HashMap::new();
        for unit in processor.units() {
            for cap in unit.capabilities() {
                canon.entry(cap.canonical().to_string()).or_insert_with(|| cap.clone());
            }
        }

        let mut by_mnemonic: HashMap<String, (String, Capability)> = HashMap::new();
        for (mnemonic, cap_str) in isa {
            let folded = mnemonic.to_lowercase();
            if let Some((old, _)) = by_mnemonic.get(&folded) {
                return Err(SimError::DupElem {
                    old: old.clone(),
                    new: mnemonic.clone(),
                });
            }
            let capability = canon
                .get(&cap_str.to_lowercase())
                .cloned()
                .unwrap_or_else(|| Capability::new(cap_str.clone()));
            by_mnemonic.insert(folded, (mnemonic.clone(), capability));
        }

        Ok(Self { by_mnemonic })
    }

    /// Resolves a mnemonic (case-insensitive) to its capability.
    #[must_use]
    pub fn resolve(&self, mnemonic: &str) -> Option<&Capability> {
        self.by_mnemonic.get(&mnemonic.to_lowercase()).map(|(_, cap)| cap)
    }
}
