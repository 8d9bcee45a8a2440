use crate::error::HostError;
use abi::OperandKinds;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ids the host assigns to the pieces of the machine it uses.
///
/// Missing fields in a JSON table fall back to the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostCodes {
    // --- Opcodes ---
    pub push: u16,
    pub call: u16,
    pub sub: u16,

    // --- Registers ---
    pub rsp: u16,

    // --- Native routines ---
    pub print: u16,
    pub input: u16,

    // --- Operand kinds ---
    pub literal: u8,
    pub register: u8,
    pub pointer: u8,
}

impl Default for HostCodes {
    fn default() -> Self {
        Self {
            push: 0x62,
            call: 0x88,
            sub: 0x49,
            rsp: 0x92,
            print: 0x23,
            input: 0x29,
            literal: 15,
            register: 29,
            pointer: 0,
        }
    }
}

impl HostCodes {
    pub fn operand_kinds(&self) -> OperandKinds {
        OperandKinds::new(self.literal, self.register, self.pointer)
    }

    pub fn from_json(text: &str) -> Result<Self, HostError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_keeps_defaults() {
        let codes = HostCodes::from_json(r#"{ "push": 1, "literal": 3 }"#).unwrap();
        assert_eq!(codes.push, 1);
        assert_eq!(codes.literal, 3);
        assert_eq!(codes.call, HostCodes::default().call);
        assert_eq!(codes.operand_kinds(), OperandKinds::new(3, 29, 0));
    }

    #[test]
    fn malformed_table_is_rejected() {
        let err = HostCodes::from_json(r#"{ "push": "sixty" }"#).unwrap_err();
        assert!(matches!(err, HostError::Codes(_)));
        assert!(err.to_string().starts_with("invalid code table"));
    }
}
