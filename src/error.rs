//! Crate-wide error taxonomy. See SPEC_FULL.md §7.

use thiserror::Error;

/// Every fatal condition the core can signal. `BusInvalidAccess` from the taxonomy has
/// deliberately no variant here: every address decodes to a defined effect, so
/// constructing that error is a compile-time impossibility rather than a runtime promise.
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("usage: {0}")]
    BadUsage(String),

    #[error("failed to load ROM '{path}': {reason}")]
    RomLoadFail { path: String, reason: String },

    #[error("unsupported cartridge type byte {type_byte:#04x}")]
    UnsupportedCartridge { type_byte: u8 },

    #[error("unimplemented opcode {opcode:#04x} at PC={pc:#06x}")]
    UnimplementedOpcode { opcode: u8, pc: u16 },
}

impl EmulatorError {
    /// Maps a fatal error to the process exit code documented in SPEC_FULL.md §6/§7.
    pub fn exit_code(&self) -> i32 {
        match self {
            EmulatorError::BadUsage(_) => 1,
            EmulatorError::RomLoadFail { .. } => 2,
            EmulatorError::UnsupportedCartridge { .. } => 1,
            EmulatorError::UnimplementedOpcode { .. } => 1,
        }
    }
}

pub type CpuResult<T> = Result<T, EmulatorError>;
