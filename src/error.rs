use thiserror::Error;

/// Errors rejected while constructing a cartridge, before the machine exists.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("rom size {actual} does not match header-declared size {expected}")]
    RomSizeMismatch { expected: usize, actual: usize },

    #[error("rom size byte {0:#04x} is not a known size code")]
    UnknownRomSize(u8),

    #[error("ram size byte {0:#04x} is not a known size code")]
    UnknownRamSize(u8),

    #[error("cartridge type byte {0:#04x} does not map to a known MBC")]
    UnknownMbc(u8),

    #[error("cartridge type byte {0:#04x} maps to a recognized but unimplemented MBC")]
    NotImplemented(u8),
}

/// Top-level error type surfaced by the public `Emulator` API.
#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("cartridge rejected: {0}")]
    Cartridge(#[from] CartridgeError),

    #[error("save file is corrupted or from an incompatible version")]
    SaveFileCorrupted,
}
