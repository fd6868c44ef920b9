mod apu;
mod cartridge;
mod counter;
mod cpu;
mod emulator;
mod error;
mod frame;
mod info;
mod log;
mod macros;
mod mem;
mod msg;
mod ppu;
mod regs;
mod serial;
mod timer;

pub use emulator::Emulator;
pub use error::{CartridgeError, EmulatorError};
pub use frame::{Color, Frame};
pub use info::{FREQUENCY, SCREEN_RESOLUTION};
pub use msg::ButtonState;
