use bincode::config;

use crate::{
    cartridge::Cartridge,
    cpu::Cpu,
    error::EmulatorError,
    frame::Frame,
    info,
    mem::Mmu,
    msg::ButtonState,
};

/// Top-level handle for a running machine.
///
/// The core is single-threaded and cooperative: nothing happens except in
/// response to `step`, which the caller drives at whatever cadence it
/// wants (real-time pacing, frame-stepping, or as fast as possible for a
/// headless run). `step` never blocks and never spawns work of its own;
/// the only outward-facing side effects are the optional callbacks below.
pub struct Emulator {
    cpu: Cpu,
    /// Total T-cycles executed since this `Emulator` was constructed
    /// (reset to 0 across a save/load, since it is not part of saved state).
    tcycles: u64,
    was_vblank: bool,

    on_vblank: Option<Box<dyn FnMut(&Frame)>>,
    on_apu_buffer_filled: Option<Box<dyn FnMut(&[f32])>>,
    on_serial_start: Option<Box<dyn FnMut(u8)>>,
}

impl Emulator {
    /// Build a fresh machine from cartridge ROM bytes, rejecting the ROM
    /// before any machine state is constructed (§7 CARTRIDGE-LOAD ERRORS).
    pub fn from_rom(rom: &[u8]) -> Result<Self, EmulatorError> {
        let cart = Cartridge::new(rom)?;
        let mmu = Mmu::new(cart);
        let mut cpu = Cpu::new(mmu);
        init_post_boot_state(&mut cpu);

        Ok(Self::wrap(cpu))
    }

    /// Rebuild a machine from a save image produced by `save`.
    pub fn from_saved(data: &[u8]) -> Result<Self, EmulatorError> {
        let (cpu, _): (Cpu, usize) = bincode::decode_from_slice(data, config::standard())
            .map_err(|_| EmulatorError::SaveFileCorrupted)?;

        Ok(Self::wrap(cpu))
    }

    /// Extract the original cartridge ROM bytes out of a save image, without
    /// constructing a machine.
    pub fn rom_from_saved(data: &[u8]) -> Result<Vec<u8>, EmulatorError> {
        let (cpu, _): (Cpu, usize) = bincode::decode_from_slice(data, config::standard())
            .map_err(|_| EmulatorError::SaveFileCorrupted)?;

        Ok(cpu.rom().to_vec())
    }

    /// Encode the full machine state (§6 Save/restore). Presentation-only
    /// scratch (current frame, in-flight audio samples) is excluded by the
    /// `#[bincode(skip)]` fields on the relevant types and rebuilt as a side
    /// effect of resuming `step`.
    pub fn save(&self) -> Vec<u8> {
        bincode::encode_to_vec(&self.cpu, config::standard())
            .expect("encoding the machine state never fails")
    }

    fn wrap(cpu: Cpu) -> Self {
        Self {
            cpu,
            tcycles: 0,
            was_vblank: false,
            on_vblank: None,
            on_apu_buffer_filled: None,
            on_serial_start: None,
        }
    }

    /// Register (or clear, with `None`) the callback invoked once per frame,
    /// right after the PPU enters VBLANK.
    pub fn set_on_vblank(&mut self, cb: impl FnMut(&Frame) + 'static) {
        self.on_vblank = Some(Box::new(cb));
    }

    /// Register the callback invoked whenever the audio buffer fills.
    pub fn set_on_apu_buffer_filled(&mut self, cb: impl FnMut(&[f32]) + 'static) {
        self.on_apu_buffer_filled = Some(Box::new(cb));
    }

    /// Register the callback invoked with the outgoing byte each time a
    /// serial transfer starts.
    pub fn set_on_serial_start(&mut self, cb: impl FnMut(u8) + 'static) {
        self.on_serial_start = Some(Box::new(cb));
    }

    /// Report the current state of all eight buttons. The physical
    /// constraint (opposite D-pad directions cannot both be pressed) is
    /// applied by the MMU, not here.
    pub fn set_buttons(&mut self, buttons: ButtonState) {
        let (dpad, btns) = buttons.to_internal_repr();
        self.cpu.mmu.update_joypad(dpad, btns);
    }

    /// Copy out the frame as it stood at the last VBLANK.
    pub fn frame(&self) -> Frame {
        let mut frame = Frame::default();
        self.cpu.mmu.ppu.fill_frame(&mut frame);
        frame
    }

    /// True once the CPU has hit a fatal condition (§7); `step` becomes a
    /// no-op and the caller should tear down.
    pub fn is_crashed(&self) -> bool {
        self.cpu.is_crashed()
    }

    /// Total T-cycles executed since construction.
    pub fn tcycles(&self) -> u64 {
        self.tcycles
    }

    /// Perform exactly one atomic step (an instruction, or a pending
    /// interrupt dispatch) and return the number of M-cycles it consumed.
    /// Fires whichever of the three callbacks apply as a side effect.
    pub fn step(&mut self) -> u32 {
        let mcycles = self.cpu.step();
        self.tcycles += mcycles as u64 * 4;

        let is_vblank = self.cpu.mmu.get_mode() == info::MODE_VBLANK;
        if is_vblank && !self.was_vblank {
            if let Some(cb) = self.on_vblank.as_mut() {
                let mut frame = Frame::default();
                self.cpu.mmu.ppu.fill_frame(&mut frame);
                cb(&frame);
            }
        }
        self.was_vblank = is_vblank;

        if let Some(samples) = self.cpu.mmu.apu.drain_if_full(info::AUDIO_BUFFER_LEN) {
            if let Some(cb) = self.on_apu_buffer_filled.as_mut() {
                cb(&samples);
            }
        }

        if let Some(byte) = self.cpu.mmu.serial.take_started() {
            if let Some(cb) = self.on_serial_start.as_mut() {
                cb(byte);
            }
        }

        mcycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 32 * 1024];
        rom[0x0100] = 0xD3; // undefined opcode: crashes the CPU
        rom[0x0147] = 0x00;
        rom[0x0148] = 0x00;
        rom[0x0149] = 0x00;
        rom
    }

    #[test]
    fn save_and_load_round_trips_register_state() {
        let mut emu = Emulator::from_rom(&test_rom()).unwrap();
        emu.cpu.pc.0 = 0x0200;
        emu.cpu.sp.0 = 0x1234;

        let saved = emu.save();
        let restored = Emulator::from_saved(&saved).unwrap();

        assert_eq!(restored.cpu.pc.0, 0x0200);
        assert_eq!(restored.cpu.sp.0, 0x1234);
    }

    #[test]
    fn save_and_load_round_trips_the_crashed_state() {
        let mut emu = Emulator::from_rom(&test_rom()).unwrap();
        emu.step();
        assert!(emu.is_crashed());

        let saved = emu.save();
        let restored = Emulator::from_saved(&saved).unwrap();

        assert!(restored.is_crashed());
    }

    #[test]
    fn rom_from_saved_recovers_the_original_cartridge_bytes() {
        let rom = test_rom();
        let emu = Emulator::from_rom(&rom).unwrap();
        let saved = emu.save();

        assert_eq!(Emulator::rom_from_saved(&saved).unwrap(), rom);
    }
}

/// Register/memory state left behind by the boot ROM once it hands control
/// to cartridge code at 0x0100. This core has no boot ROM of its own, so it
/// starts directly in this post-boot state.
fn init_post_boot_state(cpu: &mut Cpu) {
    cpu.pc.0 = 0x0100;
    cpu.sp.0 = 0xFFFE;

    let mmu = &mut cpu.mmu;
    mmu.joypad.write(0xCF);
    mmu.ppu.bgp = 0xFC;
    mmu.ppu.lcdc.write(0x91);
    mmu.ppu.stat.write(0x85);
}
