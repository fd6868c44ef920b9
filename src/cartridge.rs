mod mbc;
mod rtc;

use crate::{error::CartridgeError, info::*, log, macros::match_range};

#[derive(bincode::Encode, bincode::Decode)]
pub(crate) struct Cartridge {
    pub(crate) is_cgb: bool,
    mbc: mbc::Mbc,

    /// Cartridge ROM fixed size on load.
    rom: Box<[u8]>,
    /// External RAM banks are allocated on demand.
    ram: Vec<u8>,
}

impl Cartridge {
    /// Validate the header and create a new cartridge from `rom`.
    pub(crate) fn new(rom: &[u8]) -> Result<Self, CartridgeError> {
        if rom.len() <= CART_ROM_SIZE {
            return Err(CartridgeError::RomSizeMismatch {
                expected: SIZE_ROM_BANK * 2,
                actual: rom.len(),
            });
        }

        let rom_size_code = rom[CART_ROM_SIZE];
        let expected_rom_size = rom_size_for_code(rom_size_code)
            .ok_or(CartridgeError::UnknownRomSize(rom_size_code))?;
        if rom.len() != expected_rom_size {
            return Err(CartridgeError::RomSizeMismatch {
                expected: expected_rom_size,
                actual: rom.len(),
            });
        }

        let ram_size_code = rom[CART_RAM_SIZE];
        let ram_size = ram_size_for_code(ram_size_code)
            .ok_or(CartridgeError::UnknownRamSize(ram_size_code))?;
        // MBC2 has 512x4-bit built-in RAM regardless of the header byte.
        let ram_size = ram_size.max(SIZE_EXT_RAM_BANK);

        let is_cgb_rom = matches!(rom[CART_CGB_FLAG], CART_CGB_TOO | CART_CGB_ONLY);
        let mbc = mbc::Mbc::new(rom[CART_TYPE])?;

        if rom.len() % SIZE_ROM_BANK != 0 {
            log::warn("cartridge: ROM size is not a multiple of 16kiB");
        }

        Ok(Self {
            is_cgb: is_cgb_rom,
            mbc,
            rom: rom.to_vec().into_boxed_slice(),
            ram: vec![0; ram_size],
        })
    }

    /// The original cartridge ROM bytes, as loaded.
    pub(crate) fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub(crate) fn read(&self, addr: usize) -> u8 {
        // Some ROM sizes may not be multiples of SIZE_ROM_BANK, in such cases
        // an address might overflow on last ROM bank.
        let safe_read = |addr: usize| {
            if addr < self.rom.len() {
                self.rom[addr]
            } else {
                0xFF
            }
        };

        match_range! { v@addr {
            ADDR_ROM0 => { safe_read(self.mbc.rom0_addr(v)) }
            ADDR_ROM1 => { safe_read(self.mbc.rom1_addr(v)) }
            ADDR_EXT_RAM => {
                if self.mbc.ram_enabled {
                    self.ram[self.mbc.ram_addr(v) % self.ram.len()]
                } else {
                    0xFF
                }
            }
            _ => { unreachable!() }
        }}
    }

    pub(crate) fn write(&mut self, addr: usize, val: u8) {
        match_range! { v@addr {
            ADDR_ROM0 => { self.mbc.write(addr, val) }
            ADDR_ROM1 => { self.mbc.write(addr, val) }

            ADDR_EXT_RAM => {
                if self.mbc.ram_enabled {
                    let len = self.ram.len();
                    self.ram[self.mbc.ram_addr(v) % len] = val;
                }
            }
            _ => { unreachable!() }
        }}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbc1_rom(banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * SIZE_ROM_BANK];
        for (i, bank) in rom.chunks_mut(SIZE_ROM_BANK).enumerate() {
            bank[0] = i as u8;
        }
        rom[CART_TYPE] = 0x01; // MBC1
        rom[CART_ROM_SIZE] = 0x03; // 32KiB << 3 = 256KiB = 16 banks
        rom[CART_RAM_SIZE] = 0x00;
        rom
    }

    #[test]
    fn mbc1_rom1_reads_the_selected_bank_and_promotes_bank_zero_to_one() {
        let mut cart = Cartridge::new(&mbc1_rom(16)).unwrap();

        cart.write(0x2000, 0x02);
        assert_eq!(cart.read(0x4000), 2);

        // Selecting bank 0 is translated to bank 1, never bank 0 itself.
        cart.write(0x2000, 0x00);
        assert_eq!(cart.read(0x4000), 1);
    }
}
