//! IO-port register structures for convenient reading and writing.

use crate::macros::bit_fields;

bit_fields! {
    /// Joypad/P1 register, only upper nibble is writable by user-code.
    /// In this register, rather unconventionally 0-bit means PRESSED,
    /// so complement bits before writng to the actual register.
    ///
    /// Lower 4-bits are set as: `ActionButtons` for `select_buttons`
    /// and `Dpad` for `select_dpad`.
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct JoyPad<u8> {
        /// Input line state for the currently selected group(s), 0=pressed.
        state: 4,
        select_dpad: 1,
        select_buttons: 1,
        _0: 2,
    }
}

bit_fields! {
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct DPad<u8> {
        right: 1,
        left: 1,
        up: 1,
        down: 1,
    }
}

bit_fields! {
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct ActionButtons<u8> {
        a: 1,
        b: 1,
        select: 1,
        start: 1,
    }
}

bit_fields! {
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct SerialCtrl<u8> {
        clock_select: 1,
        clock_speed: 1,
        _0: 5,
        tx_enable: 1,
    }
}

bit_fields! {
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct LcdCtrl<u8> {
        /// In non-CGB mode this overrides win_enable
        /// and has meaning `BG_and_window_enable`.
        bg_win_priotity:1,
        obj_enable: 1,
        obj_size: 1,
        bg_tile_map: 1,
        /// Addressing mode for BG/Win tile index in tile data.
        bg_win_tile_data: 1,
        win_enable: 1,
        win_tile_map: 1,
        ppu_enable: 1,
    }
}

bit_fields! {
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct LcdStat<u8> {
        ppu_mode: 2,
        ly_eq_lyc: 1,
        // Conditions for STAT interrupt.
        mode0: 1,
        mode1: 1,
        mode2: 1,
        lyc: 1,
    }
}

bit_fields! {
    /// Background/Object color palette index.
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct CgbPaletteIndex<u8> {
        addr: 6,
        _0: 1,
        auto_inc: 1,
    }
}

bit_fields! {
    /// Background/Object color palette index.
    pub(crate) struct CgbPaletteColor<u16> {
        red: 5,
        green: 5,
        blue: 5,
    }
}

bit_fields! {
    /// `TIMA` register control information.
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct TimerCtrl<u8> {
        clock_select: 2,
        enable: 1,
    }
}

bit_fields! {
    /// Interrupt data and Interrupt enable register fields.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct IntrBits<u8> {
        vblank: 1,
        stat: 1,
        timer: 1,
        serial: 1,
        joypad: 1,
    }
}

impl IntrBits {
    /// Bits set in both `self` and `other`, in priority order
    /// (vblank, stat, timer, serial, joypad).
    pub(crate) fn masked(&self, other: &IntrBits) -> IntrBits {
        IntrBits::new(self.read() & other.read())
    }

    pub(crate) fn any(&self) -> bool {
        self.read() != 0
    }
}

bit_fields! {
    /// Dual-speed(for CGB) speed switch register(KEY1).
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct Key1<u8> {
        armed: 1,
        _1: 6,
        speed: 1,
    }
}

// Audio registers.
// ---------------------------------------------------------

bit_fields! {
    /// NR10: pulse-1 frequency sweep. Shared type with pulse-2's unused NR20.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioNx0<u8> {
        shift_step: 3,
        direction: 1,
        pace: 3,
        _0: 1,
    }
}

bit_fields! {
    /// NR11/NR21/NR41: initial length timer + duty cycle (duty unused by noise).
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioNx1<u8> {
        length_period: 6,
        wave_duty: 2,
    }
}

bit_fields! {
    /// NR12/NR22/NR42: volume envelope.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioNx2<u8> {
        pace: 3,
        direction: 1,
        initial_volume: 4,
    }
}

bit_fields! {
    /// NR13/NR23/NR33: period low bits (write-only on real hardware).
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioNx3<u8> {
        period_low: 8,
    }
}

bit_fields! {
    /// NR14/NR24/NR34: period high bits, length-enable and trigger.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioNx4<u8> {
        period_high: 3,
        _0: 3,
        length_timer_enable: 1,
        trigger: 1,
    }
}

bit_fields! {
    /// NR30: DAC enable for the wave channel.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioN30<u8> {
        _0: 7,
        dac_on: 1,
    }
}

bit_fields! {
    /// NR31: full 8-bit initial length timer for the wave channel.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioN31<u8> {
        length_period: 8,
    }
}

bit_fields! {
    /// NR32: output level (volume shift) for the wave channel.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioN32<u8> {
        _0: 5,
        output_level: 2,
        _1: 1,
    }
}

bit_fields! {
    /// NR43: clock divider, LFSR width and clock shift for the noise channel.
    #[derive(Debug, bincode::Encode, bincode::Decode)]
    pub(crate) struct AudioN43<u8> {
        clock_divider: 3,
        lfsr_width: 1,
        clock_shift: 4,
    }
}

bit_fields! {
    /// NR50: master volume + VIN routing.
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    pub(crate) struct AudioNr50<u8> {
        vol_right: 3,
        vin_right: 1,
        vol_left: 3,
        vin_left: 1,
    }
}

bit_fields! {
    /// NR51: per-channel stereo panning.
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    pub(crate) struct AudioNr51<u8> {
        ch1_right: 1,
        ch2_right: 1,
        ch3_right: 1,
        ch4_right: 1,
        ch1_left: 1,
        ch2_left: 1,
        ch3_left: 1,
        ch4_left: 1,
    }
}

bit_fields! {
    /// NR52: master audio enable + read-only per-channel active flags.
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    pub(crate) struct AudioNr52<u8> {
        ch1_on: 1,
        ch2_on: 1,
        ch3_on: 1,
        ch4_on: 1,
        _0: 3,
        audio_on: 1,
    }
}

bit_fields! {
    /// IR port (FF56), modeled only enough to satisfy reads/writes;
    /// no actual infrared transport exists in this implementation.
    #[derive(bincode::Encode, bincode::Decode)]
    pub(crate) struct Rp<u8> {
        write_data: 1,
        read_enable: 1,
        _0: 4,
        read_data: 2,
    }
}
