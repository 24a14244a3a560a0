/// `SR` bit for carry.
pub const SR_C: u16 = 1 << 0;
/// `SR` bit for zero result.
pub const SR_Z: u16 = 1 << 1;
/// `SR` bit for negative result.
pub const SR_N: u16 = 1 << 2;
/// `SR` bit for general interrupt enable.
pub const SR_GIE: u16 = 1 << 3;
/// `SR` bit that gates the CPU clock.
pub const SR_CPUOFF: u16 = 1 << 4;
/// `SR` bit that stops the crystal oscillator.
pub const SR_OSCOFF: u16 = 1 << 5;
/// `SR` system clock generator bit 0.
pub const SR_SCG0: u16 = 1 << 6;
/// `SR` system clock generator bit 1.
pub const SR_SCG1: u16 = 1 << 7;
/// `SR` bit for signed overflow.
pub const SR_V: u16 = 1 << 8;
/// Control bits that select the low-power mode.
pub const SR_LPM_MASK: u16 = SR_CPUOFF | SR_OSCOFF | SR_SCG0 | SR_SCG1;

/// Arithmetic flags held in the status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `C`, bit 0.
    Carry,
    /// `Z`, bit 1.
    Zero,
    /// `N`, bit 2.
    Negative,
    /// `V`, bit 8.
    Overflow,
}

impl Flag {
    /// Status-word mask of this flag.
    #[must_use]
    pub const fn mask(self) -> u16 {
        match self {
            Self::Carry => SR_C,
            Self::Zero => SR_Z,
            Self::Negative => SR_N,
            Self::Overflow => SR_V,
        }
    }
}

/// Low-power operating modes selected by `CPUOFF`, `OSCOFF`, `SCG0` and `SCG1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum LowPowerMode {
    /// CPU clocked and fetching.
    #[default]
    Active,
    /// CPU off; MCLK stopped.
    Lpm0,
    /// CPU off; DCO generator disabled when unused.
    Lpm1,
    /// CPU off; SMCLK off.
    Lpm2,
    /// CPU off; only ACLK running.
    Lpm3,
    /// CPU and all clocks off.
    Lpm4,
}

impl LowPowerMode {
    /// Returns `true` for every mode in which the CPU does not fetch.
    #[must_use]
    pub const fn is_cpu_off(self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Integer-backed view over the status register (`R2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StatusWord(u16);

impl StatusWord {
    /// Wraps a raw status-word value.
    #[must_use]
    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw 16-bit value.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Reads an arithmetic flag.
    #[must_use]
    pub const fn flag(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    /// Returns a copy with one arithmetic flag set or cleared.
    #[must_use]
    pub const fn with_flag(self, flag: Flag, enabled: bool) -> Self {
        if enabled {
            Self(self.0 | flag.mask())
        } else {
            Self(self.0 & !flag.mask())
        }
    }

    /// Carry flag.
    #[must_use]
    pub const fn carry(self) -> bool {
        self.flag(Flag::Carry)
    }

    /// Zero flag.
    #[must_use]
    pub const fn zero(self) -> bool {
        self.flag(Flag::Zero)
    }

    /// Negative flag.
    #[must_use]
    pub const fn negative(self) -> bool {
        self.flag(Flag::Negative)
    }

    /// Overflow flag.
    #[must_use]
    pub const fn overflow(self) -> bool {
        self.flag(Flag::Overflow)
    }

    /// General interrupt enable.
    #[must_use]
    pub const fn gie(self) -> bool {
        self.0 & SR_GIE != 0
    }

    /// CPU clock gated.
    #[must_use]
    pub const fn cpu_off(self) -> bool {
        self.0 & SR_CPUOFF != 0
    }

    /// Oscillator stopped.
    #[must_use]
    pub const fn osc_off(self) -> bool {
        self.0 & SR_OSCOFF != 0
    }

    /// System clock generator bit 0.
    #[must_use]
    pub const fn scg0(self) -> bool {
        self.0 & SR_SCG0 != 0
    }

    /// System clock generator bit 1.
    #[must_use]
    pub const fn scg1(self) -> bool {
        self.0 & SR_SCG1 != 0
    }

    /// Low-power control bits only.
    #[must_use]
    pub const fn lpm_bits(self) -> u16 {
        self.0 & SR_LPM_MASK
    }

    /// Decodes the selected low-power mode.
    ///
    /// `OSCOFF` with the CPU off always reads as LPM4; otherwise the two
    /// clock-generator bits pick LPM0 through LPM3.
    #[must_use]
    pub const fn low_power_mode(self) -> LowPowerMode {
        if !self.cpu_off() {
            return LowPowerMode::Active;
        }
        if self.osc_off() {
            return LowPowerMode::Lpm4;
        }
        match (self.scg0(), self.scg1()) {
            (false, false) => LowPowerMode::Lpm0,
            (true, false) => LowPowerMode::Lpm1,
            (false, true) => LowPowerMode::Lpm2,
            (true, true) => LowPowerMode::Lpm3,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        Flag, LowPowerMode, StatusWord, SR_CPUOFF, SR_GIE, SR_LPM_MASK, SR_OSCOFF, SR_SCG0,
        SR_SCG1, SR_V,
    };

    #[test]
    fn flag_bits_sit_at_architectural_positions() {
        assert_eq!(Flag::Carry.mask(), 0x0001);
        assert_eq!(Flag::Zero.mask(), 0x0002);
        assert_eq!(Flag::Negative.mask(), 0x0004);
        assert_eq!(Flag::Overflow.mask(), 0x0100);
        assert_eq!(SR_LPM_MASK, 0x00F0);
    }

    #[test]
    fn with_flag_touches_only_its_bit() {
        let sr = StatusWord::new(SR_GIE | SR_CPUOFF);
        let set = sr.with_flag(Flag::Overflow, true);
        assert_eq!(set.bits(), SR_GIE | SR_CPUOFF | SR_V);
        assert_eq!(set.with_flag(Flag::Overflow, false), sr);
        assert_eq!(set.lpm_bits(), sr.lpm_bits());
    }

    #[rstest]
    #[case(0, LowPowerMode::Active)]
    #[case(SR_SCG0 | SR_SCG1 | SR_OSCOFF, LowPowerMode::Active)]
    #[case(SR_CPUOFF, LowPowerMode::Lpm0)]
    #[case(SR_CPUOFF | SR_SCG0, LowPowerMode::Lpm1)]
    #[case(SR_CPUOFF | SR_SCG1, LowPowerMode::Lpm2)]
    #[case(SR_CPUOFF | SR_SCG0 | SR_SCG1, LowPowerMode::Lpm3)]
    #[case(SR_CPUOFF | SR_SCG0 | SR_SCG1 | SR_OSCOFF, LowPowerMode::Lpm4)]
    fn control_bits_select_low_power_mode(#[case] bits: u16, #[case] mode: LowPowerMode) {
        assert_eq!(StatusWord::new(bits).low_power_mode(), mode);
        assert_eq!(mode.is_cpu_off(), bits & SR_CPUOFF != 0);
    }
}
