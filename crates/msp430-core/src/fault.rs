use thiserror::Error;

use crate::RunSignal;

/// Per-instruction fault kinds surfaced to the host through the run signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Instruction word does not decode to a defined opcode.
    #[error("illegal instruction")]
    IllegalInstruction = 0x01,
    /// Access hit an address with no registered handler.
    #[error("bus error on unmapped address")]
    BusError = 0x02,
    /// Access-control collaborator fired a breakpoint or watchpoint.
    #[error("memory access-control trap")]
    AccessTrap = 0x03,
}

impl FaultCode {
    /// Converts a fault code to its stable wire value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable wire value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::IllegalInstruction),
            0x02 => Some(Self::BusError),
            0x03 => Some(Self::AccessTrap),
            _ => None,
        }
    }

    /// Run-signal bits that report this fault when the core raises it itself.
    ///
    /// Access traps are raised by the observer with their own fetch/read/write
    /// bits, so they map to the empty set here.
    #[must_use]
    pub const fn signal(self) -> RunSignal {
        match self {
            Self::IllegalInstruction => RunSignal::ILLEGAL_INSTRUCTION,
            Self::BusError => RunSignal::BUS_ERROR,
            Self::AccessTrap => RunSignal::empty(),
        }
    }
}

/// Construction-time address-map configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MapError {
    /// Requested range overlaps a range that is already registered.
    #[error(
        "range {start:#06x}..={end:#06x} overlaps registered range {existing_start:#06x}..={existing_end:#06x}"
    )]
    Conflict {
        /// Inclusive start of the rejected range.
        start: u16,
        /// Inclusive end of the rejected range.
        end: u16,
        /// Inclusive start of the range already owning part of the request.
        existing_start: u16,
        /// Inclusive end of the range already owning part of the request.
        existing_end: u16,
    },
    /// Range end lies below its start.
    #[error("range start {start:#06x} is above its end {end:#06x}")]
    InvertedRange {
        /// Inclusive start of the rejected range.
        start: u16,
        /// Inclusive end of the rejected range.
        end: u16,
    },
    /// Handler id was never issued by this dispatch table.
    #[error("unknown handler id {0}")]
    UnknownHandler(usize),
}

#[cfg(test)]
mod tests {
    use super::{FaultCode, MapError};
    use crate::RunSignal;

    #[test]
    fn stable_code_roundtrip_is_bijective_for_defined_values() {
        for code in 0x01u8..=0x03 {
            let fault = FaultCode::from_u8(code).expect("defined fault code");
            assert_eq!(fault.as_u8(), code);
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(FaultCode::from_u8(0x00).is_none());
        assert!(FaultCode::from_u8(0xFF).is_none());
    }

    #[test]
    fn core_raised_faults_map_to_their_signal_bits() {
        assert_eq!(
            FaultCode::IllegalInstruction.signal(),
            RunSignal::ILLEGAL_INSTRUCTION
        );
        assert_eq!(FaultCode::BusError.signal(), RunSignal::BUS_ERROR);
        assert!(FaultCode::AccessTrap.signal().is_empty());
    }

    #[test]
    fn conflict_message_names_both_ranges() {
        let err = MapError::Conflict {
            start: 0x0200,
            end: 0x02FF,
            existing_start: 0x0100,
            existing_end: 0x0280,
        };
        assert_eq!(
            err.to_string(),
            "range 0x0200..=0x02ff overlaps registered range 0x0100..=0x0280"
        );
    }
}
