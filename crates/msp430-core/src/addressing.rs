//! Operand resolution: turns register index plus addressing field into a
//! value and a write-back location, fetching extension words through
//! `next_pc` as it goes.

use crate::decoder::AddressingMode;
use crate::fault::FaultCode;
use crate::memory::{AccessKind, Width};
use crate::state::{CG2, PC, SP, SR};
use crate::timing::{DestinationClass, SingleClass, SourceClass};
use crate::Machine;

/// Effective addressing mode after constant-generator rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// Register direct.
    Register,
    /// Constant-generator literal (`R2`/`R3`).
    Constant,
    /// `x(Rn)`.
    Indexed,
    /// `EDE` (PC-relative).
    Symbolic,
    /// `&EDE`.
    Absolute,
    /// `@Rn`.
    Indirect,
    /// `@Rn+`.
    IndirectIncrement,
    /// `#N`.
    Immediate,
}

impl OperandKind {
    /// Format I source timing row.
    #[must_use]
    pub const fn source_class(self) -> SourceClass {
        match self {
            Self::Register | Self::Constant => SourceClass::Register,
            Self::Indirect => SourceClass::Indirect,
            Self::IndirectIncrement | Self::Immediate => SourceClass::IndirectIncrement,
            Self::Indexed | Self::Symbolic | Self::Absolute => SourceClass::Indexed,
        }
    }

    /// Format II timing row.
    #[must_use]
    pub const fn single_class(self) -> SingleClass {
        match self {
            Self::Register | Self::Constant => SingleClass::Register,
            Self::Indirect => SingleClass::Indirect,
            Self::IndirectIncrement => SingleClass::IndirectIncrement,
            Self::Immediate => SingleClass::Immediate,
            Self::Indexed | Self::Symbolic | Self::Absolute => SingleClass::Indexed,
        }
    }
}

/// Where a result is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// Register by index.
    Register(u8),
    /// Memory at the given address.
    Memory(u16),
    /// Nowhere; writes are discarded.
    Constant,
}

/// Per-instruction operand descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    /// Effective mode.
    pub kind: OperandKind,
    /// Encoded register index.
    pub reg: u8,
    /// Resolved write-back location.
    pub location: Location,
    /// Operand value, masked to the instruction width.
    pub value: u16,
}

impl Operand {
    const fn constant(reg: u8, value: u16, width: Width) -> Self {
        Self {
            kind: OperandKind::Constant,
            reg,
            location: Location::Constant,
            value: value & width.mask(),
        }
    }

    const fn memory(kind: OperandKind, reg: u8, addr: u16, value: u16) -> Self {
        Self {
            kind,
            reg,
            location: Location::Memory(addr),
            value,
        }
    }

    /// Format I destination timing column.
    #[must_use]
    pub const fn destination_class(&self) -> DestinationClass {
        match self.location {
            Location::Register(r) if r as usize == PC => DestinationClass::ProgramCounter,
            Location::Register(_) | Location::Constant => DestinationClass::Register,
            Location::Memory(_) => DestinationClass::Indexed,
        }
    }
}

impl Machine {
    /// Fetches the word at `next_pc` and advances `next_pc` past it.
    pub(crate) fn fetch_extension(&mut self) -> Result<u16, FaultCode> {
        let addr = self.regs.next_pc();
        let word = self.bus_read(addr, Width::Word, AccessKind::Fetch)?;
        self.regs.set_next_pc(addr.wrapping_add(2));
        Ok(word)
    }

    /// Register value as seen by an operand; `PC` reads as the address
    /// following the words fetched so far.
    pub(crate) const fn operand_register(&self, reg: u8) -> u16 {
        if reg as usize == PC {
            self.regs.next_pc()
        } else {
            self.regs.get(reg as usize)
        }
    }

    /// Resolves a source operand (format I) or the single operand (format II).
    pub(crate) fn resolve_source(
        &mut self,
        reg: u8,
        mode: AddressingMode,
        width: Width,
    ) -> Result<Operand, FaultCode> {
        let index = usize::from(reg & 0xF);
        let mask = width.mask();

        let operand = match (index, mode) {
            (CG2, AddressingMode::Register) => Operand::constant(reg, 0, width),
            (CG2, AddressingMode::Indexed) => Operand::constant(reg, 1, width),
            (CG2, AddressingMode::Indirect) => Operand::constant(reg, 2, width),
            (CG2, AddressingMode::IndirectIncrement) => Operand::constant(reg, 0xFFFF, width),
            (SR, AddressingMode::Indirect) => Operand::constant(reg, 4, width),
            (SR, AddressingMode::IndirectIncrement) => Operand::constant(reg, 8, width),
            (SR, AddressingMode::Indexed) => {
                let addr = self.fetch_extension()?;
                let value = self.bus_read(addr, width, AccessKind::Read)?;
                Operand::memory(OperandKind::Absolute, reg, addr, value)
            }
            (PC, AddressingMode::Indexed) => {
                let base = self.regs.next_pc();
                let addr = self.fetch_extension()?.wrapping_add(base);
                let value = self.bus_read(addr, width, AccessKind::Read)?;
                Operand::memory(OperandKind::Symbolic, reg, addr, value)
            }
            (PC, AddressingMode::IndirectIncrement) => {
                let value = self.fetch_extension()? & mask;
                Operand {
                    kind: OperandKind::Immediate,
                    reg,
                    location: Location::Constant,
                    value,
                }
            }
            (_, AddressingMode::Register) => Operand {
                kind: OperandKind::Register,
                reg,
                location: Location::Register(reg & 0xF),
                value: self.operand_register(reg) & mask,
            },
            (_, AddressingMode::Indexed) => {
                let offset = self.fetch_extension()?;
                let addr = self.regs.get(index).wrapping_add(offset);
                let value = self.bus_read(addr, width, AccessKind::Read)?;
                Operand::memory(OperandKind::Indexed, reg, addr, value)
            }
            (_, AddressingMode::Indirect) => {
                let addr = self.operand_register(reg);
                let value = self.bus_read(addr, width, AccessKind::Read)?;
                Operand::memory(OperandKind::Indirect, reg, addr, value)
            }
            (_, AddressingMode::IndirectIncrement) => {
                let addr = self.regs.get(index);
                let value = self.bus_read(addr, width, AccessKind::Read)?;
                let step = if index == SP { 2 } else { width.step() };
                self.regs.set(index, addr.wrapping_add(step));
                Operand::memory(OperandKind::IndirectIncrement, reg, addr, value)
            }
        };
        Ok(operand)
    }

    /// Resolves a format I destination.
    ///
    /// `read` is `false` for `MOV`, which never reads its destination.
    pub(crate) fn resolve_destination(
        &mut self,
        indexed: bool,
        reg: u8,
        width: Width,
        read: bool,
    ) -> Result<Operand, FaultCode> {
        let index = usize::from(reg & 0xF);

        if !indexed {
            if index == CG2 {
                return Ok(Operand::constant(reg, 0, width));
            }
            return Ok(Operand {
                kind: OperandKind::Register,
                reg,
                location: Location::Register(reg & 0xF),
                value: self.operand_register(reg) & width.mask(),
            });
        }

        let base = self.regs.next_pc();
        let ext = self.fetch_extension()?;
        let (kind, addr) = match index {
            PC => (OperandKind::Symbolic, ext.wrapping_add(base)),
            SR => (OperandKind::Absolute, ext),
            _ => (OperandKind::Indexed, self.regs.get(index).wrapping_add(ext)),
        };
        let value = if read {
            self.bus_read(addr, width, AccessKind::Read)?
        } else {
            0
        };
        Ok(Operand::memory(kind, reg, addr, value))
    }
}
