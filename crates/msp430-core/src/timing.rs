//! Instruction cycle-count tables.

/// Cycles for any format III jump, taken or not.
pub const JUMP_CYCLES: u32 = 2;
/// Cycles for `RETI`.
pub const RETI_CYCLES: u32 = 5;
/// Cycles for the interrupt entry sequence.
pub const INTERRUPT_ENTRY_CYCLES: u32 = 6;
/// Cycles charged for the reset sequence.
pub const RESET_CYCLES: u32 = 4;

/// Format I source timing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceClass {
    /// `Rn` and constant generators.
    Register,
    /// `@Rn`.
    Indirect,
    /// `@Rn+` and `#N`.
    IndirectIncrement,
    /// `x(Rn)`, `EDE`, `&EDE`.
    Indexed,
}

/// Format I destination timing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationClass {
    /// General register or SR.
    Register,
    /// Register-direct write to `PC`.
    ProgramCounter,
    /// `x(Rm)`, `EDE`, `&EDE`.
    Indexed,
}

/// Format II operand timing row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingleClass {
    /// `Rn` and constant generators.
    Register,
    /// `@Rn`.
    Indirect,
    /// `@Rn+`.
    IndirectIncrement,
    /// `#N`.
    Immediate,
    /// `x(Rn)`, `EDE`, `&EDE`.
    Indexed,
}

/// Format II timing column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SingleColumn {
    /// `RRA`, `RRC`, `SWPB`, `SXT`.
    Rotate,
    /// `PUSH`.
    Push,
    /// `CALL`.
    Call,
}

/// Format I cycles, rows by [`SourceClass`], columns by [`DestinationClass`].
pub const DOUBLE_OPERAND_CYCLES: [[u32; 3]; 4] = [
    [1, 2, 4], // Rn
    [2, 2, 5], // @Rn
    [2, 3, 5], // @Rn+, #N
    [3, 3, 6], // x(Rn), EDE, &EDE
];

/// Format II cycles, rows by [`SingleClass`], columns by [`SingleColumn`].
pub const SINGLE_OPERAND_CYCLES: [[u32; 3]; 5] = [
    [1, 3, 4], // Rn
    [3, 4, 4], // @Rn
    [3, 5, 5], // @Rn+
    [3, 4, 5], // #N
    [4, 5, 5], // x(Rn), EDE, &EDE
];

/// Looks up format I cycles.
#[must_use]
pub const fn double_operand_cycles(src: SourceClass, dst: DestinationClass) -> u32 {
    let row = match src {
        SourceClass::Register => 0,
        SourceClass::Indirect => 1,
        SourceClass::IndirectIncrement => 2,
        SourceClass::Indexed => 3,
    };
    let col = match dst {
        DestinationClass::Register => 0,
        DestinationClass::ProgramCounter => 1,
        DestinationClass::Indexed => 2,
    };
    DOUBLE_OPERAND_CYCLES[row][col]
}

/// Looks up format II cycles.
#[must_use]
pub const fn single_operand_cycles(operand: SingleClass, column: SingleColumn) -> u32 {
    let row = match operand {
        SingleClass::Register => 0,
        SingleClass::Indirect => 1,
        SingleClass::IndirectIncrement => 2,
        SingleClass::Immediate => 3,
        SingleClass::Indexed => 4,
    };
    let col = match column {
        SingleColumn::Rotate => 0,
        SingleColumn::Push => 1,
        SingleColumn::Call => 2,
    };
    SINGLE_OPERAND_CYCLES[row][col]
}
