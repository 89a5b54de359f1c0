/// Ordered table of instruction forms accepted by the assembler.
pub mod descriptor;

pub use descriptor::{Descriptor, Fixed, Slot, DESCRIPTORS};

/// Operation performed by an instruction.
///
/// Shared by the decoder, which classifies binary words into operations, and the descriptor
/// table, which maps mnemonics onto them. `Invalid` is produced for every word that does not
/// correspond to a known instruction.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, strum_macros::EnumIter)]
pub enum Operation {
    Invalid,
    /// `00Cn` scroll the display down n pixels
    ScrollDown,
    /// `00FB`
    ScrollRight,
    /// `00FC`
    ScrollLeft,
    /// `00FD` quit the interpreter
    Quit,
    /// `00FE` 64x32 graphics mode
    LowRes,
    /// `00FF` 128x64 graphics mode
    HighRes,
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `1nnn`
    Jump,
    /// `2nnn`
    Call,
    /// `3xnn`
    SkipEqImm,
    /// `4xnn`
    SkipNeImm,
    /// `5xy0`
    SkipEqReg,
    /// `6xnn`
    LoadImm,
    /// `7xnn`
    AddImm,
    /// `8xy0`
    Copy,
    /// `8xy1`
    Or,
    /// `8xy2`
    And,
    /// `8xy3`
    Xor,
    /// `8xy4` with carry in VF
    Add,
    /// `8xy5` with borrow in VF
    Sub,
    /// `8xy6`
    ShiftRight,
    /// `8xy7` Vx = Vy - Vx
    SubNeg,
    /// `8xyE`
    ShiftLeft,
    /// `9xy0`
    SkipNeReg,
    /// `Annn`
    LoadIndex,
    /// `Bnnn` jump to nnn + V0
    JumpV0,
    /// `Cxnn`
    Random,
    /// `Dxyn`
    Draw,
    /// `Ex9E`
    SkipKeyEq,
    /// `ExA1`
    SkipKeyNe,
    /// `Fx07`
    GetTimer,
    /// `Fx0A`
    WaitKey,
    /// `Fx15`
    SetTimer,
    /// `Fx18`
    SetSound,
    /// `Fx1E`
    AddIndex,
    /// `Fx29` point IX at the font sprite for Vx
    Font,
    /// `Fx33`
    Bcd,
    /// `Fx55` store V0..Vx at IX
    Store,
    /// `Fx65` load V0..Vx from IX
    Recall,
    /// `Fx75` save V0..Vx to persistent flags
    Save,
    /// `Fx85` load V0..Vx from persistent flags
    Load,
}

impl Operation {
    /// Operations whose 12-bit operand is an absolute address in the program.
    pub fn references_address(&self) -> bool {
        matches!(self, Operation::Jump | Operation::Call | Operation::LoadIndex)
    }
}

/// Reserved words that may appear as operands.
///
/// Matching is case-insensitive, so `key`, `Key` and `KEY` all name [`Keyword::Key`].
#[derive(
    Debug, Hash, Eq, PartialEq, Clone, Copy, strum_macros::EnumString, strum_macros::Display,
)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Keyword {
    /// The index register
    IX,
    Key,
    Timer,
    Sound,
}
