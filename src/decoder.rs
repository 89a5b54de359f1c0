use crate::isa::Operation;

const GROUP_MASK: u16 = 0xF000;
const SCROLL_DOWN_MASK: u16 = 0xFFF0;
const SYSTEM_MASK: u16 = 0x0FFF;
const ALU_MASK: u16 = 0xF00F;
const KEY_MASK: u16 = 0xF0FF;
const MISC_MASK: u16 = 0xF0FF;

/// A decoded instruction word.
///
/// Every operand field is extracted from every word, whether the operation uses it or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub operation: Operation,
    /// `...n`
    pub n: u8,
    /// `..nn`
    pub nn: u8,
    /// `.nnn`
    pub nnn: u16,
    /// `.x..`
    pub x: u8,
    /// `..y.`
    pub y: u8,
}

/// Decode an instruction word. Words that are not a known instruction decode to
/// [`Operation::Invalid`].
pub fn decode(word: u16) -> Decoded {
    Decoded {
        operation: operation(word),
        n: (word & 0x000F) as u8,
        nn: (word & 0x00FF) as u8,
        nnn: word & 0x0FFF,
        x: ((word & 0x0F00) >> 8) as u8,
        y: ((word & 0x00F0) >> 4) as u8,
    }
}

fn operation(word: u16) -> Operation {
    match word & GROUP_MASK {
        0x0000 => system(word),
        0x1000 => Operation::Jump,
        0x2000 => Operation::Call,
        0x3000 => Operation::SkipEqImm,
        0x4000 => Operation::SkipNeImm,
        0x5000 => Operation::SkipEqReg,
        0x6000 => Operation::LoadImm,
        0x7000 => Operation::AddImm,
        0x8000 => alu(word),
        0x9000 => Operation::SkipNeReg,
        0xA000 => Operation::LoadIndex,
        0xB000 => Operation::JumpV0,
        0xC000 => Operation::Random,
        0xD000 => Operation::Draw,
        0xE000 => key(word),
        _ => misc(word),
    }
}

fn system(word: u16) -> Operation {
    if word & SCROLL_DOWN_MASK == 0x00C0 {
        return Operation::ScrollDown;
    }
    match word & SYSTEM_MASK {
        0x0E0 => Operation::ClearScreen,
        0x0EE => Operation::Return,
        0x0FB => Operation::ScrollRight,
        0x0FC => Operation::ScrollLeft,
        0x0FD => Operation::Quit,
        0x0FE => Operation::LowRes,
        0x0FF => Operation::HighRes,
        _ => Operation::Invalid,
    }
}

fn alu(word: u16) -> Operation {
    match word & ALU_MASK {
        0x8000 => Operation::Copy,
        0x8001 => Operation::Or,
        0x8002 => Operation::And,
        0x8003 => Operation::Xor,
        0x8004 => Operation::Add,
        0x8005 => Operation::Sub,
        0x8006 => Operation::ShiftRight,
        0x8007 => Operation::SubNeg,
        0x800E => Operation::ShiftLeft,
        _ => Operation::Invalid,
    }
}

fn key(word: u16) -> Operation {
    match word & KEY_MASK {
        0xE09E => Operation::SkipKeyEq,
        0xE0A1 => Operation::SkipKeyNe,
        _ => Operation::Invalid,
    }
}

fn misc(word: u16) -> Operation {
    match word & MISC_MASK {
        0xF007 => Operation::GetTimer,
        0xF00A => Operation::WaitKey,
        0xF015 => Operation::SetTimer,
        0xF018 => Operation::SetSound,
        0xF01E => Operation::AddIndex,
        0xF029 => Operation::Font,
        0xF033 => Operation::Bcd,
        0xF055 => Operation::Store,
        0xF065 => Operation::Recall,
        0xF075 => Operation::Save,
        0xF085 => Operation::Load,
        _ => Operation::Invalid,
    }
}
