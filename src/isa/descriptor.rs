use lazy_static::lazy_static;
use std::collections::HashSet;

use super::{Keyword, Operation};

/// How an operand is folded into the opcode template.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub enum Slot {
    None,
    /// Register index in bits 8-11 (`.x..`)
    RegisterHigh,
    /// Register index in bits 4-7 (`..y.`)
    RegisterMid,
    /// `...n`
    Imm4,
    /// `..nn`
    Imm8,
    /// `.nnn`
    Imm12,
}

/// An exact operand required in the first slot, e.g. `KEY` in `SKEQ KEY, Vx`.
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy)]
pub enum Fixed {
    Keyword(Keyword),
    Register(u8),
    /// Selector compared against the operand text, ignoring case. Selectors are not reserved,
    /// so `left` remains usable as a label.
    Word(&'static str),
}

/// One instruction form: a mnemonic with an operand shape and its opcode template.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct Descriptor {
    pub operation: Operation,
    pub mnemonic: &'static str,
    /// Number of operands the form needs
    pub operands: usize,
    /// Replaces the slot type of the first operand when set
    pub fixed: Option<Fixed>,
    pub slots: [Slot; 3],
    pub opcode: u16,
}

const fn form(
    operation: Operation,
    mnemonic: &'static str,
    opcode: u16,
    operands: usize,
    fixed: Option<Fixed>,
    slots: [Slot; 3],
) -> Descriptor {
    Descriptor {
        operation,
        mnemonic,
        operands,
        fixed,
        slots,
        opcode,
    }
}

const fn op0(operation: Operation, mnemonic: &'static str, opcode: u16) -> Descriptor {
    form(operation, mnemonic, opcode, 0, None, [Slot::None; 3])
}

const fn op1(operation: Operation, mnemonic: &'static str, opcode: u16, a: Slot) -> Descriptor {
    form(operation, mnemonic, opcode, 1, None, [a, Slot::None, Slot::None])
}

const fn op2(
    operation: Operation,
    mnemonic: &'static str,
    opcode: u16,
    a: Slot,
    b: Slot,
) -> Descriptor {
    form(operation, mnemonic, opcode, 2, None, [a, b, Slot::None])
}

const fn op3(
    operation: Operation,
    mnemonic: &'static str,
    opcode: u16,
    a: Slot,
    b: Slot,
    c: Slot,
) -> Descriptor {
    form(operation, mnemonic, opcode, 3, None, [a, b, c])
}

const fn fixed1(operation: Operation, mnemonic: &'static str, opcode: u16, f: Fixed) -> Descriptor {
    form(operation, mnemonic, opcode, 1, Some(f), [Slot::None; 3])
}

const fn fixed2(
    operation: Operation,
    mnemonic: &'static str,
    opcode: u16,
    f: Fixed,
    b: Slot,
) -> Descriptor {
    form(operation, mnemonic, opcode, 2, Some(f), [Slot::None, b, Slot::None])
}

use self::Fixed::{Keyword as Kw, Word};
use self::Slot::{Imm12, Imm4, Imm8, RegisterHigh as Vx, RegisterMid as Vy};
use super::Operation as Op;

const IX: Fixed = Kw(Keyword::IX);
const KEY: Fixed = Kw(Keyword::Key);
const TIMER: Fixed = Kw(Keyword::Timer);

/// Every accepted instruction form.
///
/// The encoder picks the first row that matches, so overloaded mnemonics list their most
/// specific form first (`JMP V0, nnn` before `JMP nnn`).
pub static DESCRIPTORS: &[Descriptor] = &[
    op0(Op::Quit, "QUIT", 0x00FD),
    op0(Op::ClearScreen, "CLS", 0x00E0),
    op0(Op::Return, "RET", 0x00EE),
    op0(Op::Return, "RTS", 0x00EE),
    fixed1(Op::LowRes, "MODE", 0x00FE, Word("64X32")),
    fixed1(Op::HighRes, "MODE", 0x00FF, Word("128X64")),
    fixed2(Op::ScrollDown, "SCRL", 0x00C0, Word("DOWN"), Imm4),
    fixed1(Op::ScrollLeft, "SCRL", 0x00FC, Word("LEFT")),
    fixed1(Op::ScrollRight, "SCRL", 0x00FB, Word("RIGHT")),
    op3(Op::Draw, "DRAW", 0xD000, Vx, Vy, Imm4),
    fixed2(Op::JumpV0, "JMP", 0xB000, Fixed::Register(0), Imm12),
    op1(Op::Jump, "JMP", 0x1000, Imm12),
    fixed2(Op::JumpV0, "JUMP", 0xB000, Fixed::Register(0), Imm12),
    op1(Op::Jump, "JUMP", 0x1000, Imm12),
    op1(Op::Call, "JSR", 0x2000, Imm12),
    op1(Op::Call, "CALL", 0x2000, Imm12),
    fixed2(Op::SkipKeyEq, "SKEQ", 0xE09E, KEY, Vx),
    op2(Op::SkipEqReg, "SKEQ", 0x5000, Vx, Vy),
    op2(Op::SkipEqImm, "SKEQ", 0x3000, Vx, Imm8),
    fixed2(Op::SkipKeyNe, "SKNE", 0xE0A1, KEY, Vx),
    op2(Op::SkipNeReg, "SKNE", 0x9000, Vx, Vy),
    op2(Op::SkipNeImm, "SKNE", 0x4000, Vx, Imm8),
    fixed2(Op::WaitKey, "WAIT", 0xF00A, KEY, Vx),
    op2(Op::LoadImm, "LD", 0x6000, Vx, Imm8),
    fixed2(Op::LoadIndex, "LD", 0xA000, IX, Imm12),
    op2(Op::Copy, "CP", 0x8000, Vx, Vy),
    op2(Op::LoadImm, "CP", 0x6000, Vx, Imm8),
    fixed2(Op::LoadIndex, "CP", 0xA000, IX, Imm12),
    fixed2(Op::AddIndex, "ADD", 0xF01E, IX, Vx),
    op2(Op::Add, "ADD", 0x8004, Vx, Vy),
    op2(Op::AddImm, "ADD", 0x7000, Vx, Imm8),
    op2(Op::Sub, "SUB", 0x8005, Vx, Vy),
    op2(Op::SubNeg, "NSUB", 0x8007, Vx, Vy),
    op2(Op::And, "AND", 0x8002, Vx, Vy),
    op2(Op::Or, "OR", 0x8001, Vx, Vy),
    op2(Op::Xor, "XOR", 0x8003, Vx, Vy),
    op1(Op::ShiftRight, "SHR", 0x8006, Vx),
    op1(Op::ShiftLeft, "SHL", 0x800E, Vx),
    op2(Op::Random, "RAND", 0xC000, Vx, Imm8),
    fixed2(Op::Font, "FONT", 0xF029, IX, Vx),
    fixed2(Op::SetTimer, "SET", 0xF015, TIMER, Vx),
    fixed2(Op::GetTimer, "GET", 0xF007, TIMER, Vx),
    fixed2(Op::SetSound, "SET", 0xF018, Kw(Keyword::Sound), Vx),
    fixed2(Op::Bcd, "BCD", 0xF033, IX, Vx),
    fixed2(Op::Store, "STO", 0xF055, IX, Vx),
    fixed2(Op::Recall, "RCL", 0xF065, IX, Vx),
    op1(Op::Save, "SAVE", 0xF075, Vx),
    op1(Op::Load, "LOAD", 0xF085, Vx),
];

lazy_static! {
    static ref MNEMONICS: HashSet<&'static str> =
        DESCRIPTORS.iter().map(|descriptor| descriptor.mnemonic).collect();
}

/// Whether any instruction form uses the given mnemonic, ignoring case.
pub fn is_mnemonic(text: &str) -> bool {
    MNEMONICS.contains(text.to_ascii_uppercase().as_str())
}
