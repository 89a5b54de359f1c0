use chip8_toolchain::{
    assembler::{
        encoder::{encode, encode_line},
        symbols::SymbolTable,
        Assembler, MEMORY_SIZE,
    },
    decoder::decode,
    disassembler::disassemble_code,
    isa::{Fixed, Operation, Slot, DESCRIPTORS},
};

use pretty_assertions::assert_eq;

const X: u8 = 0x3;
const Y: u8 = 0x5;
const N: u16 = 0x7;
const NN: u16 = 0xAB;
const NNN: u16 = 0x345;

/// Build the canonical example statement of an instruction form and the word it encodes to.
fn example(ix: usize) -> (Vec<String>, u16) {
    let descriptor = &DESCRIPTORS[ix];
    let mut tokens = vec![descriptor.mnemonic.to_string()];
    let mut word = descriptor.opcode;

    for slot in 0..descriptor.operands {
        if slot == 0 {
            if let Some(fixed) = descriptor.fixed {
                tokens.push(match fixed {
                    Fixed::Keyword(keyword) => keyword.to_string(),
                    Fixed::Register(register) => format!("V{:X}", register),
                    Fixed::Word(word) => word.to_string(),
                });
                continue;
            }
        }
        let token = match descriptor.slots[slot] {
            Slot::RegisterHigh => {
                word |= (X as u16) << 8;
                format!("V{:X}", X)
            }
            Slot::RegisterMid => {
                word |= (Y as u16) << 4;
                format!("V{:X}", Y)
            }
            Slot::Imm4 => {
                word |= N;
                format!("{}", N)
            }
            Slot::Imm8 => {
                word |= NN;
                format!("0{:X}h", NN)
            }
            Slot::Imm12 => {
                word |= NNN;
                format!("{:X}h", NNN)
            }
            Slot::None => unreachable!("{:?}", descriptor),
        };
        tokens.push(token);
    }

    (tokens, word)
}

#[test]
fn test_every_form_roundtrips() {
    for (ix, descriptor) in DESCRIPTORS.iter().enumerate() {
        let (tokens, expected) = example(ix);
        let mut symbols = SymbolTable::new();

        assert_eq!(encode(&tokens, &mut symbols), Ok(expected), "{:?}", tokens);

        let decoded = decode(expected);
        assert_eq!(decoded.operation, descriptor.operation, "{:?}", tokens);
        if descriptor.slots.contains(&Slot::RegisterHigh) {
            assert_eq!(decoded.x, X, "{:?}", tokens);
        }
        if descriptor.slots.contains(&Slot::RegisterMid) {
            assert_eq!(decoded.y, Y, "{:?}", tokens);
        }
        if descriptor.slots.contains(&Slot::Imm4) {
            assert_eq!(decoded.n as u16, N, "{:?}", tokens);
        }
        if descriptor.slots.contains(&Slot::Imm8) {
            assert_eq!(decoded.nn as u16, NN, "{:?}", tokens);
        }
        if descriptor.slots.contains(&Slot::Imm12) {
            assert_eq!(decoded.nnn, NNN, "{:?}", tokens);
        }
    }
}

#[test]
fn test_every_operation_has_a_form() {
    use strum::IntoEnumIterator;

    for operation in Operation::iter().filter(|operation| *operation != Operation::Invalid) {
        assert!(
            DESCRIPTORS.iter().any(|d| d.operation == operation),
            "{:?}",
            operation
        );
    }
}

#[test]
fn test_every_valid_word_reassembles() {
    for word in 0..=u16::MAX {
        let disassembly = disassemble_code(&word.to_be_bytes(), 0x200);
        let line = &disassembly.lines[0];
        if line.decoded.operation == Operation::Invalid {
            continue;
        }

        let mut symbols = SymbolTable::new();
        for (address, label) in &disassembly.labels {
            symbols.define(label, *address).unwrap();
        }
        let encoded = match encode_line(&line.text, &mut symbols) {
            Ok(encoded) => encoded,
            Err(err) => panic!("{:04X} '{}': {}", word, line.text, err),
        };
        assert_eq!(encoded.len(), 1);

        // Bits the operation ignores may differ, the instruction may not.
        let redecoded = disassemble_code(&encoded[0].to_be_bytes(), 0x200);
        assert_eq!(redecoded.lines[0].decoded.operation, line.decoded.operation, "{:04X}", word);
        assert_eq!(redecoded.lines[0].text, line.text, "{:04X}", word);
    }
}

#[test]
fn test_disassembly_reassembles_to_same_bytes() {
    let source = "
.code
start:  CLS
        LD VA, 05h
        LD IX, 0F00h
        CALL sub
        JMP V0, 210h
        JMP start
sub:    DRAW VA, VB, 5
        SKEQ KEY, V3
        RET
.org 214h
        QUIT
";
    let assembly = Assembler::new().assemble_str(source);
    assert_eq!(assembly.diagnostics, vec![]);
    let mut memory = vec![0; MEMORY_SIZE];
    let end = assembly.store(&mut memory).end;
    let image = &memory[0x200..end];
    assert_eq!(image.len(), 0x16);

    let disassembled = disassemble_code(image, 0x200).source();

    let again = Assembler::new().assemble_str(&disassembled);
    assert_eq!(again.diagnostics, vec![], "{}", disassembled);
    let mut memory_again = vec![0; MEMORY_SIZE];
    let end_again = again.store(&mut memory_again).end;

    assert_eq!(end_again, end);
    assert_eq!(&memory_again[0x200..end_again], image);
}
