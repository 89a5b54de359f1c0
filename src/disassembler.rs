use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::Context;
use clap::Args;

use crate::{
    assembler::parse_address,
    decoder::{decode, Decoded},
    isa::Operation,
};

/// Text output of a disassembly, either as a listing or as source for the assembler.
pub mod listing;

/// One decoded instruction word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub address: usize,
    pub word: u16,
    pub decoded: Decoded,
    /// Source text in the syntax accepted by the assembler
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    pub base: usize,
    pub lines: Vec<Line>,
    /// Synthesized labels for every jump, call and index target
    pub labels: BTreeMap<u16, String>,
}

/// Decode a program loaded at `base`.
///
/// Every two bytes form one big-endian instruction word, a trailing odd byte is padded with a
/// zero low byte.
#[tracing::instrument(skip(input))]
pub fn disassemble_code(input: &[u8], base: u16) -> Disassembly {
    let mut labels = BTreeMap::new();
    let base = base as usize;

    let lines = input
        .chunks(2)
        .enumerate()
        .map(|(ix, bytes)| {
            let word = u16::from_be_bytes([bytes[0], bytes.get(1).copied().unwrap_or(0)]);
            let decoded = decode(word);
            if decoded.operation.references_address() {
                labels
                    .entry(decoded.nnn)
                    .or_insert_with(|| label_name(decoded.nnn));
            }
            Line {
                address: base + ix * 2,
                word,
                decoded,
                text: render(word, &decoded),
            }
        })
        .collect();

    Disassembly {
        base,
        lines,
        labels,
    }
}

/// Disassemble a program into a listing with synthesized labels.
pub fn disassemble(input: &[u8], base: u16) -> String {
    disassemble_code(input, base).listing()
}

/// Name of the label synthesized for an address.
pub fn label_name(address: u16) -> String {
    format!("L_{:04X}", address)
}

fn instruction(mnemonic: &str, operands: String) -> String {
    format!("{:<8}{}", mnemonic, operands)
}

/// Render a decoded word as assembler source.
fn render(word: u16, decoded: &Decoded) -> String {
    let Decoded { n, nn, nnn, x, y, .. } = *decoded;

    match decoded.operation {
        Operation::Invalid => instruction("???", format!("{:04X}h", word)),
        Operation::ScrollDown => instruction("SCRL", format!("DOWN, {:X}h", n)),
        Operation::ScrollRight => instruction("SCRL", "RIGHT".to_string()),
        Operation::ScrollLeft => instruction("SCRL", "LEFT".to_string()),
        Operation::Quit => "QUIT".to_string(),
        Operation::LowRes => instruction("MODE", "64x32".to_string()),
        Operation::HighRes => instruction("MODE", "128x64".to_string()),
        Operation::ClearScreen => "CLS".to_string(),
        Operation::Return => "RET".to_string(),
        Operation::Jump => instruction("JUMP", label_name(nnn)),
        Operation::Call => instruction("CALL", label_name(nnn)),
        Operation::SkipEqImm => instruction("SKEQ", format!("V{:X}, {:02X}h", x, nn)),
        Operation::SkipNeImm => instruction("SKNE", format!("V{:X}, {:02X}h", x, nn)),
        Operation::SkipEqReg => instruction("SKEQ", format!("V{:X}, V{:X}", x, y)),
        Operation::LoadImm => instruction("CP", format!("V{:X}, {:02X}h", x, nn)),
        Operation::AddImm => instruction("ADD", format!("V{:X}, {:02X}h", x, nn)),
        Operation::Copy => instruction("CP", format!("V{:X}, V{:X}", x, y)),
        Operation::Or => instruction("OR", format!("V{:X}, V{:X}", x, y)),
        Operation::And => instruction("AND", format!("V{:X}, V{:X}", x, y)),
        Operation::Xor => instruction("XOR", format!("V{:X}, V{:X}", x, y)),
        Operation::Add => instruction("ADD", format!("V{:X}, V{:X}", x, y)),
        Operation::Sub => instruction("SUB", format!("V{:X}, V{:X}", x, y)),
        Operation::ShiftRight => instruction("SHR", format!("V{:X}", x)),
        Operation::SubNeg => instruction("NSUB", format!("V{:X}, V{:X}", x, y)),
        Operation::ShiftLeft => instruction("SHL", format!("V{:X}", x)),
        Operation::SkipNeReg => instruction("SKNE", format!("V{:X}, V{:X}", x, y)),
        Operation::LoadIndex => instruction("CP", format!("IX, {}", label_name(nnn))),
        Operation::JumpV0 => instruction("JUMP", format!("V0, {:03X}h", nnn)),
        Operation::Random => instruction("RAND", format!("V{:X}, {:02X}h", x, nn)),
        Operation::Draw => instruction("DRAW", format!("V{:X}, V{:X}, {:X}h", x, y, n)),
        Operation::SkipKeyEq => instruction("SKEQ", format!("KEY, V{:X}", x)),
        Operation::SkipKeyNe => instruction("SKNE", format!("KEY, V{:X}", x)),
        Operation::GetTimer => instruction("GET", format!("TIMER, V{:X}", x)),
        Operation::WaitKey => instruction("WAIT", format!("KEY, V{:X}", x)),
        Operation::SetTimer => instruction("SET", format!("TIMER, V{:X}", x)),
        Operation::SetSound => instruction("SET", format!("SOUND, V{:X}", x)),
        Operation::AddIndex => instruction("ADD", format!("IX, V{:X}", x)),
        Operation::Font => instruction("FONT", format!("IX, V{:X}", x)),
        Operation::Bcd => instruction("BCD", format!("IX, V{:X}", x)),
        Operation::Store => instruction("STO", format!("IX, V{:X}", x)),
        Operation::Recall => instruction("RCL", format!("IX, V{:X}", x)),
        Operation::Save => instruction("SAVE", format!("V{:X}", x)),
        Operation::Load => instruction("LOAD", format!("V{:X}", x)),
    }
}

#[derive(Args, Debug)]
pub struct DisassemblyArgs {
    #[clap(help = "Binary image to disassemble")]
    pub image: PathBuf,
    #[clap(long, default_value = "0x200", value_parser = parse_address)]
    #[clap(help = "Address the image is loaded at")]
    pub base: u16,
    #[clap(short, long)]
    #[clap(help = "Output file [default: stdout]")]
    pub output: Option<PathBuf>,
    #[clap(long)]
    #[clap(help = "Write source that can be assembled again instead of a listing")]
    pub source: bool,
}

/// Disassemble a binary image into a listing or source.
pub fn run(args: &DisassemblyArgs) -> anyhow::Result<()> {
    let bytes = fs::read(&args.image).with_context(|| "Unable to read file")?;
    tracing::info!(
        "Disassembling {} at {:#06x}",
        args.image.display(),
        args.base
    );

    let disassembly = disassemble_code(&bytes, args.base);
    let text = if args.source {
        disassembly.source()
    } else {
        disassembly.listing()
    };

    match &args.output {
        Some(output) => {
            fs::write(output, text).with_context(|| "Unable to write file")?;
            eprintln!("Wrote {}", output.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_render() {
        let tests = vec![
            (0x00C5, "SCRL    DOWN, 5h"),
            (0x00FB, "SCRL    RIGHT"),
            (0x00FE, "MODE    64x32"),
            (0x00E0, "CLS"),
            (0x00EE, "RET"),
            (0x1206, "JUMP    L_0206"),
            (0x2300, "CALL    L_0300"),
            (0x3A05, "SKEQ    VA, 05h"),
            (0x6A05, "CP      VA, 05h"),
            (0x8126, "SHR     V1"),
            (0xA2F0, "CP      IX, L_02F0"),
            (0xB123, "JUMP    V0, 123h"),
            (0xD12B, "DRAW    V1, V2, Bh"),
            (0xE39E, "SKEQ    KEY, V3"),
            (0xF233, "BCD     IX, V2"),
            (0xF785, "LOAD    V7"),
            (0x0000, "???     0000h"),
            (0xF0FF, "???     F0FFh"),
        ];
        for (word, expected) in tests {
            assert_eq!(render(word, &decode(word)), expected, "{:04X}", word);
        }
    }

    #[test]
    fn test_disassemble_code() {
        let disassembly = disassemble_code(&[0x6A, 0x05, 0x12, 0x00, 0xA2, 0x00, 0xFF], 0x200);
        assert_eq!(disassembly.base, 0x200);
        assert_eq!(
            disassembly
                .lines
                .iter()
                .map(|line| (line.address, line.word))
                .collect::<Vec<_>>(),
            vec![(0x200, 0x6A05), (0x202, 0x1200), (0x204, 0xA200), (0x206, 0xFF00)]
        );
        assert_eq!(
            disassembly.labels,
            BTreeMap::from([(0x200, "L_0200".to_string())])
        );
    }

    #[test]
    fn test_labels_are_per_call() {
        let first = disassemble_code(&[0x13, 0x00], 0x200);
        let second = disassemble_code(&[0x00, 0xE0], 0x200);
        assert_eq!(first.labels.len(), 1);
        assert!(second.labels.is_empty());
    }
}
