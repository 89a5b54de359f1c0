use std::collections::HashSet;

use super::{data::DataLine, symbols::SymbolTable, CodeLine};

/// Generate the listing of an assembled program.
///
/// Code lines come first, then data lines, each preceded by the labels sitting at its
/// address. Words and bytes that never resolved are shown as `?`:
///
/// ```text
/// START:
/// 0200: 6A05    LD VA 05h
/// 0202: ????    JMP nowhere
/// 0204: 00 2A 00 2A
///               times 2 dw 002Ah
/// LEN EQU 0010
/// ```
#[tracing::instrument(skip_all)]
pub fn generate(code: &[CodeLine], data: &[DataLine], symbols: &SymbolTable) -> String {
    let mut str = String::new();
    let mut labelled = HashSet::new();

    let mut labels = |str: &mut String, address: usize| {
        let Ok(address) = u16::try_from(address) else {
            return;
        };
        if !labelled.insert(address) {
            return;
        }
        for label in symbols.labels_at(address) {
            str.push_str(format!("{}:\n", label.name).as_str());
        }
    };

    for line in code {
        labels(&mut str, line.address);
        str.push_str(format!("{:04X}: ", line.address).as_str());
        match line.word {
            Some(word) => str.push_str(format!("{:04X}    ", word).as_str()),
            None => str.push_str("????    "),
        }
        str.push_str(format!("{}\n", line.text()).as_str());
    }

    for line in data {
        if line.constant {
            str.push_str(format!("{}\n", line.text).as_str());
            continue;
        }
        labels(&mut str, line.address);
        str.push_str(format!("{:04X}:", line.address).as_str());
        for byte in &line.bytes {
            if line.is_pending() {
                str.push_str(" ??");
            } else {
                str.push_str(format!(" {:02X}", byte).as_str());
            }
        }
        str.push_str(format!("\n              {}\n", line.text).as_str());
    }

    str
}

#[cfg(test)]
mod tests {
    use crate::assembler::Assembler;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_listing() {
        let source = "
.code
start:
    LD VA, 05h      ; load
    JMP nowhere
loop: CLS : JMP loop
.data
len equ 0010h
table: times 2 dw 002Ah
";
        let assembly = Assembler::new().assemble_str(source);
        let expected = "START:
0200: 6A05    LD VA 05h
0202: ????    JMP nowhere
LOOP:
0204: 00E0    CLS
0206: 1204    JMP loop
LEN EQU 0010
TABLE:
0208: 00 2A 00 2A
              table: times 2 dw 002Ah
";
        assert_eq!(assembly.listing(), expected);
    }

    #[test]
    fn test_unresolved_data_is_marked() {
        let source = "
.data
ptr dw nowhere
zero dw 0
";
        let assembly = Assembler::new().assemble_str(source);
        let expected = "PTR:
0200: ?? ??
              ptr dw nowhere
ZERO:
0202: 00 00
              zero dw 0
";
        assert_eq!(assembly.listing(), expected);
    }
}
