use std::str::FromStr;

use strum_macros::EnumString;

use super::{
    source::{report, Diagnostic, DiagnosticKind, SourcePosition},
    symbols::SymbolTable,
    term::{evaluate, Term},
};

/// Keywords that may start the body of a data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DataKeyword {
    /// `DB list` one byte per operand
    #[strum(serialize = "DB", serialize = "BYTES")]
    Bytes,
    /// `DW list` two bytes per operand, high byte first
    #[strum(serialize = "DW", serialize = "WORDS")]
    Words,
    /// `TIMES n DB|DW list`
    #[strum(serialize = "TIMES")]
    Times,
    /// `RESB n`
    #[strum(serialize = "RESB")]
    ReserveBytes,
    /// `RESW n`
    #[strum(serialize = "RESW")]
    ReserveWords,
    /// `name EQU value`
    #[strum(serialize = "EQU")]
    Equ,
}

impl DataKeyword {
    fn parse(token: &str) -> Option<Self> {
        Self::from_str(token).ok()
    }
}

/// One line of the data segment after layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine {
    pub address: usize,
    /// `EQU` lines occupy no memory
    pub constant: bool,
    pub bytes: Vec<u8>,
    pub text: String,
    pub position: SourcePosition,
    /// Tokens from the data keyword on, kept for reconciliation
    body: Vec<String>,
    /// Some operands were unresolved labels when the line was laid out
    pending: bool,
}

/// Bytes produced by a data statement.
#[derive(Debug, Default, PartialEq, Eq)]
struct Layout {
    bytes: Vec<u8>,
    /// First operand that is still an unresolved label
    unresolved: Option<String>,
}

impl DataLine {
    /// Lay out one data line at `cursor`, defining its label and advancing the cursor past
    /// its bytes.
    #[tracing::instrument(level = "debug", skip(symbols, diagnostics))]
    pub(crate) fn assemble(
        tokens: &[String],
        position: SourcePosition,
        cursor: &mut usize,
        symbols: &mut SymbolTable,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> DataLine {
        if *cursor % 2 == 1 {
            *cursor += 1;
        }
        let address = *cursor;

        let (label, body) = match tokens.split_first() {
            Some((first, rest)) if DataKeyword::parse(first).is_none() => {
                (Some(first.trim_end_matches(':').to_ascii_uppercase()), rest)
            }
            _ => (None, tokens),
        };

        let mut line = DataLine {
            address,
            constant: false,
            bytes: Vec::new(),
            text: tokens.join(" "),
            position,
            body: body.to_vec(),
            pending: false,
        };

        let keyword = body.first().and_then(|token| DataKeyword::parse(token));
        if keyword == Some(DataKeyword::Equ) {
            line.constant = true;
            line.equ(label, symbols, diagnostics);
            return line;
        }

        if let Some(label) = &label {
            match u16::try_from(address) {
                Ok(address) => {
                    if let Err(err) = symbols.define(label, address) {
                        report(diagnostics, &line.position, err.into());
                    }
                }
                Err(_) => report(
                    diagnostics,
                    &line.position,
                    DiagnosticKind::OutOfRange(address),
                ),
            }
        }

        let Some(first) = body.first() else {
            // A label on its own marks the next line's address
            return line;
        };
        if keyword.is_none() {
            report(
                diagnostics,
                &line.position,
                DiagnosticKind::UnknownDataKeyword(first.to_string()),
            );
            return line;
        }

        match layout(body, symbols) {
            Ok(layout) => {
                if layout.bytes.is_empty() {
                    report(
                        diagnostics,
                        &line.position,
                        DiagnosticKind::EmptyData(line.text.clone()),
                    );
                }
                line.pending = layout.unresolved.is_some();
                line.bytes = layout.bytes;
            }
            Err(kind) => report(diagnostics, &line.position, kind),
        }

        *cursor += line.bytes.len();
        line
    }

    fn equ(
        &mut self,
        label: Option<String>,
        symbols: &mut SymbolTable,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(label) = label else {
            report(
                diagnostics,
                &self.position,
                DiagnosticKind::MissingOperand("EQU".to_string()),
            );
            return;
        };
        let Some(operand) = self.body.get(1) else {
            report(
                diagnostics,
                &self.position,
                DiagnosticKind::MissingOperand("EQU".to_string()),
            );
            return;
        };

        match evaluate(operand, symbols) {
            Term::Numeric(value) => {
                self.text = format!("{} EQU {:04X}", label, value);
                if let Err(err) = symbols.define_constant(&label, value) {
                    report(diagnostics, &self.position, err.into());
                }
            }
            Term::LabelRef(name) => {
                self.text = format!("{} EQU ????", label);
                report(diagnostics, &self.position, DiagnosticKind::UnresolvedData(name));
            }
            _ => report(
                diagnostics,
                &self.position,
                DiagnosticKind::InvalidOperand {
                    directive: "EQU".to_string(),
                    operand: operand.to_string(),
                },
            ),
        }
    }

    /// Re-evaluate a line whose operands referred to labels defined after it.
    pub(crate) fn reconcile(
        &mut self,
        symbols: &mut SymbolTable,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if !self.pending {
            return;
        }
        match layout(&self.body, symbols) {
            Ok(Layout {
                bytes,
                unresolved: None,
            }) if bytes.len() == self.bytes.len() => {
                self.bytes = bytes;
                self.pending = false;
            }
            Ok(Layout {
                unresolved: Some(name),
                ..
            }) => report(diagnostics, &self.position, DiagnosticKind::UnresolvedData(name)),
            Ok(_) => report(
                diagnostics,
                &self.position,
                DiagnosticKind::UnresolvedData(self.text.clone()),
            ),
            Err(kind) => report(diagnostics, &self.position, kind),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Produce the bytes of a data statement starting at its keyword.
fn layout(body: &[String], symbols: &mut SymbolTable) -> Result<Layout, DiagnosticKind> {
    let Some((keyword, operands)) = body.split_first() else {
        return Ok(Layout::default());
    };
    let Some(parsed) = DataKeyword::parse(keyword) else {
        return Err(DiagnosticKind::UnknownDataKeyword(keyword.to_string()));
    };

    match parsed {
        DataKeyword::Bytes => values(keyword, operands, 1, symbols),
        DataKeyword::Words => values(keyword, operands, 2, symbols),
        DataKeyword::ReserveBytes => {
            let count = count(keyword, operands.first(), symbols)?;
            Ok(Layout {
                bytes: vec![0; count],
                unresolved: None,
            })
        }
        DataKeyword::ReserveWords => {
            let count = count(keyword, operands.first(), symbols)?;
            Ok(Layout {
                bytes: vec![0; count * 2],
                unresolved: None,
            })
        }
        DataKeyword::Times => {
            let times = count(keyword, operands.first(), symbols)?;
            let Some(inner) = operands.get(1) else {
                return Err(DiagnosticKind::MissingOperand(keyword.to_string()));
            };
            let once = match DataKeyword::parse(inner) {
                Some(DataKeyword::Bytes) => values(inner, &operands[2..], 1, symbols)?,
                Some(DataKeyword::Words) => values(inner, &operands[2..], 2, symbols)?,
                _ => return Err(DiagnosticKind::UnknownDataKeyword(inner.to_string())),
            };
            Ok(Layout {
                bytes: once.bytes.repeat(times),
                unresolved: once.unresolved,
            })
        }
        DataKeyword::Equ => Err(DiagnosticKind::MissingOperand(keyword.to_string())),
    }
}

/// Evaluate a list of byte or word values. Unresolved labels leave zero placeholders.
fn values(
    keyword: &str,
    operands: &[String],
    width: usize,
    symbols: &mut SymbolTable,
) -> Result<Layout, DiagnosticKind> {
    let mut layout = Layout::default();
    for operand in operands {
        let value = match evaluate(operand, symbols) {
            Term::Numeric(value) => value,
            Term::LabelRef(name) => {
                layout.unresolved.get_or_insert(name);
                0
            }
            _ => {
                return Err(DiagnosticKind::InvalidOperand {
                    directive: keyword.to_ascii_uppercase(),
                    operand: operand.to_string(),
                })
            }
        };
        if width == 2 {
            layout.bytes.extend_from_slice(&value.to_be_bytes());
        } else {
            layout.bytes.push((value & 0xFF) as u8);
        }
    }
    Ok(layout)
}

/// Repeat counts have to be known when the line is laid out.
fn count(
    keyword: &str,
    operand: Option<&String>,
    symbols: &mut SymbolTable,
) -> Result<usize, DiagnosticKind> {
    let Some(operand) = operand else {
        return Err(DiagnosticKind::MissingOperand(keyword.to_ascii_uppercase()));
    };
    match evaluate(operand, symbols) {
        Term::Numeric(value) => Ok(value as usize),
        Term::LabelRef(name) => Err(DiagnosticKind::UnresolvedData(name)),
        _ => Err(DiagnosticKind::InvalidOperand {
            directive: keyword.to_ascii_uppercase(),
            operand: operand.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assembler::source::tokenize;

    use pretty_assertions::assert_eq;

    fn position() -> SourcePosition {
        SourcePosition::new(Arc::from("test.asm"), 1)
    }

    fn assemble(
        line: &str,
        cursor: &mut usize,
        symbols: &mut SymbolTable,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> DataLine {
        DataLine::assemble(&tokenize(line), position(), cursor, symbols, diagnostics)
    }

    #[test]
    fn test_data_keywords() {
        let tests = vec![
            ("db 1, 2, 'A'", vec![0x01, 0x02, 0x41]),
            ("BYTES 1FFh", vec![0xFF]),
            ("dw 1234h, 5", vec![0x12, 0x34, 0x00, 0x05]),
            ("WORDS 0FFh", vec![0x00, 0xFF]),
            ("times 3 dw 002Ah", vec![0x00, 0x2A, 0x00, 0x2A, 0x00, 0x2A]),
            ("times 2 db 1, 2", vec![1, 2, 1, 2]),
            ("resb 3", vec![0, 0, 0]),
            ("resw 2", vec![0, 0, 0, 0]),
            ("msg: db 'h', 'i'", vec![0x68, 0x69]),
        ];
        for (input, expected) in tests {
            let mut symbols = SymbolTable::new();
            let mut diagnostics = Vec::new();
            let mut cursor = 0x300;
            let line = assemble(input, &mut cursor, &mut symbols, &mut diagnostics);
            assert_eq!(line.bytes, expected, "{}", input);
            assert_eq!(cursor, 0x300 + expected.len(), "{}", input);
            assert_eq!(diagnostics, vec![], "{}", input);
        }
    }

    #[test]
    fn test_reserve_defines_label() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = Vec::new();
        let mut cursor = 0x300;
        let line = assemble("buf resb 4", &mut cursor, &mut symbols, &mut diagnostics);
        assert_eq!(line.bytes, vec![0, 0, 0, 0]);
        assert_eq!(cursor, 0x304);
        assert_eq!(symbols.reference("BUF"), Some(0x300));
        assert_eq!(line.text, "buf resb 4");
    }

    #[test]
    fn test_equ() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = Vec::new();
        let mut cursor = 0x302;
        let line = assemble("len equ 0010h", &mut cursor, &mut symbols, &mut diagnostics);
        assert!(line.constant);
        assert!(line.bytes.is_empty());
        assert_eq!(line.text, "LEN EQU 0010");
        assert_eq!(cursor, 0x302);
        assert_eq!(symbols.reference("len"), Some(0x10));
        assert!(symbols.find("LEN").unwrap().constant);
        assert_eq!(diagnostics, vec![]);
    }

    #[test]
    fn test_alignment() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = Vec::new();
        let mut cursor = 0x301;
        let line = assemble("x db 1", &mut cursor, &mut symbols, &mut diagnostics);
        assert_eq!(line.address, 0x302);
        assert_eq!(cursor, 0x303);
        assert_eq!(symbols.reference("x"), Some(0x302));
    }

    #[test]
    fn test_forward_reference_is_reconciled() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = Vec::new();
        let mut cursor = 0x300;
        let mut line = assemble("ptr dw later", &mut cursor, &mut symbols, &mut diagnostics);
        assert_eq!(line.bytes, vec![0, 0]);
        assert!(line.is_pending());
        assert_eq!(cursor, 0x302);

        symbols.define("later", 0x2AB).unwrap();
        line.reconcile(&mut symbols, &mut diagnostics);
        assert_eq!(line.bytes, vec![0x02, 0xAB]);
        assert!(!line.is_pending());
        assert_eq!(diagnostics, vec![]);
    }

    #[test]
    fn test_still_unresolved_is_reported() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = Vec::new();
        let mut cursor = 0x300;
        let mut line = assemble("db nowhere", &mut cursor, &mut symbols, &mut diagnostics);
        line.reconcile(&mut symbols, &mut diagnostics);
        assert_eq!(
            diagnostics,
            vec![Diagnostic {
                position: position(),
                kind: DiagnosticKind::UnresolvedData("NOWHERE".to_string()),
            }]
        );
    }

    #[test]
    fn test_invalid_lines() {
        let tests = vec![
            ("x foo 3", DiagnosticKind::UnknownDataKeyword("foo".to_string())),
            ("db", DiagnosticKind::EmptyData("db".to_string())),
            ("resb", DiagnosticKind::MissingOperand("RESB".to_string())),
            ("resb later", DiagnosticKind::UnresolvedData("LATER".to_string())),
            ("times 2 dd 1", DiagnosticKind::UnknownDataKeyword("dd".to_string())),
            (
                "db V1",
                DiagnosticKind::InvalidOperand {
                    directive: "DB".to_string(),
                    operand: "V1".to_string(),
                },
            ),
            ("equ 5", DiagnosticKind::MissingOperand("EQU".to_string())),
        ];
        for (input, expected) in tests {
            let mut symbols = SymbolTable::new();
            let mut diagnostics = Vec::new();
            let mut cursor = 0x300;
            assemble(input, &mut cursor, &mut symbols, &mut diagnostics);
            assert_eq!(
                diagnostics.into_iter().map(|d| d.kind).collect::<Vec<_>>(),
                vec![expected],
                "{}",
                input
            );
            assert_eq!(cursor, 0x300, "{}", input);
        }
    }

    #[test]
    fn test_duplicate_label() {
        let mut symbols = SymbolTable::new();
        let mut diagnostics = Vec::new();
        let mut cursor = 0x300;
        assemble("x db 1", &mut cursor, &mut symbols, &mut diagnostics);
        assemble("x db 2", &mut cursor, &mut symbols, &mut diagnostics);
        assert_eq!(symbols.reference("x"), Some(0x300));
        assert_eq!(diagnostics.len(), 1);
    }
}
