use std::fmt::Debug;

use thiserror::Error;

use super::{
    source::{statements, strip_comment, tokenize},
    symbols::SymbolTable,
    term::{evaluate, Term},
};
use crate::isa::{descriptor::is_mnemonic, Descriptor, Fixed, Slot, DESCRIPTORS};

/// Maximum number of operands any instruction form takes.
const MAX_OPERANDS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Empty statement")]
    Empty,
    #[error("Unknown mnemonic: {0}")]
    UnknownMnemonic(String),
    #[error("Unresolved label: {0}")]
    UnresolvedLabel(String),
    #[error("No instruction form matches the operands")]
    NoMatchingForm,
}

/// Encode one statement, mnemonic first, into an instruction word.
///
/// Operands beyond the third are not evaluated, and operands beyond what the matching form
/// needs are ignored.
#[tracing::instrument(level = "debug", skip(symbols))]
pub fn encode<S: AsRef<str> + Debug>(
    tokens: &[S],
    symbols: &mut SymbolTable,
) -> Result<u16, EncodeError> {
    let (mnemonic, operands) = tokens.split_first().ok_or(EncodeError::Empty)?;
    let mnemonic = mnemonic.as_ref();
    if !is_mnemonic(mnemonic) {
        return Err(EncodeError::UnknownMnemonic(mnemonic.to_ascii_uppercase()));
    }

    let operands: Vec<&str> = operands
        .iter()
        .take(MAX_OPERANDS)
        .map(|operand| operand.as_ref())
        .collect();
    let terms: Vec<Term> = operands
        .iter()
        .map(|operand| evaluate(operand, symbols))
        .collect();

    select(DESCRIPTORS, mnemonic, &operands, &terms)
}

/// Encode a line of source holding any number of `:` separated statements.
pub fn encode_line(line: &str, symbols: &mut SymbolTable) -> Result<Vec<u16>, EncodeError> {
    let tokens = tokenize(strip_comment(line));
    statements(&tokens)
        .map(|statement| encode(statement, symbols))
        .collect()
}

/// Find the first form in `table` accepting the operands and fold them into its opcode.
///
/// `operands` holds the operand tokens, `terms` their evaluated values.
fn select(
    table: &[Descriptor],
    mnemonic: &str,
    operands: &[&str],
    terms: &[Term],
) -> Result<u16, EncodeError> {
    let mut unresolved = None;

    for descriptor in table
        .iter()
        .filter(|descriptor| descriptor.mnemonic.eq_ignore_ascii_case(mnemonic))
        .filter(|descriptor| terms.len() >= descriptor.operands)
    {
        match fold(descriptor, operands, terms) {
            Fold::Word(word) => {
                tracing::trace!("{:?} -> {:04X}", descriptor.operation, word);
                return Ok(word);
            }
            Fold::Unresolved(name) => {
                unresolved.get_or_insert(name);
            }
            Fold::Mismatch => (),
        }
    }

    match unresolved {
        Some(name) => Err(EncodeError::UnresolvedLabel(name)),
        None => Err(EncodeError::NoMatchingForm),
    }
}

enum Fold {
    Word(u16),
    /// The form would match if the named label had an address
    Unresolved(String),
    Mismatch,
}

fn fold(descriptor: &Descriptor, operands: &[&str], terms: &[Term]) -> Fold {
    let mut word = descriptor.opcode;
    let mut unresolved = None;

    for (ix, term) in terms.iter().enumerate().take(descriptor.operands) {
        if ix == 0 {
            if let Some(fixed) = descriptor.fixed {
                let matches = match (fixed, term) {
                    (Fixed::Word(word), _) => operands
                        .first()
                        .map_or(false, |operand| word.eq_ignore_ascii_case(operand)),
                    (Fixed::Keyword(keyword), Term::Keyword(actual)) => keyword == *actual,
                    (Fixed::Register(register), Term::Register(actual)) => register == *actual,
                    _ => false,
                };
                if !matches {
                    return Fold::Mismatch;
                }
                continue;
            }
        }

        match (descriptor.slots[ix], term) {
            (Slot::RegisterHigh, Term::Register(register)) => word |= (*register as u16) << 8,
            (Slot::RegisterMid, Term::Register(register)) => word |= (*register as u16) << 4,
            (Slot::Imm4, Term::Numeric(value)) => word |= value & 0xF,
            (Slot::Imm8, Term::Numeric(value)) => word |= value & 0xFF,
            (Slot::Imm12, Term::Numeric(value)) => word |= value & 0xFFF,
            (Slot::Imm4 | Slot::Imm8 | Slot::Imm12, Term::LabelRef(name)) => {
                unresolved.get_or_insert_with(|| name.clone());
            }
            _ => return Fold::Mismatch,
        }
    }

    match unresolved {
        Some(name) => Fold::Unresolved(name),
        None => Fold::Word(word),
    }
}
