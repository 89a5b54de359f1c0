use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use clap::Args;

use self::{
    data::DataLine,
    encoder::{encode, EncodeError},
    source::{
        report, statements, strip_comment, tokenize, Diagnostic, DiagnosticKind, SourcePosition,
        COMMENT, DIRECTIVE,
    },
    symbols::SymbolTable,
    term::{evaluate, parse_number, Term},
};
use crate::hexdump::hexdump;

/// Data segment layout: `DB`, `DW`, `TIMES`, `RESB`, `RESW` and `EQU`.
pub mod data;

/// Encodes a single statement into an instruction word using the descriptor table.
///
/// ```text
/// LD VA, 05h  ->  6A05
/// ```
pub mod encoder;

/// Listing file generation.
pub mod listing;

/// Source positions, diagnostics and line tokenization.
pub mod source;

/// Labels and constants of a single assembly run.
pub mod symbols;

/// Evaluation of a single operand token.
pub mod term;

/// Address programs are loaded at by the interpreter.
pub const PROGRAM_START: u16 = 0x200;
/// Size of the address space.
pub const MEMORY_SIZE: usize = 0x10000;
/// How deep `.include` directives may nest.
pub const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AssemblerError {
    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Segment that source lines are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    None,
    Code,
    Data,
}

/// One instruction statement of the code segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLine {
    pub address: usize,
    /// `None` until every label the statement refers to is resolved
    pub word: Option<u16>,
    pub tokens: Vec<String>,
    pub position: SourcePosition,
}

impl CodeLine {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Two-pass assembler.
///
/// The steps are:
/// 1. **Ingestion** - reading lines, executing directives and routing lines to the code or
///    data segment. Code lines are encoded right away, leaving forward references open.
/// 2. **Data layout** - placing data lines after the code and defining their labels
/// 3. **Reconciliation** - encoding everything that referred to a label defined later
///
/// The result is an [`Assembly`] which can be stored to memory and listed.
#[derive(Debug)]
pub struct Assembler {
    mode: Mode,
    address: usize,
    depth: usize,
    symbols: SymbolTable,
    code: Vec<CodeLine>,
    data_source: Vec<(SourcePosition, Vec<String>)>,
    data: Vec<DataLine>,
    diagnostics: Vec<Diagnostic>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::with_origin(PROGRAM_START)
    }

    pub fn with_origin(origin: u16) -> Self {
        Self {
            mode: Mode::None,
            address: origin as usize,
            depth: 0,
            symbols: SymbolTable::new(),
            code: Vec::new(),
            data_source: Vec::new(),
            data: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Assemble a source file. Only failing to read the file itself is an error, every other
    /// problem ends up in [`Assembly::diagnostics`].
    #[tracing::instrument(skip(self))]
    pub fn assemble_file(mut self, path: &Path) -> Result<Assembly, AssemblerError> {
        let source = fs::read_to_string(path).map_err(|source| AssemblerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!("Assembling {}", path.display());
        let base = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        self.ingest(&source, Arc::from(path.display().to_string()), &base);
        Ok(self.finish())
    }

    /// Assemble source text. Includes are looked up relative to the working directory.
    #[tracing::instrument(skip_all)]
    pub fn assemble_str(mut self, source: &str) -> Assembly {
        self.ingest(source, Arc::from("<input>"), Path::new(""));
        self.finish()
    }

    fn finish(mut self) -> Assembly {
        self.layout_data();
        self.reconcile();
        Assembly {
            code: self.code,
            data: self.data,
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        }
    }

    fn ingest(&mut self, source: &str, file: Arc<str>, base: &Path) {
        for (ix, line) in source.lines().enumerate() {
            let position = SourcePosition::new(file.clone(), ix + 1);
            let line = line.trim();
            if line.is_empty() || line.starts_with(COMMENT) {
                continue;
            }
            if line.starts_with(DIRECTIVE) {
                self.directive(line, &position, base);
                continue;
            }
            match self.mode {
                Mode::Code => self.code_line(line, position),
                Mode::Data => {
                    let tokens = tokenize(strip_comment(line));
                    if !tokens.is_empty() {
                        self.data_source.push((position, tokens));
                    }
                }
                Mode::None => report(
                    &mut self.diagnostics,
                    &position,
                    DiagnosticKind::Unrouted(line.to_string()),
                ),
            }
        }
    }

    fn directive(&mut self, line: &str, position: &SourcePosition, base: &Path) {
        let line = strip_comment(line).trim();
        let (name, rest) = line
            .split_once(char::is_whitespace)
            .map(|(name, rest)| (name, rest.trim()))
            .unwrap_or((line, ""));
        let operands = tokenize(rest);

        match name.to_ascii_uppercase().as_str() {
            ".ORG" => {
                if let Some(address) = self.directive_value(".ORG", operands.first(), position) {
                    tracing::debug!("Origin {:#06x}", address);
                    self.address = address as usize;
                }
            }
            ".INCLUDE" => {
                let file = rest.trim_matches('"');
                if file.is_empty() {
                    self.missing_operand(".INCLUDE", position);
                } else {
                    self.include(&base.join(file), position);
                }
            }
            ".CODE" => self.mode = Mode::Code,
            ".DATA" => self.mode = Mode::Data,
            ".ECHO" => tracing::info!("{}", rest),
            ".LABEL" => {
                let Some(label) = operands.first() else {
                    self.missing_operand(".LABEL", position);
                    return;
                };
                if let Some(value) = self.directive_value(".LABEL", operands.get(1), position) {
                    if let Err(err) = self.symbols.define_constant(label, value) {
                        report(&mut self.diagnostics, position, err.into());
                    }
                }
            }
            ".DEF" | ".IMPORT" => report(
                &mut self.diagnostics,
                position,
                DiagnosticKind::UnsupportedDirective(name.to_string()),
            ),
            _ => report(
                &mut self.diagnostics,
                position,
                DiagnosticKind::UnknownDirective(name.to_string()),
            ),
        }
    }

    /// Evaluate the single value operand of a directive.
    fn directive_value(
        &mut self,
        directive: &str,
        operand: Option<&String>,
        position: &SourcePosition,
    ) -> Option<u16> {
        let Some(operand) = operand else {
            self.missing_operand(directive, position);
            return None;
        };
        match evaluate(operand, &mut self.symbols) {
            Term::Numeric(value) => Some(value),
            _ => {
                report(
                    &mut self.diagnostics,
                    position,
                    DiagnosticKind::InvalidOperand {
                        directive: directive.to_string(),
                        operand: operand.to_string(),
                    },
                );
                None
            }
        }
    }

    fn missing_operand(&mut self, directive: &str, position: &SourcePosition) {
        report(
            &mut self.diagnostics,
            position,
            DiagnosticKind::MissingOperand(directive.to_string()),
        );
    }

    fn include(&mut self, path: &Path, position: &SourcePosition) {
        if self.depth >= MAX_INCLUDE_DEPTH {
            report(
                &mut self.diagnostics,
                position,
                DiagnosticKind::IncludeTooDeep(MAX_INCLUDE_DEPTH),
            );
            return;
        }
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                report(
                    &mut self.diagnostics,
                    position,
                    DiagnosticKind::IncludeFailed {
                        path: path.display().to_string(),
                        reason: err.to_string(),
                    },
                );
                return;
            }
        };

        tracing::info!("Include file: {}", path.display());
        let base = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        self.depth += 1;
        self.ingest(&source, Arc::from(path.display().to_string()), &base);
        self.depth -= 1;
    }

    fn define_label(&mut self, name: &str, position: &SourcePosition) {
        let result = match u16::try_from(self.address) {
            Ok(address) => self.symbols.define(name, address).map_err(DiagnosticKind::from),
            Err(_) => Err(DiagnosticKind::OutOfRange(self.address)),
        };
        if let Err(kind) = result {
            report(&mut self.diagnostics, position, kind);
        }
    }

    fn code_line(&mut self, line: &str, position: SourcePosition) {
        if self.address % 2 == 1 {
            self.address += 1;
        }

        let mut tokens = tokenize(strip_comment(line));
        if let Some(label) = tokens
            .first()
            .and_then(|token| token.strip_suffix(':'))
            .filter(|label| !label.is_empty())
            .map(str::to_string)
        {
            self.define_label(&label, &position);
            tokens.remove(0);
        }

        for statement in statements(&tokens) {
            let word = match encode(statement, &mut self.symbols) {
                Ok(word) => Some(word),
                Err(EncodeError::UnresolvedLabel(_)) => None,
                Err(error) => {
                    report(
                        &mut self.diagnostics,
                        &position,
                        DiagnosticKind::Encode {
                            statement: statement.join(" "),
                            error,
                        },
                    );
                    None
                }
            };
            self.code.push(CodeLine {
                address: self.address,
                word,
                tokens: statement.to_vec(),
                position: position.clone(),
            });
            self.address += 2;
        }
    }

    #[tracing::instrument(skip(self))]
    fn layout_data(&mut self) {
        for (position, tokens) in std::mem::take(&mut self.data_source) {
            let line = DataLine::assemble(
                &tokens,
                position,
                &mut self.address,
                &mut self.symbols,
                &mut self.diagnostics,
            );
            self.data.push(line);
        }
    }

    #[tracing::instrument(skip(self))]
    fn reconcile(&mut self) {
        for line in self.code.iter_mut().filter(|line| line.word.is_none()) {
            match encode(&line.tokens, &mut self.symbols) {
                Ok(word) => line.word = Some(word),
                Err(error @ EncodeError::UnresolvedLabel(_)) => report(
                    &mut self.diagnostics,
                    &line.position,
                    DiagnosticKind::Encode {
                        statement: line.text(),
                        error,
                    },
                ),
                // Reported when the line was first encoded
                Err(_) => (),
            }
        }
        for line in &mut self.data {
            line.reconcile(&mut self.symbols, &mut self.diagnostics);
        }
        for label in self.symbols.unresolved() {
            tracing::debug!("Label never defined: {}", label.name);
        }
    }
}

/// Result of an assembly run.
#[derive(Debug)]
pub struct Assembly {
    pub code: Vec<CodeLine>,
    pub data: Vec<DataLine>,
    pub symbols: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of [`Assembly::store`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Stored {
    /// Highest address written + 1
    pub end: usize,
    /// Lines that did not fit in memory
    pub skipped: Vec<Diagnostic>,
}

impl Assembly {
    /// Write the program into `memory`.
    ///
    /// Code words that never resolved are written as `0000`. Lines that do not fit in
    /// `memory` are skipped and returned as diagnostics, the assembly itself is left as is.
    #[tracing::instrument(skip_all)]
    pub fn store(&self, memory: &mut [u8]) -> Stored {
        let mut stored = Stored::default();

        let code = self
            .code
            .iter()
            .map(|line| (line, line.word.unwrap_or(0).to_be_bytes()));
        for (line, bytes) in code {
            let range = line.address..line.address + bytes.len();
            store_line(memory, &line.position, range, &bytes, &mut stored);
        }

        for line in self.data.iter().filter(|line| !line.constant && !line.bytes.is_empty()) {
            let range = line.address..line.address + line.bytes.len();
            store_line(memory, &line.position, range, &line.bytes, &mut stored);
        }

        stored
    }

    /// Report every line placed below `start`, which an image beginning at `start` leaves
    /// out.
    pub fn below(&self, start: usize) -> Vec<Diagnostic> {
        let code = self.code.iter().map(|line| (&line.position, line.address));
        let data = self
            .data
            .iter()
            .filter(|line| !line.constant && !line.bytes.is_empty())
            .map(|line| (&line.position, line.address));

        let mut diagnostics = Vec::new();
        for (position, address) in code.chain(data).filter(|(_, address)| *address < start) {
            report(
                &mut diagnostics,
                position,
                DiagnosticKind::BelowStart { address, start },
            );
        }
        diagnostics
    }

    pub fn listing(&self) -> String {
        listing::generate(&self.code, &self.data, &self.symbols)
    }
}

fn store_line(
    memory: &mut [u8],
    position: &SourcePosition,
    range: Range<usize>,
    bytes: &[u8],
    stored: &mut Stored,
) {
    match memory.get_mut(range.clone()) {
        Some(target) => {
            target.copy_from_slice(bytes);
            stored.end = stored.end.max(range.end);
        }
        None => report(
            &mut stored.skipped,
            position,
            DiagnosticKind::OutOfRange(range.start),
        ),
    }
}

/// Parse an address given on the command line, e.g. `0x200`, `200h` or `512`.
pub fn parse_address(s: &str) -> Result<u16, String> {
    parse_number(s).ok_or_else(|| format!("Invalid address: {}", s))
}

#[derive(Args, Debug)]
pub struct AssemblyArgs {
    #[clap(help = "Assembly source file")]
    pub source: PathBuf,
    #[clap(short, long)]
    #[clap(help = "Output binary image [default: <source>.ch8]")]
    pub output: Option<PathBuf>,
    #[clap(long)]
    #[clap(help = "Listing file [default: <source>.lst]")]
    pub listing: Option<PathBuf>,
    #[clap(long, default_value = "0x200", value_parser = parse_address)]
    #[clap(help = "Origin of the program, the image starts here")]
    pub start: u16,
    #[clap(long)]
    #[clap(help = "Print a hexdump of the image")]
    pub hexdump: bool,
}

/// Assemble a source file into a binary image and a listing.
pub fn run(args: &AssemblyArgs) -> anyhow::Result<()> {
    let assembly = Assembler::with_origin(args.start)
        .assemble_file(&args.source)
        .with_context(|| "Assembly failed")?;

    let mut memory = vec![0; MEMORY_SIZE];
    let stored = assembly.store(&mut memory);
    let start = args.start as usize;
    let image = memory.get(start..stored.end).unwrap_or_default();
    let left_out = assembly.below(start);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.source.with_extension("ch8"));
    fs::write(&output, image).with_context(|| "Unable to write image")?;
    eprintln!("Wrote {}", output.display());

    let listing = args
        .listing
        .clone()
        .unwrap_or_else(|| args.source.with_extension("lst"));
    fs::write(&listing, assembly.listing()).with_context(|| "Unable to write listing")?;
    eprintln!("Wrote {}", listing.display());

    if args.hexdump {
        println!("{}", hexdump(image, args.start, 16));
    }

    let problems = assembly.diagnostics.len() + stored.skipped.len() + left_out.len();
    if problems > 0 {
        anyhow::bail!(
            "Assembled with {} problem(s), see the warnings above",
            problems
        );
    }
    Ok(())
}
