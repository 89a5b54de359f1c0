/// Transforms CHIP-8 assembly source into a memory image.
///
/// The steps are:
/// 1. **Ingestion** - reading lines, running directives and routing lines into the code and
///    data segments
/// 2. **Code pass** - encoding each statement at its address as it is read
/// 3. **Data pass** - laying out data statements after the code
/// 4. **Reconciliation** - encoding what referred to labels defined later
/// 5. **Materialization** - writing code and data into memory
pub mod assembler;

/// Decodes instruction words into operations and operand fields.
pub mod decoder;

/// Turns a memory image back into assembler source with synthesized labels.
pub mod disassembler;

/// Hexdump utility
pub mod hexdump;

/// Logging and chrome tracing setup
pub mod instrumentation;

/// Instruction set: operations, operand keywords and the instruction form table.
pub mod isa;
