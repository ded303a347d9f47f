//! Execution engine for the 32-bit base integer instruction set (RV32I).
//!
//! This crate implements the part of an instruction-set simulator that updates architectural
//! state given an already-decoded instruction: the general purpose register file, the program
//! counter, a small control/status register bank, and data-memory transactions through an
//! abstract bus. Binary loading, instruction fetch/decode, and top-level simulation scheduling
//! are the responsibility of a host simulator built on top of this crate.

#[macro_use]
extern crate static_assertions;

pub mod bus;
pub mod config;
pub mod csr;
pub mod error;
pub mod executor;
pub mod instruction;
pub mod registers;
pub mod stats;

pub use bus::{Bus, BusFault, FlatMemory, Width};
pub use config::{AlignmentPolicy, CsrAccessMode, ExecutorConfig};
pub use csr::CsrFile;
pub use error::{ExecutionResult, Fault, TerminationStatus};
pub use executor::{Executor, Outcome};
pub use instruction::{Instruction, Opcode};
pub use registers::{Registers, Specifier};
pub use stats::ExecutionStats;
