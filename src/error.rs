//! Fault conditions that can terminate execution of a single instruction.

use thiserror::Error;

/// Everything that can go wrong while executing one instruction.
///
/// All variants are fatal to the instruction in progress: no partial state is committed when a
/// [`Fault`] is produced. See [`crate::executor::Executor::execute`].
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Fault {
    /// The decoded opcode has no associated semantic routine.
    #[error("illegal instruction")]
    IllegalInstruction,

    /// The memory bus reported a transport failure for the given address.
    #[error("bus fault at address {0:#010x}")]
    BusFault(u32),

    /// An address was not naturally aligned to the access width, and
    /// [`crate::config::AlignmentPolicy::Strict`] is in effect.
    #[error("misaligned access at address {0:#010x}")]
    Misaligned(u32),

    /// A CSR index outside the declared set was accessed under
    /// [`crate::config::CsrAccessMode::Strict`].
    #[error("invalid CSR index {0:#05x}")]
    InvalidCsr(u16),
}

/// Terminal status reported when an [`crate::executor::Outcome::Halted`] is observed.
///
/// Mirrors [`Fault`] one-for-one, plus the ordinary end-of-program sentinel that carries no
/// fault at all.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TerminationStatus {
    /// The NOP sentinel was retired; the simulation ended normally.
    Ok,
    IllegalInstruction,
    BusFault(u32),
    Misaligned(u32),
    InvalidCsr(u16),
}

impl From<Fault> for TerminationStatus {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::IllegalInstruction => Self::IllegalInstruction,
            Fault::BusFault(addr) => Self::BusFault(addr),
            Fault::Misaligned(addr) => Self::Misaligned(addr),
            Fault::InvalidCsr(csr) => Self::InvalidCsr(csr),
        }
    }
}

/// Result alias used throughout the executor for fallible operations.
pub type ExecutionResult<T> = Result<T, Fault>;
