//! Caller-supplied policy choices that resolve the execution engine's open design questions.
//!
//! The source this engine is grounded on hardwires both of these choices; this crate exposes them
//! explicitly instead, so a host simulator decides rather than inheriting an implicit default.

/// How the executor reacts to an access to a CSR index it has no prior knowledge of.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum CsrAccessMode {
    /// Unmapped CSRs read as zero and are created lazily on first write. Matches the permissive
    /// behavior of the reference architecture, which never rejects a CSR index.
    #[default]
    Lenient,
    /// Only CSR indices that have already been written (or pre-seeded) are valid; any other
    /// access is a [`crate::error::Fault::InvalidCsr`].
    Strict,
}

/// How the executor reacts to a memory address or branch/jump target that is not naturally
/// aligned to the access width.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum AlignmentPolicy {
    /// Misaligned accesses are forwarded to the bus unchanged, exactly as the reference
    /// architecture does. Whether this later faults is up to the downstream memory.
    #[default]
    Permissive,
    /// Loads, stores, and control-flow targets are checked for natural alignment before any bus
    /// transaction is issued; a misaligned address raises [`crate::error::Fault::Misaligned`].
    Strict,
}

/// Policy bundle passed to [`crate::executor::Executor::new`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ExecutorConfig {
    pub csr_access: CsrAccessMode,
    pub alignment: AlignmentPolicy,
}

impl ExecutorConfig {
    /// Permissive CSR access, permissive alignment — matches the reference architecture exactly.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Strict CSR access and strict alignment checking.
    pub fn strict() -> Self {
        Self {
            csr_access: CsrAccessMode::Strict,
            alignment: AlignmentPolicy::Strict,
        }
    }
}
