//! The control/status register bank.
//!
//! This is a deliberately small slice of the full privileged CSR space: just enough indexed
//! 32-bit storage for `CSRRW`/`CSRRS`/`CSRRC` and their immediate forms to operate on. Privilege
//! levels, read-only shadow CSRs, and the performance-counter CSRs are out of scope here; see
//! [`crate::stats`] for the non-architectural instruction/cycle counters this crate tracks
//! instead.

use std::collections::HashMap;

use crate::config::CsrAccessMode;
use crate::error::{ExecutionResult, Fault};

/// A sparse bank of 32-bit control/status registers, addressed by a 12-bit index.
#[derive(Debug, Clone, Default)]
pub struct CsrFile {
    registers: HashMap<u16, u32>,
}

impl CsrFile {
    /// Returns an empty CSR bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-declares `index` with `value`, so it reads as valid under
    /// [`CsrAccessMode::Strict`] without first being written.
    pub fn seed(&mut self, index: u16, value: u32) {
        self.registers.insert(index, value);
    }

    /// Reads `index` according to `mode`.
    ///
    /// Under [`CsrAccessMode::Lenient`], an unmapped index reads as `0`. Under
    /// [`CsrAccessMode::Strict`], an unmapped index is [`Fault::InvalidCsr`].
    pub fn read(&self, index: u16, mode: CsrAccessMode) -> ExecutionResult<u32> {
        match self.registers.get(&index) {
            Some(&value) => Ok(value),
            None => match mode {
                CsrAccessMode::Lenient => Ok(0),
                CsrAccessMode::Strict => Err(Fault::InvalidCsr(index)),
            },
        }
    }

    /// Writes `value` to `index` according to `mode`.
    ///
    /// Under [`CsrAccessMode::Lenient`], the entry is created if it did not already exist. Under
    /// [`CsrAccessMode::Strict`], writing an index that has never been read or seeded is
    /// [`Fault::InvalidCsr`].
    pub fn write(&mut self, index: u16, value: u32, mode: CsrAccessMode) -> ExecutionResult<()> {
        if mode == CsrAccessMode::Strict && !self.registers.contains_key(&index) {
            return Err(Fault::InvalidCsr(index));
        }
        self.registers.insert(index, value);
        Ok(())
    }
}
