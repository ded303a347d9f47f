//! Dispatches a single decoded instruction to its semantic routine.

mod ops;

use crate::bus::Bus;
use crate::config::ExecutorConfig;
use crate::csr::CsrFile;
use crate::error::{Fault, TerminationStatus};
use crate::instruction::{Instruction, Opcode};
use crate::registers::Registers;
use crate::stats::ExecutionStats;

/// What happened as a result of one call to [`Executor::execute`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    /// The instruction retired normally; the caller may execute another.
    Continue,
    /// Simulation has ended. The caller must not call [`Executor::execute`] again.
    Halted(TerminationStatus),
}

/// Internal result of dispatching one instruction, before faults are folded into
/// [`TerminationStatus`].
enum Retirement {
    Continue,
    Halt(TerminationStatus),
}

/// Executes decoded instructions against caller-owned architectural state.
///
/// An `Executor` itself holds no architectural state — only the policy bundle resolving the
/// engine's open design questions (see [`ExecutorConfig`]). The register file, CSR bank, bus, and
/// statistics are all owned by the enclosing simulation and borrowed mutably for the duration of
/// one [`Executor::execute`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Creates an executor that resolves CSR access and alignment strictness per `config`.
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// The policy bundle this executor was constructed with.
    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Executes one decoded instruction.
    ///
    /// No instruction is partially retired: on [`Outcome::Halted`] with a fault, neither the
    /// program counter nor the destination register have been written for this instruction.
    pub fn execute<B: Bus>(
        &self,
        inst: &Instruction,
        registers: &mut Registers,
        csrs: &mut CsrFile,
        bus: &mut B,
        stats: &mut ExecutionStats,
    ) -> Outcome {
        stats.record_cycle();
        match self.dispatch(inst, registers, csrs, bus) {
            Ok(Retirement::Continue) => {
                stats.record_retired();
                Outcome::Continue
            }
            Ok(Retirement::Halt(status)) => {
                stats.record_retired();
                Outcome::Halted(status)
            }
            Err(fault) => Outcome::Halted(fault.into()),
        }
    }

    fn dispatch<B: Bus>(
        &self,
        inst: &Instruction,
        registers: &mut Registers,
        csrs: &mut CsrFile,
        bus: &mut B,
    ) -> Result<Retirement, Fault> {
        use Opcode::*;
        if inst.opcode() == Nop {
            ops::nop(registers);
            return Ok(Retirement::Halt(TerminationStatus::Ok));
        }
        match inst.opcode() {
            Lui => ops::lui(registers, inst),
            Auipc => ops::auipc(self.config, registers, inst),
            Jal => ops::jal(self.config, registers, inst),
            Jalr => ops::jalr(self.config, registers, inst),
            Beq | Bne | Blt | Bge | Bltu | Bgeu => ops::cond_branch(self.config, registers, inst),
            Lb | Lh | Lw | Lbu | Lhu => ops::load_op(self.config, registers, bus, inst),
            Sb | Sh | Sw => ops::store_op(self.config, registers, bus, inst),
            Addi | Slti | Sltiu | Xori | Ori | Andi | Slli | Srli | Srai => {
                ops::reg_imm_op(registers, inst)
            }
            Add | Sub | Sll | Slt | Sltu | Xor | Srl | Sra | Or | And => {
                ops::reg_reg_op(registers, inst)
            }
            Csrrw | Csrrs | Csrrc => ops::csr_op(self.config, registers, csrs, inst),
            Illegal => Err(Fault::IllegalInstruction),
            Nop => unreachable!("handled above"),
        }
        .map(|()| Retirement::Continue)
    }
}
