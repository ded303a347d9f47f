//! Semantic routines for each opcode, grouped by the combinator that dispatches to them.
//!
//! Each routine is a short, pure-ish function over a mutable register file (and, for memory and
//! CSR forms, a bus or CSR bank). The default control-flow rule — every instruction except a
//! taken branch or jump advances `pc` by 4 — is implemented by each routine calling
//! [`Registers::inc_pc`] itself, rather than by a shared wrapper, so that jumps, branches, and
//! `AUIPC` can override it locally.

use log::trace;

use crate::bus::{Bus, Width};
use crate::config::{AlignmentPolicy, CsrAccessMode, ExecutorConfig};
use crate::csr::CsrFile;
use crate::error::Fault;
use crate::instruction::{Instruction, Opcode};
use crate::registers::{Registers, Specifier};

fn check_target_alignment(config: ExecutorConfig, target: u32) -> Result<(), Fault> {
    if config.alignment == AlignmentPolicy::Strict && !Width::Word.is_aligned(target) {
        return Err(Fault::Misaligned(target));
    }
    Ok(())
}

pub(super) fn lui(registers: &mut Registers, inst: &Instruction) -> Result<(), Fault> {
    trace!("lui rd={} imm_u={:#x}", inst.rd_specifier(), inst.imm_u_value());
    let value = (inst.imm_u_value() as u32).wrapping_shl(12);
    registers.set_x(inst.rd_specifier(), value);
    registers.inc_pc();
    Ok(())
}

/// Also updates `pc`, not just `rd`. This is a deliberate deviation from the canonical
/// instruction set, preserved from the reference this engine is grounded on.
pub(super) fn auipc(
    config: ExecutorConfig,
    registers: &mut Registers,
    inst: &Instruction,
) -> Result<(), Fault> {
    trace!("auipc rd={} imm_u={:#x}", inst.rd_specifier(), inst.imm_u_value());
    let value = registers
        .pc()
        .wrapping_add((inst.imm_u_value() as u32).wrapping_shl(12));
    check_target_alignment(config, value)?;
    registers.set_pc(value);
    registers.set_x(inst.rd_specifier(), value);
    Ok(())
}

pub(super) fn jal(
    config: ExecutorConfig,
    registers: &mut Registers,
    inst: &Instruction,
) -> Result<(), Fault> {
    trace!("jal rd={} imm_j={}", inst.rd_specifier(), inst.imm_j_value());
    let link = registers.pc().wrapping_add(4);
    let target = registers.pc().wrapping_add(inst.imm_j_value() as u32);
    check_target_alignment(config, target)?;
    registers.set_x(inst.rd_specifier(), link);
    registers.set_pc(target);
    Ok(())
}

pub(super) fn jalr(
    config: ExecutorConfig,
    registers: &mut Registers,
    inst: &Instruction,
) -> Result<(), Fault> {
    trace!(
        "jalr rd={} rs1={} imm_i={}",
        inst.rd_specifier(),
        inst.rs1_specifier(),
        inst.imm_i_value()
    );
    let link = registers.pc().wrapping_add(4);
    let base = registers.x(inst.rs1_specifier());
    let target = base.wrapping_add(inst.imm_i_value() as u32) & !1u32;
    check_target_alignment(config, target)?;
    registers.set_x(inst.rd_specifier(), link);
    registers.set_pc(target);
    Ok(())
}

pub(super) fn cond_branch(
    config: ExecutorConfig,
    registers: &mut Registers,
    inst: &Instruction,
) -> Result<(), Fault> {
    let rs1 = registers.x(inst.rs1_specifier());
    let rs2 = registers.x(inst.rs2_specifier());
    let taken = match inst.opcode() {
        Opcode::Beq => rs1 == rs2,
        Opcode::Bne => rs1 != rs2,
        Opcode::Blt => (rs1 as i32) < (rs2 as i32),
        Opcode::Bge => (rs1 as i32) >= (rs2 as i32),
        Opcode::Bltu => rs1 < rs2,
        Opcode::Bgeu => rs1 >= rs2,
        other => unreachable!("{other:?} is not a branch opcode"),
    };
    trace!(
        "branch {:?} rs1={} rs2={} taken={}",
        inst.opcode(),
        rs1,
        rs2,
        taken
    );
    if taken {
        let target = registers.pc().wrapping_add(inst.imm_b_value() as u32);
        check_target_alignment(config, target)?;
        registers.set_pc(target);
    } else {
        registers.inc_pc();
    }
    Ok(())
}

pub(super) fn reg_imm_op(registers: &mut Registers, inst: &Instruction) -> Result<(), Fault> {
    let rs1 = registers.x(inst.rs1_specifier());
    let imm = inst.imm_i_value();
    let value = match inst.opcode() {
        Opcode::Addi => rs1.wrapping_add(imm as u32),
        Opcode::Slti => ((rs1 as i32) < imm) as u32,
        Opcode::Sltiu => (rs1 < (imm as u32)) as u32,
        Opcode::Xori => rs1 ^ (imm as u32),
        Opcode::Ori => rs1 | (imm as u32),
        Opcode::Andi => rs1 & (imm as u32),
        Opcode::Slli => rs1.wrapping_shl(shamt(inst.rs2_specifier())),
        Opcode::Srli => rs1.wrapping_shr(shamt(inst.rs2_specifier())),
        Opcode::Srai => ((rs1 as i32) >> shamt(inst.rs2_specifier())) as u32,
        other => unreachable!("{other:?} is not an immediate ALU opcode"),
    };
    trace!(
        "{:?} rd={} rs1={} imm={} -> {:#x}",
        inst.opcode(),
        inst.rd_specifier(),
        rs1,
        imm,
        value
    );
    registers.set_x(inst.rd_specifier(), value);
    registers.inc_pc();
    Ok(())
}

pub(super) fn reg_reg_op(registers: &mut Registers, inst: &Instruction) -> Result<(), Fault> {
    let rs1 = registers.x(inst.rs1_specifier());
    let rs2 = registers.x(inst.rs2_specifier());
    let value = match inst.opcode() {
        Opcode::Add => rs1.wrapping_add(rs2),
        Opcode::Sub => rs1.wrapping_sub(rs2),
        Opcode::Sll => rs1.wrapping_shl(rs2 & 0x1F),
        Opcode::Srl => rs1.wrapping_shr(rs2 & 0x1F),
        Opcode::Sra => ((rs1 as i32) >> (rs2 & 0x1F)) as u32,
        Opcode::Slt => ((rs1 as i32) < (rs2 as i32)) as u32,
        Opcode::Sltu => (rs1 < rs2) as u32,
        Opcode::Xor => rs1 ^ rs2,
        Opcode::Or => rs1 | rs2,
        Opcode::And => rs1 & rs2,
        other => unreachable!("{other:?} is not a register ALU opcode"),
    };
    trace!(
        "{:?} rd={} rs1={} rs2={} -> {:#x}",
        inst.opcode(),
        inst.rd_specifier(),
        rs1,
        rs2,
        value
    );
    registers.set_x(inst.rd_specifier(), value);
    registers.inc_pc();
    Ok(())
}

pub(super) fn load_op<B: Bus>(
    config: ExecutorConfig,
    registers: &mut Registers,
    bus: &mut B,
    inst: &Instruction,
) -> Result<(), Fault> {
    let width = match inst.opcode() {
        Opcode::Lb | Opcode::Lbu => Width::Byte,
        Opcode::Lh | Opcode::Lhu => Width::Half,
        Opcode::Lw => Width::Word,
        other => unreachable!("{other:?} is not a load opcode"),
    };
    let address = registers
        .x(inst.rs1_specifier())
        .wrapping_add(inst.imm_i_value() as u32);
    if config.alignment == AlignmentPolicy::Strict && !width.is_aligned(address) {
        return Err(Fault::Misaligned(address));
    }
    let raw = bus
        .read(address, width)
        .map_err(|fault| Fault::BusFault(fault.address))?;
    let value = match inst.opcode() {
        Opcode::Lb => sign_extend(raw, 8),
        Opcode::Lh => sign_extend(raw, 16),
        Opcode::Lw => raw,
        Opcode::Lbu => raw & 0xFF,
        Opcode::Lhu => raw & 0xFFFF,
        other => unreachable!("{other:?} is not a load opcode"),
    };
    trace!(
        "{:?} rd={} address={:#010x} -> {:#x}",
        inst.opcode(),
        inst.rd_specifier(),
        address,
        value
    );
    registers.set_x(inst.rd_specifier(), value);
    registers.inc_pc();
    Ok(())
}

pub(super) fn store_op<B: Bus>(
    config: ExecutorConfig,
    registers: &mut Registers,
    bus: &mut B,
    inst: &Instruction,
) -> Result<(), Fault> {
    let width = match inst.opcode() {
        Opcode::Sb => Width::Byte,
        Opcode::Sh => Width::Half,
        Opcode::Sw => Width::Word,
        other => unreachable!("{other:?} is not a store opcode"),
    };
    let address = registers
        .x(inst.rs1_specifier())
        .wrapping_add(inst.imm_s_value() as u32);
    if config.alignment == AlignmentPolicy::Strict && !width.is_aligned(address) {
        return Err(Fault::Misaligned(address));
    }
    let value = registers.x(inst.rs2_specifier());
    trace!(
        "{:?} rs2={} address={:#010x} value={:#x}",
        inst.opcode(),
        inst.rs2_specifier(),
        address,
        value
    );
    bus.write(address, value, width)
        .map_err(|fault| Fault::BusFault(fault.address))?;
    registers.inc_pc();
    Ok(())
}

/// `rd == x0` makes the whole instruction a no-op, including the CSR read and write — a
/// deliberate deviation preserved from the reference this engine is grounded on (the canonical
/// rule only suppresses the register write).
pub(super) fn csr_op(
    config: ExecutorConfig,
    registers: &mut Registers,
    csrs: &mut CsrFile,
    inst: &Instruction,
) -> Result<(), Fault> {
    let rd = inst.rd_specifier();
    if rd == Specifier::X0 {
        trace!("{:?} rd=x0, suppressing CSR side effects", inst.opcode());
        registers.inc_pc();
        return Ok(());
    }
    let operand = registers.x(inst.rs1_specifier());
    let old = csrs.read(inst.csr_index(), config.csr_access)?;
    let new = match inst.opcode() {
        Opcode::Csrrw => operand,
        Opcode::Csrrs => old | operand,
        Opcode::Csrrc => old & !operand,
        other => unreachable!("{other:?} is not a CSR opcode"),
    };
    trace!(
        "{:?} csr={:#05x} old={:#x} new={:#x}",
        inst.opcode(),
        inst.csr_index(),
        old,
        new
    );
    csrs.write(inst.csr_index(), new, config.csr_access)?;
    registers.set_x(rd, old);
    registers.inc_pc();
    Ok(())
}

/// Dumps register state as the simulation's terminal action. Does not mutate `pc`: the caller
/// treats this opcode as a halt, not a retirement that advances control flow.
pub(super) fn nop(registers: &mut Registers) {
    trace!("nop: halting");
    registers.dump();
}

fn shamt(specifier: Specifier) -> u32 {
    u32::from(specifier) & 0x1F
}

fn sign_extend(value: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    (((value << shift) as i32) >> shift) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FlatMemory;
    use crate::instruction::Instruction;

    fn reg(i: u8) -> Specifier {
        Specifier::from_u5(i)
    }

    #[test]
    fn lui_shifts_immediate_into_place() {
        let mut registers = Registers::new(0);
        let inst = Instruction::new(Opcode::Lui).rd(reg(1)).imm_u(0x12345);
        lui(&mut registers, &inst).unwrap();
        assert_eq!(registers.x(reg(1)), 0x1234_5000);
        assert_eq!(registers.pc(), 4);
    }

    #[test]
    fn auipc_mutates_pc_as_well_as_rd() {
        let mut registers = Registers::new(0x1000);
        let inst = Instruction::new(Opcode::Auipc).rd(reg(2)).imm_u(0x1);
        auipc(ExecutorConfig::default(), &mut registers, &inst).unwrap();
        assert_eq!(registers.x(reg(2)), 0x2000);
        assert_eq!(registers.pc(), 0x2000);
    }

    #[test]
    fn jal_links_and_jumps() {
        let mut registers = Registers::new(0x100);
        let inst = Instruction::new(Opcode::Jal).rd(reg(1)).imm_j(8);
        jal(ExecutorConfig::default(), &mut registers, &inst).unwrap();
        assert_eq!(registers.pc(), 0x108);
        assert_eq!(registers.x(reg(1)), 0x104);
    }

    #[test]
    fn jalr_clears_low_bit_of_target() {
        let mut registers = Registers::new(0x100);
        registers.set_x(reg(2), 0x205);
        let inst = Instruction::new(Opcode::Jalr)
            .rd(reg(1))
            .rs1(reg(2))
            .imm_i(1);
        jalr(ExecutorConfig::default(), &mut registers, &inst).unwrap();
        assert_eq!(registers.pc(), 0x206);
        assert_eq!(registers.x(reg(1)), 0x104);
    }

    #[test]
    fn beq_on_equal_operands_is_unconditional() {
        let mut registers = Registers::new(0x100);
        registers.set_x(reg(1), 42);
        let inst = Instruction::new(Opcode::Beq)
            .rs1(reg(1))
            .rs2(reg(1))
            .imm_b(16);
        cond_branch(ExecutorConfig::default(), &mut registers, &inst).unwrap();
        assert_eq!(registers.pc(), 0x110);
    }

    #[test]
    fn blt_is_signed_bge_is_signed() {
        let mut registers = Registers::new(0x100);
        registers.set_x(reg(1), u32::MAX); // -1
        registers.set_x(reg(2), 1);
        let inst = Instruction::new(Opcode::Blt)
            .rs1(reg(1))
            .rs2(reg(2))
            .imm_b(16);
        cond_branch(ExecutorConfig::default(), &mut registers, &inst).unwrap();
        assert_eq!(registers.pc(), 0x110);
    }

    #[test]
    fn bltu_treats_operands_as_unsigned() {
        let mut registers = Registers::new(0x100);
        registers.set_x(reg(1), u32::MAX);
        registers.set_x(reg(2), 1);
        let inst = Instruction::new(Opcode::Bltu)
            .rs1(reg(1))
            .rs2(reg(2))
            .imm_b(16);
        cond_branch(ExecutorConfig::default(), &mut registers, &inst).unwrap();
        assert_eq!(registers.pc(), 0x104); // not taken: MAX is not < 1 unsigned
    }

    #[test]
    fn sltiu_sign_extends_immediate_before_unsigned_compare() {
        let mut registers = Registers::new(0);
        registers.set_x(reg(1), 0);
        let inst = Instruction::new(Opcode::Sltiu).rd(reg(2)).rs1(reg(1)).imm_i(1);
        reg_imm_op(&mut registers, &inst).unwrap();
        assert_eq!(registers.x(reg(2)), 1);
    }

    #[test]
    fn slli_shifts_by_the_rs2_encoded_shamt() {
        let mut registers = Registers::new(0);
        registers.set_x(reg(1), 1);
        let inst = Instruction::new(Opcode::Slli)
            .rd(reg(2))
            .rs1(reg(1))
            .rs2(reg(4));
        reg_imm_op(&mut registers, &inst).unwrap();
        assert_eq!(registers.x(reg(2)), 1 << 4);
    }

    #[test]
    fn sll_masks_shift_amount_from_register() {
        let mut registers = Registers::new(0);
        registers.set_x(reg(1), 1);
        registers.set_x(reg(2), 33);
        let inst = Instruction::new(Opcode::Sll)
            .rd(reg(3))
            .rs1(reg(1))
            .rs2(reg(2));
        reg_reg_op(&mut registers, &inst).unwrap();
        assert_eq!(registers.x(reg(3)), 2);
    }

    #[test]
    fn sub_of_equal_operands_is_zero() {
        let mut registers = Registers::new(0);
        registers.set_x(reg(1), 0x1234);
        let inst = Instruction::new(Opcode::Sub)
            .rd(reg(2))
            .rs1(reg(1))
            .rs2(reg(1));
        reg_reg_op(&mut registers, &inst).unwrap();
        assert_eq!(registers.x(reg(2)), 0);
    }

    #[test]
    fn slt_is_signed_sltu_is_unsigned() {
        let mut registers = Registers::new(0);
        registers.set_x(reg(1), u32::MAX);
        registers.set_x(reg(2), 1);
        let slt = Instruction::new(Opcode::Slt).rd(reg(3)).rs1(reg(1)).rs2(reg(2));
        reg_reg_op(&mut registers, &slt).unwrap();
        assert_eq!(registers.x(reg(3)), 1);
        let sltu = Instruction::new(Opcode::Sltu).rd(reg(3)).rs1(reg(1)).rs2(reg(2));
        reg_reg_op(&mut registers, &sltu).unwrap();
        assert_eq!(registers.x(reg(3)), 0);
    }

    #[test]
    fn lb_sign_extends_lbu_zero_extends() {
        let mut mem = FlatMemory::new(16);
        mem.write(0, 0xFF, Width::Byte).unwrap();
        let config = ExecutorConfig::default();

        let mut registers = Registers::new(0);
        let lb = Instruction::new(Opcode::Lb).rd(reg(1));
        load_op(config, &mut registers, &mut mem, &lb).unwrap();
        assert_eq!(registers.x(reg(1)), 0xFFFF_FFFF);

        let mut registers = Registers::new(0);
        let lbu = Instruction::new(Opcode::Lbu).rd(reg(1));
        load_op(config, &mut registers, &mut mem, &lbu).unwrap();
        assert_eq!(registers.x(reg(1)), 0xFF);
    }

    #[test]
    fn store_then_load_round_trips() {
        let mut mem = FlatMemory::new(16);
        let config = ExecutorConfig::default();
        let mut registers = Registers::new(0);
        registers.set_x(reg(1), 4);
        registers.set_x(reg(2), 0xDEAD_BEEF);
        let sw = Instruction::new(Opcode::Sw).rs1(reg(1)).rs2(reg(2));
        store_op(config, &mut registers, &mut mem, &sw).unwrap();

        let lw = Instruction::new(Opcode::Lw).rd(reg(3)).rs1(reg(1));
        load_op(config, &mut registers, &mut mem, &lw).unwrap();
        assert_eq!(registers.x(reg(3)), 0xDEAD_BEEF);
    }

    #[test]
    fn strict_alignment_rejects_misaligned_word_access() {
        let mut mem = FlatMemory::new(16);
        let config = ExecutorConfig::strict();
        let mut registers = Registers::new(0);
        registers.set_x(reg(1), 1);
        let lw = Instruction::new(Opcode::Lw).rd(reg(2)).rs1(reg(1));
        let err = load_op(config, &mut registers, &mut mem, &lw).unwrap_err();
        assert_eq!(err, Fault::Misaligned(1));
    }

    #[test]
    fn strict_alignment_rejects_misaligned_jump_target() {
        let config = ExecutorConfig::strict();
        let mut registers = Registers::new(0x100);
        registers.set_x(reg(1), 0x203);
        let jalr_inst = Instruction::new(Opcode::Jalr).rd(reg(2)).rs1(reg(1)).imm_i(1);
        // target = (0x203 + 1) & !1 = 0x204, which is word-aligned; no fault expected here.
        jalr(config, &mut registers, &jalr_inst).unwrap();
        assert_eq!(registers.pc(), 0x204);

        let mut registers = Registers::new(0x100);
        let jal_inst = Instruction::new(Opcode::Jal).rd(reg(1)).imm_j(2);
        let err = jal(config, &mut registers, &jal_inst).unwrap_err();
        assert_eq!(err, Fault::Misaligned(0x102));
    }

    #[test]
    fn csrrs_reads_old_value_and_ors_in_operand() {
        let mut registers = Registers::new(0);
        let mut csrs = CsrFile::new();
        csrs.seed(0x300, 0x5);
        registers.set_x(reg(1), 0x2);
        let inst = Instruction::new(Opcode::Csrrs)
            .rd(reg(2))
            .rs1(reg(1))
            .csr(0x300);
        csr_op(ExecutorConfig::default(), &mut registers, &mut csrs, &inst).unwrap();
        assert_eq!(registers.x(reg(2)), 0x5);
        assert_eq!(csrs.read(0x300, CsrAccessMode::Lenient).unwrap(), 0x7);
    }

    #[test]
    fn csr_op_with_rd_zero_is_a_total_no_op() {
        let mut registers = Registers::new(0x100);
        let mut csrs = CsrFile::new();
        csrs.seed(0x300, 0x5);
        registers.set_x(reg(1), 0xFF);
        let inst = Instruction::new(Opcode::Csrrw)
            .rd(reg(0))
            .rs1(reg(1))
            .csr(0x300);
        csr_op(ExecutorConfig::default(), &mut registers, &mut csrs, &inst).unwrap();
        assert_eq!(csrs.read(0x300, CsrAccessMode::Lenient).unwrap(), 0x5);
        assert_eq!(registers.pc(), 0x104);
    }
}
