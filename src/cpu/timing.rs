//! Derives the M-cycle cost of a decoded instruction from its opcode and
//! operand shapes, rather than keeping a second 512-entry table in sync
//! with `table.rs` by hand.
//!
//! Returns `(mcycles, branch_mcycles)`. For instructions without a taken/
//! not-taken distinction both values are equal; `exec_next_instr` only
//! substitutes `branch_mcycles` when a branch is actually taken.

use super::isa::{Opcode, Operand, Reg};

pub(crate) fn instr_timing(op: Opcode, op1: Operand, op2: Operand) -> (u8, u8) {
    use Opcode::*;
    use Operand::*;

    match op {
        Nop | Di | Ei | Cpl | Ccf | Scf | Daa | Illegal | Prefix | Halt | Stop
        | Rlca | Rrca | Rla | Rra => (1, 1),

        Inc | Dec => match op1 {
            RegMem(_) => (3, 3),
            Reg(r) if is_reg16(r) => (2, 2),
            _ => (1, 1),
        },

        Add | Adc | Sub | Sbc | And | Xor | Or | Cp => match (op1, op2) {
            (Reg(Reg::HL), Reg(_)) => (2, 2),
            (Reg(Reg::SP), I8(_)) => (4, 4),
            (_, RegMem(_)) | (_, U8(_)) => (2, 2),
            _ => (1, 1),
        },

        Rlc | Rrc | Rl | Rr | Sla | Sra | Swap | Srl => match op1 {
            RegMem(_) => (4, 4),
            _ => (2, 2),
        },

        Bit => match op2 {
            RegMem(_) => (3, 3),
            _ => (2, 2),
        },
        Res | Set => match op2 {
            RegMem(_) => (4, 4),
            _ => (2, 2),
        },

        Jr => match op1 {
            Cond(_) => (2, 3),
            _ => (3, 3),
        },
        Jp => match op1 {
            Reg(Reg::HL) => (1, 1),
            Cond(_) => (3, 4),
            _ => (4, 4),
        },
        Call => match op1 {
            Cond(_) => (3, 6),
            _ => (6, 6),
        },
        Ret => match op1 {
            Cond(_) => (2, 5),
            _ => (4, 4),
        },
        Reti => (4, 4),
        Rst => (4, 4),

        Push => (4, 4),
        Pop => (3, 3),

        Ldh => (3, 3),
        Ld => {
            let m = match (op1, op2) {
                (RegMem(_), U8(_)) => 3,
                (A16(_), Reg(Reg::SP)) => 5,
                (Reg(Reg::SP), Reg(Reg::HL)) => 2,
                (Reg(Reg::HL), SPplusI8(_)) => 3,
                (A16(_), _) | (_, A16(_)) => 4,
                (RegMem(_), _) | (_, RegMem(_)) => 2,
                (Reg(_), U16(_)) => 3,
                (Reg(_), U8(_)) => 2,
                (Reg(_), Reg(_)) => 1,
                _ => 1,
            };
            (m, m)
        }
    }
}

fn is_reg16(r: Reg) -> bool {
    matches!(
        r,
        Reg::BC | Reg::DE | Reg::HL | Reg::SP | Reg::AF | Reg::HLinc | Reg::HLdec
    )
}
