#![allow(dead_code)]

use abi::{Instruction, Machine, Op, OperandKinds, Reg};

// Opcode ids (arbitrary, host-chosen)
pub const MOV: u16 = 0x01;
pub const PUSH: u16 = 0x02;
pub const POP: u16 = 0x03;
pub const ADD: u16 = 0x04;
pub const SUB: u16 = 0x05;
pub const MUL: u16 = 0x06;
pub const DIV: u16 = 0x07;
pub const IMUL: u16 = 0x08;
pub const IDIV: u16 = 0x09;
pub const CMP: u16 = 0x0A;
pub const JMP: u16 = 0x10;
pub const JE: u16 = 0x11;
pub const JNE: u16 = 0x12;
pub const JL: u16 = 0x13;
pub const JG: u16 = 0x14;
pub const JA: u16 = 0x15;
pub const JB: u16 = 0x16;
pub const CALL: u16 = 0x20;

// Register ids
pub const RA: u64 = 0x40;
pub const RB: u64 = 0x41;
pub const RC: u64 = 0x42;
pub const RD: u64 = 0x43;
pub const RSP: u64 = 0x44;
pub const RBP: u64 = 0x45;
pub const RIP: u64 = 0x46;

// Operand kinds, deliberately not 0/1/2
pub const LIT: u8 = 15;
pub const REG: u8 = 29;
pub const PTR: u8 = 0;
pub const BAD: u8 = 99;

pub const BINDINGS: [(Op, u16); 18] = [
    (Op::Mov, MOV),
    (Op::Push, PUSH),
    (Op::Pop, POP),
    (Op::Add, ADD),
    (Op::Sub, SUB),
    (Op::Mul, MUL),
    (Op::Div, DIV),
    (Op::Imul, IMUL),
    (Op::Idiv, IDIV),
    (Op::Cmp, CMP),
    (Op::Jmp, JMP),
    (Op::Je, JE),
    (Op::Jne, JNE),
    (Op::Jl, JL),
    (Op::Jg, JG),
    (Op::Ja, JA),
    (Op::Jb, JB),
    (Op::Call, CALL),
];

pub fn bind_all(vm: &mut Machine) {
    for (op, code) in BINDINGS {
        vm.bind_instruction(op, code);
    }
    for (reg, id) in [
        (Reg::A, RA),
        (Reg::B, RB),
        (Reg::C, RC),
        (Reg::D, RD),
        (Reg::Sp, RSP),
        (Reg::Bp, RBP),
        (Reg::Ip, RIP),
    ] {
        vm.bind_register(reg, id as u16);
    }
    vm.set_operand_kinds(OperandKinds::new(LIT, REG, PTR));
}

/// A machine with every operation and register bound.
pub fn machine() -> Machine {
    let mut vm = Machine::new();
    bind_all(&mut vm);
    vm
}

pub fn ins(opcode: u16, a: u64, b: u64, kind: u8) -> Instruction {
    Instruction::new(opcode, a, b, kind)
}

pub fn run(vm: &mut Machine, program: &[Instruction]) {
    vm.run(program).expect("program should run to completion");
}
