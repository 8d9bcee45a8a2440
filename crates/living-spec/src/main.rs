use colored::*;
use abi::{Flags, Instruction, Machine, Op, Reg, VmError};

const MANIFESTO: &str = r#"
================================================================================
REGVM // CONFORMANCE REPORT
================================================================================

[ MACHINE ]
Seven 64-bit registers (A B C D SP BP IP), four flags (Z S C O), a u64 stack
and external memory. Opcode, register and operand-kind ids are all chosen by
the host at bind time.

[ CONVENTIONS USED BELOW ]
Opcodes:   mov=01 push=02 pop=03 add=04 sub=05 mul=06 div=07 cmp=0A
           jmp=10 je=11 jne=12 jl=13 jg=14 call=20
Registers: A=40 B=41 C=42 SP=44
Kinds:     literal=0 register=1 pointer=2

================================================================================
CONFORMANCE SUITE
================================================================================
"#;

const MOV: u16 = 0x01;
const PUSH: u16 = 0x02;
const POP: u16 = 0x03;
const ADD: u16 = 0x04;
const SUB: u16 = 0x05;
const MUL: u16 = 0x06;
const DIV: u16 = 0x07;
const CMP: u16 = 0x0A;
const JMP: u16 = 0x10;
const JE: u16 = 0x11;
const JNE: u16 = 0x12;
const JL: u16 = 0x13;
const JG: u16 = 0x14;
const CALL: u16 = 0x20;

const RA: u64 = 0x40;
const RB: u64 = 0x41;
const RC: u64 = 0x42;

const LIT: u8 = 0;
const REG: u8 = 1;

fn main() {
    println!("{}", MANIFESTO);
    let mut passed = 0;
    let mut failed = 0;

    run_test("MOV_THEN_ADD", test_mov_add, &mut passed, &mut failed);
    run_test("SUB_CLEARS_CARRY", test_sub_flags, &mut passed, &mut failed);
    run_test("CMP_EQUAL_TAKES_JE", test_cmp_je, &mut passed, &mut failed);
    run_test("PUSH_POP_ROUND_TRIP", test_push_pop, &mut passed, &mut failed);
    run_test("NATIVE_SEES_STACK", test_native_call, &mut passed, &mut failed);
    run_test("UNBOUND_OPCODE_CRASHES", test_unbound_opcode, &mut passed, &mut failed);
    run_test("UNKNOWN_KIND_IS_NOOP", test_unknown_kind, &mut passed, &mut failed);
    run_test("COUNTDOWN_LOOP", test_countdown, &mut passed, &mut failed);
    run_test("SIGNED_VS_UNSIGNED", test_signed_compare, &mut passed, &mut failed);
    run_test("DIV_BY_ZERO_CRASHES", test_div_zero, &mut passed, &mut failed);

    println!("\n--------------------------------------------------------------------------------");
    println!("{} passed, {} failed", passed, failed);
    if failed == 0 {
        println!("{}", "ALL SYSTEMS NOMINAL.".green().bold());
    } else {
        std::process::exit(1);
    }
}

// --- TEST INFRASTRUCTURE ---

fn run_test<F>(name: &str, test_fn: F, passed: &mut i32, failed: &mut i32)
where F: Fn() -> Result<(), String> {
    print!("TEST: {:<30} ... ", name);
    match test_fn() {
        Ok(_) => { println!("{}", "PASS".green()); *passed += 1; }
        Err(e) => { println!("{}", "FAIL".red()); println!("  -> {}", e); *failed += 1; }
    }
}

fn machine() -> Machine {
    let mut vm = Machine::new();
    let table = [
        (Op::Mov, MOV), (Op::Push, PUSH), (Op::Pop, POP), (Op::Add, ADD),
        (Op::Sub, SUB), (Op::Mul, MUL), (Op::Div, DIV), (Op::Cmp, CMP),
        (Op::Jmp, JMP), (Op::Je, JE), (Op::Jne, JNE), (Op::Jl, JL),
        (Op::Jg, JG), (Op::Call, CALL),
    ];
    for (op, code) in table {
        vm.bind_instruction(op, code);
    }
    vm.bind_register(Reg::A, RA as u16);
    vm.bind_register(Reg::B, RB as u16);
    vm.bind_register(Reg::C, RC as u16);
    vm.bind_register(Reg::Sp, 0x44);
    vm
}

fn ins(opcode: u16, a: u64, b: u64, kind: u8) -> Instruction {
    Instruction::new(opcode, a, b, kind)
}

fn expect(what: &str, got: u64, want: u64) -> Result<(), String> {
    if got == want { Ok(()) } else { Err(format!("{what}: got {got:#x}, want {want:#x}")) }
}

fn run(vm: &mut Machine, program: &[Instruction]) -> Result<(), String> {
    vm.run(program).map_err(|e| format!("unexpected crash: {e}"))
}

fn test_mov_add() -> Result<(), String> {
    let mut vm = machine();
    run(&mut vm, &[ins(MOV, RA, 5, LIT), ins(ADD, RA, 7, LIT)])?;
    expect("A", vm.get(Reg::A), 12)?;
    expect("IP", vm.ip(), 2)
}

fn test_sub_flags() -> Result<(), String> {
    let mut vm = machine();
    run(&mut vm, &[ins(MOV, RA, 10, LIT), ins(SUB, RA, 3, LIT)])?;
    expect("A", vm.get(Reg::A), 7)?;
    let flags = vm.flags();
    if flags.zero() || flags.carry() {
        return Err(format!("flags {flags}, want Z=0 C=0"));
    }
    Ok(())
}

fn test_cmp_je() -> Result<(), String> {
    let mut vm = machine();
    run(&mut vm, &[
        ins(MOV, RA, 4, LIT),
        ins(CMP, RA, 4, LIT),
        ins(JE, 5, 0, LIT),
        ins(MOV, RB, 1, LIT),
        ins(JMP, 6, 0, LIT),
        ins(MOV, RB, 2, LIT),
    ])?;
    expect("B", vm.get(Reg::B), 2)
}

fn test_push_pop() -> Result<(), String> {
    let mut vm = machine();
    run(&mut vm, &[ins(PUSH, 42, 0, LIT), ins(POP, RB, 0, REG)])?;
    expect("B", vm.get(Reg::B), 42)?;
    expect("SP", vm.sp(), 0)
}

fn test_native_call() -> Result<(), String> {
    let mut vm = machine();
    vm.bind_native(|_: &Instruction, vm: &mut Machine| {
        let top = vm.stack_index_from_top(0).map(|i| vm.stack()[i]).unwrap_or(0);
        vm.set(Reg::C, top * 2);
    }, 0x30);
    run(&mut vm, &[ins(PUSH, 21, 0, LIT), ins(CALL, 0x30, 0, LIT)])?;
    expect("C", vm.get(Reg::C), 42)?;
    expect("SP", vm.sp(), 1)
}

fn test_unbound_opcode() -> Result<(), String> {
    let mut vm = machine();
    match vm.run(&[ins(0x7F, 0, 0, LIT)]) {
        Err(VmError::UnboundOpcode { opcode: 0x7F, ip: 0 }) => Ok(()),
        other => Err(format!("got {other:?}")),
    }
}

fn test_unknown_kind() -> Result<(), String> {
    let mut vm = machine();
    run(&mut vm, &[ins(MOV, RA, 9, 99), ins(PUSH, 1, 0, 99)])?;
    expect("A", vm.get(Reg::A), 0)?;
    expect("SP", vm.sp(), 0)?;
    expect("IP", vm.ip(), 2)
}

fn test_countdown() -> Result<(), String> {
    let mut vm = machine();
    run(&mut vm, &[
        ins(MOV, RA, 3, LIT),
        ins(ADD, RB, 1, LIT),
        ins(SUB, RA, 1, LIT),
        ins(CMP, RA, 0, LIT),
        ins(JNE, 1, 0, LIT),
    ])?;
    expect("A", vm.get(Reg::A), 0)?;
    expect("B", vm.get(Reg::B), 3)
}

fn test_signed_compare() -> Result<(), String> {
    let mut vm = machine();
    run(&mut vm, &[
        ins(MOV, RA, (-1i64) as u64, LIT),
        ins(CMP, RA, 1, LIT),
        ins(JL, 4, 0, LIT),
        ins(MOV, RC, 1, LIT),
    ])?;
    expect("C", vm.get(Reg::C), 0)?;
    if vm.flags().below() || !vm.flags().less() {
        return Err(format!("flags {}", vm.flags()));
    }
    if vm.flags() != Flags::compare(u64::MAX, 1) {
        return Err("cmp disagrees with Flags::compare".into());
    }
    Ok(())
}

fn test_div_zero() -> Result<(), String> {
    let mut vm = machine();
    vm.set(Reg::A, 10);
    match vm.run(&[ins(MUL, RA, 2, LIT), ins(DIV, RA, 0, LIT)]) {
        Err(VmError::DivisionByZero { ip: 1 }) => expect("A", vm.get(Reg::A), 20),
        other => Err(format!("got {other:?}")),
    }
}
