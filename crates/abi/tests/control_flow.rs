mod common;

use abi::{ExternalMemory, HostMemory, Instruction, Machine, MachineConfig, Reg, VMStatus};
use common::*;

const LEN: u64 = 6;

/// `mov D, k` at every position k, with a `jmp target` at `at`.
fn marked_program(at: u64, target: u64) -> Vec<Instruction> {
    (0..LEN)
        .map(|k| {
            if k == at {
                ins(JMP, target, 0, LIT)
            } else {
                ins(MOV, RD, k, LIT)
            }
        })
        .collect()
}

#[test]
fn jump_lands_exactly_on_target() {
    for at in [0, 3, LEN - 1] {
        for target in 0..LEN {
            let program = marked_program(at, target);
            let mut vm = machine();
            vm.set(Reg::Ip, at);

            assert_eq!(vm.step(&program).unwrap(), VMStatus::Running);
            assert_eq!(vm.ip(), target, "jmp at {at} to {target}");

            assert_eq!(vm.step(&program).unwrap(), VMStatus::Running);
            if target != at {
                assert_eq!(vm.get(Reg::D), target, "jmp at {at} to {target}");
                assert_eq!(vm.ip(), target + 1);
            }
        }
    }
}

#[test]
fn forward_jump_skips_instructions() {
    let mut vm = machine();
    run(
        &mut vm,
        &[
            ins(JMP, 3, 0, LIT),
            ins(MOV, RA, 1, LIT),
            ins(MOV, RA, 2, LIT),
            ins(MOV, RB, 7, LIT),
        ],
    );
    assert_eq!(vm.get(Reg::A), 0);
    assert_eq!(vm.get(Reg::B), 7);
}

#[test]
fn jump_past_end_halts() {
    let mut vm = machine();
    run(&mut vm, &[ins(JMP, 100, 0, LIT), ins(MOV, RA, 1, LIT)]);
    assert_eq!(vm.ip(), 100);
    assert_eq!(vm.get(Reg::A), 0);
}

#[test]
fn jump_target_from_register() {
    let mut vm = machine();
    run(
        &mut vm,
        &[
            ins(MOV, RC, 3, LIT),
            ins(JMP, RC, 0, REG),
            ins(MOV, RA, 1, LIT),
            ins(MOV, RB, 1, LIT),
        ],
    );
    assert_eq!(vm.get(Reg::A), 0);
    assert_eq!(vm.get(Reg::B), 1);
}

#[test]
fn jump_target_from_memory() {
    let mut memory = HostMemory::new();
    let cell = memory.alloc(8).unwrap();
    memory.write_u64(cell, 3).unwrap();

    let mut vm = Machine::with_memory(MachineConfig::default(), Box::new(memory));
    bind_all(&mut vm);
    run(
        &mut vm,
        &[
            ins(JMP, cell, 0, PTR),
            ins(MOV, RA, 1, LIT),
            ins(MOV, RA, 2, LIT),
            ins(MOV, RB, 7, LIT),
        ],
    );
    assert_eq!(vm.get(Reg::A), 0);
    assert_eq!(vm.get(Reg::B), 7);
}

#[test]
fn jump_executed_outside_step_does_not_repeat_target() {
    let mut vm = machine();
    vm.execute(&ins(JMP, 1, 0, LIT)).unwrap();
    assert_eq!(vm.ip(), 1);

    run(
        &mut vm,
        &[
            ins(ADD, RA, 1, LIT),
            ins(ADD, RA, 10, LIT),
            ins(ADD, RA, 100, LIT),
        ],
    );
    assert_eq!(vm.get(Reg::A), 110);
    assert_eq!(vm.ip(), 3);
}

#[test]
fn jump_with_unknown_kind_falls_through() {
    let mut vm = machine();
    run(&mut vm, &[ins(JMP, 0, 0, BAD), ins(MOV, RA, 1, LIT)]);
    assert_eq!(vm.get(Reg::A), 1);
    assert_eq!(vm.ip(), 2);
}

#[test]
fn countdown_loop() {
    let mut vm = machine();
    run(
        &mut vm,
        &[
            ins(MOV, RA, 5, LIT),
            ins(MOV, RB, 0, LIT),
            ins(ADD, RB, 2, LIT),
            ins(SUB, RA, 1, LIT),
            ins(CMP, RA, 0, LIT),
            ins(JNE, 2, 0, LIT),
        ],
    );
    assert_eq!(vm.get(Reg::A), 0);
    assert_eq!(vm.get(Reg::B), 10);
}

/// Runs `cmp ra, rb` then the conditional jump; returns whether it was taken.
fn taken(jump: u16, ra: u64, rb: u64) -> bool {
    let mut vm = machine();
    run(
        &mut vm,
        &[
            ins(MOV, RA, ra, LIT),
            ins(CMP, RA, rb, LIT),
            ins(jump, 5, 0, LIT),
            ins(MOV, RB, 0, LIT),
            ins(JMP, 6, 0, LIT),
            ins(MOV, RB, 1, LIT),
        ],
    );
    vm.get(Reg::B) == 1
}

#[test]
fn conditional_jumps_over_orderings() {
    // (jump, taken for ra<rb, ra==rb, ra>rb)
    let table = [
        ("je", JE, [false, true, false]),
        ("jne", JNE, [true, false, true]),
        ("jl", JL, [true, false, false]),
        ("jg", JG, [false, false, true]),
        ("ja", JA, [false, false, true]),
        ("jb", JB, [true, false, false]),
    ];
    for (name, jump, expected) in table {
        assert_eq!(taken(jump, 3, 10), expected[0], "{name} with 3 < 10");
        assert_eq!(taken(jump, 7, 7), expected[1], "{name} with 7 == 7");
        assert_eq!(taken(jump, 10, 3), expected[2], "{name} with 10 > 3");
    }
}

#[test]
fn signed_and_unsigned_jumps_disagree_on_negative_values() {
    let minus_one = -1i64 as u64;
    assert!(taken(JL, minus_one, 1));
    assert!(!taken(JG, minus_one, 1));
    assert!(taken(JA, minus_one, 1));
    assert!(!taken(JB, minus_one, 1));
}

#[test]
fn untaken_branch_advances_normally() {
    let mut vm = machine();
    let program = [
        ins(MOV, RA, 1, LIT),
        ins(CMP, RA, 2, LIT),
        ins(JE, 0, 0, LIT),
        ins(MOV, RB, 5, LIT),
    ];
    run(&mut vm, &program);
    assert_eq!(vm.get(Reg::B), 5);
    assert_eq!(vm.ip(), 4);
}

#[test]
fn step_reports_halt_at_end() {
    let mut vm = machine();
    let program = [ins(MOV, RA, 1, LIT)];
    assert_eq!(vm.step(&program).unwrap(), VMStatus::Running);
    assert_eq!(vm.step(&program).unwrap(), VMStatus::Halted);
    assert_eq!(vm.step(&[]).unwrap(), VMStatus::Halted);
}

#[test]
fn run_resumes_from_current_ip() {
    let mut vm = machine();
    let program = [
        ins(ADD, RA, 1, LIT),
        ins(ADD, RA, 10, LIT),
        ins(ADD, RA, 100, LIT),
    ];
    vm.set(Reg::Ip, 1);
    run(&mut vm, &program);
    assert_eq!(vm.get(Reg::A), 110);

    // ip is already past the end; a second run does nothing.
    run(&mut vm, &program);
    assert_eq!(vm.get(Reg::A), 110);

    vm.reset();
    assert_eq!(vm.ip(), 0);
    run(&mut vm, &program);
    assert_eq!(vm.get(Reg::A), 111);
}

#[test]
fn writing_ip_redirects_after_increment() {
    // Writing ip through arithmetic is not a jump: the engine still increments.
    let mut vm = machine();
    run(
        &mut vm,
        &[
            ins(MOV, RIP, 2, LIT),
            ins(MOV, RA, 1, LIT),
            ins(MOV, RB, 1, LIT),
            ins(MOV, RC, 1, LIT),
        ],
    );
    assert_eq!(vm.get(Reg::A), 0);
    assert_eq!(vm.get(Reg::B), 0);
    assert_eq!(vm.get(Reg::C), 1);
}
