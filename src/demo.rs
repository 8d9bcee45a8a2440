//! The greeting program: ask for a name and a birthplace, then greet.

use crate::codes::HostCodes;
use crate::console::Console;
use crate::error::HostError;
use abi::{HostMemory, Instruction, Machine, MachineConfig, Op, Program, Reg, VmError};
use std::io::{BufRead, Write};
use std::rc::Rc;
use tracing::info;

pub const DEFAULT_BUFFER_SIZE: u64 = 256;
/// Largest answer buffer the command line accepts.
pub const MAX_BUFFER_SIZE: u64 = 1 << 20;

pub const QUESTION_NAME: &str = "What is your name: ";
pub const QUESTION_PLACE: &str = "Where were you born: ";

/// Hand-assembled program plus the memory its addresses point into.
pub struct Greeting {
    pub program: Program,
    pub memory: HostMemory,
}

struct Assembler<'a> {
    codes: &'a HostCodes,
    program: Program,
}

impl Assembler<'_> {
    fn emit(&mut self, opcode: u16, a: u64, b: u64) {
        self.program
            .push(Instruction::new(opcode, a, b, self.codes.literal));
    }

    // push address; call print; sub rsp, 1
    fn print(&mut self, address: u64) {
        self.emit(self.codes.push, address, 0);
        self.emit(self.codes.call, self.codes.print as u64, 0);
        self.emit(self.codes.sub, self.codes.rsp as u64, 1);
    }

    // push buffer; push size; call input; sub rsp, 2
    fn input(&mut self, buffer: u64, size: u64) {
        self.emit(self.codes.push, buffer, 0);
        self.emit(self.codes.push, size, 0);
        self.emit(self.codes.call, self.codes.input as u64, 0);
        self.emit(self.codes.sub, self.codes.rsp as u64, 2);
    }
}

impl Greeting {
    /// Fails when the two answer buffers do not fit in host memory.
    pub fn assemble(codes: &HostCodes, buffer_size: u64) -> Result<Self, VmError> {
        let mut memory = HostMemory::new();
        let question_name = memory.alloc_c_str(QUESTION_NAME)?;
        let question_place = memory.alloc_c_str(QUESTION_PLACE)?;
        let hello = memory.alloc_c_str("Hello ")?;
        let from = memory.alloc_c_str(" from ")?;
        let end = memory.alloc_c_str(".\n")?;
        let buffer_len = usize::try_from(buffer_size).unwrap_or(usize::MAX);
        let name = memory.alloc(buffer_len)?;
        let place = memory.alloc(buffer_len)?;

        let mut asm = Assembler {
            codes,
            program: Program::new(),
        };
        asm.print(question_name);
        asm.input(name, buffer_size);
        asm.print(question_place);
        asm.input(place, buffer_size);
        asm.print(hello);
        asm.print(name);
        asm.print(from);
        asm.print(place);
        asm.print(end);

        Ok(Self {
            program: asm.program,
            memory,
        })
    }
}

/// Builds a machine with only what the greeting needs bound, then runs it
/// against `console`.
pub fn run_greeting<R, W>(
    console: &Rc<Console<R, W>>,
    codes: &HostCodes,
    buffer_size: u64,
) -> Result<(), HostError>
where
    R: BufRead + 'static,
    W: Write + 'static,
{
    let Greeting { program, memory } = Greeting::assemble(codes, buffer_size)?;
    let config = MachineConfig {
        operand_kinds: codes.operand_kinds(),
        ..MachineConfig::default()
    };
    let mut vm = Machine::with_memory(config, Box::new(memory));
    vm.bind_instruction(Op::Push, codes.push);
    vm.bind_instruction(Op::Call, codes.call);
    vm.bind_instruction(Op::Sub, codes.sub);
    vm.bind_register(Reg::Sp, codes.rsp);
    console.bind(&mut vm, codes);

    info!(instructions = program.len(), "running greeting");
    vm.run(&program)?;
    Ok(())
}
