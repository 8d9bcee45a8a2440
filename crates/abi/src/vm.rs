use crate::bindings::{Bindings, Handler, Native, Reg};
use crate::error::VmError;
use crate::flags::Flags;
use crate::isa::{Instruction, Mode, Op, OperandKinds};
use crate::memory::{ExternalMemory, HostMemory};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMStatus {
    Running,
    Halted, // ip ran off the end of the program
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub operand_kinds: OperandKinds,
    /// Highest stack index a push may write, exclusive. A push at or past it
    /// fails with [`VmError::StackOverflow`] and aborts the run.
    pub stack_limit: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            operand_kinds: OperandKinds::default(),
            stack_limit: 1 << 20,
        }
    }
}

/// Register machine whose opcodes and register ids are bound by the host.
///
/// The same value is the machine handle native routines receive: every
/// register, the flags, the stack and external memory are reachable from it.
pub struct Machine {
    regs: [u64; Reg::COUNT],
    flags: Flags,
    stack: Vec<u64>,
    bindings: Bindings,
    kinds: OperandKinds,
    stack_limit: usize,
    memory: Box<dyn ExternalMemory>,
    jumped: bool,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("regs", &self.regs)
            .field("flags", &self.flags)
            .field("stack", &self.stack)
            .field("bindings", &self.bindings)
            .field("operand_kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Self::with_memory(config, Box::new(HostMemory::new()))
    }

    pub fn with_memory(config: MachineConfig, memory: Box<dyn ExternalMemory>) -> Self {
        Self {
            regs: [0; Reg::COUNT],
            flags: Flags::default(),
            stack: Vec::new(),
            bindings: Bindings::new(),
            kinds: config.operand_kinds,
            stack_limit: config.stack_limit,
            memory,
            jumped: false,
        }
    }

    // --- Setup ---

    pub fn bind_instruction(&mut self, handler: impl Into<Handler>, opcode: u16) {
        let handler = handler.into();
        let name = handler.name();
        let replaced = self.bindings.bind_opcode(opcode, handler).is_some();
        debug!(opcode, handler = name, replaced, "instruction bound");
    }

    /// Binds `routine` under `id`: it runs when `id` is executed as an opcode
    /// and when a `call` instruction names `id`.
    pub fn bind_native(&mut self, routine: impl Native + 'static, id: u16) {
        self.bind_instruction(Handler::native(routine), id);
    }

    pub fn bind_register(&mut self, reg: Reg, id: u16) {
        let replaced = self.bindings.bind_register(id, reg).is_some();
        debug!(id, register = reg.name(), replaced, "register bound");
    }

    pub fn set_operand_kinds(&mut self, kinds: OperandKinds) {
        debug!(?kinds, "operand kinds set");
        self.kinds = kinds;
    }

    pub fn operand_kinds(&self) -> OperandKinds {
        self.kinds
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Clears registers, flags, the stack and any pending jump. Bindings and
    /// memory are kept.
    pub fn reset(&mut self) {
        self.regs = [0; Reg::COUNT];
        self.flags = Flags::default();
        self.stack.clear();
        self.jumped = false;
    }

    // --- Machine handle ---

    pub fn get(&self, reg: Reg) -> u64 {
        self.regs[reg.index()]
    }

    pub fn set(&mut self, reg: Reg, value: u64) {
        self.regs[reg.index()] = value;
    }

    pub fn ip(&self) -> u64 {
        self.get(Reg::Ip)
    }

    pub fn sp(&self) -> u64 {
        self.get(Reg::Sp)
    }

    /// Reads the register bound under the host id `id`.
    pub fn register(&self, id: u64) -> Result<u64, VmError> {
        Ok(self.get(self.lookup_register(id)?))
    }

    pub fn set_register(&mut self, id: u64, value: u64) -> Result<(), VmError> {
        let reg = self.lookup_register(id)?;
        self.set(reg, value);
        Ok(())
    }

    fn lookup_register(&self, id: u64) -> Result<Reg, VmError> {
        self.bindings.register(id).ok_or(VmError::UnboundRegister {
            register: id,
            ip: self.ip(),
        })
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    pub fn stack(&self) -> &[u64] {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Vec<u64> {
        &mut self.stack
    }

    /// Index of the cell `depth` slots below the stack pointer
    /// (`depth == 0` is `sp - 1`), if it exists.
    pub fn stack_index_from_top(&self, depth: u64) -> Option<usize> {
        let index = self.sp().checked_sub(depth.checked_add(1)?)?;
        let index = usize::try_from(index).ok()?;
        (index < self.stack.len()).then_some(index)
    }

    pub fn memory(&self) -> &dyn ExternalMemory {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> &mut dyn ExternalMemory {
        self.memory.as_mut()
    }

    // --- Operand Resolution ---

    /// The value an operand field stands for under `tag`. `None` means the tag
    /// is not one of the configured kinds and the caller must do nothing.
    pub fn resolve(&self, field: u64, tag: u8) -> Result<Option<u64>, VmError> {
        let value = match self.kinds.classify(tag) {
            None => return Ok(None),
            Some(Mode::Literal) => field,
            Some(Mode::Register) => self.register(field)?,
            Some(Mode::Pointer) => self.memory.read_u64(field)?,
        };
        Ok(Some(value))
    }

    // --- Flags ---

    /// Replaces the flags with the comparison of register `a` against operand `b`.
    pub fn recompute_flags(&mut self, a: u64, b: u64, tag: u8) -> Result<(), VmError> {
        let Some(rb) = self.resolve(b, tag)? else {
            return Ok(());
        };
        let ra = self.register(a)?;
        self.flags = Flags::compare(ra, rb);
        Ok(())
    }

    // --- Arithmetic ---

    fn arithmetic(&mut self, op: Op, ins: &Instruction) -> Result<(), VmError> {
        let Some(rb) = self.resolve(ins.b, ins.operand_kind)? else {
            trace!(op = op.mnemonic(), tag = ins.operand_kind, "unknown operand kind, skipped");
            return Ok(());
        };
        let ra = self.register(ins.a)?;
        let value = match op {
            Op::Mov => rb,
            Op::Add => ra.wrapping_add(rb),
            Op::Sub => ra.wrapping_sub(rb),
            Op::Mul => ra.wrapping_mul(rb),
            Op::Div => {
                if rb == 0 {
                    return Err(VmError::DivisionByZero { ip: self.ip() });
                }
                ra / rb
            }
            Op::Imul => (ra as i64).wrapping_mul(rb as i64) as u64,
            Op::Idiv => {
                if rb == 0 {
                    return Err(VmError::DivisionByZero { ip: self.ip() });
                }
                (ra as i64).wrapping_div(rb as i64) as u64
            }
            _ => unreachable!("{} is not an arithmetic operation", op.mnemonic()),
        };
        self.set_register(ins.a, value)?;
        // Flags describe the operands the result was computed from.
        self.flags = Flags::compare(ra, rb);
        Ok(())
    }

    // --- Stack ---

    fn push(&mut self, ins: &Instruction) -> Result<(), VmError> {
        let Some(value) = self.resolve(ins.a, ins.operand_kind)? else {
            trace!(tag = ins.operand_kind, "push: unknown operand kind, skipped");
            return Ok(());
        };
        let sp = self.sp();
        let index = usize::try_from(sp)
            .ok()
            .filter(|&index| index < self.stack_limit)
            .ok_or(VmError::StackOverflow {
                sp,
                limit: self.stack_limit,
            })?;
        if index >= self.stack.len() {
            self.stack.resize(index + 1, 0);
        }
        self.stack[index] = value;
        self.set(Reg::Sp, sp + 1);
        Ok(())
    }

    /// Reads the last physical cell, not `stack[sp - 1]`; the two differ once
    /// pops have moved the pointer below the end of the backing storage.
    fn pop(&mut self, ins: &Instruction) -> Result<(), VmError> {
        let Some(&value) = self.stack.last() else {
            trace!("pop: empty stack, skipped");
            return Ok(());
        };
        match self.kinds.classify(ins.operand_kind) {
            None => {
                trace!(tag = ins.operand_kind, "pop: unknown operand kind, skipped");
                return Ok(());
            }
            Some(Mode::Literal | Mode::Register) => self.set_register(ins.a, value)?,
            Some(Mode::Pointer) => self.memory.write_u64(ins.a, value)?,
        }
        self.set(Reg::Sp, self.sp().wrapping_sub(1));
        Ok(())
    }

    // --- Control Flow ---

    fn jump(&mut self, ins: &Instruction) -> Result<(), VmError> {
        let Some(target) = self.resolve(ins.a, ins.operand_kind)? else {
            trace!(tag = ins.operand_kind, "jump: unknown operand kind, skipped");
            return Ok(());
        };
        trace!(from = self.ip(), to = target, "jump");
        self.set(Reg::Ip, target);
        self.jumped = true;
        Ok(())
    }

    fn branch(&mut self, op: Op, ins: &Instruction) -> Result<(), VmError> {
        let flags = self.flags;
        let taken = match op {
            Op::Jmp => true,
            Op::Je => flags.equal(),
            Op::Jne => flags.not_equal(),
            Op::Jl => flags.less(),
            Op::Jg => flags.greater(),
            Op::Ja => flags.above(),
            Op::Jb => flags.below(),
            _ => unreachable!("{} is not a jump", op.mnemonic()),
        };
        if taken {
            self.jump(ins)?;
        }
        Ok(())
    }

    // --- Host Interface ---

    fn call(&mut self, ins: &Instruction) -> Result<(), VmError> {
        let id = ins.a;
        let ip = self.ip();
        let handler = u16::try_from(id)
            .ok()
            .and_then(|id| self.bindings.opcode(id))
            .cloned();
        match handler {
            Some(Handler::Native(routine)) => {
                trace!(id, ip, "native call");
                routine.invoke(ins, self);
                Ok(())
            }
            Some(Handler::Op(_)) => Err(VmError::NotNative { id, ip }),
            None => Err(VmError::UnboundNative { id, ip }),
        }
    }

    // --- Execution ---

    /// Dispatches one instruction through the opcode table.
    pub fn execute(&mut self, ins: &Instruction) -> Result<(), VmError> {
        let ip = self.ip();
        let handler = self
            .bindings
            .opcode(ins.opcode)
            .cloned()
            .ok_or(VmError::UnboundOpcode {
                opcode: ins.opcode,
                ip,
            })?;
        trace!(
            ip,
            opcode = ins.opcode,
            op = handler.name(),
            a = ins.a,
            b = ins.b,
            kind = ins.operand_kind,
            "execute"
        );
        match handler {
            Handler::Op(op) if op.is_arithmetic() => self.arithmetic(op, ins),
            Handler::Op(op) if op.is_jump() => self.branch(op, ins),
            Handler::Op(Op::Push) => self.push(ins),
            Handler::Op(Op::Pop) => self.pop(ins),
            Handler::Op(Op::Cmp) => self.recompute_flags(ins.a, ins.b, ins.operand_kind),
            Handler::Op(Op::Call) => self.call(ins),
            Handler::Op(op) => unreachable!("{} has no dispatch arm", op.mnemonic()),
            Handler::Native(routine) => {
                routine.invoke(ins, self);
                Ok(())
            }
        }
    }

    // The Heartbeat: Execute one instruction
    pub fn step(&mut self, program: &[Instruction]) -> Result<VMStatus, VmError> {
        // Fetch
        let Some(ins) = usize::try_from(self.ip())
            .ok()
            .and_then(|ip| program.get(ip))
        else {
            return Ok(VMStatus::Halted);
        };

        // Decode & Execute
        // Only a jump taken by this instruction skips the increment.
        self.jumped = false;
        self.execute(ins)?;

        // A jump already placed ip on its target.
        if self.jumped {
            self.jumped = false;
        } else {
            self.set(Reg::Ip, self.ip().wrapping_add(1));
        }
        Ok(VMStatus::Running)
    }

    /// Runs from the current ip until it leaves the program. Nothing is reset
    /// first; registers, flags and ip carry over from the previous run.
    pub fn run(&mut self, program: &[Instruction]) -> Result<(), VmError> {
        debug!(
            len = program.len(),
            ip = self.ip(),
            opcodes = self.bindings.opcode_count(),
            registers = self.bindings.register_count(),
            "run started"
        );
        let mut cycles: u64 = 0;
        loop {
            match self.step(program) {
                Ok(VMStatus::Running) => cycles += 1,
                Ok(VMStatus::Halted) => break,
                Err(err) => {
                    debug!(cycles, %err, "run aborted");
                    return Err(err);
                }
            }
        }
        debug!(cycles, ip = self.ip(), "run finished");
        Ok(())
    }
}
