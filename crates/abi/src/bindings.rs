use crate::isa::{Instruction, Op};
use crate::vm::Machine;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// The machine's fixed storage cells. A register binding maps a host id to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    A,
    B,
    C,
    D,
    Sp,
    Bp,
    Ip,
}

impl Reg {
    pub const COUNT: usize = 7;

    pub const ALL: [Reg; Reg::COUNT] = [Reg::A, Reg::B, Reg::C, Reg::D, Reg::Sp, Reg::Bp, Reg::Ip];

    pub(crate) const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Reg::A => "a",
            Reg::B => "b",
            Reg::C => "c",
            Reg::D => "d",
            Reg::Sp => "sp",
            Reg::Bp => "bp",
            Reg::Ip => "ip",
        }
    }
}

/// A host-supplied routine with full access to the machine.
///
/// There is no return channel: results and failures are reported by writing
/// registers, stack cells or memory.
pub trait Native {
    fn invoke(&self, instruction: &Instruction, vm: &mut Machine);
}

impl<F> Native for F
where
    F: Fn(&Instruction, &mut Machine),
{
    fn invoke(&self, instruction: &Instruction, vm: &mut Machine) {
        self(instruction, vm)
    }
}

pub type NativeRoutine = Rc<dyn Native>;

/// What an opcode id is bound to.
#[derive(Clone)]
pub enum Handler {
    Op(Op),
    Native(NativeRoutine),
}

impl Handler {
    pub fn native(routine: impl Native + 'static) -> Self {
        Handler::Native(Rc::new(routine))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Handler::Op(op) => op.mnemonic(),
            Handler::Native(_) => "native",
        }
    }
}

impl From<Op> for Handler {
    fn from(op: Op) -> Self {
        Handler::Op(op)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Op(op) => f.debug_tuple("Op").field(op).finish(),
            Handler::Native(routine) => f
                .debug_tuple("Native")
                .field(&Rc::as_ptr(routine).cast::<()>())
                .finish(),
        }
    }
}

/// Opcode and register tables owned by one machine. Inserting an existing id
/// replaces the previous binding.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    opcodes: HashMap<u16, Handler>,
    registers: HashMap<u16, Reg>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the binding that was replaced, if any.
    pub fn bind_opcode(&mut self, opcode: u16, handler: Handler) -> Option<Handler> {
        self.opcodes.insert(opcode, handler)
    }

    pub fn bind_register(&mut self, id: u16, reg: Reg) -> Option<Reg> {
        self.registers.insert(id, reg)
    }

    pub fn opcode(&self, opcode: u16) -> Option<&Handler> {
        self.opcodes.get(&opcode)
    }

    /// Register ids live in 64-bit operand fields; anything past `u16` is unbound.
    pub fn register(&self, id: u64) -> Option<Reg> {
        let id = u16::try_from(id).ok()?;
        self.registers.get(&id).copied()
    }

    pub fn opcode_count(&self) -> usize {
        self.opcodes.len()
    }

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }
}
