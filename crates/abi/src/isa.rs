use serde::{Deserialize, Serialize};

/// One fixed-width instruction record.
///
/// The opcode, register and operand-kind identifier spaces belong to the host:
/// the machine only ever uses them as keys into its binding tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: u16,
    pub a: u64,
    pub b: u64,
    pub operand_kind: u8,
}

impl Instruction {
    pub const fn new(opcode: u16, a: u64, b: u64, operand_kind: u8) -> Self {
        Self { opcode, a, b, operand_kind }
    }
}

/// An ordered program; the instruction pointer is an index into it.
pub type Program = Vec<Instruction>;

/// Built-in operations a host can bind to an opcode of its choosing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    // --- Data Movement ---
    Mov,  // a <- b

    // --- Stack Manipulation ---
    Push, // stack[sp] <- a, sp += 1
    Pop,  // a <- stack.last(), sp -= 1

    // --- Arithmetic (Integers) ---
    Add,
    Sub,
    Mul,
    Div,
    Imul, // signed multiply
    Idiv, // signed divide
    Cmp,  // flags only

    // --- Control Flow ---
    Jmp,
    Je,   // zero
    Jne,  // !zero
    Jl,   // sign != overflow
    Jg,   // !zero && sign == overflow
    Ja,   // !carry && !zero
    Jb,   // carry

    // --- Host Interface ---
    Call, // invoke the native routine bound under `a`
}

impl Op {
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Op::Mov => "mov",
            Op::Push => "push",
            Op::Pop => "pop",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Imul => "imul",
            Op::Idiv => "idiv",
            Op::Cmp => "cmp",
            Op::Jmp => "jmp",
            Op::Je => "je",
            Op::Jne => "jne",
            Op::Jl => "jl",
            Op::Jg => "jg",
            Op::Ja => "ja",
            Op::Jb => "jb",
            Op::Call => "call",
        }
    }

    /// Operations that write register A and recompute the flags afterwards.
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Op::Mov | Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Imul | Op::Idiv
        )
    }

    pub const fn is_jump(&self) -> bool {
        matches!(
            self,
            Op::Jmp | Op::Je | Op::Jne | Op::Jl | Op::Jg | Op::Ja | Op::Jb
        )
    }
}

/// Addressing mode selected by an instruction's operand-kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The field is the value.
    Literal,
    /// The field is a register identifier.
    Register,
    /// The field is an address in external memory.
    Pointer,
}

/// Which tag values mean which [`Mode`]. Set once by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandKinds {
    pub literal: u8,
    pub register: u8,
    pub pointer: u8,
}

impl Default for OperandKinds {
    fn default() -> Self {
        Self { literal: 0, register: 1, pointer: 2 }
    }
}

impl OperandKinds {
    pub const fn new(literal: u8, register: u8, pointer: u8) -> Self {
        Self { literal, register, pointer }
    }

    /// Maps a tag to its mode. Literal is checked first, then register, then
    /// pointer, so colliding values resolve to the earliest mode.
    pub fn classify(&self, tag: u8) -> Option<Mode> {
        if tag == self.literal {
            Some(Mode::Literal)
        } else if tag == self.register {
            Some(Mode::Register)
        } else if tag == self.pointer {
            Some(Mode::Pointer)
        } else {
            None
        }
    }
}
