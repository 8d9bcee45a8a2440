// Register machine core.
// Opcodes, register ids and operand-kind tags are all chosen by the host and
// installed at setup time; nothing here is a fixed instruction encoding.

pub mod bindings;
pub mod error;
pub mod flags;
pub mod isa;
pub mod memory;
pub mod vm;

pub use bindings::{Bindings, Handler, Native, NativeRoutine, Reg};
pub use error::VmError;
pub use flags::Flags;
pub use isa::{Instruction, Mode, Op, OperandKinds, Program};
pub use memory::{ExternalMemory, HostMemory, RawMemory};
pub use vm::{Machine, MachineConfig, VMStatus};
