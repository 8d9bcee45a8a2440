use thiserror::Error;

/// Fatal conditions that abort a run.
///
/// Everything not listed here (unknown operand-kind tags, popping an empty
/// stack) is a silent no-op at the affected instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("unbound opcode {opcode:#06x} at ip {ip}")]
    UnboundOpcode { opcode: u16, ip: u64 },

    #[error("unbound register {register:#x} at ip {ip}")]
    UnboundRegister { register: u64, ip: u64 },

    #[error("call to unbound native routine {id:#x} at ip {ip}")]
    UnboundNative { id: u64, ip: u64 },

    #[error("call target {id:#x} at ip {ip} is bound to a built-in operation, not a native routine")]
    NotNative { id: u64, ip: u64 },

    #[error("division by zero at ip {ip}")]
    DivisionByZero { ip: u64 },

    #[error("memory fault at address {address:#x}")]
    MemoryFault { address: u64 },

    #[error("stack overflow: sp {sp} exceeds limit of {limit} cells")]
    StackOverflow { sp: u64, limit: usize },
}
