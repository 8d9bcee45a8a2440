use abi::VmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("vm crash: {0}")]
    Vm(#[from] VmError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid code table: {0}")]
    Codes(#[from] serde_json::Error),
}
