//! External memory reached through the pointer addressing mode.
//!
//! Registers and the stack are plain owned data. Anything addressed by a raw
//! 64-bit value goes through [`ExternalMemory`] instead, so the only code that
//! dereferences host addresses is [`RawMemory`].

use crate::error::VmError;

pub trait ExternalMemory {
    fn read_u64(&self, address: u64) -> Result<u64, VmError>;

    fn write_u64(&mut self, address: u64, value: u64) -> Result<(), VmError>;

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>, VmError>;

    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<(), VmError>;

    /// Reads bytes up to (not including) the first NUL.
    fn read_c_str(&self, address: u64) -> Result<Vec<u8>, VmError> {
        let mut out = Vec::new();
        let mut cursor = address;
        loop {
            let byte = self.read_bytes(cursor, 1)?[0];
            if byte == 0 {
                return Ok(out);
            }
            out.push(byte);
            cursor = cursor
                .checked_add(1)
                .ok_or(VmError::MemoryFault { address: cursor })?;
        }
    }
}

// --- Arena ---

/// Byte arena owned by the host. Addresses are `BASE + offset`.
#[derive(Debug, Default, Clone)]
pub struct HostMemory {
    bytes: Vec<u8>,
}

impl HostMemory {
    /// First valid address. Keeps 0 unmapped.
    pub const BASE: u64 = 0x1000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `len` zeroed bytes and returns their address.
    pub fn alloc(&mut self, len: usize) -> Result<u64, VmError> {
        let address = self.reserve(len)?;
        self.bytes.resize(self.bytes.len() + len, 0);
        Ok(address)
    }

    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> Result<u64, VmError> {
        let address = self.reserve(bytes.len())?;
        self.bytes.extend_from_slice(bytes);
        Ok(address)
    }

    /// Copies `s` in with a trailing NUL.
    pub fn alloc_c_str(&mut self, s: &str) -> Result<u64, VmError> {
        let address = self.reserve(s.len() + 1)?;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        Ok(address)
    }

    /// Makes room for `len` more bytes and returns where they will start.
    /// Fails, leaving the arena as it was, when the new end would not be
    /// addressable or the allocation cannot be made.
    fn reserve(&mut self, len: usize) -> Result<u64, VmError> {
        let address = Self::BASE + self.bytes.len() as u64;
        let fault = VmError::MemoryFault { address };
        self.bytes
            .len()
            .checked_add(len)
            .and_then(|end| u64::try_from(end).ok())
            .and_then(|end| end.checked_add(Self::BASE))
            .ok_or(fault.clone())?;
        self.bytes.try_reserve(len).map_err(|_| fault)?;
        Ok(address)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn range(&self, address: u64, len: usize) -> Result<std::ops::Range<usize>, VmError> {
        let fault = VmError::MemoryFault { address };
        let start = address.checked_sub(Self::BASE).ok_or(fault.clone())?;
        let start = usize::try_from(start).map_err(|_| fault.clone())?;
        let end = start.checked_add(len).ok_or(fault.clone())?;
        if end > self.bytes.len() {
            return Err(fault);
        }
        Ok(start..end)
    }
}

impl ExternalMemory for HostMemory {
    fn read_u64(&self, address: u64) -> Result<u64, VmError> {
        let range = self.range(address, 8)?;
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.bytes[range]);
        Ok(u64::from_le_bytes(word))
    }

    fn write_u64(&mut self, address: u64, value: u64) -> Result<(), VmError> {
        let range = self.range(address, 8)?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>, VmError> {
        let range = self.range(address, len)?;
        Ok(self.bytes[range].to_vec())
    }

    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<(), VmError> {
        let range = self.range(address, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }
}

// --- Raw process memory ---

/// Treats every address as a pointer into the current process.
///
/// No access is checked. Address 0 is reported as a fault; any other invalid
/// address is undefined behavior.
#[derive(Debug)]
pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// # Safety
    ///
    /// Every address a program or native routine reaches through this memory
    /// must point to live, suitably sized memory for the whole run, and no
    /// Rust reference may alias a location that gets written.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }

    fn check(address: u64) -> Result<usize, VmError> {
        match usize::try_from(address) {
            Ok(0) | Err(_) => Err(VmError::MemoryFault { address }),
            Ok(a) => Ok(a),
        }
    }
}

impl ExternalMemory for RawMemory {
    fn read_u64(&self, address: u64) -> Result<u64, VmError> {
        let ptr = Self::check(address)? as *const u64;
        // SAFETY: upheld by the contract of `RawMemory::new`.
        Ok(unsafe { ptr.read_unaligned() })
    }

    fn write_u64(&mut self, address: u64, value: u64) -> Result<(), VmError> {
        let ptr = Self::check(address)? as *mut u64;
        // SAFETY: upheld by the contract of `RawMemory::new`.
        unsafe { ptr.write_unaligned(value) };
        Ok(())
    }

    fn read_bytes(&self, address: u64, len: usize) -> Result<Vec<u8>, VmError> {
        let ptr = Self::check(address)? as *const u8;
        // SAFETY: upheld by the contract of `RawMemory::new`.
        Ok(unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec())
    }

    fn write_bytes(&mut self, address: u64, bytes: &[u8]) -> Result<(), VmError> {
        let ptr = Self::check(address)? as *mut u8;
        // SAFETY: upheld by the contract of `RawMemory::new`.
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len()) };
        Ok(())
    }
}
