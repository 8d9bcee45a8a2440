//! Line-based console I/O exposed to programs as native routines.
//!
//! Calling convention (both routines leave sp alone):
//! - `read_line`: `stack[sp-1]` is the buffer size, `stack[sp-2]` the buffer address.
//!   The line is stored NUL-terminated and its length replaces the size slot.
//! - `print_str`: `stack[sp-1]` is the address of a NUL-terminated string.

use crate::codes::HostCodes;
use abi::{Instruction, Machine};
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;
use tracing::{debug, warn};

/// Written into the size slot when no line could be read.
pub const READ_FAILED: u64 = u64::MAX;

pub struct Console<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl<R: BufRead + 'static, W: Write + 'static> Console<R, W> {
    pub fn new(input: R, output: W) -> Rc<Self> {
        Rc::new(Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        })
    }

    /// Binds `read_line` and `print_str` under the host's native ids.
    pub fn bind(self: &Rc<Self>, vm: &mut Machine, codes: &HostCodes) {
        let console = Rc::clone(self);
        vm.bind_native(
            move |ins: &Instruction, vm: &mut Machine| console.read_line(ins, vm),
            codes.input,
        );
        let console = Rc::clone(self);
        vm.bind_native(
            move |ins: &Instruction, vm: &mut Machine| console.print_str(ins, vm),
            codes.print,
        );
    }

    pub fn read_line(&self, _: &Instruction, vm: &mut Machine) {
        let (Some(size_slot), Some(buffer_slot)) =
            (vm.stack_index_from_top(0), vm.stack_index_from_top(1))
        else {
            warn!(sp = vm.sp(), "read_line: buffer address and size missing from stack");
            return;
        };
        let size = vm.stack()[size_slot];
        let buffer = vm.stack()[buffer_slot];

        let mut line = String::new();
        match self.input.borrow_mut().read_line(&mut line) {
            Ok(0) => {
                debug!("read_line: end of input");
                vm.stack_mut()[size_slot] = READ_FAILED;
                return;
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "read_line: input failed");
                vm.stack_mut()[size_slot] = READ_FAILED;
                return;
            }
        }

        let text = line.trim_end_matches(['\r', '\n']).as_bytes();
        let len = text.len() as u64;
        if len >= size {
            debug!(len, size, "read_line: line does not fit, buffer untouched");
            return;
        }

        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text);
        bytes.push(0);
        match vm.memory_mut().write_bytes(buffer, &bytes) {
            Ok(()) => vm.stack_mut()[size_slot] = len,
            Err(err) => {
                warn!(%err, buffer, "read_line: buffer not writable");
                vm.stack_mut()[size_slot] = READ_FAILED;
            }
        }
    }

    pub fn print_str(&self, _: &Instruction, vm: &mut Machine) {
        let Some(slot) = vm.stack_index_from_top(0) else {
            warn!(sp = vm.sp(), "print_str: string address missing from stack");
            return;
        };
        let address = vm.stack()[slot];
        let text = match vm.memory().read_c_str(address) {
            Ok(text) => text,
            Err(err) => {
                warn!(%err, address, "print_str: string not readable");
                return;
            }
        };

        let mut output = self.output.borrow_mut();
        if let Err(err) = output.write_all(&text) {
            warn!(%err, "print_str: output failed");
            return;
        }
        if let Err(err) = output.flush() {
            warn!(%err, "print_str: flush failed");
        }
    }
}

impl<R, W: Default> Console<R, W> {
    /// Takes everything written so far.
    pub fn take_output(&self) -> W {
        std::mem::take(&mut *self.output.borrow_mut())
    }
}
