//! Register-bank I²C mock for host-side renderer tests
//!
//! Behaves like a byte-addressed register device: a write sets the register
//! pointer and stores any following bytes, a read returns bytes from the
//! pointer onwards. Every register write is logged for assertions.

#![allow(clippy::indexing_slicing)] // Safety: every index is a u8 into a 256-entry array

use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};
use embedded_hal_async::i2c::I2c;

/// Register writes kept in [`MockRegisterBank::writes`].
pub const WRITE_LOG: usize = 64;

/// Mock I²C device with a 256-byte register file.
pub struct MockRegisterBank {
    /// Address the device answers on.
    pub address: u8,
    /// Register contents.
    pub regs: [u8; 256],
    /// `(register, value)` of every write, oldest first.
    pub writes: heapless::Vec<(u8, u8), WRITE_LOG>,
    /// NACK every transaction.
    pub offline: bool,
    pointer: u8,
}

impl MockRegisterBank {
    /// Device at `address` with every register zero.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            regs: [0; 256],
            writes: heapless::Vec::new(),
            offline: false,
            pointer: 0,
        }
    }

    /// Preset `reg` to `value` without logging a write.
    #[must_use]
    pub fn with_register(mut self, reg: u8, value: u8) -> Self {
        self.regs[usize::from(reg)] = value;
        self
    }

    /// Current value of `reg`.
    pub fn register(&self, reg: u8) -> u8 {
        self.regs[usize::from(reg)]
    }
}

impl ErrorType for MockRegisterBank {
    type Error = ErrorKind;
}

impl I2c for MockRegisterBank {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.offline || address != self.address {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    self.pointer = reg;
                    for &value in data.iter() {
                        self.regs[usize::from(self.pointer)] = value;
                        let _ = self.writes.push((self.pointer, value));
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
                Operation::Read(buf) => {
                    for byte in buf.iter_mut() {
                        *byte = self.regs[usize::from(self.pointer)];
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}
