//! Register-style command protocol
//!
//! A request is one opcode byte followed by its payload. Reads answer with exactly two
//! bytes, little-endian; writes, rejected requests and unknown opcodes answer with
//! nothing.

mod command;
mod dispatch;
mod error;

pub use self::{
    command::{opcode, Command},
    dispatch::{dispatch, execute, Registers, Reply},
    error::ProtocolError,
};

/// Longest request: opcode plus a two-byte payload
pub const MAX_REQUEST_LEN: usize = 3;

/// Bytes received in one transaction
///
/// Requests longer than [`MAX_REQUEST_LEN`] are truncated by the transport; the extra
/// payload bytes are ignored by every command anyway.
pub type Request = heapless::Vec<u8, MAX_REQUEST_LEN>;

/// Bytes to clock out in the next read phase
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response {
    bytes: [u8; 2],
    len: u8,
}

impl Response {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            bytes: [0; 2],
            len: 0,
        }
    }

    #[must_use]
    pub const fn word(value: u16) -> Self {
        Self {
            bytes: value.to_le_bytes(),
            len: 2,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The byte to send at `index` of the read phase; zero past the end.
    #[must_use]
    pub fn byte(&self, index: usize) -> u8 {
        self.as_bytes().get(index).copied().unwrap_or(0)
    }

    /// The response as a little-endian word, if it is one
    #[must_use]
    pub const fn value(&self) -> Option<u16> {
        if self.len == 2 {
            Some(u16::from_le_bytes(self.bytes))
        } else {
            None
        }
    }
}
