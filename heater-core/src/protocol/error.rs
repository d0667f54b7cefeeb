#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    /// The transaction carried no opcode
    Empty,

    /// The opcode is not part of the command set
    UnknownOpcode(u8),

    /// The opcode needs more payload than was sent
    ShortPayload { opcode: u8, expected: u8, got: u8 },

    /// Write target sensor named a channel the board does not have
    SensorOutOfRange(u8),
}

impl ProtocolError {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "Empty request",
            Self::UnknownOpcode(_) => "Unknown opcode",
            Self::ShortPayload { .. } => "Short payload",
            Self::SensorOutOfRange(_) => "Sensor out of range",
        }
    }
}
