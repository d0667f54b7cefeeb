use static_assertions::const_assert_eq;

use super::ProtocolError;
use crate::config::{SensorIndex, CHANNEL_COUNT};

/// Opcode values of the command set
pub mod opcode {
    pub const READ_SENSOR_LOW: u8 = 0x01;
    pub const READ_SENSOR_HIGH: u8 = 0x08;
    pub const READ_VERSION: u8 = 0x10;
    pub const READ_STATUS: u8 = 0x11;
    pub const READ_HEATER_MODE: u8 = 0x20;
    pub const READ_TARGET_TEMP: u8 = 0x21;
    pub const READ_TARGET_SENSOR: u8 = 0x22;
    pub const READ_PWM: u8 = 0x23;
    pub const READ_MAX_TEMP: u8 = 0x24;
    pub const READ_FILTERED_LOW: u8 = 0x31;
    pub const READ_FILTERED_HIGH: u8 = 0x38;
    pub const WRITE_HEATER_MODE: u8 = 0x40;
    pub const WRITE_TARGET_TEMP: u8 = 0x41;
    pub const WRITE_TARGET_SENSOR: u8 = 0x42;
    pub const WRITE_PWM_DUTY: u8 = 0x43;
    pub const WRITE_MAX_TEMP: u8 = 0x44;
    pub const RESET: u8 = 0x50;
}

const_assert_eq!(
    (opcode::READ_SENSOR_HIGH - opcode::READ_SENSOR_LOW + 1) as usize,
    CHANNEL_COUNT
);
const_assert_eq!(
    (opcode::READ_FILTERED_HIGH - opcode::READ_FILTERED_LOW + 1) as usize,
    CHANNEL_COUNT
);

/// A decoded request
///
/// Write payloads are carried as received; range checks happen when the command is
/// executed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    ReadRaw(SensorIndex),
    ReadFiltered(SensorIndex),
    ReadVersion,
    ReadStatus,
    ReadHeaterMode,
    ReadTargetTemp,
    ReadTargetSensor,
    /// Compare value in PID mode, configured duty otherwise
    ReadPwm,
    ReadMaxTemp,
    WriteHeaterMode(u8),
    WriteTargetTemp(u16),
    WriteTargetSensor(u8),
    WritePwmDuty(u8),
    WriteMaxTemp(u16),
    Reset,
}

impl Command {
    /// Decode one request.
    ///
    /// Payload bytes beyond what the opcode needs are ignored.
    pub fn parse(request: &[u8]) -> Result<Self, ProtocolError> {
        use opcode::*;

        let (&op, payload) = request.split_first().ok_or(ProtocolError::Empty)?;

        let command = match op {
            READ_SENSOR_LOW..=READ_SENSOR_HIGH => Self::ReadRaw(channel(op, READ_SENSOR_LOW)?),
            READ_FILTERED_LOW..=READ_FILTERED_HIGH => {
                Self::ReadFiltered(channel(op, READ_FILTERED_LOW)?)
            }
            READ_VERSION => Self::ReadVersion,
            READ_STATUS => Self::ReadStatus,
            READ_HEATER_MODE => Self::ReadHeaterMode,
            READ_TARGET_TEMP => Self::ReadTargetTemp,
            READ_TARGET_SENSOR => Self::ReadTargetSensor,
            READ_PWM => Self::ReadPwm,
            READ_MAX_TEMP => Self::ReadMaxTemp,
            WRITE_HEATER_MODE => Self::WriteHeaterMode(byte(op, payload)?),
            WRITE_TARGET_TEMP => Self::WriteTargetTemp(word(op, payload)?),
            WRITE_TARGET_SENSOR => Self::WriteTargetSensor(byte(op, payload)?),
            WRITE_PWM_DUTY => Self::WritePwmDuty(byte(op, payload)?),
            WRITE_MAX_TEMP => Self::WriteMaxTemp(word(op, payload)?),
            RESET => Self::Reset,
            _ => return Err(ProtocolError::UnknownOpcode(op)),
        };

        Ok(command)
    }

    /// Whether the command answers with a value
    #[must_use]
    pub const fn is_read(&self) -> bool {
        !matches!(
            self,
            Self::WriteHeaterMode(_)
                | Self::WriteTargetTemp(_)
                | Self::WriteTargetSensor(_)
                | Self::WritePwmDuty(_)
                | Self::WriteMaxTemp(_)
                | Self::Reset
        )
    }
}

fn channel(opcode: u8, first: u8) -> Result<SensorIndex, ProtocolError> {
    SensorIndex::new(opcode - first).ok_or(ProtocolError::UnknownOpcode(opcode))
}

#[allow(clippy::cast_possible_truncation)]
fn short(opcode: u8, expected: u8, payload: &[u8]) -> ProtocolError {
    ProtocolError::ShortPayload {
        opcode,
        expected,
        got: payload.len() as u8,
    }
}

fn byte(opcode: u8, payload: &[u8]) -> Result<u8, ProtocolError> {
    payload
        .first()
        .copied()
        .ok_or_else(|| short(opcode, 1, payload))
}

fn word(opcode: u8, payload: &[u8]) -> Result<u16, ProtocolError> {
    match payload {
        [low, high, ..] => Ok(u16::from_le_bytes([*low, *high])),
        _ => Err(short(opcode, 2, payload)),
    }
}
