use embedded_hal::PwmPin;

use super::{Command, ProtocolError, Response};
use crate::{
    config::{ControlConfig, HeaterMode, SensorIndex, Status, FIRMWARE_VERSION},
    heater::{self, HeaterPin},
    sensors::SensorBank,
};

/// Everything a command can read or write
pub struct Registers<'a, H, C> {
    pub config: &'a mut ControlConfig,
    pub sensors: &'a SensorBank,
    pub heater: &'a mut H,
    pub compare: &'a C,
}

/// Outcome of one request
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Clock this out in the next read phase
    Respond(Response),
    /// Nothing was changed; answer with nothing
    Rejected(ProtocolError),
    /// The master asked for a soft reset
    Reset,
}

impl Reply {
    /// The bytes to clock out for this reply
    #[must_use]
    pub const fn response(&self) -> Response {
        match self {
            Self::Respond(response) => *response,
            Self::Rejected(_) | Self::Reset => Response::empty(),
        }
    }
}

/// Decode and execute one request.
pub fn dispatch<H, C>(request: &[u8], regs: Registers<'_, H, C>) -> Result<Reply, H::Error>
where
    H: HeaterPin,
    C: PwmPin<Duty = u16>,
{
    match Command::parse(request) {
        Ok(command) => execute(command, regs),
        Err(e) => Ok(Reply::Rejected(e)),
    }
}

/// Execute one decoded command.
pub fn execute<H, C>(command: Command, regs: Registers<'_, H, C>) -> Result<Reply, H::Error>
where
    H: HeaterPin,
    C: PwmPin<Duty = u16>,
{
    let Registers {
        config,
        sensors,
        heater,
        compare,
    } = regs;

    let value = match command {
        Command::ReadRaw(index) => sensors.raw(index),
        Command::ReadFiltered(index) => sensors.filtered(index),
        Command::ReadVersion => FIRMWARE_VERSION,
        Command::ReadStatus => config.status.bits(),
        Command::ReadHeaterMode => config.heater_mode.code().into(),
        Command::ReadTargetTemp => config.set_point,
        Command::ReadTargetSensor => config.control_sensor.get().into(),
        Command::ReadPwm => match config.heater_mode {
            HeaterMode::Pid => compare.get_duty(),
            HeaterMode::Off | HeaterMode::Pwm => config.pwm_duty.into(),
        },
        Command::ReadMaxTemp => config.max_temp,

        Command::WriteHeaterMode(code) => {
            let mode = HeaterMode::from_code(code);
            heater::apply_mode(heater, mode)?;
            config.heater_mode = mode;
            config.status.remove(Status::MAX_TEMP);
            return Ok(Reply::Respond(Response::empty()));
        }
        Command::WriteTargetTemp(set_point) => {
            config.set_point = set_point;
            return Ok(Reply::Respond(Response::empty()));
        }
        Command::WriteTargetSensor(index) => {
            let Some(index) = SensorIndex::new(index) else {
                return Ok(Reply::Rejected(ProtocolError::SensorOutOfRange(index)));
            };
            config.control_sensor = index;
            return Ok(Reply::Respond(Response::empty()));
        }
        Command::WritePwmDuty(duty) => {
            config.pwm_duty = duty;
            return Ok(Reply::Respond(Response::empty()));
        }
        Command::WriteMaxTemp(max_temp) => {
            config.max_temp = max_temp;
            return Ok(Reply::Respond(Response::empty()));
        }
        Command::Reset => return Ok(Reply::Reset),
    };

    Ok(Reply::Respond(Response::word(value)))
}
