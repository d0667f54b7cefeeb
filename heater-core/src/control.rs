//! The control-timer tick: interlock on every tick, PID on every divided tick.

use embedded_hal::PwmPin;

use crate::{
    config::{ControlConfig, HeaterMode, Status},
    heater::HeaterPin,
    pid::{self, PidController, TickDivider, MIN_OUTPUT},
    safety::{self, SafetyStatus},
    sensors::SensorBank,
};

/// What a control tick did, for logging and the PID indicator
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// The interlock forced the heater off; `latched` is set if the trip flag was
    /// already raised before this tick
    Tripped {
        channel: u8,
        reading: u16,
        latched: bool,
    },
    /// Not a controller tick
    Idle,
    /// Controller tick outside PID mode; the compare output was zeroed
    Inactive,
    /// Control sensor reading out of range; the compare output was zeroed
    SensorFault { reading: u16 },
    /// New compare value written
    Updated { output: u16 },
}

/// PID activity indicator action
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    Toggle,
    Off,
    Keep,
}

impl TickOutcome {
    /// The indicator blinks at the controller rate while PID is running
    #[must_use]
    pub const fn indicator(self) -> Indicator {
        match self {
            Self::Updated { .. } => Indicator::Toggle,
            Self::Tripped { .. } | Self::Inactive | Self::SensorFault { .. } => Indicator::Off,
            Self::Idle => Indicator::Keep,
        }
    }
}

/// State owned by the control-timer handler
#[derive(Debug, Default, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlLoop {
    divider: TickDivider,
    pid: PidController,
}

impl ControlLoop {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            divider: TickDivider::new(),
            pid: PidController::new(),
        }
    }

    /// Handle one control-timer tick.
    pub fn tick<H, C>(
        &mut self,
        config: &mut ControlConfig,
        sensors: &SensorBank,
        heater: &mut H,
        compare: &mut C,
    ) -> Result<TickOutcome, H::Error>
    where
        H: HeaterPin,
        C: PwmPin<Duty = u16>,
    {
        let due = self.divider.advance();

        if let SafetyStatus::OverTemperature { channel, reading } = safety::check(config, sensors)
        {
            let latched = config.status.contains(Status::MAX_TEMP);
            safety::trip(config, heater, compare)?;
            return Ok(TickOutcome::Tripped {
                channel,
                reading,
                latched,
            });
        }

        if !due {
            return Ok(TickOutcome::Idle);
        }

        if config.heater_mode != HeaterMode::Pid {
            compare.set_duty(MIN_OUTPUT);
            return Ok(TickOutcome::Inactive);
        }

        let reading = sensors.raw(config.control_sensor);
        if !pid::plausible(reading) {
            compare.set_duty(self.pid.hold());
            return Ok(TickOutcome::SensorFault { reading });
        }

        let output = self.pid.update(config.set_point, reading);
        compare.set_duty(output);
        Ok(TickOutcome::Updated { output })
    }

    #[must_use]
    pub const fn pid(&self) -> &PidController {
        &self.pid
    }
}
