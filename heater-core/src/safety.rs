//! Over-temperature interlock
//!
//! Checked on every control-timer tick. A trip turns the heater off and latches
//! [`Status::MAX_TEMP`] until the next write-heater-mode command; cooling back down
//! below the threshold does not clear it.

use embedded_hal::PwmPin;

use crate::{
    config::{ControlConfig, HeaterMode, Status},
    heater::{Drive, HeaterPin},
    pid::MIN_OUTPUT,
    sensors::{ChannelMask, SensorBank},
};

/// Channels wired to temperature sensors
pub const MONITORED: ChannelMask = ChannelMask::TEMPERATURE;

/// Result of an interlock check
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All monitored readings are at or below the threshold
    Ok,
    /// `max_temp` is 0
    Disabled,
    /// First monitored channel above the threshold
    OverTemperature { channel: u8, reading: u16 },
}

impl SafetyStatus {
    #[must_use]
    pub const fn is_tripped(self) -> bool {
        matches!(self, Self::OverTemperature { .. })
    }
}

/// Compare the monitored raw readings against `config.max_temp`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn check(config: &ControlConfig, sensors: &SensorBank) -> SafetyStatus {
    if !config.interlock_enabled() {
        return SafetyStatus::Disabled;
    }

    sensors
        .raw_in(MONITORED)
        .find(|&(_, reading)| reading > config.max_temp)
        .map_or(SafetyStatus::Ok, |(channel, reading)| {
            SafetyStatus::OverTemperature {
                channel: channel as u8,
                reading,
            }
        })
}

/// Force the heater off.
///
/// The pin is de-asserted and taken back from the timer before this returns.
pub fn trip<H, C>(config: &mut ControlConfig, heater: &mut H, compare: &mut C) -> Result<(), H::Error>
where
    H: HeaterPin,
    C: PwmPin<Duty = u16>,
{
    config.heater_mode = HeaterMode::Off;
    heater.set_low()?;
    heater.route(Drive::Software)?;
    compare.set_duty(MIN_OUTPUT);
    config.status.insert(Status::MAX_TEMP);
    Ok(())
}
