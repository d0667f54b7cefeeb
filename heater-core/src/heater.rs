//! Heater output: mode state machine, software PWM and pin routing.

use embedded_hal::digital::v2::OutputPin;

use crate::{
    config::{ControlConfig, HeaterMode},
    sensors::ChannelMask,
};

/// What drives the heater pin
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drive {
    /// Plain GPIO output, driven by [`HeaterActuator`] or the interlock
    Software,
    /// Timer compare output, driven by the PID controller
    Compare,
}

/// Heater output pin that can be handed between software and the timer compare unit.
pub trait HeaterPin: OutputPin {
    /// Switch the pin over to `drive`.
    ///
    /// The pin must be driven by exactly one side once this returns.
    fn route(&mut self, drive: Drive) -> Result<(), Self::Error>;

    fn drive(&self) -> Drive;
}

/// Route the heater pin for `mode`.
///
/// Turning the heater off de-asserts the pin before taking it back from the timer.
pub fn apply_mode<H: HeaterPin>(heater: &mut H, mode: HeaterMode) -> Result<(), H::Error> {
    match mode {
        HeaterMode::Pid => heater.route(Drive::Compare),
        HeaterMode::Pwm => heater.route(Drive::Software),
        HeaterMode::Off => {
            heater.set_low()?;
            heater.route(Drive::Software)
        }
    }
}

/// Software PWM state, advanced once per background pass
#[derive(Debug, Default, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaterActuator {
    counter: u8,
    asserted: bool,
}

impl HeaterActuator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: 0,
            asserted: false,
        }
    }

    /// Drive the pin for one background pass.
    ///
    /// In PID mode the compare unit owns the pin and this does nothing.
    pub fn pass<H: HeaterPin>(
        &mut self,
        config: &ControlConfig,
        heater: &mut H,
    ) -> Result<(), H::Error> {
        match config.heater_mode {
            HeaterMode::Off => {
                self.asserted = false;
                heater.set_low()
            }
            HeaterMode::Pwm => {
                self.asserted = self.counter < config.pwm_duty;
                self.counter = self.counter.wrapping_add(1);
                if self.asserted {
                    heater.set_high()
                } else {
                    heater.set_low()
                }
            }
            HeaterMode::Pid => {
                self.asserted = false;
                Ok(())
            }
        }
    }

    /// Channels the next conversion should not capture.
    ///
    /// Heater voltage and current are meaningless while software PWM holds the heater off.
    #[must_use]
    pub fn skip_mask(&self, config: &ControlConfig) -> ChannelMask {
        if config.heater_mode == HeaterMode::Pwm && !self.asserted {
            ChannelMask::HEATER_SENSE
        } else {
            ChannelMask::NONE
        }
    }

    #[must_use]
    pub const fn counter(&self) -> u8 {
        self.counter
    }

    /// Whether the last software pass left the heater on
    #[must_use]
    pub const fn asserted(&self) -> bool {
        self.asserted
    }
}
