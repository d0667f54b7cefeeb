//! Control configuration shared by the control loop and the command protocol.
//!
//! All values are raw ADC codes; nothing here survives a reset.

use core::fmt;

/// Number of analog sensor channels on the board
pub const CHANNEL_COUNT: usize = 8;

/// Firmware version reported over the command protocol (3 digits: major, minor, rev)
pub const FIRMWARE_VERSION: u16 = 220;

/// ADC codes of the TH1 thermistor divider (NTCS0603E3103JMT) at reference temperatures
pub mod codes {
    pub const TEMP_120C: u16 = 3893;
    pub const TEMP_80C: u16 = 3555;
    pub const TEMP_70C: u16 = 3397;
    pub const TEMP_60C: u16 = 3192;
    pub const TEMP_50C: u16 = 2934;
    pub const TEMP_40C: u16 = 2618;
    pub const TEMP_25C: u16 = 2048;
    pub const TEMP_0C: u16 = 1044;
}

pub const DEFAULT_SET_POINT: u16 = codes::TEMP_0C;
pub const DEFAULT_PWM_DUTY: u8 = 255;
pub const DEFAULT_MAX_TEMP: u16 = codes::TEMP_120C;

/// Heater operating mode
///
/// The discriminants are the protocol codes.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HeaterMode {
    #[default]
    Off = 0x00,
    Pid = 0x01,
    Pwm = 0x02,
}

impl HeaterMode {
    /// Decode a protocol mode byte.
    ///
    /// Anything that is not a known mode turns the heater off.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Pid,
            0x02 => Self::Pwm,
            _ => Self::Off,
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// A channel index that is always below [`CHANNEL_COUNT`]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorIndex(u8);

impl SensorIndex {
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < CHANNEL_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Rejected channel index
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidSensor(pub u8);

impl TryFrom<u8> for SensorIndex {
    type Error = InvalidSensor;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidSensor(value))
    }
}

impl fmt::Display for SensorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Board status flags, as reported by the read-board-status command
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status(u16);

impl Status {
    /// The board is powered and running
    pub const ON: Self = Self(1 << 0);
    /// The over-temperature interlock has tripped since the last mode write
    pub const MAX_TEMP: Self = Self(1 << 1);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

/// Runtime configuration of the heater controller
///
/// `status` and `heater_mode` are also force-written by the interlock from the control
/// tick; every other field is only written by the command dispatcher.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlConfig {
    /// Target reading of the control sensor
    pub set_point: u16,
    /// Channel the PID controller regulates
    pub control_sensor: SensorIndex,
    pub heater_mode: HeaterMode,
    /// Software PWM duty, out of 256
    pub pwm_duty: u8,
    /// Interlock threshold; 0 disables the interlock
    pub max_temp: u16,
    pub status: Status,
}

impl ControlConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set_point: DEFAULT_SET_POINT,
            control_sensor: SensorIndex(0),
            heater_mode: HeaterMode::Off,
            pwm_duty: DEFAULT_PWM_DUTY,
            max_temp: DEFAULT_MAX_TEMP,
            status: Status::ON,
        }
    }

    #[must_use]
    pub const fn interlock_enabled(&self) -> bool {
        self.max_temp != 0
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::new()
    }
}
