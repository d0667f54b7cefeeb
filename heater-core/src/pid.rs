//! Fixed-point PI controller driving the heater compare output.
//!
//! Arithmetic is 16-bit signed, wrapping, with the integrator clamped before the
//! proportional term is added. Gains are compile-time constants.

use num_traits::clamp;
use static_assertions::const_assert;

/// Proportional gain
pub const P_GAIN: i16 = 3;
/// The integrator accumulates `error >> I_SHIFT` per update
pub const I_SHIFT: u32 = 3;

pub const MIN_OUTPUT: u16 = 0;
/// Full scale of the compare output
pub const MAX_OUTPUT: u16 = 1000;

/// Lowest reading accepted from the control sensor
pub const MIN_READING: u16 = 0x0010;
/// Highest reading accepted from the control sensor (12-bit full scale)
pub const MAX_READING: u16 = 0x0FFF;

/// The tick counter has to exceed this before the controller updates, so one update
/// happens every `TICK_DIVIDER + 1` control-timer ticks.
pub const TICK_DIVIDER: u16 = 250;

const_assert!(MIN_OUTPUT < MAX_OUTPUT);
const_assert!(MAX_OUTPUT <= i16::MAX as u16);

/// Whether the control sensor reading is plausible enough to act on
#[must_use]
pub const fn plausible(reading: u16) -> bool {
    reading >= MIN_READING && reading <= MAX_READING
}

/// PI controller state
///
/// Survives mode changes; only a reset clears the integrator.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidController {
    error_sum: i32,
    last_output: u16,
}

impl PidController {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            error_sum: 0,
            last_output: 0,
        }
    }

    /// Run one update and return the new compare value in `MIN_OUTPUT..=MAX_OUTPUT`.
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn update(&mut self, set_point: u16, reading: u16) -> u16 {
        let error = (set_point as i16).wrapping_sub(reading as i16);

        self.error_sum = clamp(
            self.error_sum + i32::from(error >> I_SHIFT),
            i32::from(MIN_OUTPUT),
            i32::from(MAX_OUTPUT),
        );

        // error_sum is within 0..=1000 here, so the cast is exact
        let output = P_GAIN
            .wrapping_mul(error)
            .wrapping_add(self.error_sum as i16);
        let output = clamp(output, MIN_OUTPUT as i16, MAX_OUTPUT as i16);

        self.last_output = output as u16;
        self.last_output
    }

    /// Zero the output without touching the integrator.
    pub fn hold(&mut self) -> u16 {
        self.last_output = MIN_OUTPUT;
        self.last_output
    }

    #[must_use]
    pub const fn error_sum(&self) -> i32 {
        self.error_sum
    }

    #[must_use]
    pub const fn last_output(&self) -> u16 {
        self.last_output
    }
}

/// Divides the control timer down to the PID update rate
#[derive(Debug, Default, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickDivider {
    count: u16,
}

impl TickDivider {
    #[must_use]
    pub const fn new() -> Self {
        Self { count: 0 }
    }

    /// Count one timer tick. Returns `true` on the ticks that should run the controller.
    pub fn advance(&mut self) -> bool {
        self.count += 1;
        if self.count > TICK_DIVIDER {
            self.count = 0;
            true
        } else {
            false
        }
    }
}
