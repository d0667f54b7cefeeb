//! Board constants and control-timer plumbing
//!
//! The HAL sets TIM1 up as a PWM timer from a frequency; the control loop needs the
//! exact register values below instead, so they are written over the HAL's choice.

use fugit::HertzU32;
use static_assertions::{const_assert, const_assert_eq};
use stm32f0xx_hal::{
    pac::TIM1,
    pwm::{PwmChannels, C1},
};

/// System, AHB and APB clock
pub const SYSCLK: HertzU32 = HertzU32::MHz(24);

/// TIM1 counter clock after the prescaler
pub const COUNTER_CLOCK: HertzU32 = HertzU32::kHz(250);

/// TIM1 prescaler register value
#[allow(clippy::cast_possible_truncation)]
pub const CONTROL_PSC: u16 = (SYSCLK.raw() / COUNTER_CLOCK.raw() - 1) as u16;

/// TIM1 auto-reload value, which is also the compare full scale
pub const CONTROL_ARR: u16 = 1000;

/// Control tick rate, one update interrupt per counter period
pub const CONTROL_RATE: HertzU32 = HertzU32::Hz(250);

/// 7-bit I2C target address
pub const I2C_ADDRESS: u8 = 0x08;

/// I2C1 TIMINGR for 100 kHz from the 8 MHz HSI kernel clock
pub const I2C_TIMINGR: u32 = 0x1042_0F13;

const_assert_eq!(SYSCLK.raw() % COUNTER_CLOCK.raw(), 0);
const_assert_eq!(CONTROL_ARR, heater_core::pid::MAX_OUTPUT);
const_assert!(COUNTER_CLOCK.raw() / CONTROL_RATE.raw() == CONTROL_ARR as u32);

/// TIM1 channel 1, the heater compare output in PID mode
pub type HeaterCompare = PwmChannels<TIM1, C1>;

const TIM_DIER_UIE: u32 = 1 << 0;
const TIM_SR_UIF: u32 = 1 << 0;
const TIM_EGR_UG: u32 = 1 << 0;

/// Reprogram TIM1 for the control tick and enable its update interrupt.
///
/// Must run after the HAL has configured TIM1 for PWM.
pub fn configure_control_timer() {
    // SAFETY: TIM1 is owned by `HeaterCompare`, which only touches CCR1 and CCER
    let tim = unsafe { &*TIM1::ptr() };

    tim.psc.write(|w| unsafe { w.bits(u32::from(CONTROL_PSC)) });
    tim.arr.write(|w| unsafe { w.bits(u32::from(CONTROL_ARR)) });

    // Load the shadow registers now, not at the end of the HAL's period
    tim.egr.write(|w| unsafe { w.bits(TIM_EGR_UG) });
    clear_update_flag();

    tim.dier.modify(|r, w| unsafe { w.bits(r.bits() | TIM_DIER_UIE) });
}

/// Acknowledge the TIM1 update interrupt.
pub fn clear_update_flag() {
    // SAFETY: SR is rc_w0; writing 1 to the other flags leaves them untouched
    unsafe {
        (*TIM1::ptr()).sr.write(|w| w.bits(!TIM_SR_UIF));
    }
}
