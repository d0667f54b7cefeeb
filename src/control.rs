//! Control-timer task

use defmt::*;
use heater_core::control::{Indicator, TickOutcome};
use rtic::{mutex_prelude::*, Mutex};
use stm32f0xx_hal::prelude::*;

use crate::{app::tim1_update::Context, board};

/// TIM1 update handler: interlock on every tick, PID every 251st.
#[cfg_attr(feature = "sizing", inline(never))]
pub fn control_tick(cx: Context<'_>) {
    board::clear_update_flag();

    let control = cx.local.control;
    let outcome = (
        cx.shared.config,
        cx.shared.sensors,
        cx.shared.heater,
        cx.shared.compare,
    )
        .lock(|config, sensors, heater, compare| control.tick(config, sensors, heater, compare));
    let outcome = unwrap!(outcome);

    match outcome {
        TickOutcome::Tripped {
            channel,
            reading,
            latched: false,
        } => warn!(
            "Over temperature on sensor {=u8}: {=u16}, heater off",
            channel, reading
        ),
        TickOutcome::Tripped { .. } => trace!("Interlock still tripped"),
        TickOutcome::SensorFault { reading } => {
            warn!("Control sensor out of range: {=u16:#x}", reading);
        }
        TickOutcome::Updated { output } => trace!(
            "PID output: {=u16}, integrator: {=i32}",
            output,
            control.pid().error_sum()
        ),
        TickOutcome::Idle | TickOutcome::Inactive => {}
    }

    let indicator = cx.local.indicator;
    match outcome.indicator() {
        Indicator::Toggle => unwrap!(indicator.toggle()),
        Indicator::Off => unwrap!(indicator.set_low()),
        Indicator::Keep => {}
    }
}
