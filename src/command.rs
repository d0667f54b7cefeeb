//! Command task: runs each I2C request through the protocol dispatcher.

use defmt::*;
use heater_core::protocol::{self, Registers, Reply};
use rtic::{mutex_prelude::*, Mutex};

use crate::app::i2c1::Context;

/// I2C1 event handler
///
/// Dispatching happens under the configuration, sensor and heater locks, so a request
/// never sees a half-finished control tick and a trip always lands before or after it.
#[cfg_attr(feature = "sizing", inline(never))]
pub fn i2c_event(cx: Context<'_>) {
    let target = cx.local.target;
    let mut config = cx.shared.config;
    let mut sensors = cx.shared.sensors;
    let mut heater = cx.shared.heater;
    let mut compare = cx.shared.compare;

    target.service(|request| {
        let reply = (&mut config, &mut sensors, &mut heater, &mut compare).lock(
            |config, sensors, heater, compare| {
                let regs = Registers {
                    config,
                    sensors,
                    heater,
                    compare,
                };
                unwrap!(protocol::dispatch(request, regs))
            },
        );

        match reply {
            Reply::Respond(response) => {
                debug!("{=[u8]:#x} -> {=[u8]:#x}", request, response.as_bytes());
            }
            Reply::Rejected(e) => debug!("{=[u8]:#x} rejected: {}: {}", request, e.as_str(), e),
            Reply::Reset => {
                info!("Resetting...");
                cortex_m::peripheral::SCB::sys_reset();
            }
        }

        reply.response()
    });
}
