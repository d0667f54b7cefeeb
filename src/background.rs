//! Background task: conversion requests and the software PWM pass

use defmt::{unreachable, *};
use embedded_hal::digital::v2::StatefulOutputPin;
use rtic::{mutex_prelude::*, Mutex};
use rtic_sync::channel::{ReceiveError, Receiver};

use crate::{adc, app::background::Context};

#[cfg_attr(feature = "sizing", inline(never))]
pub async fn background(mut cx: Context<'_>, mut wake: Receiver<'static, (), 1>) {
    let actuator = cx.local.actuator;

    loop {
        adc::start_conversion();

        match wake.recv().await {
            Ok(()) => {}
            Err(ReceiveError::Empty) => continue,
            Err(ReceiveError::NoSender) => unreachable!("Conversion task dropped its sender"),
        }

        let skip = (&mut cx.shared.config, &mut cx.shared.heater).lock(|config, heater| {
            unwrap!(actuator.pass(config, heater));
            trace!(
                "PWM pass {=u8}: heater {=bool}",
                actuator.counter(),
                unwrap!(heater.is_set_high())
            );
            actuator.skip_mask(config)
        });

        cx.shared.skip.lock(|mask| *mask = skip);
    }
}
