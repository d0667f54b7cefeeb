//! Heater output driver on PA8.

use core::convert::Infallible;

use defmt::unwrap;
use embedded_hal::digital::v2::{OutputPin, StatefulOutputPin};
use heater_core::heater::{Drive, HeaterPin};
use stm32f0xx_hal::pac::GPIOA;

const PIN: u32 = 8;
const MODER_MASK: u32 = 0b11 << (PIN * 2);
const MODER_OUTPUT: u32 = 0b01 << (PIN * 2);
const MODER_ALTERNATE: u32 = 0b10 << (PIN * 2);

/// A heater on PA8 that is either driven as GPIO or handed to TIM1 CH1.
///
/// PA8 must already be set up as AF2 push-pull; routing only flips its mode between
/// general-purpose output and alternate function.
pub struct BoardHeater {
    drive: Drive,
}

impl BoardHeater {
    /// Take over PA8 as a de-asserted software output.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let mut heater = Self {
            drive: Drive::Compare,
        };
        unwrap!(heater.set_low());
        unwrap!(heater.route(Drive::Software));
        heater
    }

    fn gpio() -> &'static stm32f0xx_hal::pac::gpioa::RegisterBlock {
        // SAFETY: PA8 is only ever written through this driver after init, and BSRR
        // writes are atomic
        unsafe { &*GPIOA::ptr() }
    }
}

impl OutputPin for BoardHeater {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Self::gpio().bsrr.write(|w| unsafe { w.bits(1 << (PIN + 16)) });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Self::gpio().bsrr.write(|w| unsafe { w.bits(1 << PIN) });
        Ok(())
    }
}

impl StatefulOutputPin for BoardHeater {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(Self::gpio().odr.read().bits() & (1 << PIN) != 0)
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }
}

impl HeaterPin for BoardHeater {
    fn route(&mut self, drive: Drive) -> Result<(), Self::Error> {
        let mode = match drive {
            Drive::Software => MODER_OUTPUT,
            Drive::Compare => MODER_ALTERNATE,
        };
        // MODER is shared with the sensor and unused pins of port A, which are only
        // written during init
        cortex_m::interrupt::free(|_| {
            Self::gpio()
                .moder
                .modify(|r, w| unsafe { w.bits((r.bits() & !MODER_MASK) | mode) });
        });
        self.drive = drive;
        Ok(())
    }

    fn drive(&self) -> Drive {
        self.drive
    }
}
