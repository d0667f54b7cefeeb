//! ADC scan of the eight sensor channels
//!
//! One conversion request converts IN0..=IN7 in order. The conversion-complete task
//! collects the results and hands a full batch to the sensor bank.

use defmt::*;
use heater_core::{config::CHANNEL_COUNT, sensors::Batch};
use rtic::Mutex;
use stm32f0xx_hal::{
    gpio::{
        gpioa::{PA0, PA1, PA2, PA3, PA4, PA5, PA6, PA7},
        Analog,
    },
    pac::{ADC, RCC},
};

use crate::app::adc_comp::Context;

/// The analog inputs, claimed so nothing else reconfigures them
pub type SensorPins = (
    PA0<Analog>,
    PA1<Analog>,
    PA2<Analog>,
    PA3<Analog>,
    PA4<Analog>,
    PA5<Analog>,
    PA6<Analog>,
    PA7<Analog>,
);

const ISR_ADRDY: u32 = 1 << 0;
const ISR_EOC: u32 = 1 << 2;
const ISR_EOSEQ: u32 = 1 << 3;
const ISR_OVR: u32 = 1 << 4;

const CR_ADEN: u32 = 1 << 0;
const CR_ADSTART: u32 = 1 << 2;
const CR_ADCAL: u32 = 1 << 31;

/// Overrun mode: keep the newest result
const CFGR1_OVRMOD: u32 = 1 << 12;
/// Clock mode: PCLK / 2, synchronous with the timer
const CFGR2_CKMODE_PCLK_DIV2: u32 = 0b01 << 30;
/// 239.5 ADC clock cycles, for the high-impedance thermistor dividers
const SMPR_SMP_239_5: u32 = 0b111;
const CHSELR_SENSORS: u32 = (1 << CHANNEL_COUNT) - 1;

const RCC_APB2ENR_ADCEN: u32 = 1 << 9;

/// Error raised while collecting a sequence
#[derive(Debug, Copy, Clone, Eq, PartialEq, Format)]
pub enum Error {
    /// A result was overwritten before it was read
    Overrun,
    /// The sequence ended with the wrong number of results
    Incomplete(usize),
}

impl Error {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Overrun => "ADC overrun",
            Self::Incomplete(_) => "Incomplete sequence",
        }
    }
}

/// Progress of the current conversion sequence
#[derive(Debug, Format)]
pub enum Sequence {
    /// Channels are still converting
    Running,
    /// The last channel was converted
    Complete(Batch),
    /// The sequence ended but its results cannot be trusted
    Discarded(Error),
}

/// Owner of the ADC peripheral
pub struct Sampler {
    adc: ADC,
    batch: Batch,
    next: usize,
    overrun: bool,
}

impl Sampler {
    /// Power up, calibrate and configure the ADC for an 8-channel scan.
    pub fn new(adc: ADC, _pins: SensorPins) -> Self {
        // SAFETY: single read-modify-write during init, before interrupts are enabled
        unsafe {
            (*RCC::ptr())
                .apb2enr
                .modify(|r, w| w.bits(r.bits() | RCC_APB2ENR_ADCEN));
        }

        adc.cfgr2.write(|w| unsafe { w.bits(CFGR2_CKMODE_PCLK_DIV2) });

        adc.cr.write(|w| unsafe { w.bits(CR_ADCAL) });
        while adc.cr.read().bits() & CR_ADCAL != 0 {}
        trace!("ADC calibration factor: {=u32}", adc.dr.read().bits());

        adc.cfgr1.write(|w| unsafe { w.bits(CFGR1_OVRMOD) });
        adc.smpr.write(|w| unsafe { w.bits(SMPR_SMP_239_5) });
        adc.chselr.write(|w| unsafe { w.bits(CHSELR_SENSORS) });
        adc.ier
            .write(|w| unsafe { w.bits(ISR_EOC | ISR_EOSEQ | ISR_OVR) });

        adc.isr.write(|w| unsafe { w.bits(ISR_ADRDY) });
        adc.cr.write(|w| unsafe { w.bits(CR_ADEN) });
        while adc.isr.read().bits() & ISR_ADRDY == 0 {}

        Self {
            adc,
            batch: [0; CHANNEL_COUNT],
            next: 0,
            overrun: false,
        }
    }

    /// Handle the pending ADC interrupt flags.
    pub fn service(&mut self) -> Sequence {
        let isr = self.adc.isr.read().bits();

        if isr & ISR_OVR != 0 {
            self.adc.isr.write(|w| unsafe { w.bits(ISR_OVR) });
            self.overrun = true;
        }

        if isr & ISR_EOC != 0 {
            // Reading DR clears EOC
            #[allow(clippy::cast_possible_truncation)]
            let reading = self.adc.dr.read().bits() as u16;
            if let Some(slot) = self.batch.get_mut(self.next) {
                *slot = reading;
            }
            self.next += 1;
        }

        if isr & ISR_EOSEQ == 0 {
            return Sequence::Running;
        }
        self.adc.isr.write(|w| unsafe { w.bits(ISR_EOSEQ) });

        let converted = core::mem::take(&mut self.next);
        if core::mem::take(&mut self.overrun) {
            Sequence::Discarded(Error::Overrun)
        } else if converted == CHANNEL_COUNT {
            Sequence::Complete(self.batch)
        } else {
            Sequence::Discarded(Error::Incomplete(converted))
        }
    }
}

/// Request one conversion sequence.
///
/// Called from the background task; the sequence completes in [`conversion_complete`].
pub fn start_conversion() {
    // SAFETY: ADSTART is write-1-only and the ADC task never writes CR
    unsafe {
        (*ADC::ptr()).cr.modify(|r, w| w.bits(r.bits() | CR_ADSTART));
    }
}

/// ADC conversion-complete task
///
/// Captures a finished batch into the sensor bank, honoring the skip mask set by the
/// background task, then wakes the background task. It is woken for discarded sequences
/// too so that it requests the next one.
#[cfg_attr(feature = "sizing", inline(never))]
pub fn conversion_complete(mut cx: Context<'_>) {
    let batch = match cx.local.sampler.service() {
        Sequence::Running => return,
        Sequence::Complete(batch) => Some(batch),
        Sequence::Discarded(e) => {
            warn!("Sequence discarded: {}: {}", e.as_str(), e);
            None
        }
    };

    if let Some(batch) = batch {
        let skip = cx.shared.skip.lock(|skip| *skip);
        cx.shared.sensors.lock(|sensors| sensors.capture(&batch, skip));
        trace!("Batch: {}", batch);
    }

    if cx.local.wake.try_send(()).is_err() {
        trace!("Background task already woken");
    }
}
