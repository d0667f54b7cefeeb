//! I2C1 target (slave) transport
//!
//! The master writes a request, then reads the response either after a repeated start
//! or in a separate transaction. A request is handed to the dispatcher when the write
//! phase ends; the response is clocked out during the next read phase and padded with
//! zeros.

use defmt::*;
use heater_core::protocol::{Request, Response};
use stm32f0xx_hal::pac::{I2C1, RCC};

use crate::board::{I2C_ADDRESS, I2C_TIMINGR};

const CR1_PE: u32 = 1 << 0;
const CR1_TXIE: u32 = 1 << 1;
const CR1_RXIE: u32 = 1 << 2;
const CR1_ADDRIE: u32 = 1 << 3;
const CR1_NACKIE: u32 = 1 << 4;
const CR1_STOPIE: u32 = 1 << 5;
const CR1_ERRIE: u32 = 1 << 7;

const OAR1_OA1EN: u32 = 1 << 15;

const ISR_TXE: u32 = 1 << 0;
const ISR_TXIS: u32 = 1 << 1;
const ISR_RXNE: u32 = 1 << 2;
const ISR_ADDR: u32 = 1 << 3;
const ISR_NACKF: u32 = 1 << 4;
const ISR_STOPF: u32 = 1 << 5;
const ISR_BERR: u32 = 1 << 8;
const ISR_ARLO: u32 = 1 << 9;
const ISR_OVR: u32 = 1 << 10;
const ISR_DIR: u32 = 1 << 16;

const RCC_APB1ENR_I2C1EN: u32 = 1 << 21;

/// Bus fault reported by the peripheral
#[derive(Debug, Format, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// Misplaced start or stop condition
    Bus,
    /// Lost arbitration while driving SDA
    ArbitrationLost,
    /// Receive overrun or transmit underrun
    Overrun,
}

impl Error {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bus => "Bus error",
            Self::ArbitrationLost => "Arbitration lost",
            Self::Overrun => "Overrun/underrun",
        }
    }

    const fn from_isr(isr: u32) -> Option<Self> {
        if isr & ISR_BERR != 0 {
            Some(Self::Bus)
        } else if isr & ISR_ARLO != 0 {
            Some(Self::ArbitrationLost)
        } else if isr & ISR_OVR != 0 {
            Some(Self::Overrun)
        } else {
            None
        }
    }
}

/// I2C1 in target mode at [`I2C_ADDRESS`]
pub struct I2cTarget {
    i2c: I2C1,
    request: Request,
    response: Response,
    sent: usize,
    reading: bool,
}

impl I2cTarget {
    /// Enable the peripheral and start listening on the bus.
    ///
    /// PB6/PB7 must already be in AF1 open-drain mode.
    pub fn new(i2c: I2C1) -> Self {
        // SAFETY: single read-modify-write during init, before interrupts are enabled
        unsafe {
            (*RCC::ptr())
                .apb1enr
                .modify(|r, w| w.bits(r.bits() | RCC_APB1ENR_I2C1EN));
        }

        i2c.cr1.write(|w| unsafe { w.bits(0) });
        i2c.timingr.write(|w| unsafe { w.bits(I2C_TIMINGR) });
        i2c.oar1
            .write(|w| unsafe { w.bits(OAR1_OA1EN | (u32::from(I2C_ADDRESS) << 1)) });
        i2c.cr1.write(|w| unsafe {
            w.bits(
                CR1_PE | CR1_TXIE | CR1_RXIE | CR1_ADDRIE | CR1_NACKIE | CR1_STOPIE | CR1_ERRIE,
            )
        });

        Self {
            i2c,
            request: Request::new(),
            response: Response::empty(),
            sent: 0,
            reading: false,
        }
    }

    /// Handle the pending I2C1 interrupt flags.
    ///
    /// `handler` is called with each complete request and returns its response.
    pub fn service<F>(&mut self, mut handler: F)
    where
        F: FnMut(&[u8]) -> Response,
    {
        let isr = self.i2c.isr.read().bits();

        if let Some(e) = Error::from_isr(isr) {
            error!("I2C error: {}: {}", e.as_str(), e);
            self.i2c
                .icr
                .write(|w| unsafe { w.bits(ISR_BERR | ISR_ARLO | ISR_OVR) });
            self.request.clear();
            self.reading = false;
        }

        if isr & ISR_RXNE != 0 {
            #[allow(clippy::cast_possible_truncation)]
            let byte = self.i2c.rxdr.read().bits() as u8;
            if self.request.push(byte).is_err() {
                trace!("Request truncated, dropped {=u8:#x}", byte);
            }
        }

        if isr & ISR_ADDR != 0 {
            if isr & ISR_DIR != 0 {
                // Read phase, possibly right after a repeated start
                self.complete(&mut handler);
                self.sent = 0;
                self.reading = true;
                // Flush anything left in TXDR from an earlier read
                self.i2c.isr.write(|w| unsafe { w.bits(ISR_TXE) });
            } else {
                self.request.clear();
            }
            self.i2c.icr.write(|w| unsafe { w.bits(ISR_ADDR) });
        }

        if isr & ISR_TXIS != 0 {
            let byte = self.response.byte(self.sent);
            self.sent += 1;
            self.i2c.txdr.write(|w| unsafe { w.bits(u32::from(byte)) });
        }

        if isr & ISR_NACKF != 0 {
            self.i2c.icr.write(|w| unsafe { w.bits(ISR_NACKF) });
        }

        if isr & ISR_STOPF != 0 {
            self.i2c.icr.write(|w| unsafe { w.bits(ISR_STOPF) });
            if self.reading {
                trace!("Sent {=usize} bytes", self.sent);
                self.response = Response::empty();
                self.reading = false;
            } else {
                self.complete(&mut handler);
            }
        }
    }

    fn complete<F>(&mut self, handler: &mut F)
    where
        F: FnMut(&[u8]) -> Response,
    {
        if !self.request.is_empty() {
            self.response = handler(&self.request);
            self.request.clear();
        }
    }
}
