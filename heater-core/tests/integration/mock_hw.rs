//! Mock heater pin and compare output for integration tests.
//!
//! Every pin operation is recorded so tests can assert on ordering, e.g. that a trip
//! de-asserts the pin before taking it back from the timer.

use std::convert::Infallible;

use embedded_hal::{digital::v2::OutputPin, PwmPin};
use heater_core::{
    config::ControlConfig,
    heater::{Drive, HeaterPin},
    protocol::{self, Registers, Reply},
    sensors::SensorBank,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PinCall {
    SetLow,
    SetHigh,
    Route(Drive),
}

pub struct MockHeater {
    pub high: bool,
    pub drive: Drive,
    pub calls: Vec<PinCall>,
}

#[allow(dead_code)]
impl MockHeater {
    pub fn new() -> Self {
        Self {
            high: false,
            drive: Drive::Software,
            calls: Vec::new(),
        }
    }

    pub fn last_call(&self) -> Option<PinCall> {
        self.calls.last().copied()
    }
}

impl OutputPin for MockHeater {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.calls.push(PinCall::SetLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.calls.push(PinCall::SetHigh);
        Ok(())
    }
}

impl HeaterPin for MockHeater {
    fn route(&mut self, drive: Drive) -> Result<(), Self::Error> {
        self.drive = drive;
        self.calls.push(PinCall::Route(drive));
        Ok(())
    }

    fn drive(&self) -> Drive {
        self.drive
    }
}

pub struct MockCompare {
    pub duty: u16,
    pub writes: usize,
}

#[allow(dead_code)]
impl MockCompare {
    pub fn new() -> Self {
        Self { duty: 0, writes: 0 }
    }
}

impl PwmPin for MockCompare {
    type Duty = u16;

    fn disable(&mut self) {}

    fn enable(&mut self) {}

    fn get_duty(&self) -> u16 {
        self.duty
    }

    fn get_max_duty(&self) -> u16 {
        1000
    }

    fn set_duty(&mut self, duty: u16) {
        self.duty = duty;
        self.writes += 1;
    }
}

/// The shared state of the board, as the firmware holds it
pub struct MockBoard {
    pub config: ControlConfig,
    pub sensors: SensorBank,
    pub heater: MockHeater,
    pub compare: MockCompare,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            config: ControlConfig::new(),
            sensors: SensorBank::new(),
            heater: MockHeater::new(),
            compare: MockCompare::new(),
        }
    }

    /// Run one request through the dispatcher.
    pub fn send(&mut self, request: &[u8]) -> Reply {
        let regs = Registers {
            config: &mut self.config,
            sensors: &self.sensors,
            heater: &mut self.heater,
            compare: &self.compare,
        };
        match protocol::dispatch(request, regs) {
            Ok(reply) => reply,
            Err(never) => match never {},
        }
    }

    /// Send a read command and decode the two-byte answer.
    pub fn read(&mut self, opcode: u8) -> Option<u16> {
        self.send(&[opcode]).response().value()
    }
}
