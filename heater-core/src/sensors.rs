//! Sensor conditioning: one exponential moving-average filter per ADC channel.

use fixed::types::U26F6;

use crate::config::{SensorIndex, CHANNEL_COUNT};

/// One raw reading per channel, as delivered by a single conversion sequence
pub type Batch = [u16; CHANNEL_COUNT];

/// EMA state: 6 fractional bits gives a smoothing factor of 2^-6, settling in ~64 samples.
pub type EmaState = U26F6;

/// Number of fractional bits of [`EmaState`]
pub const EMA_SHIFT: u32 = EmaState::FRAC_NBITS;

/// Every filter starts out as if it had settled on this reading
pub const EMA_START: u16 = 1024;

/// Raw readings at or above this are fed to clamped filters as 0
pub const CLAMP_THRESHOLD: u16 = 2048;

/// Channels whose filter input is clamped: heater low-side voltage and current sense
pub const CLAMPED: ChannelMask = ChannelMask::from_bits(0b0110_0000);

const HALF: EmaState = EmaState::from_bits(1 << (EMA_SHIFT - 1));

/// Set of channel indices
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(0xFF);
    /// Thermistor and external temperature inputs
    pub const TEMPERATURE: Self = Self(0b0001_1111);
    /// Heater voltage and current sense inputs
    pub const HEATER_SENSE: Self = Self(0b1110_0000);

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether `channel` is in the set; out-of-range channels never are.
    #[must_use]
    pub const fn contains(self, channel: usize) -> bool {
        channel < CHANNEL_COUNT && self.0 & (1 << channel) != 0
    }

    /// Iterate over the channel indices in the set, lowest first.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..CHANNEL_COUNT).filter(move |&ch| self.contains(ch))
    }
}

/// First-order IIR low-pass filter in fixed point
///
/// Each update adds the input at 2^-6 weight, rounds the state to the output and removes
/// the output at 2^-6 weight. A constant input is reproduced exactly once settled.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct EmaFilter {
    state: EmaState,
}

impl EmaFilter {
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(EMA_START)
    }

    #[must_use]
    pub const fn starting_at(reading: u16) -> Self {
        Self {
            state: EmaState::from_bits((reading as u32) << EMA_SHIFT),
        }
    }

    /// Feed one reading and return the filtered value.
    pub fn update(&mut self, input: u16) -> u16 {
        self.state = self.state.wrapping_add(EmaState::from_bits(input.into()));
        let output: u16 = self.state.wrapping_add(HALF).wrapping_to_num();
        self.state = self.state.wrapping_sub(EmaState::from_bits(output.into()));
        output
    }

    #[must_use]
    pub const fn state(&self) -> EmaState {
        self.state
    }
}

impl Default for EmaFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct SensorChannel {
    raw: u16,
    filtered: u16,
    filter: EmaFilter,
    clamped: bool,
}

impl SensorChannel {
    const fn new(clamped: bool) -> Self {
        Self {
            raw: 0,
            filtered: 0,
            filter: EmaFilter::new(),
            clamped,
        }
    }

    fn capture(&mut self, raw: u16) {
        self.raw = raw;
        let input = if self.clamped && raw >= CLAMP_THRESHOLD {
            // Disconnected sense inputs float to full scale
            0
        } else {
            raw
        };
        self.filtered = self.filter.update(input);
    }
}

/// Latest raw and filtered reading of every channel
///
/// Only the conversion-complete handler writes to this.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SensorBank {
    channels: [SensorChannel; CHANNEL_COUNT],
}

impl SensorBank {
    #[must_use]
    pub const fn new() -> Self {
        let mut channels = [SensorChannel::new(false); CHANNEL_COUNT];
        let mut ch = 0;
        while ch < CHANNEL_COUNT {
            channels[ch].clamped = CLAMPED.contains(ch);
            ch += 1;
        }
        Self { channels }
    }

    /// Store one conversion sequence.
    ///
    /// Channels in `skip` keep their previous raw and filtered values.
    pub fn capture(&mut self, batch: &Batch, skip: ChannelMask) {
        for (ch, (channel, &raw)) in self.channels.iter_mut().zip(batch).enumerate() {
            if !skip.contains(ch) {
                channel.capture(raw);
            }
        }
    }

    #[must_use]
    pub const fn raw(&self, index: SensorIndex) -> u16 {
        self.channels[index.as_usize()].raw
    }

    #[must_use]
    pub const fn filtered(&self, index: SensorIndex) -> u16 {
        self.channels[index.as_usize()].filtered
    }

    /// Raw readings of the channels in `mask`, paired with their index.
    pub fn raw_in(&self, mask: ChannelMask) -> impl Iterator<Item = (usize, u16)> + '_ {
        mask.iter().map(move |ch| (ch, self.channels[ch].raw))
    }
}

impl Default for SensorBank {
    fn default() -> Self {
        Self::new()
    }
}
