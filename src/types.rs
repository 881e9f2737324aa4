//! This module contains the typed values exchanged with the SMU.

use fugit::MicrosDurationU32;

use crate::limits::Model;

/// Used to be less ambiguous about whether something is on or off.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Disabled.
    #[default]
    Off,
    /// Enabled.
    On,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

impl core::ops::Not for State {
    type Output = State;

    fn not(self) -> Self::Output {
        match self {
            State::Off => State::On,
            State::On => State::Off,
        }
    }
}

/// What the channel sources. The other quantity is what it limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFunction {
    /// `smuX.OUTPUT_DCAMPS`
    DcAmps,
    /// `smuX.OUTPUT_DCVOLTS`
    DcVolts,
}

impl SourceFunction {
    pub const fn code(self) -> i32 {
        match self {
            SourceFunction::DcAmps => 0,
            SourceFunction::DcVolts => 1,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SourceFunction::DcAmps),
            1 => Some(SourceFunction::DcVolts),
            _ => None,
        }
    }
}

/// Measurement autorange modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Autorange {
    /// Fixed range, as set by the range attribute.
    Off,
    /// Pick the best range for each reading.
    On,
    /// Set the measure range to follow the compliance limit.
    FollowLimit,
}

impl Autorange {
    pub const fn code(self) -> i32 {
        match self {
            Autorange::Off => 0,
            Autorange::On => 1,
            Autorange::FollowLimit => 2,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Autorange::Off),
            1 => Some(Autorange::On),
            2 => Some(Autorange::FollowLimit),
            _ => None,
        }
    }
}

impl From<bool> for Autorange {
    fn from(value: bool) -> Self {
        if value { Autorange::On } else { Autorange::Off }
    }
}

/// Delay the SMU inserts before each measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureDelay {
    /// `smuX.DELAY_AUTO`, a range dependent delay chosen by the firmware.
    Auto,
    Fixed(MicrosDurationU32),
}

impl MeasureDelay {
    const AUTO_SECONDS: f64 = -1.0;

    /// The value of the `measure.delay` attribute.
    pub fn as_seconds(&self) -> f64 {
        match self {
            MeasureDelay::Auto => Self::AUTO_SECONDS,
            MeasureDelay::Fixed(delay) => delay.to_micros() as f64 / 1e6,
        }
    }

    /// Interpret a `measure.delay` value. Any negative value is the automatic delay.
    pub fn from_seconds(seconds: f64) -> Option<Self> {
        if !seconds.is_finite() {
            return None;
        }
        if seconds < 0.0 {
            return Some(MeasureDelay::Auto);
        }
        let micros = seconds * 1e6 + 0.5;
        if micros > u32::MAX as f64 {
            return None;
        }
        Some(MeasureDelay::Fixed(MicrosDurationU32::micros(micros as u32)))
    }
}

/// A single simultaneous current and voltage reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvReading {
    /// Measured current, A.
    pub current_a: f64,
    /// Measured voltage, V.
    pub voltage_v: f64,
}

impl IvReading {
    /// Resistance derived from this reading, Ohm.
    pub fn resistance_ohm(&self) -> f64 {
        self.voltage_v / self.current_a
    }

    /// Power derived from this reading, W.
    pub fn power_w(&self) -> f64 {
        self.voltage_v * self.current_a
    }
}

impl From<IvReading> for (f64, f64) {
    fn from(value: IvReading) -> Self {
        (value.current_a, value.voltage_v)
    }
}

/// The response to `*IDN?`.
///
/// E.g. `Keithley Instruments Inc., Model 2602B, 4390123, 3.2.2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub manufacturer: heapless::String<48>,
    pub model: heapless::String<24>,
    pub serial_number: heapless::String<24>,
    pub firmware_version: heapless::String<24>,
}

impl Identity {
    /// Split an identification line into its four fields.
    pub fn parse(text: &str) -> Option<Self> {
        let mut fields = text.trim().split(',').map(str::trim);
        let identity = Identity {
            manufacturer: heapless::String::try_from(fields.next()?).ok()?,
            model: heapless::String::try_from(fields.next()?).ok()?,
            serial_number: heapless::String::try_from(fields.next()?).ok()?,
            firmware_version: heapless::String::try_from(fields.next()?).ok()?,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(identity)
    }

    /// The product model, if it is one we know.
    pub fn product_model(&self) -> Option<Model> {
        Model::from_model_name(&self.model)
    }
}
