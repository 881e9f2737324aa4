use fugit::MicrosDurationU32;

use crate::{
    attribute::SmuAttribute,
    tsp::TspValue,
    types::{Autorange, MeasureDelay, SourceFunction, State},
};

/// One action of a [`MeasurementSetup`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetupStep {
    /// Return the channel to its power-on defaults.
    Reset,
    Assign(SmuAttribute, TspValue),
}

impl SetupStep {
    const fn number(attribute: SmuAttribute, value: f64) -> Self {
        SetupStep::Assign(attribute, TspValue::Number(value))
    }

    const fn code(attribute: SmuAttribute, code: i32) -> Self {
        SetupStep::Assign(attribute, TspValue::Integer(code))
    }
}

/// Upper bound on the number of steps of any setup.
pub const MAX_SETUP_STEPS: usize = 12;

pub type SetupSteps = heapless::Vec<SetupStep, MAX_SETUP_STEPS>;

/// A fixed sequence of settings that puts the channel into a known state.
///
/// Steps are applied in order. Applying the same setup twice leaves the instrument in the same
/// state.
pub trait MeasurementSetup {
    fn steps(&self) -> SetupSteps;
}

/// Source voltage, measure current and voltage.
///
/// Resets the channel, sources 0 V and autoranges both measurements. Optionally fixes the
/// measure ranges and the measure delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IvSetup {
    /// Current compliance, A.
    current_limit: f64,
    nplc: f64,
    /// Fixed voltage measure range instead of autorange.
    voltage_range: Option<f64>,
    /// Fixed current measure range instead of autorange.
    current_range: Option<f64>,
    measure_delay: Option<MeasureDelay>,
}

impl IvSetup {
    pub fn new(current_limit: f64, nplc: f64) -> Self {
        Self {
            current_limit,
            nplc,
            voltage_range: None,
            current_range: None,
            measure_delay: None,
        }
    }

    /// Measure voltage on a fixed range, V.
    pub fn with_voltage_range(mut self, range: f64) -> Self {
        self.voltage_range = Some(range);
        self
    }

    /// Measure current on a fixed range, A.
    pub fn with_current_range(mut self, range: f64) -> Self {
        self.current_range = Some(range);
        self
    }

    pub fn with_measure_delay(mut self, delay: MeasureDelay) -> Self {
        self.measure_delay = Some(delay);
        self
    }
}

impl MeasurementSetup for IvSetup {
    fn steps(&self) -> SetupSteps {
        use SmuAttribute as SA;

        let mut steps = SetupSteps::new();
        steps.extend([
            SetupStep::Reset,
            SetupStep::code(SA::SourceFunction, SourceFunction::DcVolts.code()),
            SetupStep::number(SA::SourceLevelV, 0.0),
        ]);
        steps.extend([match self.current_range {
            Some(range) => SetupStep::number(SA::MeasureRangeI, range),
            None => SetupStep::code(SA::MeasureAutorangeI, Autorange::On.code()),
        }]);
        steps.extend([match self.voltage_range {
            Some(range) => SetupStep::number(SA::MeasureRangeV, range),
            None => SetupStep::code(SA::MeasureAutorangeV, Autorange::On.code()),
        }]);
        steps.extend([
            SetupStep::number(SA::SourceLimitI, self.current_limit),
            SetupStep::number(SA::MeasureNplc, self.nplc),
        ]);
        steps.extend(
            self.measure_delay
                .map(|delay| SetupStep::number(SA::MeasureDelay, delay.as_seconds())),
        );
        steps
    }
}

/// Source a small current and measure the voltage it develops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResistanceSetup {
    /// Sourced current, A.
    test_current: f64,
    nplc: f64,
    measure_delay: MeasureDelay,
    /// Voltage measure range, V.
    voltage_range: f64,
    /// Current measure range, A.
    current_range: f64,
}

impl Default for ResistanceSetup {
    /// 1 mA into the device, 5 PLC, 100 ms delay, 20 V and 1 mA ranges.
    fn default() -> Self {
        Self {
            test_current: 1e-3,
            nplc: 5.0,
            measure_delay: MeasureDelay::Fixed(MicrosDurationU32::millis(100)),
            voltage_range: 20.0,
            current_range: 1e-3,
        }
    }
}

impl ResistanceSetup {
    pub fn with_test_current(mut self, current: f64) -> Self {
        self.test_current = current;
        self
    }

    pub fn with_nplc(mut self, nplc: f64) -> Self {
        self.nplc = nplc;
        self
    }

    pub fn with_measure_delay(mut self, delay: MeasureDelay) -> Self {
        self.measure_delay = delay;
        self
    }

    pub fn with_voltage_range(mut self, range: f64) -> Self {
        self.voltage_range = range;
        self
    }

    pub fn with_current_range(mut self, range: f64) -> Self {
        self.current_range = range;
        self
    }
}

impl MeasurementSetup for ResistanceSetup {
    fn steps(&self) -> SetupSteps {
        use SmuAttribute as SA;

        let mut steps = SetupSteps::new();
        steps.extend([
            SetupStep::Reset,
            SetupStep::code(SA::SourceFunction, SourceFunction::DcAmps.code()),
            SetupStep::number(SA::SourceLevelI, self.test_current),
            SetupStep::code(SA::MeasureAutorangeV, Autorange::On.code()),
            SetupStep::number(SA::MeasureNplc, self.nplc),
            SetupStep::number(SA::MeasureDelay, self.measure_delay.as_seconds()),
            SetupStep::number(SA::MeasureRangeV, self.voltage_range),
            SetupStep::number(SA::MeasureRangeI, self.current_range),
        ]);
        steps
    }
}

/// Idle state: 0 V source, autoranged measurements, output off. Does not reset.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DefaultSetup;

impl MeasurementSetup for DefaultSetup {
    fn steps(&self) -> SetupSteps {
        use SmuAttribute as SA;

        let mut steps = SetupSteps::new();
        steps.extend([
            SetupStep::code(SA::SourceFunction, SourceFunction::DcVolts.code()),
            SetupStep::number(SA::SourceLevelV, 0.0),
            SetupStep::code(SA::MeasureAutorangeI, Autorange::On.code()),
            SetupStep::code(SA::MeasureAutorangeV, Autorange::On.code()),
            SetupStep::code(SA::SourceOutput, State::Off as i32),
        ]);
        steps
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use SmuAttribute as SA;

    fn attributes(steps: &SetupSteps) -> Vec<Option<SmuAttribute>> {
        steps
            .iter()
            .map(|step| match step {
                SetupStep::Reset => None,
                SetupStep::Assign(attribute, _) => Some(*attribute),
            })
            .collect()
    }

    #[test]
    fn iv_setup_order() {
        let steps = IvSetup::new(1e-3, 3.0).steps();

        assert_eq!(
            attributes(&steps),
            [
                None,
                Some(SA::SourceFunction),
                Some(SA::SourceLevelV),
                Some(SA::MeasureAutorangeI),
                Some(SA::MeasureAutorangeV),
                Some(SA::SourceLimitI),
                Some(SA::MeasureNplc),
            ]
        );
        assert_eq!(steps[5], SetupStep::number(SA::SourceLimitI, 1e-3));
        assert_eq!(steps[6], SetupStep::number(SA::MeasureNplc, 3.0));
    }

    #[test]
    fn iv_setup_with_fixed_ranges() {
        let steps = IvSetup::new(1e-3, 1.0)
            .with_current_range(1e-6)
            .with_voltage_range(2.0)
            .with_measure_delay(MeasureDelay::Auto)
            .steps();

        assert_eq!(steps[3], SetupStep::number(SA::MeasureRangeI, 1e-6));
        assert_eq!(steps[4], SetupStep::number(SA::MeasureRangeV, 2.0));
        assert_eq!(steps.last(), Some(&SetupStep::number(SA::MeasureDelay, -1.0)));
        assert_eq!(steps.len(), 8);
    }

    #[test]
    fn resistance_setup_defaults() {
        let steps = ResistanceSetup::default().steps();

        assert_eq!(steps[0], SetupStep::Reset);
        assert_eq!(steps[1], SetupStep::code(SA::SourceFunction, 0));
        assert_eq!(steps[2], SetupStep::number(SA::SourceLevelI, 1e-3));
        assert_eq!(steps[5], SetupStep::number(SA::MeasureDelay, 0.1));
        assert_eq!(steps[6], SetupStep::number(SA::MeasureRangeV, 20.0));
        assert_eq!(steps.len(), 8);
    }

    #[test]
    fn default_setup_turns_output_off_last() {
        let steps = DefaultSetup.steps();
        assert_eq!(steps.last(), Some(&SetupStep::code(SA::SourceOutput, 0)));
        assert!(!steps.contains(&SetupStep::Reset));
    }

    #[test]
    fn setups_fit() {
        let longest = IvSetup::new(1.0, 1.0)
            .with_measure_delay(MeasureDelay::Auto)
            .steps();
        assert!(longest.len() <= MAX_SETUP_STEPS);
    }
}
