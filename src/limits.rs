//! Clamping policy for source settings
//!
//! Setters for the attributes listed in [`SourceLimits::for_attribute`] clamp the requested value
//! into range before it is sent, rather than leaving it to the firmware to reject or coerce.
//! Every other attribute is passed through unchanged.

use strum_macros::EnumIter;

use crate::attribute::SmuAttribute;

/// Closed interval a value is clamped into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub min: f64,
    pub max: f64,
}

impl Limits {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `[-max, max]`
    pub const fn symmetric(max: f64) -> Self {
        Self { min: -max, max }
    }

    /// Clamp `value` into this interval.
    pub fn clamp(&self, value: f64) -> f64 {
        if value > self.max {
            self.max
        } else if value < self.min {
            self.min
        } else {
            value
        }
    }
}

/// NPLC accepted by every 2600 series model.
pub const NPLC_LIMITS: Limits = Limits::new(0.001, 25.0);

/// Per-attribute clamping policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceLimits {
    /// `source.levelv`, V.
    pub voltage_level: Limits,
    /// `source.leveli`, A.
    pub current_level: Limits,
    /// `source.limitv`, V.
    pub voltage_limit: Limits,
    /// `source.limiti`, A.
    pub current_limit: Limits,
    /// `measure.nplc`.
    pub nplc: Limits,
}

impl Default for SourceLimits {
    /// Wide enough for any 2600 series model. Use [`Model::source_limits`] to be exact.
    fn default() -> Self {
        Self::new(202.0, 3.03)
    }
}

impl SourceLimits {
    /// Limits for a channel sourcing at most `max_voltage` V and `max_current` A.
    pub const fn new(max_voltage: f64, max_current: f64) -> Self {
        Self {
            voltage_level: Limits::symmetric(max_voltage),
            current_level: Limits::symmetric(max_current),
            voltage_limit: Limits::new(0.0, max_voltage),
            current_limit: Limits::new(0.0, max_current),
            nplc: NPLC_LIMITS,
        }
    }

    /// Lower the maximum source and compliance voltage, e.g. to protect a device under test.
    pub fn with_max_voltage(mut self, max_voltage: f64) -> Self {
        self.voltage_level = Limits::symmetric(max_voltage);
        self.voltage_limit = Limits::new(0.0, max_voltage);
        self
    }

    /// Lower the maximum source and compliance current.
    pub fn with_max_current(mut self, max_current: f64) -> Self {
        self.current_level = Limits::symmetric(max_current);
        self.current_limit = Limits::new(0.0, max_current);
        self
    }

    /// The clamp applied to `attribute`, if it has one.
    pub fn for_attribute(&self, attribute: SmuAttribute) -> Option<Limits> {
        match attribute {
            SmuAttribute::SourceLevelV => Some(self.voltage_level),
            SmuAttribute::SourceLevelI => Some(self.current_level),
            SmuAttribute::SourceLimitV => Some(self.voltage_limit),
            SmuAttribute::SourceLimitI => Some(self.current_limit),
            SmuAttribute::MeasureNplc => Some(self.nplc),
            _ => None,
        }
    }

    /// Apply the policy for `attribute` to `value`.
    pub fn clamp(&self, attribute: SmuAttribute, value: f64) -> f64 {
        match self.for_attribute(attribute) {
            Some(limits) => limits.clamp(value),
            None => value,
        }
    }
}

/// The 2600 series models we know the source capabilities of.
///
/// Suffixes (`A`, `B`) share the DC source limits of the base model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Model {
    K2601,
    K2602,
    K2604,
    K2611,
    K2612,
    K2614,
    K2634,
    K2635,
    K2636,
}

impl Model {
    /// Interpret the model field of `*IDN?`, e.g. `Model 2602B`.
    pub fn from_model_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix("Model").unwrap_or(name).trim_start();
        let digits = name.get(..4)?;
        match digits {
            "2601" => Some(Model::K2601),
            "2602" => Some(Model::K2602),
            "2604" => Some(Model::K2604),
            "2611" => Some(Model::K2611),
            "2612" => Some(Model::K2612),
            "2614" => Some(Model::K2614),
            "2634" => Some(Model::K2634),
            "2635" => Some(Model::K2635),
            "2636" => Some(Model::K2636),
            _ => None,
        }
    }

    /// Number of SMU channels.
    pub const fn channel_count(&self) -> usize {
        match self {
            Model::K2601 | Model::K2611 | Model::K2635 => 1,
            _ => 2,
        }
    }

    /// DC source limits of this model.
    pub const fn source_limits(&self) -> SourceLimits {
        match self {
            Model::K2601 | Model::K2602 | Model::K2604 => SourceLimits::new(40.4, 3.03),
            _ => SourceLimits::new(202.0, 1.515),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn clamp_to_interval() {
        let limits = Limits::symmetric(20.0);
        assert_eq!(limits.clamp(25.0), 20.0);
        assert_eq!(limits.clamp(-25.0), -20.0);
        assert_eq!(limits.clamp(12.5), 12.5);
    }

    #[test]
    fn only_documented_attributes_are_clamped() {
        let limits = SourceLimits::default();
        assert_eq!(limits.clamp(SmuAttribute::MeasureRangeV, 1000.0), 1000.0);
        assert_eq!(limits.clamp(SmuAttribute::MeasureDelay, 1e6), 1e6);
        assert_eq!(limits.clamp(SmuAttribute::SourceLevelV, 1000.0), 202.0);
        assert_eq!(limits.clamp(SmuAttribute::SourceLimitI, -1.0), 0.0);
        assert_eq!(limits.clamp(SmuAttribute::MeasureNplc, 100.0), 25.0);
        assert_eq!(limits.clamp(SmuAttribute::MeasureNplc, 0.0), 0.001);
    }

    #[test]
    fn lowered_maximum() {
        let limits = SourceLimits::default().with_max_voltage(20.0);
        assert_eq!(limits.clamp(SmuAttribute::SourceLevelV, 25.0), 20.0);
        assert_eq!(limits.clamp(SmuAttribute::SourceLimitV, 25.0), 20.0);
        // Current is untouched.
        assert_eq!(limits.clamp(SmuAttribute::SourceLevelI, 3.0), 3.0);
    }

    #[test]
    fn model_names() {
        assert_eq!(Model::from_model_name("Model 2602B"), Some(Model::K2602));
        assert_eq!(Model::from_model_name("2636A"), Some(Model::K2636));
        assert_eq!(Model::from_model_name("Model 2450"), None);
        assert_eq!(Model::from_model_name("26"), None);
    }

    #[test]
    fn model_limits_within_default() {
        let default = SourceLimits::default();
        for model in Model::iter() {
            let limits = model.source_limits();
            assert!(limits.voltage_level.max <= default.voltage_level.max);
            assert!(limits.current_level.max <= default.current_level.max);
            assert!(model.channel_count() >= 1);
        }
    }
}
