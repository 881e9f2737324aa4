//! This module is used to define the TSP attributes the driver reads and writes.

use core::fmt;

use strum_macros::EnumIter;

/// The source-measure channels of a 2600 series SMU.
///
/// Single channel models (e.g. 2601B, 2611B, 2635B) only have [`Channel::A`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Channel {
    #[default]
    A,
    B,
}

impl Channel {
    /// The TSP object name of this channel.
    pub const fn tsp_name(&self) -> &'static str {
        match self {
            Channel::A => "smua",
            Channel::B => "smub",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tsp_name())
    }
}

/// The settings of a channel that we expose.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter)]
pub enum SmuAttribute {
    /// __R/W__ - Source function.
    /// * `0` - DC amps.
    /// * `1` - DC volts.
    SourceFunction,
    /// __R/W__ - Output relay.
    /// * `0` - Off.
    /// * `1` - On.
    SourceOutput,
    /// __R/W__ - Voltage source level, V.
    SourceLevelV,
    /// __R/W__ - Current source level, A.
    SourceLevelI,
    /// __R/W__ - Voltage compliance, V.
    SourceLimitV,
    /// __R/W__ - Current compliance, A.
    SourceLimitI,
    /// __R/W__ - Voltage measurement range, V.
    MeasureRangeV,
    /// __R/W__ - Current measurement range, A.
    MeasureRangeI,
    /// __R/W__ - Voltage measurement autorange.
    ///
    /// See [`Autorange`](crate::types::Autorange).
    MeasureAutorangeV,
    /// __R/W__ - Current measurement autorange.
    ///
    /// See [`Autorange`](crate::types::Autorange).
    MeasureAutorangeI,
    /// __R/W__ - Integration aperture in power line cycles.
    ///
    /// 1 PLC is 16.67 ms at 60 Hz and 20 ms at 50 Hz.
    MeasureNplc,
    /// __R/W__ - Delay before each measurement, s. `-1` selects the automatic delay.
    MeasureDelay,
}

impl SmuAttribute {
    /// Attribute path below the channel object.
    pub const fn tsp_path(&self) -> &'static str {
        match self {
            SmuAttribute::SourceFunction => "source.func",
            SmuAttribute::SourceOutput => "source.output",
            SmuAttribute::SourceLevelV => "source.levelv",
            SmuAttribute::SourceLevelI => "source.leveli",
            SmuAttribute::SourceLimitV => "source.limitv",
            SmuAttribute::SourceLimitI => "source.limiti",
            SmuAttribute::MeasureRangeV => "measure.rangev",
            SmuAttribute::MeasureRangeI => "measure.rangei",
            SmuAttribute::MeasureAutorangeV => "measure.autorangev",
            SmuAttribute::MeasureAutorangeI => "measure.autorangei",
            SmuAttribute::MeasureNplc => "measure.nplc",
            SmuAttribute::MeasureDelay => "measure.delay",
        }
    }

    /// Qualify this attribute with a channel.
    pub const fn on(self, channel: Channel) -> TspVariable {
        TspVariable {
            channel,
            attribute: self,
        }
    }
}

/// A fully qualified TSP variable, e.g. `smua.source.limiti`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TspVariable {
    pub channel: Channel,
    pub attribute: SmuAttribute,
}

impl fmt::Display for TspVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.channel, self.attribute.tsp_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn variable_names() {
        let variable = SmuAttribute::SourceLimitI.on(Channel::A);
        assert_eq!(format!("{variable}"), "smua.source.limiti");

        let variable = SmuAttribute::MeasureNplc.on(Channel::B);
        assert_eq!(format!("{variable}"), "smub.measure.nplc");
    }

    #[test]
    fn attribute_paths_are_unique() {
        // Two attributes sharing a path would silently alias each other.
        for a in SmuAttribute::iter() {
            let clashes = SmuAttribute::iter()
                .filter(|b| b.tsp_path() == a.tsp_path())
                .count();
            assert_eq!(clashes, 1, "{a:?}");
        }
    }
}
