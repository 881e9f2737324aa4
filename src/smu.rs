use crate::{
    attribute::{Channel, SmuAttribute},
    connection::Connection,
    error::{Error, Result, ValueKind},
    limits::{Model, SourceLimits},
    preset::{DefaultSetup, IvSetup, MeasurementSetup, ResistanceSetup, SetupStep},
    tsp::{self, TspValue},
    types::{Autorange, Identity, IvReading, MeasureDelay, SourceFunction, State},
};

/// Settings fixed for the lifetime of a [`Keithley2600`].
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SmuConfig {
    /// Channel all commands are addressed to.
    pub channel: Channel,
    /// Clamping policy applied by the setters.
    pub limits: SourceLimits,
}

impl SmuConfig {
    /// Default configuration with the source limits of `model`.
    pub fn for_model(model: Model) -> Self {
        Self {
            limits: model.source_limits(),
            ..Default::default()
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_limits(mut self, limits: SourceLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// You can create a Keithley2600 using any open [`Connection`] to the instrument.
///
/// Each setter sends one TSP assignment and each getter one `print(...)` query; nothing is cached,
/// so every read reflects the firmware's current state. For its methods, "set" means to write a
/// configuration and "get" means to read it back, whereas "measure" triggers a new reading.
///
/// All methods take `&mut self`, so a facade is only ever driven by one caller at a time. Wrap it
/// in a mutex to share it between threads.
///
/// The const generic `L` is the size of the response buffer.
///
/// Dropping the facade without calling [`Self::close`] turns the output off and resets the
/// channel, ignoring any errors.
pub struct Keithley2600<C: Connection, const L: usize = 128> {
    /// `None` once closed.
    connection: Option<C>,
    channel: Channel,
    limits: SourceLimits,
}

impl<C: Connection, const L: usize> Keithley2600<C, L> {
    /// Take over an already open connection. Nothing is sent to the instrument.
    pub fn new(connection: C) -> Result<Self, C::Error> {
        Self::with_config(connection, SmuConfig::default())
    }

    /// Take over an open connection, reset the channel and apply [`DefaultSetup`].
    ///
    /// Leaves the channel sourcing 0 V with the output off.
    pub fn connect(connection: C, config: SmuConfig) -> Result<Self, C::Error> {
        let mut smu = Self::with_config(connection, config)?;
        smu.reset()?;
        smu.default_setup()?;
        Ok(smu)
    }

    pub fn with_config(connection: C, config: SmuConfig) -> Result<Self, C::Error> {
        if !connection.is_open() {
            return Err(Error::Connection);
        }
        Ok(Self {
            connection: Some(connection),
            channel: config.channel,
            limits: config.limits,
        })
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn limits(&self) -> &SourceLimits {
        &self.limits
    }

    /// Replace the clamping policy used by the setters.
    pub fn set_limits(&mut self, limits: SourceLimits) {
        self.limits = limits;
    }

    /// Whether [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.connection.is_none()
    }

    /// Enable/disable the output.
    pub fn set_output_state(&mut self, state: impl Into<State>) -> Result<(), C::Error> {
        let state: State = state.into();
        let code = bool::from(state) as i32;
        self.set_attribute(SmuAttribute::SourceOutput, TspValue::Integer(code))
    }

    /// Read whether the output is enabled or disabled.
    pub fn get_output_state(&mut self) -> Result<State, C::Error> {
        let on = self.get_flag(SmuAttribute::SourceOutput)?;
        Ok(State::from(on))
    }

    /// Choose whether the channel sources voltage or current.
    pub fn set_source_function(&mut self, function: SourceFunction) -> Result<(), C::Error> {
        self.set_attribute(
            SmuAttribute::SourceFunction,
            TspValue::Integer(function.code()),
        )
    }

    pub fn get_source_function(&mut self) -> Result<SourceFunction, C::Error> {
        let code = self.get_code(SmuAttribute::SourceFunction)?;
        SourceFunction::from_code(code).ok_or(Error::Parse(ValueKind::Setting))
    }

    /// Set the voltage source level, V. Clamped to the voltage level limits.
    pub fn set_voltage_level(&mut self, level_v: f64) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::SourceLevelV, level_v)
    }

    pub fn get_voltage_level(&mut self) -> Result<f64, C::Error> {
        self.get_number(SmuAttribute::SourceLevelV)
    }

    /// Set the current source level, A. Clamped to the current level limits.
    pub fn set_current_level(&mut self, level_a: f64) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::SourceLevelI, level_a)
    }

    pub fn get_current_level(&mut self) -> Result<f64, C::Error> {
        self.get_number(SmuAttribute::SourceLevelI)
    }

    /// Set the voltage compliance used while sourcing current, V.
    pub fn set_voltage_limit(&mut self, limit_v: f64) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::SourceLimitV, limit_v)
    }

    pub fn get_voltage_limit(&mut self) -> Result<f64, C::Error> {
        self.get_number(SmuAttribute::SourceLimitV)
    }

    /// Set the current compliance used while sourcing voltage, A.
    pub fn set_current_limit(&mut self, limit_a: f64) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::SourceLimitI, limit_a)
    }

    pub fn get_current_limit(&mut self) -> Result<f64, C::Error> {
        self.get_number(SmuAttribute::SourceLimitI)
    }

    /// Set the voltage measurement range, V. The firmware picks the lowest range that fits.
    pub fn set_voltage_range(&mut self, range_v: f64) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::MeasureRangeV, range_v)
    }

    pub fn get_voltage_range(&mut self) -> Result<f64, C::Error> {
        self.get_number(SmuAttribute::MeasureRangeV)
    }

    /// Set the current measurement range, A.
    pub fn set_current_range(&mut self, range_a: f64) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::MeasureRangeI, range_a)
    }

    pub fn get_current_range(&mut self) -> Result<f64, C::Error> {
        self.get_number(SmuAttribute::MeasureRangeI)
    }

    pub fn set_voltage_autorange(&mut self, mode: impl Into<Autorange>) -> Result<(), C::Error> {
        let mode: Autorange = mode.into();
        self.set_attribute(SmuAttribute::MeasureAutorangeV, TspValue::Integer(mode.code()))
    }

    pub fn get_voltage_autorange(&mut self) -> Result<Autorange, C::Error> {
        let code = self.get_code(SmuAttribute::MeasureAutorangeV)?;
        Autorange::from_code(code).ok_or(Error::Parse(ValueKind::Setting))
    }

    pub fn set_current_autorange(&mut self, mode: impl Into<Autorange>) -> Result<(), C::Error> {
        let mode: Autorange = mode.into();
        self.set_attribute(SmuAttribute::MeasureAutorangeI, TspValue::Integer(mode.code()))
    }

    pub fn get_current_autorange(&mut self) -> Result<Autorange, C::Error> {
        let code = self.get_code(SmuAttribute::MeasureAutorangeI)?;
        Autorange::from_code(code).ok_or(Error::Parse(ValueKind::Setting))
    }

    /// Set the integration aperture in power line cycles. Clamped to `0.001 - 25`.
    pub fn set_nplc(&mut self, nplc: f64) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::MeasureNplc, nplc)
    }

    pub fn get_nplc(&mut self) -> Result<f64, C::Error> {
        self.get_number(SmuAttribute::MeasureNplc)
    }

    pub fn set_measure_delay(&mut self, delay: MeasureDelay) -> Result<(), C::Error> {
        self.set_number(SmuAttribute::MeasureDelay, delay.as_seconds())
    }

    pub fn get_measure_delay(&mut self) -> Result<MeasureDelay, C::Error> {
        let seconds = self.get_number(SmuAttribute::MeasureDelay)?;
        MeasureDelay::from_seconds(seconds).ok_or(Error::Parse(ValueKind::Number))
    }

    /// Take a single simultaneous current and voltage reading.
    pub fn measure_iv(&mut self) -> Result<IvReading, C::Error> {
        let trigger = Self::command(tsp::iv_trigger(self.channel))?;
        self.write_tsp(&trigger)?;
        let response = self.query_tsp(tsp::IV_READOUT)?;
        let (current_a, voltage_v) =
            Self::parse_response(&response, tsp::parse_pair, ValueKind::Pair)?;
        Ok(IvReading {
            current_a,
            voltage_v,
        })
    }

    /// Return a single current reading, A.
    pub fn measure_current(&mut self) -> Result<f64, C::Error> {
        self.measure_single("measure.i()")
    }

    /// Return a single voltage reading, V.
    pub fn measure_voltage(&mut self) -> Result<f64, C::Error> {
        self.measure_single("measure.v()")
    }

    /// Return a single resistance reading, Ohm.
    pub fn measure_resistance(&mut self) -> Result<f64, C::Error> {
        self.measure_single("measure.r()")
    }

    /// Return a single power reading, W.
    pub fn measure_power(&mut self) -> Result<f64, C::Error> {
        self.measure_single("measure.p()")
    }

    /// Return the channel to its power-on defaults.
    pub fn reset(&mut self) -> Result<(), C::Error> {
        let command = Self::command(tsp::reset(self.channel))?;
        self.write_tsp(&command)
    }

    /// Read the manufacturer, model, serial number and firmware version.
    pub fn identify(&mut self) -> Result<Identity, C::Error> {
        let response = self.query_tsp(tsp::IDENTIFY)?;
        Self::parse_response(&response, Identity::parse, ValueKind::Identity)
    }

    /// Identify the instrument and adopt the source limits of its model.
    ///
    /// Returns `None`, leaving the limits untouched, for models we don't know.
    pub fn detect_model(&mut self) -> Result<Option<Model>, C::Error> {
        let identity = self.identify()?;
        let model = identity.product_model();
        match model {
            Some(model) => {
                if self.channel == Channel::B && model.channel_count() < 2 {
                    log::warn!("{model:?} has no channel B");
                }
                self.limits = model.source_limits();
            }
            None => log::info!("unknown model {:?}, keeping limits", identity.model.as_str()),
        }
        Ok(model)
    }

    /// Apply every step of `setup`, in order.
    pub fn apply_setup(&mut self, setup: &impl MeasurementSetup) -> Result<(), C::Error> {
        for step in setup.steps() {
            match step {
                SetupStep::Reset => self.reset()?,
                SetupStep::Assign(attribute, value) => self.set_attribute(attribute, value)?,
            }
        }
        Ok(())
    }

    /// Reset and configure for IV measurements with the given current compliance (A) and NPLC.
    ///
    /// See [`IvSetup`] for the exact sequence and for further options.
    pub fn setup_for_iv_measurement(
        &mut self,
        current_limit: f64,
        nplc: f64,
    ) -> Result<(), C::Error> {
        self.apply_setup(&IvSetup::new(current_limit, nplc))
    }

    /// Reset and configure for 4-wire style resistance readings at 1 mA.
    pub fn setup_for_resistance_measurement(&mut self) -> Result<(), C::Error> {
        self.apply_setup(&ResistanceSetup::default())
    }

    /// 0 V source, autoranged measurements, output off.
    pub fn default_setup(&mut self) -> Result<(), C::Error> {
        self.apply_setup(&DefaultSetup)
    }

    /// Turn the output off, reset the channel and release the connection.
    ///
    /// The connection is released even if the shutdown commands fail. Every later call fails
    /// with [`Error::Connection`].
    pub fn close(&mut self) -> Result<(), C::Error> {
        let shutdown = self
            .set_output_state(State::Off)
            .and_then(|_| self.reset());
        let Some(mut connection) = self.connection.take() else {
            return Err(Error::Connection);
        };
        let closed = connection.close().map_err(Error::transport);
        shutdown.and(closed)
    }

    /// Write an assignment, clamping numbers according to the configured limits.
    pub fn set_attribute(
        &mut self,
        attribute: SmuAttribute,
        value: TspValue,
    ) -> Result<(), C::Error> {
        let value = match value {
            TspValue::Number(requested) => {
                if !requested.is_finite() {
                    return Err(Error::InvalidValue(requested));
                }
                let clamped = self.limits.clamp(attribute, requested);
                if clamped != requested {
                    log::info!(
                        "{} clamped from {} to {}",
                        attribute.on(self.channel),
                        requested,
                        clamped
                    );
                }
                TspValue::Number(clamped)
            }
            other => other,
        };
        let command = Self::command(tsp::assignment(attribute.on(self.channel), value))?;
        self.write_tsp(&command)
    }

    /// Read a numeric attribute.
    pub fn get_number(&mut self, attribute: SmuAttribute) -> Result<f64, C::Error> {
        let response = self.print_attribute(attribute)?;
        Self::parse_response(&response, tsp::parse_number, ValueKind::Number)
    }

    /// Send a raw TSP command.
    pub fn write_tsp(&mut self, command: &str) -> Result<(), C::Error> {
        let connection = self.connection()?;
        log::debug!("tsp write: {command}");
        connection.write(command).map_err(Error::transport)
    }

    /// Send a raw TSP command and return the trimmed response line.
    pub fn query_tsp(&mut self, command: &str) -> Result<heapless::String<L>, C::Error> {
        let connection = self.connection()?;
        log::debug!("tsp query: {command}");

        let mut buff = [0u8; L];
        let len = connection
            .query(command, &mut buff)
            .map_err(Error::transport)?;
        let Some(raw) = buff.get(..len) else {
            return Err(Error::BufferError);
        };
        let Ok(text) = core::str::from_utf8(raw) else {
            return Err(Error::Parse(ValueKind::Text));
        };
        log::trace!("tsp response: {text}");

        heapless::String::try_from(text.trim()).map_err(|_| Error::BufferError)
    }

    fn connection(&mut self) -> Result<&mut C, C::Error> {
        match self.connection.as_mut() {
            Some(connection) if connection.is_open() => Ok(connection),
            _ => Err(Error::Connection),
        }
    }

    fn command(
        formatted: core::result::Result<tsp::Command, core::fmt::Error>,
    ) -> Result<tsp::Command, C::Error> {
        formatted.map_err(|_| Error::BufferError)
    }

    fn parse_response<T>(
        response: &str,
        parse: impl FnOnce(&str) -> Option<T>,
        kind: ValueKind,
    ) -> Result<T, C::Error> {
        parse(response).ok_or_else(|| {
            log::warn!("expected {kind}, instrument replied {response:?}");
            Error::Parse(kind)
        })
    }

    fn set_number(&mut self, attribute: SmuAttribute, value: f64) -> Result<(), C::Error> {
        self.set_attribute(attribute, TspValue::Number(value))
    }

    fn get_flag(&mut self, attribute: SmuAttribute) -> Result<bool, C::Error> {
        let response = self.print_attribute(attribute)?;
        Self::parse_response(&response, tsp::parse_flag, ValueKind::Flag)
    }

    fn get_code(&mut self, attribute: SmuAttribute) -> Result<i32, C::Error> {
        let response = self.print_attribute(attribute)?;
        Self::parse_response(&response, tsp::parse_code, ValueKind::Setting)
    }

    fn print_attribute(&mut self, attribute: SmuAttribute) -> Result<heapless::String<L>, C::Error> {
        let command = Self::command(tsp::print_variable(attribute.on(self.channel)))?;
        self.query_tsp(&command)
    }

    fn measure_single(&mut self, call: &str) -> Result<f64, C::Error> {
        let command = Self::command(tsp::print_call(self.channel, call))?;
        let response = self.query_tsp(&command)?;
        Self::parse_response(&response, tsp::parse_number, ValueKind::Number)
    }
}

impl<C: Connection, const L: usize> Drop for Keithley2600<C, L> {
    fn drop(&mut self) {
        if self.connection.is_some() {
            if let Err(err) = self.close() {
                log::warn!("shutdown of {} on drop failed: {}", self.channel, err);
            }
        }
    }
}
