//! Formatting of TSP commands and parsing of the instrument's printed responses.

use core::fmt::{self, Write};

use crate::attribute::{Channel, TspVariable};

/// Longest command we ever send is well below this.
pub const COMMAND_CAPACITY: usize = 96;

pub type Command = heapless::String<COMMAND_CAPACITY>;

/// Query sent to read the identification string.
pub const IDENTIFY: &str = "*IDN?";

/// Prints the two globals set by [`iv_trigger`], current first.
pub const IV_READOUT: &str = "printnumber(ireading, vreading)";

/// A literal on the right hand side of an assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TspValue {
    Number(f64),
    /// Flags and enumerated settings.
    Integer(i32),
}

impl fmt::Display for TspValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TspValue::Number(value) => write_number(f, *value),
            TspValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// Shortest decimal literal that parses back to `value`.
///
/// Very large and very small magnitudes use exponent notation so the literal stays short.
fn write_number(f: &mut impl Write, value: f64) -> fmt::Result {
    let magnitude = if value < 0.0 { -value } else { value };
    if value == 0.0 {
        f.write_str("0")
    } else if (1e-4..1e15).contains(&magnitude) {
        write!(f, "{value}")
    } else {
        write!(f, "{value:e}")
    }
}

/// `<variable> = <value>`
pub fn assignment(variable: TspVariable, value: TspValue) -> Result<Command, fmt::Error> {
    let mut command = Command::new();
    write!(command, "{variable} = {value}")?;
    Ok(command)
}

/// `print(<variable>)`
pub fn print_variable(variable: TspVariable) -> Result<Command, fmt::Error> {
    let mut command = Command::new();
    write!(command, "print({variable})")?;
    Ok(command)
}

/// `print(<channel>.<call>)`, e.g. `print(smua.measure.r())`.
pub fn print_call(channel: Channel, call: &str) -> Result<Command, fmt::Error> {
    let mut command = Command::new();
    write!(command, "print({channel}.{call})")?;
    Ok(command)
}

/// `<channel>.reset()`
pub fn reset(channel: Channel) -> Result<Command, fmt::Error> {
    let mut command = Command::new();
    write!(command, "{channel}.reset()")?;
    Ok(command)
}

/// Take one reading and keep it in the `ireading` and `vreading` globals.
pub fn iv_trigger(channel: Channel) -> Result<Command, fmt::Error> {
    let mut command = Command::new();
    write!(command, "ireading, vreading = {channel}.measure.iv()")?;
    Ok(command)
}

/// A single printed number, e.g. `1.00000e-03`.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

/// An on/off attribute. The firmware prints these as numbers, e.g. `1.00000e+00`.
pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim() {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            let value = parse_number(other)?;
            value.is_finite().then_some(value as i64 != 0)
        }
    }
}

/// The integer code of an enumerated setting.
pub fn parse_code(text: &str) -> Option<i32> {
    let value = parse_number(text)?;
    let code = value as i32;
    (code as f64 == value).then_some(code)
}

/// Exactly two numbers separated by a comma or tab, as `printnumber` and `print` emit them.
pub fn parse_pair(text: &str) -> Option<(f64, f64)> {
    let mut tokens = text.trim().split([',', '\t']);
    let first = parse_number(tokens.next()?)?;
    let second = parse_number(tokens.next()?)?;
    if tokens.next().is_some() {
        return None;
    }
    Some((first, second))
}
