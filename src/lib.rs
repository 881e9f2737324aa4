//! This crate provides an interface for controlling the Keithley 2600 series of source measure units.
//!
//! It supports `no-std` environments by use of the `no-std` feature flag.
//!
//! The instruments are driven with TSP (Test Script Processor) commands: every setter sends one
//! assignment such as `smua.source.limiti = 0.001`, every getter one `print(...)` query. Nothing is
//! cached on the host.
//!
//! Example models which this should work with:
//! * 2601, 2602, 2604 (40 V, 3 A)
//! * 2611, 2612, 2614 (200 V, 1.5 A)
//! * 2634, 2635, 2636 (200 V, 1.5 A, low current)
//!
//! Any transport can be used by implementing [`connection::Connection`]. For plain byte streams
//! such as RS-232, wrap the port in a [`connection::StreamConnection`]. The serial port should be
//! configured to match the instrument's front panel settings, typically:
//! * Baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//! * Terminator: `\n`
//!
//! ```ignore
//! let connection = StreamConnection::new(port);
//! let mut smu: Keithley2600<_> = Keithley2600::new(connection)?;
//!
//! smu.setup_for_iv_measurement(1e-3, 1.0)?;
//! smu.set_voltage_level(0.5)?;
//! smu.set_output_state(true)?;
//! let reading = smu.measure_iv()?;
//! smu.close()?;
//! ```

#![cfg_attr(feature = "no-std", no_std)]

pub mod attribute;
pub mod connection;
pub mod error;
pub mod limits;
pub mod preset;
pub mod smu;
pub mod tsp;
pub mod types;

#[cfg(test)]
mod mock_connection;
#[cfg(test)]
mod mock_stream;
