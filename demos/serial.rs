use std::env;

use inquire::Select;
use keithley_2600::{
    connection::StreamConnection, limits::SourceLimits, preset::IvSetup, smu::Keithley2600,
    smu::SmuConfig, types::MeasureDelay,
};
use serialport::SerialPort;

// Configuration constants - adjust these for your setup
const BAUD_RATE: u32 = 9600;
// Readings at high NPLC take a while, a reasonably large time out is required.
const SERIAL_TIMEOUT_MS: u64 = 2000;
const CURRENT_LIMIT_A: f64 = 1e-3;
const NPLC: f64 = 1.0;
// Keep the sweep gentle on whatever is connected.
const MAX_VOLTAGE_V: f64 = 5.0;
const SWEEP_STEPS: u32 = 10;

pub struct PortWrapper(Box<dyn SerialPort>);

/// Serial port failure. Only the kinds the driver treats specially are mapped.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct IoError(std::io::Error);

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            // A read that expired before the instrument answered.
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            // The adapter was unplugged.
            std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => {
                embedded_io::ErrorKind::NotConnected
            }
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn main() {
    env_logger::init();

    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    let connection = StreamConnection::new(PortWrapper(port));
    let config =
        SmuConfig::default().with_limits(SourceLimits::default().with_max_voltage(MAX_VOLTAGE_V));
    let mut smu: Keithley2600<_> =
        Keithley2600::connect(connection, config).expect("Failed to reset instrument");

    let identity = smu.identify().expect("Failed to identify instrument");
    println!(
        "Connected to {} {} (serial {}, firmware {})",
        identity.manufacturer, identity.model, identity.serial_number, identity.firmware_version
    );

    // Adopting the model limits would widen our voltage cap, so only report the model.
    println!("Known model: {:?}", identity.product_model());

    smu.apply_setup(&IvSetup::new(CURRENT_LIMIT_A, NPLC).with_measure_delay(MeasureDelay::Auto))
        .expect("Failed to configure IV measurement");
    println!(
        "Configured for IV: limit {}A, {} NPLC",
        CURRENT_LIMIT_A, NPLC
    );

    smu.set_output_state(true).unwrap();
    println!("Output enabled");

    println!("\n--- IV sweep ---");
    for step in 0..=SWEEP_STEPS {
        let level = MAX_VOLTAGE_V * step as f64 / SWEEP_STEPS as f64;
        smu.set_voltage_level(level).unwrap();
        let reading = smu.measure_iv().unwrap();
        println!(
            "{:>6.3}V  {:>12.6e}A  {:>12.3}Ohm",
            reading.voltage_v,
            reading.current_a,
            reading.resistance_ohm()
        );
    }

    println!("\nNPLC readback: {}", smu.get_nplc().unwrap());

    smu.close().expect("Failed to shut down instrument");
    println!("Output disabled, channel reset");
}
