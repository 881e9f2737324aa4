//! We use this mocking module in unit tests to emulate the instrument's serial port.

use thiserror::Error;

/// Our mock type used to emulate a byte stream to the instrument.
pub struct MockStream {
    /// Everything the driver wrote, terminators included.
    write_buffer: heapless::Vec<u8, 512>,
    /// Pre-configured response lines to be read back.
    read_buffer: heapless::Vec<u8, 512>,
    read_position: usize,
    should_error_on_write: bool,
}

#[derive(Error, Debug)]
pub enum MockStreamError {
    /// Nothing left to read, as a serial port with a timeout would report.
    #[error("Simulated timeout")]
    Timeout,
    #[error("Simulated buffer overflow")]
    BufferOverflow,
    #[error("Simulated error")]
    SimulatedError,
}

impl embedded_io::Error for MockStreamError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockStreamError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockStreamError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockStreamError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockStream {
    type Error = MockStreamError;
}

impl embedded_io::Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockStreamError::SimulatedError);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockStreamError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockStreamError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = &self.read_buffer[self.read_position..];
        if remaining.is_empty() {
            return Err(MockStreamError::Timeout);
        }

        let count = core::cmp::min(buf.len(), remaining.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        self.read_position += count;
        Ok(count)
    }
}

impl MockStream {
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
        }
    }

    /// Replace the bytes that `read()` will hand out.
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockStreamError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockStreamError::BufferOverflow)
    }

    /// Get a reference to the data that was written to this mock stream.
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Configure whether write operations should fail with an error.
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    #[test]
    fn test_read_partial_data() {
        let mut mock = MockStream::new();
        mock.set_read_data(b"Long response data").unwrap();

        let mut buffer = [0u8; 5];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
    }

    #[test]
    fn test_read_times_out_after_data_exhausted() {
        let mut mock = MockStream::new();
        mock.set_read_data(b"Hi").unwrap();

        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
        assert!(matches!(
            mock.read(&mut buffer),
            Err(MockStreamError::Timeout)
        ));
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockStream::new();
        let large_data = vec![0u8; 600];

        assert!(matches!(
            mock.write(&large_data),
            Err(MockStreamError::BufferOverflow)
        ));
    }

    #[test]
    fn test_write_error_simulation() {
        let mut mock = MockStream::new();
        mock.set_write_error(true);

        assert!(mock.write(b"test").is_err());
        assert!(mock.flush().is_err());
        assert!(mock.written_data().is_empty());
    }
}
