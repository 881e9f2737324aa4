//! We use this mocking module in unit tests to emulate an instrument behind a [`Connection`].
//!
//! Assignments are remembered and echoed back by the matching `print(...)` query, so settings
//! round trip the way they do on the real firmware. Scripted responses take precedence.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
    string::String,
    vec::Vec,
};

use thiserror::Error;

use crate::connection::Connection;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockError {
    #[error("Simulated timeout")]
    Timeout,
    #[error("Simulated I/O error")]
    Io,
    #[error("Simulated response overflow")]
    Overflow,
    #[error("Simulated lost connection")]
    Disconnected,
}

impl embedded_io::Error for MockError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockError::Io => embedded_io::ErrorKind::Other,
            MockError::Overflow => embedded_io::ErrorKind::OutOfMemory,
            MockError::Disconnected => embedded_io::ErrorKind::NotConnected,
        }
    }
}

struct MockState {
    /// Every command sent, in order.
    commands: Vec<String>,
    /// Last value assigned to each variable.
    values: HashMap<String, String>,
    /// Replies handed out before falling back to echoing.
    responses: VecDeque<Result<String, MockError>>,
    write_error: Option<MockError>,
    open: bool,
}

/// Handles share state, so a test can keep one while the driver owns another.
#[derive(Clone)]
pub struct MockConnection {
    state: Rc<RefCell<MockState>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                commands: Vec::new(),
                values: HashMap::new(),
                responses: VecDeque::new(),
                write_error: None,
                open: true,
            })),
        }
    }

    /// All commands sent so far.
    pub fn commands(&self) -> Vec<String> {
        self.state.borrow().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.borrow_mut().commands.clear();
    }

    /// Queue a reply for the next query.
    pub fn push_response(&self, response: &str) {
        self.state
            .borrow_mut()
            .responses
            .push_back(Ok(response.into()));
    }

    /// Make the next query fail.
    pub fn push_error(&self, error: MockError) {
        self.state.borrow_mut().responses.push_back(Err(error));
    }

    /// Make every write fail while set.
    pub fn set_write_error(&self, error: Option<MockError>) {
        self.state.borrow_mut().write_error = error;
    }

    pub fn set_open(&self, open: bool) {
        self.state.borrow_mut().open = open;
    }

    /// Last value assigned to `variable`, as sent.
    pub fn value_of(&self, variable: &str) -> Option<String> {
        self.state.borrow().values.get(variable).cloned()
    }
}

impl Connection for MockConnection {
    type Error = MockError;

    fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    fn write(&mut self, command: &str) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.write_error {
            return Err(error);
        }
        state.commands.push(command.into());
        if let Some((variable, value)) = command.split_once(" = ") {
            state.values.insert(variable.into(), value.into());
        }
        Ok(())
    }

    fn query(&mut self, command: &str, response: &mut [u8]) -> Result<usize, Self::Error> {
        self.write(command)?;

        let mut state = self.state.borrow_mut();
        let reply = match state.responses.pop_front() {
            Some(scripted) => scripted?,
            None => command
                .strip_prefix("print(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|variable| state.values.get(variable).cloned())
                .unwrap_or_else(|| "nil".into()),
        };

        let bytes = reply.as_bytes();
        let slot = response.get_mut(..bytes.len()).ok_or(MockError::Overflow)?;
        slot.copy_from_slice(bytes);
        Ok(bytes.len())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().open = false;
        Ok(())
    }
}
