use std::io::Write;

use super::Transport;
use crate::error::TransportError;

/// Prints each message on its own line.
pub struct ConsoleTransport {
    out: Box<dyn Write + Send>,
}

impl ConsoleTransport {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }
}

impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    fn post(&mut self, text: &str) -> Result<(), TransportError> {
        writeln!(self.out, "{text}")
            .and_then(|()| self.out.flush())
            .map_err(|e| TransportError::permanent("console", e.to_string()))
    }
}
