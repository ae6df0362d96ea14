// Encoder co-processor link over a serial port

use serialport::{self, SerialPort};
use std::io::{ErrorKind, Read};
use std::time::Duration;
use tracing::info;

use super::SerialLink;
use crate::error::Result;

/// Read timeout; the co-processor streams a packet roughly every 20ms
pub const DEFAULT_TIMEOUT_MS: u64 = 20;

/// Open the serial port the encoder co-processor is attached to
pub fn open_encoder_link(port_name: &str, baudrate: u32) -> Result<Box<dyn SerialPort>> {
    info!("Opening encoder link on {} at {} baud", port_name, baudrate);
    let port = serialport::new(port_name, baudrate)
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .open()?;

    Ok(port)
}

impl SerialLink for Box<dyn SerialPort> {
    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.bytes_to_read()? as usize)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            // A timeout only means nothing arrived yet
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
