use crate::{
    config::{Parity, SerialConfig},
    pipeline::{LineSource, LineStream, PipelineError},
};

use super::lines::line_stream;

impl From<Parity> for tokio_serial::Parity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Reads telegram lines from the meter's serial port.
///
/// The port is opened on every [`LineSource::open`] call and closed when the
/// returned stream is dropped; nothing is held between collections.
pub struct SerialLineSource {
    cfg: SerialConfig,
}

impl SerialLineSource {
    pub fn new(cfg: SerialConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait::async_trait]
impl LineSource for SerialLineSource {
    async fn open(&self) -> Result<LineStream, PipelineError> {
        let read_timeout = self.cfg.read_timeout();
        let builder = tokio_serial::new(self.cfg.device.as_str(), self.cfg.baud_rate)
            .parity(self.cfg.parity.into())
            .timeout(read_timeout);

        let port = tokio_serial::SerialStream::open(&builder).map_err(|e| {
            PipelineError::Source(format!("failed to open serial port {}: {e}", self.cfg.device))
        })?;

        tracing::debug!(
            device = %self.cfg.device,
            baud_rate = self.cfg.baud_rate,
            "serial session opened"
        );

        Ok(line_stream(port, Some(read_timeout)))
    }

    fn name(&self) -> &str {
        &self.cfg.device
    }
}
