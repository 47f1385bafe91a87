use std::{pin::Pin, time::Duration};

use futures::{Stream, StreamExt};
use meter_domain::domain::Reading;
use tokio::sync::mpsc;

use crate::{config::CollectorConfig, telegram::TelegramFramer};

/// Lazy sequence of trimmed lines from one source session.
///
/// The stream owns the underlying handle; dropping it ends the session.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, PipelineError>> + Send>>;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("no line received within {0:?}")]
    ReadTimeout(Duration),
    #[error("line stream ended before a complete telegram was framed")]
    NoTelegram,
    #[error("no telegram framed within {0:?}")]
    CycleDeadline(Duration),
}

#[async_trait::async_trait]
pub trait LineSource: Send + Sync {
    /// Open a fresh session. Each call gets its own handle.
    async fn open(&self) -> Result<LineStream, PipelineError>;

    /// Short label for logs, e.g. the device path.
    fn name(&self) -> &str;
}

/// One read-frame-assemble cycle over a line source.
///
/// A pump moves lines from the source into a bounded queue while a framer
/// drains the queue through a [`TelegramFramer`] until the first reading.
/// Both run concurrently inside the cycle's own future, so the session is
/// torn down as soon as that reading arrives, and also whenever the caller
/// drops the cycle part way through.
pub struct Pipeline<S> {
    pub source: S,
    pub line_buffer: usize,
    pub deadline: Duration,
}

impl<S> Pipeline<S>
where
    S: LineSource,
{
    pub fn new(source: S, cfg: &CollectorConfig) -> Self {
        Self {
            source,
            line_buffer: cfg.line_buffer,
            deadline: Duration::from_millis(cfg.cycle_deadline_ms),
        }
    }

    pub async fn run(&self) -> Result<Reading, PipelineError> {
        let lines = self.source.open().await?;
        let (line_tx, line_rx) = mpsc::channel(self.line_buffer.max(1));

        let pump = pump_lines(lines, line_tx);
        let framing = frame_lines(line_rx);
        tokio::pin!(pump, framing);

        let cycle = async {
            let mut pumping = true;
            loop {
                tokio::select! {
                    outcome = &mut framing => break outcome,
                    // Finishing the pump closes the queue; the framer drains what is left.
                    _ = &mut pump, if pumping => pumping = false,
                }
            }
        };

        // Returning drops `pump` and with it the stream, ending the session.
        match tokio::time::timeout(self.deadline, cycle).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PipelineError::CycleDeadline(self.deadline)),
        }
    }
}

async fn pump_lines(mut lines: LineStream, tx: mpsc::Sender<Result<String, PipelineError>>) {
    while let Some(item) = lines.next().await {
        let failed = item.is_err();
        if tx.send(item).await.is_err() || failed {
            break;
        }
    }
}

async fn frame_lines(
    mut rx: mpsc::Receiver<Result<String, PipelineError>>,
) -> Result<Reading, PipelineError> {
    let mut framer = TelegramFramer::new();

    while let Some(item) = rx.recv().await {
        let line = item?;
        metrics::counter!("p1_lines_read_total").increment(1);
        if let Some(reading) = framer.push(&line) {
            return Ok(reading);
        }
    }

    Err(PipelineError::NoTelegram)
}
