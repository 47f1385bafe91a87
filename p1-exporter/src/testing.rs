//! Scripted line sources for exercising the collection cycle without a meter.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use crate::pipeline::{LineSource, LineStream, PipelineError};

/// How a scripted session ends once its lines are exhausted.
#[derive(Debug, Clone)]
pub enum Ending {
    End,
    Error(String),
    Timeout,
    /// Never yields again.
    Hang,
}

#[derive(Clone)]
pub struct ScriptedSource {
    lines: Vec<String>,
    ending: Ending,
    open_error: Option<String>,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

struct SessionGuard(Arc<AtomicUsize>);

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    pub fn new<'a>(lines: impl IntoIterator<Item = &'a str>, ending: Ending) -> Self {
        Self {
            lines: lines.into_iter().map(str::to_string).collect(),
            ending,
            open_error: None,
            opened: Arc::new(AtomicUsize::new(0)),
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose sessions end immediately.
    pub fn empty() -> Self {
        Self::new(Vec::<&str>::new(), Ending::End)
    }

    pub fn failing_open(message: &str) -> Self {
        let mut source = Self::empty();
        source.open_error = Some(message.to_string());
        source
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LineSource for ScriptedSource {
    async fn open(&self) -> Result<LineStream, PipelineError> {
        if let Some(message) = &self.open_error {
            return Err(PipelineError::Source(message.clone()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);

        let guard = SessionGuard(self.released.clone());
        let lines = self.lines.clone();
        let ending = self.ending.clone();
        let s = async_stream::stream! {
            let _guard = guard;
            for line in lines {
                yield Ok(line);
            }
            match ending {
                Ending::End => {}
                Ending::Error(message) => {
                    yield Err(PipelineError::Source(message));
                }
                Ending::Timeout => {
                    yield Err(PipelineError::ReadTimeout(Duration::from_secs(5)));
                }
                Ending::Hang => {
                    futures::future::pending::<()>().await;
                }
            }
        };

        Ok(Box::pin(s))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
