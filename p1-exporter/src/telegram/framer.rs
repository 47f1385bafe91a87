use meter_domain::domain::Reading;

use super::assembler::{assemble_reading, AssembleError};
use super::{END_MARKER, START_MARKER};

/// Body lines kept before an unterminated telegram is dropped.
pub const MAX_TELEGRAM_LINES: usize = 1024;

/// Framing state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FramerState {
    /// Scanning for a start marker.
    #[default]
    Idle,
    /// Inside a telegram, holding the body lines seen so far.
    Collecting(Vec<String>),
}

/// Splits a line sequence into telegrams and turns each one into a `Reading`.
///
/// Transitions:
///
/// | state      | line            | result                                   |
/// |------------|-----------------|------------------------------------------|
/// | Idle       | start marker    | Collecting with an empty block           |
/// | Idle       | other           | ignored                                  |
/// | Collecting | start marker    | ignored, block kept                      |
/// | Collecting | end marker      | Idle; a reading unless the block is empty |
/// | Collecting | other           | appended to the block                    |
#[derive(Debug, Default)]
pub struct TelegramFramer {
    state: FramerState,
}

impl TelegramFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FramerState {
        &self.state
    }

    /// Feed one trimmed line. Returns a reading when `line` closes a
    /// non-empty telegram.
    pub fn push(&mut self, line: &str) -> Option<Reading> {
        if line.starts_with(START_MARKER) {
            if self.state == FramerState::Idle {
                self.state = FramerState::Collecting(Vec::new());
            }
            return None;
        }

        let FramerState::Collecting(block) = &mut self.state else {
            return None;
        };

        if line.starts_with(END_MARKER) {
            let block = std::mem::take(block);
            self.state = FramerState::Idle;
            return match assemble_reading(block.as_slice()) {
                Ok(reading) => Some(reading),
                Err(AssembleError::EmptyTelegram) => {
                    tracing::debug!("discarding telegram without body lines");
                    metrics::counter!("p1_telegrams_discarded_total", "reason" => "empty")
                        .increment(1);
                    None
                }
            };
        }

        if block.len() >= MAX_TELEGRAM_LINES {
            tracing::warn!(
                lines = block.len(),
                "telegram exceeded line limit without end marker, discarding"
            );
            metrics::counter!("p1_telegrams_discarded_total", "reason" => "overflow").increment(1);
            self.state = FramerState::Idle;
            return None;
        }

        block.push(line.to_string());
        None
    }
}
