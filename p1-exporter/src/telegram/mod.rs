pub mod assembler;
pub mod fields;
pub mod framer;

pub use assembler::{assemble_reading, AssembleError};
pub use fields::{read_value, ObisField};
pub use framer::{FramerState, TelegramFramer};

/// Prefix of the line that opens a telegram.
pub const START_MARKER: &str = "/ISK5";

/// Prefix of the line that closes a telegram.
pub const END_MARKER: &str = "!";
