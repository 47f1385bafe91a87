pub mod capture_file;
pub mod lines;
pub mod serial;

pub use capture_file::CaptureFileSource;
pub use lines::line_stream;
pub use serial::SerialLineSource;
