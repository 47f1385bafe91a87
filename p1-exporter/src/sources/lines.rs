use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{AnyDelimiterCodec, FramedRead};

use crate::pipeline::{LineStream, PipelineError};

/// Longest line accepted before the session is treated as garbage.
pub const MAX_LINE_BYTES: usize = 4096;

/// Decode `reader` into trimmed lines.
///
/// Lines are split on `\n` as raw bytes. Bytes that are not valid UTF-8,
/// such as line noise while the port settles, become U+FFFD instead of
/// failing the session.
///
/// With a `read_timeout`, each line must arrive within that window or the
/// stream yields [`PipelineError::ReadTimeout`] and ends. Any read or decode
/// error also ends the stream. Dropping the stream drops `reader`.
pub fn line_stream<R>(reader: R, read_timeout: Option<Duration>) -> LineStream
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let s = async_stream::try_stream! {
        let codec =
            AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), MAX_LINE_BYTES);
        let mut frames = FramedRead::new(reader, codec);

        loop {
            let next = match read_timeout {
                Some(limit) => tokio::time::timeout(limit, frames.next())
                    .await
                    .map_err(|_| PipelineError::ReadTimeout(limit))?,
                None => frames.next().await,
            };

            let line = match next {
                Some(line) => line
                    .map_err(|e| PipelineError::Source(format!("failed to read line: {e}")))?,
                None => break,
            };

            yield String::from_utf8_lossy(&line).trim().to_string();
        }
    };

    Box::pin(s)
}
