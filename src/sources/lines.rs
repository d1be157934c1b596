//! Line-delimited JSON source
//!
//! Each line is one raw event:
//!
//! ```text
//! {"kind":"Physics","frame":{"SpeedKmh":120.0,"Gear":3}}
//! {"kind":"Graphics","frame":{"Session":2,"CompletedLaps":7}}
//! ```

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, trace, warn};

use crate::Result;
use crate::source::TelemetrySource;
use crate::types::RawEvent;

/// Reads raw events as JSON lines from an async reader.
///
/// Blank lines are ignored. Lines that fail to parse are logged and
/// skipped; only I/O failures surface as errors.
pub struct LineSource<R> {
    lines: LinesStream<R>,
    line_no: u64,
    label: String,
}

impl<R> LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self { lines: LinesStream::new(reader.lines()), line_no: 0, label: label.into() }
    }
}

impl LineSource<BufReader<Stdin>> {
    /// Source reading standard input.
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), "stdin")
    }
}

#[async_trait::async_trait]
impl<R> TelemetrySource for LineSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_event(&mut self) -> Result<Option<RawEvent>> {
        while let Some(line) = self.lines.next().await {
            let line = line?;
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<RawEvent>(trimmed) {
                Ok(event) => {
                    trace!(line = self.line_no, kind = %event.kind, "Parsed raw event");
                    return Ok(Some(event));
                }
                Err(e) => {
                    warn!(source = %self.label, line = self.line_no, "Skipping malformed event: {}", e);
                }
            }
        }

        debug!(source = %self.label, lines = self.line_no, "Line source ended");
        Ok(None)
    }

    fn describe(&self) -> String {
        format!("JSON lines from {}", self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SnapshotKind;

    fn source(text: &'static str) -> LineSource<&'static [u8]> {
        LineSource::new(text.as_bytes(), "test")
    }

    #[tokio::test]
    async fn reads_events_in_order() {
        let mut src = source(
            "{\"kind\":\"Physics\",\"frame\":{\"SpeedKmh\":120.0}}\n\
             {\"kind\":\"StaticInfo\",\"frame\":{\"Track\":\"Spa\"}}\n",
        );

        let first = src.next_event().await.unwrap().unwrap();
        assert_eq!(first.kind, SnapshotKind::Physics);
        let second = src.next_event().await.unwrap().unwrap();
        assert_eq!(second.kind, SnapshotKind::StaticInfo);
        assert!(src.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn skips_blank_and_malformed_lines() {
        let mut src = source(
            "\n\
             not json\n\
             {\"kind\":\"Tyres\"}\n\
             {\"kind\":\"Graphics\"}\n",
        );

        let event = src.next_event().await.unwrap().unwrap();
        assert_eq!(event.kind, SnapshotKind::Graphics);
        assert!(event.frame.is_none());
        assert!(src.next_event().await.unwrap().is_none());
    }
}
