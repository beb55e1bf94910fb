use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::input::{event::Event, runtime::client::RuntimeClient};

use super::SourceError;

/// Reads one JSON encoded [Event] per line and forwards it to the runtime.
/// Blank lines and lines starting with `#` are skipped.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    reader: R,
    client: RuntimeClient,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, client: RuntimeClient) -> Self {
        Self { reader, client }
    }

    /// Forward events until the input is exhausted. Malformed lines are
    /// logged and skipped. Returns the number of forwarded events.
    pub async fn run(&mut self) -> Result<usize, SourceError> {
        let mut lines = (&mut self.reader).lines();
        let mut count = 0;
        let mut line_number = 0;
        while let Some(line) = lines.next_line().await? {
            line_number += 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let event: Event = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(e) => {
                    log::warn!("Skipping malformed event on line {line_number}: {e}");
                    continue;
                }
            };
            log::trace!("Read event: {event:?}");
            self.client.process_event(event).await?;
            count += 1;
        }
        log::debug!("Input source closed after {count} events");
        Ok(count)
    }
}
