use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::broadcast::{self, error::RecvError},
};

use crate::input::event::Event;

use super::TargetError;

/// Writes every emitted [Event] as one line of JSON
#[derive(Debug)]
pub struct JsonLinesTarget<W> {
    writer: W,
    rx: broadcast::Receiver<Event>,
}

impl<W> JsonLinesTarget<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W, rx: broadcast::Receiver<Event>) -> Self {
        Self { writer, rx }
    }

    /// Write events until every sender is dropped. Returns the number of
    /// written events.
    pub async fn run(&mut self) -> Result<usize, TargetError> {
        let mut count = 0;
        loop {
            let event = match self.rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Output target lagged behind, dropped {skipped} events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let mut line = serde_json::to_vec(&event)?;
            line.push(b'\n');
            self.writer.write_all(&line).await?;
            self.writer.flush().await?;
            count += 1;
        }
        log::debug!("Output target closed after {count} events");
        Ok(count)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
