// Chat driver - streams a response out of the shared inference handle
//
// Generation runs in its own task holding a lease on the handle for the whole
// stream, so two streams never interleave on one model and the handle cannot
// be reclaimed mid-answer.

use anyhow::{anyhow, Result};
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::models::{GenerationLease, Turn};

/// Partials buffered ahead of the reader
const STREAM_BUFFER: usize = 1;

/// Finite, non-restartable sequence of cumulative partial responses
pub struct ResponseStream {
    rx: mpsc::Receiver<Result<String>>,
}

impl ResponseStream {
    /// Consume every partial and return the last one (the final answer).
    ///
    /// An empty stream or any mid-stream error is a generation failure.
    pub async fn drain(mut self) -> Result<String> {
        let mut last = None;
        while let Some(item) = self.next().await {
            last = Some(item?);
        }
        last.ok_or_else(|| anyhow!("Model produced an empty response"))
    }

    /// Collect all partials (diagnostics and tests)
    pub async fn collect_partials(mut self) -> Result<Vec<String>> {
        let mut partials = Vec::new();
        while let Some(item) = self.next().await {
            partials.push(item?);
        }
        Ok(partials)
    }
}

impl Stream for ResponseStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChatDriver;

impl ChatDriver {
    pub fn new() -> Self {
        Self
    }

    /// Start generating a response to `query`
    pub fn respond(&self, lease: GenerationLease, query: String, history: Vec<Turn>) -> ResponseStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let handle = lease.handle();
            tracing::debug!(handle = %handle.id(), "Generation started");
            if let Err(e) = handle.model().stream_chat(&query, &history, &tx).await {
                tracing::debug!(handle = %handle.id(), "Generation failed: {:#}", e);
                let _ = tx.send(Err(e)).await;
            }
            tracing::debug!(handle = %handle.id(), "Generation finished");
            drop(lease);
        });

        ResponseStream { rx }
    }
}
