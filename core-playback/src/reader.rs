//! # Chunk Source Reader
//!
//! Drains a read-once [`ChunkStream`] into a media buffer through a
//! [`ChunkAppender`], then replays the retained chunks for the remaining
//! repeat passes and finalizes the media source.
//!
//! ```text
//!   ChunkStream ──next()──▶ retain ──append()──▶ SourceBuffer
//!        ▲                                            │
//!        └──────────── only after UpdateEnd ◀─────────┘
//!
//!   pass 2..N: retained[0..] ──append()──▶ SourceBuffer
//!   done:      MediaSource::end_of_stream(None)
//!   failure:   MediaSource::end_of_stream(Some(Decode))
//! ```
//!
//! The loop is sequential, so the next chunk is never requested before the
//! previous append has completed. Both waits race the session's
//! [`CancellationToken`]; a cancelled drain drops the stream and leaves the
//! media source untouched.

use crate::appender::ChunkAppender;
use crate::error::{PlaybackError, Result};
use bridge_traits::{ChunkStream, EndOfStreamError, MediaSource};
use bytes::Bytes;
use core_async::sync::CancellationToken;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Byte accounting of a drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Chunks received from the stream (first pass).
    pub chunks_per_pass: usize,
    /// Bytes received from the stream (first pass).
    pub bytes_per_pass: usize,
    /// Passes fully written into the buffer.
    pub passes: u32,
    /// Total bytes written across all passes.
    pub bytes_written: usize,
}

/// How a drain ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every pass was written and the source was finalized.
    Completed(DrainReport),
    /// The cancellation token fired; the source was not finalized.
    Cancelled(DrainReport),
}

impl DrainOutcome {
    pub fn report(&self) -> &DrainReport {
        match self {
            DrainOutcome::Completed(report) | DrainOutcome::Cancelled(report) => report,
        }
    }
}

/// Sequential stream-to-buffer pump for one media source.
pub struct ChunkReader {
    appender: ChunkAppender,
    source: Arc<dyn MediaSource>,
    cancel_token: CancellationToken,
}

impl ChunkReader {
    pub fn new(
        appender: ChunkAppender,
        source: Arc<dyn MediaSource>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            appender,
            source,
            cancel_token,
        }
    }

    /// Drain `stream` into the buffer `repeat_count` times (`0` counts as `1`).
    ///
    /// # Errors
    ///
    /// [`PlaybackError::ChunkStream`] or [`PlaybackError::BufferWrite`]; in
    /// both cases the source has been finalized with a decode error and no
    /// further passes are written.
    #[instrument(skip(self, stream), fields(passes = repeat_count.max(1)))]
    pub async fn drain(&self, mut stream: ChunkStream, repeat_count: u32) -> Result<DrainOutcome> {
        let passes = repeat_count.max(1);
        let mut retained: Vec<Bytes> = Vec::new();
        let mut report = DrainReport::default();

        loop {
            let next = core_async::select! {
                biased;
                _ = self.cancel_token.cancelled() => {
                    debug!(chunks = report.chunks_per_pass, "Drain cancelled while reading");
                    return Ok(DrainOutcome::Cancelled(report));
                }
                next = stream.next() => next,
            };

            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    return Err(self.fail(PlaybackError::ChunkStream(e.to_string())));
                }
                None => break,
            };

            report.chunks_per_pass += 1;
            report.bytes_per_pass += chunk.len();
            retained.push(chunk.clone());

            if !self.append(chunk, &mut report).await? {
                return Ok(DrainOutcome::Cancelled(report));
            }
        }
        report.passes = 1;
        drop(stream);

        for pass in 2..=passes {
            for chunk in &retained {
                if !self.append(chunk.clone(), &mut report).await? {
                    return Ok(DrainOutcome::Cancelled(report));
                }
            }
            report.passes = pass;
        }

        self.source
            .end_of_stream(None)
            .map_err(|e| PlaybackError::MediaSource(e.to_string()))?;

        debug!(
            chunks = report.chunks_per_pass,
            passes = report.passes,
            bytes = report.bytes_written,
            "Drain complete, source finalized"
        );
        Ok(DrainOutcome::Completed(report))
    }

    /// Appends one chunk; `Ok(false)` when cancelled mid-write.
    async fn append(&self, chunk: Bytes, report: &mut DrainReport) -> Result<bool> {
        let len = chunk.len();
        let appended = core_async::select! {
            biased;
            _ = self.cancel_token.cancelled() => return Ok(false),
            appended = self.appender.append(chunk) => appended,
        };

        match appended {
            Ok(_) => {
                report.bytes_written += len;
                Ok(true)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&self, err: PlaybackError) -> PlaybackError {
        error!(error = %err, "Chunk drain failed, finalizing with decode error");
        if let Err(e) = self.source.end_of_stream(Some(EndOfStreamError::Decode)) {
            warn!(error = %e, "Failed to finalize media source after drain error");
        }
        err
    }
}

impl std::fmt::Debug for ChunkReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}
