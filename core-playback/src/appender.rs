//! # Chunk Buffer Appender
//!
//! Serializes writes against a [`SourceBuffer`] that accepts one pending
//! write at a time.
//!
//! Callers are served strictly in call order: the writer lock is a fair
//! async mutex, so concurrent `append` calls queue FIFO and at most one write
//! is ever in flight. Each call resolves only after the buffer signals
//! completion for that specific chunk.

use crate::error::{PlaybackError, Result};
use bridge_traits::{SourceBuffer, SourceBufferEvent};
use bytes::Bytes;
use core_async::sync::broadcast::error::{RecvError, TryRecvError};
use core_async::sync::{broadcast, Mutex};
use std::sync::Arc;
use tracing::{trace, warn};

/// FIFO, single-writer front for one source buffer.
pub struct ChunkAppender {
    buffer: Arc<dyn SourceBuffer>,
    /// Position of the next chunk. Holding the lock is holding the write slot.
    next_position: Mutex<u64>,
}

impl ChunkAppender {
    pub fn new(buffer: Arc<dyn SourceBuffer>) -> Self {
        Self {
            buffer,
            next_position: Mutex::new(0),
        }
    }

    /// Number of appends issued so far, including failed ones.
    pub async fn appended(&self) -> u64 {
        *self.next_position.lock().await
    }

    /// Appends `chunk` and waits for the buffer to finish writing it.
    ///
    /// Returns the chunk's position in this appender's sequence.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::BufferWrite`] when the buffer rejects the write or
    /// signals an error for it. The position is consumed either way.
    pub async fn append(&self, chunk: Bytes) -> Result<u64> {
        let mut next = self.next_position.lock().await;
        let position = *next;
        *next += 1;

        // Subscribe before inspecting `updating` so a completion published
        // between the check and the wait cannot be missed.
        let mut events = self.buffer.subscribe();
        self.wait_idle(&mut events, position).await?;
        drain_stale(&mut events);

        let len = chunk.len();
        self.buffer
            .append_buffer(chunk)
            .map_err(|e| PlaybackError::BufferWrite {
                position,
                message: e.to_string(),
            })?;
        trace!(position, bytes = len, "Chunk append issued");

        loop {
            match events.recv().await {
                Ok(SourceBufferEvent::UpdateEnd) => return Ok(position),
                Ok(SourceBufferEvent::Error(message)) => {
                    return Err(PlaybackError::BufferWrite { position, message })
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(position, skipped, "Source buffer events lagged");
                    if !self.buffer.updating() {
                        return Ok(position);
                    }
                }
                Err(RecvError::Closed) => {
                    return Err(PlaybackError::BufferWrite {
                        position,
                        message: "source buffer closed".to_string(),
                    })
                }
            }
        }
    }

    /// Waits out a write that was issued outside this appender.
    async fn wait_idle(
        &self,
        events: &mut broadcast::Receiver<SourceBufferEvent>,
        position: u64,
    ) -> Result<()> {
        while self.buffer.updating() {
            match events.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => {
                    return Err(PlaybackError::BufferWrite {
                        position,
                        message: "source buffer closed".to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

fn drain_stale(events: &mut broadcast::Receiver<SourceBufferEvent>) {
    loop {
        match events.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

impl std::fmt::Debug for ChunkAppender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkAppender")
            .field("updating", &self.buffer.updating())
            .finish()
    }
}
