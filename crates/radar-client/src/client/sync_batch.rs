//! Replay of missed channel history.
//!
//! # Purpose
//! After a reconnect (or an explicit `sync` request) the server sends one
//! `sync` frame per channel holding the history the client may have missed.
//! The server does not know what the client already saw, so the same updates
//! can arrive more than once.
//!
//! # Watermarks
//! For each channel we remember the newest update time delivered so far. Only
//! entries strictly newer than that are replayed, which makes delivering the
//! same frame twice invisible to listeners. A watermark never moves backwards.
use radar_wire::{Message, SyncBatch};
use std::collections::HashMap;

use crate::error::Result;

/// Updates selected for replay from one sync frame.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Replay {
    pub(crate) channel: String,
    // In payload order.
    pub(crate) updates: Vec<Message>,
    pub(crate) suppressed: usize,
    pub(crate) watermark: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SyncBatchProcessor {
    watermarks: HashMap<String, u64>,
}

impl SyncBatchProcessor {
    /// Decodes `frame` and selects the entries newer than the channel's
    /// watermark, then advances the watermark.
    ///
    /// Frames without a channel, history, or time are not an error and yield
    /// `None`. A frame with any undecodable entry fails as a whole and leaves
    /// the watermark untouched.
    ///
    /// This is all-or-nothing on purpose, unlike a streaming replay that
    /// emits each entry as it is decoded: entries ahead of the bad one are
    /// not replayed either, so listeners never see half of a frame that
    /// the caller is told failed.
    pub(crate) fn process(&mut self, frame: &Message) -> Result<Option<Replay>> {
        let Some(batch) = SyncBatch::from_message(frame)? else {
            return Ok(None);
        };
        let current = self.watermark(&batch.channel).unwrap_or(0);
        let mut newest = batch.time;
        let mut updates = Vec::new();
        let mut suppressed = 0;
        for entry in batch.entries {
            if entry.time > newest {
                newest = entry.time;
            }
            if entry.time > current {
                updates.push(entry.message);
            } else {
                suppressed += 1;
            }
        }
        let watermark = newest.max(current);
        self.watermarks.insert(batch.channel.clone(), watermark);
        Ok(Some(Replay {
            channel: batch.channel,
            updates,
            suppressed,
            watermark,
        }))
    }

    pub(crate) fn watermark(&self, channel: &str) -> Option<u64> {
        self.watermarks.get(channel).copied()
    }
}
