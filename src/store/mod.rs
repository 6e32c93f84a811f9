//! # Series Store Module
//!
//! Bounded, filtered, per-channel buffering of decoded samples.
//!
//! This module handles:
//! - Per-channel time series in first-seen channel order
//! - Optional channel whitelisting
//! - FIFO eviction once a channel exceeds the sample limit
//! - Immutable snapshots for the view sink

use crate::sample::Sample;
use std::collections::{HashSet, VecDeque};

/// Bounded, ordered sequence of (timestamp, field tuple) entries for one channel
#[derive(Debug, Default)]
pub struct SeriesBuffer {
    timestamps: VecDeque<f64>,
    points: VecDeque<Vec<f64>>,
}

impl SeriesBuffer {
    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the buffer holds no entries
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Iterate entries oldest-first
    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> + '_ {
        self.timestamps
            .iter()
            .copied()
            .zip(self.points.iter().map(|p| p.as_slice()))
    }

    fn push(&mut self, timestamp: f64, fields: Vec<f64>) {
        self.timestamps.push_back(timestamp);
        self.points.push_back(fields);
    }

    fn evict_to(&mut self, limit: usize) {
        while self.timestamps.len() > limit {
            self.timestamps.pop_front();
            self.points.pop_front();
        }
    }
}

/// Owned copy of one channel's series, for the view sink
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSeries {
    /// Channel name
    pub name: String,
    /// Timestamps in seconds, oldest first
    pub timestamps: Vec<f64>,
    /// Field tuples aligned with `timestamps`
    pub points: Vec<Vec<f64>>,
}

/// Immutable view of every buffered channel, in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Per-channel series
    pub channels: Vec<ChannelSeries>,
}

/// Per-channel bounded series store.
///
/// Mutated only by the acquisition loop (or replay); read by the view sink
/// between iterations via [`snapshot`](SeriesStore::snapshot).
#[derive(Debug)]
pub struct SeriesStore {
    // Vec keeps first-seen channel order; channel counts are small
    series: Vec<(String, SeriesBuffer)>,
    sample_limit: Option<usize>,
    whitelist: Option<HashSet<String>>,
}

impl SeriesStore {
    /// Create a store with an optional per-channel bound and channel whitelist
    pub fn new(sample_limit: Option<usize>, whitelist: Option<HashSet<String>>) -> Self {
        Self {
            series: Vec::new(),
            sample_limit,
            whitelist,
        }
    }

    /// Whether a channel passes the configured whitelist.
    ///
    /// The acquisition loop consults this before the log-file write as well,
    /// so filtered channels reach neither the log nor the store.
    pub fn admits(&self, channel: &str) -> bool {
        match &self.whitelist {
            Some(list) => list.contains(channel),
            None => true,
        }
    }

    /// Buffer one sample.
    ///
    /// Discards the sample if the whitelist excludes its channel. Otherwise
    /// appends to the channel's buffer (created on first use) and evicts the
    /// oldest entries beyond the sample limit.
    pub fn log(&mut self, sample: &Sample) {
        if !self.admits(sample.channel()) {
            return;
        }

        let buffer = match self
            .series
            .iter()
            .position(|(name, _)| name == sample.channel())
        {
            Some(i) => i,
            None => {
                self.series
                    .push((sample.channel().to_string(), SeriesBuffer::default()));
                self.series.len() - 1
            }
        };
        let buffer = &mut self.series[buffer].1;

        buffer.push(sample.timestamp(), sample.fields());

        if let Some(limit) = self.sample_limit {
            buffer.evict_to(limit);
        }
    }

    /// Buffered channel names, in first-seen order
    pub fn channels(&self) -> impl Iterator<Item = &str> + '_ {
        self.series.iter().map(|(name, _)| name.as_str())
    }

    /// Read-only view of one channel's buffer
    pub fn series(&self, channel: &str) -> Option<&SeriesBuffer> {
        self.series
            .iter()
            .find(|(name, _)| name == channel)
            .map(|(_, buffer)| buffer)
    }

    /// Number of buffered channels
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether no channel has been buffered yet
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Owned snapshot of every channel, for the view sink
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            channels: self
                .series
                .iter()
                .map(|(name, buffer)| ChannelSeries {
                    name: name.clone(),
                    timestamps: buffer.timestamps.iter().copied().collect(),
                    points: buffer.points.iter().cloned().collect(),
                })
                .collect(),
        }
    }
}
