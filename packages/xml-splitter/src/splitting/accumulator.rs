//! Chunk accumulation and the flush policy.

use std::fmt;
use std::io;
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::types::{Chunk, Element};
use crate::xml::serialized_len;

/// Decides which chunk the threshold-crossing record belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlushPolicy {
    /// Flush the current chunk before adding a record that would push it
    /// over the threshold. That record starts the next chunk.
    #[default]
    PreCheck,

    /// Add the record first, then flush once the running total meets or
    /// exceeds the threshold.
    PostCheck,
}

impl FlushPolicy {
    /// Name used on the command line and in config files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreCheck => "pre-check",
            Self::PostCheck => "post-check",
        }
    }
}

impl fmt::Display for FlushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlushPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-check" => Ok(Self::PreCheck),
            "post-check" => Ok(Self::PostCheck),
            other => Err(format!(
                "unknown policy '{other}', expected 'pre-check' or 'post-check'"
            )),
        }
    }
}

/// Records of the chunk under construction plus their running size.
#[derive(Debug)]
pub struct ChunkAccumulator {
    threshold: u64,
    policy: FlushPolicy,
    elements: Vec<Element>,
    size: u64,
}

impl ChunkAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new(threshold: u64, policy: FlushPolicy) -> Self {
        Self {
            threshold,
            policy,
            elements: Vec::new(),
            size: 0,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Running total of the measured record sizes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append a record of known size and return the new running total.
    pub fn add(&mut self, element: Element, size: u64) -> u64 {
        self.elements.push(element);
        self.size = self.size.saturating_add(size);
        self.size
    }

    /// Drop all held records and zero the running total.
    pub fn reset(&mut self) {
        self.elements.clear();
        self.size = 0;
    }

    fn take(&mut self) -> Chunk {
        let chunk = Chunk {
            elements: std::mem::take(&mut self.elements),
            accumulated_size: self.size,
        };
        self.reset();
        chunk
    }

    /// Measure a record, apply the flush policy and add it.
    ///
    /// Returns the chunk that has to be written now, if any. Under
    /// [`FlushPolicy::PreCheck`] that is the chunk as it was before this
    /// record; under [`FlushPolicy::PostCheck`] it includes this record.
    pub fn push(&mut self, element: Element) -> io::Result<Option<Chunk>> {
        let size = serialized_len(&element)?;

        match self.policy {
            FlushPolicy::PreCheck => {
                let ready = if !self.is_empty() && self.size.saturating_add(size) > self.threshold
                {
                    debug!(
                        current = self.size,
                        incoming = size,
                        threshold = self.threshold,
                        "Flushing before record"
                    );
                    Some(self.take())
                } else {
                    None
                };
                self.add(element, size);
                Ok(ready)
            }
            FlushPolicy::PostCheck => {
                let total = self.add(element, size);
                if total >= self.threshold {
                    debug!(total, threshold = self.threshold, "Flushing after record");
                    Ok(Some(self.take()))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Hand out the trailing chunk, if it holds any records.
    pub fn finish(&mut self) -> Option<Chunk> {
        if self.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Element that serializes to exactly `bytes` bytes.
    fn sized(bytes: usize) -> Element {
        // <r> + text + </r>
        Element::new("r").with_text("x".repeat(bytes - 7))
    }

    fn sizes(chunk: &Chunk) -> Vec<u64> {
        chunk
            .elements
            .iter()
            .map(|e| serialized_len(e).unwrap())
            .collect()
    }

    #[test]
    fn test_sized_helper() {
        assert_eq!(serialized_len(&sized(30)).unwrap(), 30);
    }

    #[test]
    fn test_add_and_reset() {
        let mut acc = ChunkAccumulator::new(100, FlushPolicy::PreCheck);
        assert_eq!(acc.add(sized(30), 30), 30);
        assert_eq!(acc.add(sized(20), 20), 50);
        assert_eq!(acc.len(), 2);

        acc.reset();
        assert!(acc.is_empty());
        assert_eq!(acc.size(), 0);
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_pre_check_flushes_before_overflow() {
        let mut acc = ChunkAccumulator::new(100, FlushPolicy::PreCheck);
        assert!(acc.push(sized(30)).unwrap().is_none());
        assert!(acc.push(sized(30)).unwrap().is_none());
        assert!(acc.push(sized(30)).unwrap().is_none());

        let chunk = acc.push(sized(30)).unwrap().unwrap();
        assert_eq!(sizes(&chunk), vec![30, 30, 30]);
        assert_eq!(chunk.accumulated_size, 90);

        // The record that triggered the flush starts the next chunk.
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.size(), 30);
        let last = acc.finish().unwrap();
        assert_eq!(last.accumulated_size, 30);
        assert!(acc.is_empty());
    }

    #[test]
    fn test_pre_check_exact_fit_does_not_flush() {
        let mut acc = ChunkAccumulator::new(100, FlushPolicy::PreCheck);
        assert!(acc.push(sized(50)).unwrap().is_none());
        assert!(acc.push(sized(50)).unwrap().is_none());
        assert_eq!(acc.size(), 100);

        let chunk = acc.push(sized(10)).unwrap().unwrap();
        assert_eq!(chunk.len(), 2);
    }

    #[test]
    fn test_pre_check_oversized_record_gets_own_chunk() {
        let mut acc = ChunkAccumulator::new(100, FlushPolicy::PreCheck);
        assert!(acc.push(sized(10)).unwrap().is_none());

        let before = acc.push(sized(250)).unwrap().unwrap();
        assert_eq!(sizes(&before), vec![10]);

        let oversized = acc.push(sized(10)).unwrap().unwrap();
        assert_eq!(sizes(&oversized), vec![250]);
    }

    #[test]
    fn test_pre_check_oversized_first_record_is_kept() {
        let mut acc = ChunkAccumulator::new(100, FlushPolicy::PreCheck);
        assert!(acc.push(sized(500)).unwrap().is_none());
        assert_eq!(acc.len(), 1);
        assert_eq!(acc.finish().unwrap().accumulated_size, 500);
    }

    #[test]
    fn test_post_check_flushes_after_crossing() {
        let mut acc = ChunkAccumulator::new(100, FlushPolicy::PostCheck);
        assert!(acc.push(sized(30)).unwrap().is_none());
        assert!(acc.push(sized(30)).unwrap().is_none());
        assert!(acc.push(sized(30)).unwrap().is_none());

        let chunk = acc.push(sized(30)).unwrap().unwrap();
        assert_eq!(sizes(&chunk), vec![30, 30, 30, 30]);
        assert_eq!(chunk.accumulated_size, 120);
        assert!(acc.is_empty());
        assert!(acc.finish().is_none());
    }

    #[test]
    fn test_post_check_flushes_on_exact_threshold() {
        let mut acc = ChunkAccumulator::new(100, FlushPolicy::PostCheck);
        assert!(acc.push(sized(50)).unwrap().is_none());
        let chunk = acc.push(sized(50)).unwrap().unwrap();
        assert_eq!(chunk.accumulated_size, 100);
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("pre-check".parse::<FlushPolicy>(), Ok(FlushPolicy::PreCheck));
        assert_eq!("post-check".parse::<FlushPolicy>(), Ok(FlushPolicy::PostCheck));
        assert!("exact".parse::<FlushPolicy>().is_err());
        assert_eq!(FlushPolicy::PostCheck.to_string(), "post-check");
        assert_eq!(FlushPolicy::default(), FlushPolicy::PreCheck);
    }
}
