//! LabelSequence: per-sample hidden-state labels

use crate::dimension_error;
use crate::error::SdmResult;
use serde::{Deserialize, Serialize};

/// One label per observation, each in `0..n_components`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSequence {
    labels: Vec<usize>,
    n_components: usize,
}

/// Run of consecutive samples sharing a label, `start..end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSegment {
    /// Label shared by every sample in the run
    pub label: usize,
    /// Index of the first sample in the run
    pub start: usize,
    /// One past the last sample in the run (exclusive)
    pub end: usize,
}

impl LabelSegment {
    /// Number of samples in the segment
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Segments always hold at least one sample
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

impl LabelSequence {
    /// Create a label sequence, validating every label against `n_components`
    pub fn new(labels: Vec<usize>, n_components: usize) -> SdmResult<Self> {
        if let Some((index, label)) = labels
            .iter()
            .enumerate()
            .find(|(_, &label)| label >= n_components)
        {
            return Err(dimension_error!(
                "label {} at sample {} is outside 0..{}",
                label,
                index,
                n_components
            ));
        }

        Ok(LabelSequence { labels, n_components })
    }

    /// Number of labelled samples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if sequence is empty
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of components labels were drawn from
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Label of sample `index`
    pub fn get(&self, index: usize) -> Option<usize> {
        self.labels.get(index).copied()
    }

    /// Borrow labels
    pub fn as_slice(&self) -> &[usize] {
        &self.labels
    }

    /// Iterate labels in sample order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.labels.iter().copied()
    }

    /// Samples assigned to each component
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_components];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }

    /// Run-length segments for sample-aligned overlays
    pub fn segments(&self) -> Vec<LabelSegment> {
        let mut segments: Vec<LabelSegment> = Vec::new();

        for (index, &label) in self.labels.iter().enumerate() {
            match segments.last_mut() {
                Some(segment) if segment.label == label => segment.end = index + 1,
                _ => segments.push(LabelSegment {
                    label,
                    start: index,
                    end: index + 1,
                }),
            }
        }

        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_validation() {
        assert!(LabelSequence::new(vec![0, 1, 2], 3).is_ok());
        assert!(LabelSequence::new(vec![0, 3], 3).is_err());
    }

    #[test]
    fn test_counts() {
        let labels = LabelSequence::new(vec![0, 0, 2, 2, 2, 0], 3).unwrap();
        assert_eq!(labels.counts(), vec![3, 0, 3]);
    }

    #[test]
    fn test_segments() {
        let labels = LabelSequence::new(vec![1, 1, 0, 0, 0, 1], 2).unwrap();
        let segments = labels.segments();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], LabelSegment { label: 1, start: 0, end: 2 });
        assert_eq!(segments[1].len(), 3);
        assert_eq!(segments[2], LabelSegment { label: 1, start: 5, end: 6 });

        let total: usize = segments.iter().map(|s| s.len()).sum();
        assert_eq!(total, labels.len());
    }
}
