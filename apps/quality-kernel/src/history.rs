use std::collections::VecDeque;

use crate::models::HistorySample;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Bounded, append-only score series feeding the chart. Oldest samples are
/// evicted first once `capacity` is exceeded.
pub struct ScoreHistory {
    samples: VecDeque<HistorySample>,
    capacity: usize,
    recorded: u64,
}

impl ScoreHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ScoreHistory {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            recorded: 0,
        }
    }

    pub fn record(&mut self, sample: HistorySample) {
        self.samples.push_back(sample);
        self.recorded += 1;

        while self.samples.len() > self.capacity {
            if let Some(evicted) = self.samples.pop_front() {
                tracing::trace!("Evicted history sample #{}", evicted.sequence);
            }
        }
    }

    /// Sequence number for the next sample; starts at 1.
    pub fn next_sequence(&self) -> u64 {
        self.recorded + 1
    }

    /// Oldest first.
    pub fn samples(&self) -> Vec<HistorySample> {
        self.samples.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    /// Hover lookup for the chart tooltip. `None` once evicted.
    pub fn get(&self, sequence: u64) -> Option<&HistorySample> {
        self.samples.iter().find(|s| s.sequence == sequence)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKey;
    use std::collections::BTreeMap;

    fn sample(sequence: u64, score: u8) -> HistorySample {
        HistorySample {
            sequence,
            timestamp: chrono::Utc::now().to_rfc3339(),
            overall_score: score,
            trigger: MetricKey::CustomerSatisfaction,
            metric_snapshot: BTreeMap::new(),
        }
    }

    #[test]
    fn test_empty_initially() {
        let history = ScoreHistory::new(10);
        assert!(history.is_empty());
        assert!(history.samples().is_empty());
        assert_eq!(history.next_sequence(), 1);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let capacity = 50;
        let mut history = ScoreHistory::new(capacity);

        for i in 0..(capacity as u64 + 5) {
            history.record(sample(history.next_sequence(), (i % 101) as u8));
        }

        let samples = history.samples();
        assert_eq!(samples.len(), capacity);
        // Sequences 1..=5 are gone; order is preserved.
        assert_eq!(samples.first().unwrap().sequence, 6);
        assert_eq!(samples.last().unwrap().sequence, 55);
        assert!(samples.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert!(history.get(5).is_none());
        assert_eq!(history.get(6).unwrap().overall_score, 5);
    }

    #[test]
    fn test_no_dedup() {
        let mut history = ScoreHistory::new(3);
        history.record(sample(1, 40));
        history.record(sample(2, 40));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().unwrap().sequence, 2);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut history = ScoreHistory::new(0);
        history.record(sample(1, 10));
        history.record(sample(2, 20));

        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().overall_score, 20);
    }
}
