//! Accumulate records into a summary the renderer can draw.
//!
//! Three summarizers share the [`Accumulate`] interface:
//!
//! - [`UnboundedCounter`]: exact counts of every key ever seen.
//! - [`WindowCounter`]: counts over the most recent `N` keys only.
//! - [`NumericSample`]: a sorted sample of numbers, binned on demand.
//!
//! [`Accumulator`] is the closed set of these, chosen once at startup.
//!
//! Snapshots are detached from the accumulator. The unbounded table and the
//! numeric sample sit behind an `Arc`, so a snapshot is a pointer copy and
//! the next `consume` clones the data only while a snapshot is still alive.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::error::MonitorError;
use crate::frange::{BinnedDistribution, FloatRange};

/// Consume one record at a time, produce a read-only view on demand.
pub trait Accumulate {
    type Item;
    type View;

    fn consume(&mut self, item: Self::Item);

    /// Detached view of the current state. Never mutates.
    fn snapshot(&self) -> Self::View;
}

/// What the run is counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Lines are keys; show the most common ones.
    Frequency,
    /// Lines are numbers; show their distribution.
    Histogram,
}

/// A sanitized input line, ready to consume.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Key(String),
    Value(f64),
}

impl Record {
    /// Interprets a sanitized line according to `mode`.
    ///
    /// # Errors
    /// Returns [`MonitorError::InputParse`] when a histogram record is not a number.
    pub fn parse(mode: Mode, line: String) -> Result<Self, MonitorError> {
        match mode {
            Mode::Frequency => Ok(Record::Key(line)),
            Mode::Histogram => match line.trim().parse::<f64>() {
                Ok(x) => Ok(Record::Value(x)),
                Err(source) => Err(MonitorError::InputParse {
                    record: line,
                    source,
                }),
            },
        }
    }
}

/// Key to count mapping.
///
/// Keys that were never observed read as zero; every stored key has a count
/// of at least one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: Arc<HashMap<String, u64>>,
}

impl FrequencyTable {
    pub fn increment(&mut self, key: String) {
        *Arc::make_mut(&mut self.counts).entry(key).or_insert(0) += 1;
    }

    /// Count for `key`, zero if it was never seen.
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(k, c)| (k.as_str(), *c))
    }
}

impl<'a> FromIterator<&'a str> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for key in iter {
            match counts.entry(key.to_string()) {
                Entry::Occupied(mut e) => *e.get_mut() += 1,
                Entry::Vacant(e) => {
                    e.insert(1);
                }
            }
        }
        Self {
            counts: Arc::new(counts),
        }
    }
}

/// Exact counts of every key, without bound.
#[derive(Debug, Clone, Default)]
pub struct UnboundedCounter {
    table: FrequencyTable,
}

impl UnboundedCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulate for UnboundedCounter {
    type Item = String;
    type View = FrequencyTable;

    fn consume(&mut self, key: String) {
        self.table.increment(key);
    }

    fn snapshot(&self) -> FrequencyTable {
        self.table.clone()
    }
}

/// Counts over the most recent `capacity` keys (FIFO eviction).
#[derive(Debug, Clone)]
pub struct WindowCounter {
    capacity: NonZeroUsize,
    window: VecDeque<String>,
}

impl WindowCounter {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            window: VecDeque::with_capacity(capacity.get()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Current window, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.window.iter().map(String::as_str)
    }
}

impl Accumulate for WindowCounter {
    type Item = String;
    type View = FrequencyTable;

    fn consume(&mut self, key: String) {
        if self.window.len() == self.capacity.get() {
            self.window.pop_front();
        }
        self.window.push_back(key);
    }

    /// Tallies the window contents, O(N).
    fn snapshot(&self) -> FrequencyTable {
        self.iter().collect()
    }
}

/// Sorted multiset of numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericSample {
    values: Arc<Vec<f64>>,
}

impl NumericSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Values in ascending order.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Bins the sample into the buckets of `range`.
    ///
    /// The sample and the bucket boundaries are both sorted, so one merge
    /// pass assigns every value. Values outside the range, NaN included, are
    /// counted as out of range, so the distribution total always equals `len()`.
    pub fn get_dist(&self, range: &FloatRange) -> BinnedDistribution {
        let markers = range.markers();
        let n = range.len();
        let bounds = range.start()..=range.end();
        let mut counts = vec![0usize; n];
        let mut out_of_range = 0;
        let mut bucket = 0;

        for &x in self.values.iter() {
            if !bounds.contains(&x) {
                out_of_range += 1;
                continue;
            }
            while bucket + 1 < n && x >= markers[bucket + 1] {
                bucket += 1;
            }
            counts[bucket] += 1;
        }

        BinnedDistribution::new(range, counts, out_of_range)
    }
}

impl Accumulate for NumericSample {
    type Item = f64;
    type View = NumericSample;

    /// Inserts after any equal values, keeping the sample sorted.
    fn consume(&mut self, x: f64) {
        let values = Arc::make_mut(&mut self.values);
        let at = values.partition_point(|v| v.total_cmp(&x).is_le());
        values.insert(at, x);
    }

    fn snapshot(&self) -> NumericSample {
        self.clone()
    }
}

/// A detached view handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Frequencies(FrequencyTable),
    Sample(NumericSample),
}

/// The live accumulator of a run.
#[derive(Debug, Clone)]
pub enum Accumulator {
    Unbounded(UnboundedCounter),
    Window(WindowCounter),
    Numeric(NumericSample),
}

impl Accumulator {
    /// Picks the variant for a mode and optional window size.
    ///
    /// Windows only apply to frequency counting; the histogram always keeps
    /// the full sample.
    pub fn for_mode(mode: Mode, window: Option<NonZeroUsize>) -> Self {
        match (mode, window) {
            (Mode::Frequency, None) => Accumulator::Unbounded(UnboundedCounter::new()),
            (Mode::Frequency, Some(n)) => Accumulator::Window(WindowCounter::new(n)),
            (Mode::Histogram, _) => Accumulator::Numeric(NumericSample::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Accumulator::Unbounded(_) | Accumulator::Window(_) => Mode::Frequency,
            Accumulator::Numeric(_) => Mode::Histogram,
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Accumulator::Unbounded(_) => "unbounded",
            Accumulator::Window(_) => "window",
            Accumulator::Numeric(_) => "numeric",
        }
    }
}

impl Accumulate for Accumulator {
    type Item = Record;
    type View = Snapshot;

    fn consume(&mut self, record: Record) {
        match (self, record) {
            (Accumulator::Unbounded(acc), Record::Key(key)) => acc.consume(key),
            (Accumulator::Window(acc), Record::Key(key)) => acc.consume(key),
            (Accumulator::Numeric(acc), Record::Value(x)) => acc.consume(x),
            (acc, record) => {
                // Records are parsed with the accumulator's own mode, so kinds always match.
                if cfg!(debug_assertions) {
                    unreachable!("{} accumulator got {record:?}", acc.kind());
                }
                tracing::warn!(kind = acc.kind(), ?record, "dropping record of the wrong kind");
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        match self {
            Accumulator::Unbounded(acc) => Snapshot::Frequencies(acc.snapshot()),
            Accumulator::Window(acc) => Snapshot::Frequencies(acc.snapshot()),
            Accumulator::Numeric(acc) => Snapshot::Sample(acc.snapshot()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frange::Bucket;

    fn window(n: usize) -> WindowCounter {
        WindowCounter::new(NonZeroUsize::new(n).unwrap())
    }

    #[test]
    fn test_unbounded_counts_everything() {
        let mut acc = UnboundedCounter::new();
        for key in ["a", "a", "b", "c", "a"] {
            acc.consume(key.to_string());
        }
        let dist = acc.snapshot();
        assert_eq!(dist.get("a"), 3);
        assert_eq!(dist.get("b"), 1);
        assert_eq!(dist.get("c"), 1);
        assert_eq!(dist.len(), 3);
        assert_eq!(dist.total(), 5);
    }

    #[test]
    fn test_missing_key_reads_zero() {
        let mut acc = UnboundedCounter::new();
        acc.consume("x".to_string());
        assert_eq!(acc.snapshot().get("never-seen"), 0);
        assert_eq!(FrequencyTable::default().get("x"), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut acc = UnboundedCounter::new();
        acc.consume("x".to_string());
        let before = acc.snapshot();
        acc.consume("x".to_string());
        acc.consume("y".to_string());
        assert_eq!(before.get("x"), 1);
        assert_eq!(before.get("y"), 0);
        assert_eq!(acc.snapshot().get("x"), 2);
    }

    #[test]
    fn test_snapshot_idempotent() {
        let mut acc = UnboundedCounter::new();
        for key in ["x", "x", "y"] {
            acc.consume(key.to_string());
        }
        assert_eq!(acc.snapshot(), acc.snapshot());

        let mut w = window(2);
        w.consume("p".to_string());
        w.consume("q".to_string());
        assert_eq!(w.snapshot(), w.snapshot());
    }

    #[test]
    fn test_window_keeps_recent() {
        let mut acc = window(3);
        for key in ["a", "a", "b"] {
            acc.consume(key.to_string());
        }
        let dist = acc.snapshot();
        assert_eq!(dist.get("a"), 2);
        assert_eq!(dist.get("b"), 1);

        acc.consume("c".to_string());
        acc.consume("b".to_string());
        let dist = acc.snapshot();
        assert_eq!(dist.get("a"), 0);
        assert_eq!(dist.get("b"), 2);
        assert_eq!(dist.get("c"), 1);
        assert_eq!(dist.len(), 2);
        assert_eq!(acc.iter().collect::<Vec<_>>(), vec!["b", "c", "b"]);
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut acc = window(4);
        for i in 0..100 {
            acc.consume(format!("k{}", i % 7));
            assert!(acc.len() <= acc.capacity());
        }
        assert_eq!(acc.len(), 4);
        assert_eq!(acc.snapshot().total(), 4);
    }

    #[test]
    fn test_numeric_sample_stays_sorted() {
        let mut acc = NumericSample::new();
        for x in [5.0, -1.0, 3.5, 3.5, 0.0, 10.0, 2.25] {
            acc.consume(x);
        }
        let values = acc.as_slice();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(acc.min(), Some(-1.0));
        assert_eq!(acc.max(), Some(10.0));
        assert_eq!(acc.len(), 7);
    }

    #[test]
    fn test_numeric_sample_empty_bounds() {
        let acc = NumericSample::new();
        assert!(acc.is_empty());
        assert_eq!(acc.min(), None);
        assert_eq!(acc.max(), None);
    }

    #[test]
    fn test_get_dist_closed_top_bucket() {
        // deliberately unsorted input
        let data = [6.0, 0.0, 3.0, 8.0, 1.0, 7.0, 3.0, 2.0, 6.0, 4.0, 1.0, 7.0, 3.0, 6.0];
        let mut acc = NumericSample::new();
        for x in data {
            acc.consume(x);
        }
        let range = FloatRange::new(1.0, 7.0, 6).unwrap();
        let dist = acc.get_dist(&range);

        assert_eq!(dist.count(Bucket::new(1.0, 2.0)), 2);
        assert_eq!(dist.count(Bucket::new(2.0, 3.0)), 1);
        assert_eq!(dist.count(Bucket::new(3.0, 4.0)), 3);
        assert_eq!(dist.count(Bucket::new(4.0, 5.0)), 1);
        assert_eq!(dist.count(Bucket::new(5.0, 6.0)), 0);
        // the two 7s land in the closed top bucket
        assert_eq!(dist.count(Bucket::new(6.0, 7.0)), 5);
        // 0 and 8
        assert_eq!(dist.out_of_range(), 2);
        assert_eq!(dist.total(), data.len());
    }

    #[test]
    fn test_get_dist_total_matches_sample() {
        let mut acc = NumericSample::new();
        for i in 0..500 {
            acc.consume(f64::from((i * 37) % 101) - 20.0);
        }
        for (start, end, n) in [(0.0, 50.0, 7), (-100.0, 100.0, 3), (10.0, 10.5, 1)] {
            let range = FloatRange::new(start, end, n).unwrap();
            let dist = acc.get_dist(&range);
            assert_eq!(dist.total(), acc.len());
        }
    }

    #[test]
    fn test_get_dist_non_finite_out_of_range() {
        let mut acc = NumericSample::new();
        for x in [f64::NAN, 1.0, f64::INFINITY, 2.0, f64::NEG_INFINITY] {
            acc.consume(x);
        }
        let range = FloatRange::new(0.0, 4.0, 2).unwrap();
        let dist = acc.get_dist(&range);
        // [0,2) holds 1.0; 2.0 starts the closed top bucket [2,4]
        assert_eq!(dist.count_at(0), 1);
        assert_eq!(dist.count_at(1), 1);
        assert_eq!(dist.out_of_range(), 3);
        assert_eq!(range.bin_index(f64::NAN), None);
    }

    #[test]
    fn test_get_dist_matches_get_bin() {
        let mut acc = NumericSample::new();
        for i in 0..200 {
            acc.consume(f64::from(i) * 0.05);
        }
        let range = FloatRange::new(1.0, 8.0, 13).unwrap();
        let dist = acc.get_dist(&range);
        let mut expected = vec![0usize; range.len()];
        let mut outside = 0;
        for &x in acc.as_slice() {
            match range.bin_index(x) {
                Some(i) => expected[i] += 1,
                None => outside += 1,
            }
        }
        let got: Vec<usize> = dist.iter().map(|(_, c)| c).collect();
        assert_eq!(got, expected);
        assert_eq!(dist.out_of_range(), outside);
    }

    #[test]
    fn test_record_parse() {
        assert_eq!(
            Record::parse(Mode::Frequency, "abc".to_string()).unwrap(),
            Record::Key("abc".to_string())
        );
        assert_eq!(
            Record::parse(Mode::Histogram, "2.5".to_string()).unwrap(),
            Record::Value(2.5)
        );
        let err = Record::parse(Mode::Histogram, "abc".to_string()).unwrap_err();
        assert!(matches!(err, MonitorError::InputParse { ref record, .. } if record == "abc"));
    }

    #[test]
    fn test_accumulator_for_mode() {
        let n = NonZeroUsize::new(3);
        assert!(matches!(
            Accumulator::for_mode(Mode::Frequency, None),
            Accumulator::Unbounded(_)
        ));
        assert!(matches!(
            Accumulator::for_mode(Mode::Frequency, n),
            Accumulator::Window(_)
        ));
        assert!(matches!(
            Accumulator::for_mode(Mode::Histogram, n),
            Accumulator::Numeric(_)
        ));
    }

    #[test]
    fn test_accumulator_dispatch() {
        let mut acc = Accumulator::for_mode(Mode::Frequency, None);
        acc.consume(Record::Key("x".to_string()));
        acc.consume(Record::Key("x".to_string()));
        acc.consume(Record::Key("y".to_string()));
        let Snapshot::Frequencies(table) = acc.snapshot() else {
            panic!("expected frequencies");
        };
        assert_eq!(table.get("x"), 2);
        assert_eq!(table.get("y"), 1);
        assert_eq!(table.total(), 3);

        let mut acc = Accumulator::for_mode(Mode::Histogram, None);
        acc.consume(Record::Value(2.0));
        acc.consume(Record::Value(1.0));
        let Snapshot::Sample(sample) = acc.snapshot() else {
            panic!("expected a sample");
        };
        assert_eq!(sample.as_slice(), &[1.0, 2.0]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "unbounded accumulator got Value")]
    fn test_record_of_wrong_kind_is_a_bug() {
        let mut acc = Accumulator::for_mode(Mode::Frequency, None);
        acc.consume(Record::Value(1.0));
    }
}
