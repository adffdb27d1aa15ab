//! Equal-width numeric buckets for histograms.
//!
//! A [`FloatRange`] splits `[start, end]` into `n` contiguous buckets. Every
//! bucket is half-open (`[lower, upper)`) except the last one, which is
//! closed at `end` so the maximum observed value is always binned.

use anyhow::{Result, ensure};

/// Relative tolerance for drift between the last computed boundary and `end`.
const BOUNDARY_EPSILON: f64 = 1e-6;

/// One bucket of a [`FloatRange`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bucket {
    pub start: f64,
    pub end: f64,
}

impl Bucket {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatRange {
    start: f64,
    end: f64,
    interval: f64,
    /// `n + 1` ascending boundaries, first is `start`, last is exactly `end`.
    markers: Vec<f64>,
}

impl FloatRange {
    /// Builds `n` equal-width buckets spanning `[start, end]`.
    ///
    /// # Errors
    /// Returns an error if `n` is zero, `start > end`, either bound or the
    /// bucket width is not finite, or the boundaries drift away from `end`.
    pub fn new(start: f64, end: f64, n: usize) -> Result<Self> {
        ensure!(n >= 1, "a float range needs at least one bucket");
        ensure!(
            start.is_finite() && end.is_finite(),
            "range bounds {start}..{end} must be finite"
        );
        ensure!(start <= end, "range start {start} is past its end {end}");

        let interval = (end - start) / n as f64;
        ensure!(
            interval.is_finite(),
            "bucket width over {start}..{end} is not finite"
        );
        let mut markers: Vec<f64> = (0..=n).map(|i| start + i as f64 * interval).collect();

        let drift = (markers[n] - end).abs();
        ensure!(
            drift <= BOUNDARY_EPSILON * (end - start).abs().max(1.0),
            "boundary drift {drift} exceeds tolerance"
        );
        // Pin the top boundary so `end` is always binned into the last bucket.
        markers[n] = end;

        Ok(Self {
            start,
            end,
            interval,
            markers,
        })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.markers.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn markers(&self) -> &[f64] {
        &self.markers
    }

    pub fn bucket(&self, index: usize) -> Option<Bucket> {
        if index >= self.len() {
            return None;
        }
        Some(Bucket::new(self.markers[index], self.markers[index + 1]))
    }

    /// Buckets in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Bucket> + '_ {
        self.markers.windows(2).map(|w| Bucket::new(w[0], w[1]))
    }

    /// Index of the bucket holding `x`, or `None` when `x` is outside
    /// `[start, end]` or NaN.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        if !(self.start..=self.end).contains(&x) {
            return None;
        }
        // Number of boundaries <= x; a value on an interior boundary belongs
        // to the bucket starting there.
        let above = self.markers.partition_point(|&m| m <= x);
        Some((above - 1).min(self.len() - 1))
    }

    /// The bucket holding `x`, or `None` when `x` is outside `[start, end]`.
    pub fn get_bin(&self, x: f64) -> Option<Bucket> {
        self.bin_index(x).and_then(|i| self.bucket(i))
    }
}

/// Counts per bucket of a [`FloatRange`], plus values that fell outside it.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedDistribution {
    buckets: Vec<(Bucket, usize)>,
    out_of_range: usize,
}

impl BinnedDistribution {
    /// Pairs `counts` with the buckets of `range` in order.
    pub fn new(range: &FloatRange, counts: Vec<usize>, out_of_range: usize) -> Self {
        debug_assert_eq!(range.len(), counts.len());
        Self {
            buckets: range.iter().zip(counts).collect(),
            out_of_range,
        }
    }

    /// Count for `bucket`; buckets not in the range read as zero.
    pub fn count(&self, bucket: Bucket) -> usize {
        self.buckets
            .iter()
            .find(|(b, _)| *b == bucket)
            .map_or(0, |(_, count)| *count)
    }

    pub fn count_at(&self, index: usize) -> usize {
        self.buckets.get(index).map_or(0, |(_, count)| *count)
    }

    pub fn out_of_range(&self) -> usize {
        self.out_of_range
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, usize)> + '_ {
        self.buckets.iter().copied()
    }

    /// Largest single bucket count.
    pub fn largest(&self) -> usize {
        self.buckets.iter().map(|(_, c)| *c).max().unwrap_or(0)
    }

    /// In-range plus out-of-range count.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, c)| *c).sum::<usize>() + self.out_of_range
    }
}
