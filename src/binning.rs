//! # Generic Binning
//!
//! Half-open interval bins over an ordered type, plus the fixed 300-bin
//! value distribution used by chart rendering and reduction-result
//! compaction.
//!
//! [`BinBounds`] is a plain `[lower, upper)` interval, [`Bin`] associates a
//! value with one, and [`BinList`] holds an ordered run of bins with a
//! compaction step that merges adjacent bins carrying equal values.
//!
//! [`BinValueDistribution`] discretizes a collection into
//! [`BIN_COUNT`] equal-width bins; items without a value (the extractor
//! returns `None`) are excluded from the min/max span and from binning.

use log::debug;

/// Number of equal-width bins computed by [`BinValueDistribution`].
pub const BIN_COUNT: usize = 300;

/// A half-open interval `[lower, upper)` over an ordered type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinBounds<T> {
    pub lower: T,
    pub upper: T,
}

impl<T: PartialOrd> BinBounds<T> {
    pub fn new(lower: T, upper: T) -> Self {
        Self { lower, upper }
    }

    /// Lower bound is inclusive, upper is not.
    pub fn contains(&self, value: &T) -> bool {
        self.lower <= *value && *value < self.upper
    }
}

/// A bin: bounds plus the value classified into them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bin<T, V> {
    pub bounds: BinBounds<T>,
    pub value: V,
}

impl<T, V> Bin<T, V> {
    pub fn new(bounds: BinBounds<T>, value: V) -> Self {
        Self { bounds, value }
    }
}

/// An ordered run of bins.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinList<T, V> {
    bins: Vec<Bin<T, V>>,
}

impl<T, V> BinList<T, V> {
    pub fn new() -> Self {
        Self { bins: Vec::new() }
    }

    pub fn push(&mut self, bin: Bin<T, V>) {
        self.bins.push(bin);
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bin<T, V>> {
        self.bins.iter()
    }

    pub fn as_slice(&self) -> &[Bin<T, V>] {
        &self.bins
    }
}

impl<T, V: PartialEq> BinList<T, V> {
    /// Coalesce consecutive bins whose value is equal, extending the
    /// surviving bin's upper bound over the merged run.
    ///
    /// Runs of identical classification are common after reduction (long
    /// stretches of kept or dropped points), so this often shrinks the
    /// list substantially without losing information.
    pub fn merge_equal_adjacent_bins(&mut self) {
        if self.bins.is_empty() {
            return;
        }

        let before = self.bins.len();
        let mut merged: Vec<Bin<T, V>> = Vec::with_capacity(before);
        for bin in self.bins.drain(..) {
            match merged.last_mut() {
                Some(last) if last.value == bin.value => {
                    last.bounds.upper = bin.bounds.upper;
                }
                _ => merged.push(bin),
            }
        }
        debug!("merged {} bins into {}", before, merged.len());
        self.bins = merged;
    }
}

impl<T, V> IntoIterator for BinList<T, V> {
    type Item = Bin<T, V>;
    type IntoIter = std::vec::IntoIter<Bin<T, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.bins.into_iter()
    }
}

impl<T, V> FromIterator<Bin<T, V>> for BinList<T, V> {
    fn from_iter<I: IntoIterator<Item = Bin<T, V>>>(iter: I) -> Self {
        Self {
            bins: iter.into_iter().collect(),
        }
    }
}

/// One bin of a [`BinValueDistribution`].
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionBin {
    /// Lower edge of the bin on the value axis.
    pub lower: f64,
    /// Fraction of valid values that fell into this bin, in `[0, 1]`.
    pub fraction: f64,
    /// Indices (into the source collection) of the items in this bin.
    pub items: Vec<usize>,
}

/// Distribution of a per-item value over [`BIN_COUNT`] equal-width bins.
///
/// The value is pulled out of each item by an extractor closure; items for
/// which it returns `None` count as "no value" and are ignored both for
/// the min/max span and for binning.
#[derive(Debug, Clone)]
pub struct BinValueDistribution {
    bins: Vec<DistributionBin>,
    min_value: f64,
    max_value: f64,
    bin_size: f64,
    min_fraction: f64,
    max_fraction: f64,
}

impl BinValueDistribution {
    /// Bin the values extracted from `items`.
    ///
    /// Degenerate inputs (no valid values, or all values equal) fall back
    /// to a span of width 0.1 so the bin size never collapses to zero.
    pub fn from_values<T, F>(items: &[T], extract: F) -> Self
    where
        F: Fn(&T) -> Option<f64>,
    {
        let valid: Vec<(usize, f64)> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| extract(item).map(|v| (i, v)))
            .collect();

        let (min_value, max_value) = match valid
            .iter()
            .fold(None::<(f64, f64)>, |acc, &(_, v)| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            }) {
            Some((lo, hi)) if hi > lo => (lo, hi),
            // all equal, or nothing valid: fall back to a width-0.1 span
            Some((lo, _)) => (lo, lo + 0.1),
            None => (0.0, 0.1),
        };

        let bin_size = ((max_value - min_value) / (BIN_COUNT as f64 - 1.0)).max(0.1);

        let mut bins: Vec<DistributionBin> = (0..BIN_COUNT)
            .map(|i| DistributionBin {
                lower: min_value + bin_size * i as f64,
                fraction: 0.0,
                items: Vec::new(),
            })
            .collect();

        for &(index, value) in &valid {
            let bin = (((value - min_value) / bin_size).round() as usize).min(BIN_COUNT - 1);
            bins[bin].fraction += 1.0;
            bins[bin].items.push(index);
        }

        // normalize counts to fractions of the valid-value count
        let valid_count = valid.len().max(1) as f64;
        let mut min_fraction = 1.0;
        let mut max_fraction = 0.0;
        for bin in &mut bins {
            bin.fraction /= valid_count;
            min_fraction = f64::min(min_fraction, bin.fraction);
            max_fraction = f64::max(max_fraction, bin.fraction);
        }

        Self {
            bins,
            min_value,
            max_value,
            bin_size,
            min_fraction,
            max_fraction,
        }
    }

    pub fn bins(&self) -> &[DistributionBin] {
        &self.bins
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn bin_size(&self) -> f64 {
        self.bin_size
    }

    pub fn min_fraction(&self) -> f64 {
        self.min_fraction
    }

    pub fn max_fraction(&self) -> f64 {
        self.max_fraction
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
