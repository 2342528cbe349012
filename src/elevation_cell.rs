//! Robust per-cell elevation summary.

use crate::sliding_grid::GridCell;

/// Aggregates height samples for one grid cell into a robust summary.
///
/// The source keeps the full sample history and recomputes the median on
/// insert; a streaming approximate quantile would also satisfy the
/// contract (`median` only needs to reflect a 50th-percentile estimate).
#[derive(Debug, Clone)]
pub struct ElevationCell {
    samples: Vec<f64>,
    minimum: f64,
    maximum: f64,
    median: f64,
    interpolated: bool,
}

impl ElevationCell {
    pub fn measurement_count(&self) -> usize {
        self.samples.len()
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn median(&self) -> f64 {
        self.median
    }

    pub fn interpolated(&self) -> bool {
        self.interpolated
    }

    /// True iff this cell has never received a measurement nor an
    /// interpolated value (sentinel: `count == 0 && max == -inf`).
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.maximum == f64::NEG_INFINITY
    }

    /// (count, min, max, median, interpolated)
    pub fn summary(&self) -> (usize, f64, f64, f64, bool) {
        (self.measurement_count(), self.minimum, self.maximum, self.median, self.interpolated)
    }

    /// Appends a height sample; updates min/max/median incrementally and
    /// clears the interpolated flag.
    pub fn add_measurement(&mut self, h: f64) {
        if self.samples.is_empty() {
            // a prior `set_interpolated` may have lifted min/max away from
            // the sentinel; the first real sample replaces that estimate
            // rather than being merged with it.
            self.minimum = f64::INFINITY;
            self.maximum = f64::NEG_INFINITY;
        }
        self.samples.push(h);
        self.minimum = self.minimum.min(h);
        self.maximum = self.maximum.max(h);
        self.median = median_of(&self.samples);
        self.interpolated = false;
    }

    /// Sets the median to an interpolated estimate without recording it as
    /// a real measurement. Used only by [`crate::elevation_grid::ElevationGrid::smooth_into`].
    pub fn set_interpolated(&mut self, h: f64) {
        self.median = h;
        self.interpolated = true;
        if self.maximum == f64::NEG_INFINITY {
            // keep min/max consistent with the invariant min <= median <= max
            // for a cell that has no real measurements but now has a value.
            self.minimum = h;
            self.maximum = h;
        }
    }
}

impl GridCell for ElevationCell {
    fn empty() -> Self {
        ElevationCell {
            samples: Vec::new(),
            minimum: f64::INFINITY,
            maximum: f64::NEG_INFINITY,
            median: f64::INFINITY,
            interpolated: false,
        }
    }
}

fn median_of(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("height sample is not NaN"));
    let n = sorted.len();
    if n == 0 {
        return f64::INFINITY;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_is_the_no_data_sentinel() {
        let c = ElevationCell::empty();
        assert_eq!(c.measurement_count(), 0);
        assert!(c.is_empty());
        assert_eq!(c.maximum(), f64::NEG_INFINITY);
    }

    #[test]
    fn add_measurement_updates_min_max_median_and_clears_interpolated() {
        let mut c = ElevationCell::empty();
        c.set_interpolated(5.0);
        assert!(c.interpolated());

        c.add_measurement(1.0);
        c.add_measurement(3.0);
        c.add_measurement(2.0);
        assert_eq!(c.measurement_count(), 3);
        assert_eq!(c.minimum(), 1.0);
        assert_eq!(c.maximum(), 3.0);
        assert_eq!(c.median(), 2.0);
        assert!(!c.interpolated());
    }

    #[test]
    fn median_even_count_averages_middle_pair() {
        let mut c = ElevationCell::empty();
        c.add_measurement(1.0);
        c.add_measurement(2.0);
        assert_eq!(c.median(), 1.5);
    }

    #[test]
    fn invariant_min_le_median_le_max() {
        let mut c = ElevationCell::empty();
        for h in [4.0, 1.0, 9.0, 2.0, 7.0] {
            c.add_measurement(h);
            assert!(c.minimum() <= c.median());
            assert!(c.median() <= c.maximum());
        }
    }
}
