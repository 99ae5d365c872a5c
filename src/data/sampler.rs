/*!
Windowed time-series sampling over a panel of instruments
*/
use super::fill::fill_value;
use super::{FillNa, SampleIndex};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::sync::Arc;
use tch::Tensor;

/// The rows of one instrument, sorted by time
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentBlock {
    /// The instrument's name
    pub instrument: String,
    /// The timestamp of each row
    pub datetimes: Vec<NaiveDateTime>,
    /// Row-major `[rows, d_feat + 1]` data, with the label in the last column
    pub data: Vec<f32>,
}

impl InstrumentBlock {
    /// The number of rows in this block
    #[inline]
    pub fn rows(&self) -> usize {
        self.datetimes.len()
    }
}

/// Samples windows of the `step_len` most recent rows of an instrument.
///
/// Each window is a `[step_len, d_feat + 1]` matrix whose last column is the label. Rows before an
/// instrument's first observation are NaN, and are filled along with any other missing values
/// according to the sampler's `FillNa` policy. Feature values still missing after that may then be
/// replaced by a constant; labels never are.
#[derive(Debug, Clone)]
pub struct TsSampler {
    blocks: Arc<Vec<InstrumentBlock>>,
    samples: Vec<(usize, usize)>,
    step_len: usize,
    d_feat: usize,
    fillna: FillNa,
    feature_fill: Option<f32>,
}

impl TsSampler {
    /// Create a sampler over `(block, row)` sample positions
    pub fn new(
        blocks: Arc<Vec<InstrumentBlock>>,
        samples: Vec<(usize, usize)>,
        step_len: usize,
        d_feat: usize,
    ) -> TsSampler {
        debug_assert!(samples
            .iter()
            .all(|&(block, row)| block < blocks.len() && row < blocks[block].rows()));
        TsSampler {
            blocks,
            samples,
            step_len,
            d_feat,
            fillna: FillNa::None,
            feature_fill: None,
        }
    }
    /// Set the missing value policy
    pub fn config(&mut self, fillna: FillNa) {
        self.fillna = fillna
    }
    /// The current missing value policy
    pub fn fillna(&self) -> FillNa {
        self.fillna
    }
    /// Set the value replacing feature NaNs left over by the `FillNa` policy, or `None` to keep them
    pub fn fill_features(&mut self, value: Option<f32>) {
        self.feature_fill = value
    }
    /// The value replacing leftover feature NaNs, if any
    pub fn feature_fill(&self) -> Option<f32> {
        self.feature_fill
    }
    /// The number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    /// Whether there are no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// The number of features per time step
    #[inline]
    pub fn d_feat(&self) -> usize {
        self.d_feat
    }
    /// The number of time steps per window
    #[inline]
    pub fn step_len(&self) -> usize {
        self.step_len
    }
    /// The number of values in one row of a window, label included
    #[inline]
    pub fn cols(&self) -> usize {
        self.d_feat + 1
    }
    /// The label index of every sample, in sample order
    pub fn index(&self) -> Vec<SampleIndex> {
        self.samples
            .iter()
            .map(|&(block, row)| {
                let block = &self.blocks[block];
                SampleIndex {
                    instrument: block.instrument.clone(),
                    datetime: block.datetimes[row],
                }
            })
            .collect()
    }
    /// Write the window of sample `i` into `out`. Guaranteed to write `step_len * cols` values.
    pub fn push_window(&self, i: usize, out: &mut Vec<f32>) {
        let (block, row) = self.samples[i];
        let block = &self.blocks[block];
        let cols = self.cols();
        let start = out.len();
        let first = (row + 1).saturating_sub(self.step_len);
        let padding = self.step_len - (row + 1 - first);
        out.extend(std::iter::repeat(f32::NAN).take(padding * cols));
        out.extend_from_slice(&block.data[first * cols..(row + 1) * cols]);
        self.fillna.apply(&mut out[start..], cols);
        if let Some(value) = self.feature_fill {
            for col in 0..self.d_feat {
                fill_value(&mut out[start..], col, cols, value);
            }
        }
    }
    /// Get the window of sample `i`
    pub fn window(&self, i: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.step_len * self.cols());
        self.push_window(i, &mut out);
        out
    }
    /// Package the windows of a set of samples as a `[batch, step_len, d_feat + 1]` tensor.
    ///
    /// Windows are assembled in parallel on the current `rayon` pool.
    pub fn batch(&self, indices: &[usize]) -> Tensor {
        let windows: Vec<Vec<f32>> = indices.par_iter().map(|&i| self.window(i)).collect();
        let data: Vec<f32> = windows.concat();
        Tensor::from(&data[..]).view([
            indices.len() as i64,
            self.step_len as i64,
            self.cols() as i64,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn block(instrument: &str, rows: usize) -> InstrumentBlock {
        let t = NaiveDate::from_ymd(2020, 6, 22).and_hms(0, 0, 0);
        InstrumentBlock {
            instrument: instrument.into(),
            datetimes: (0..rows).map(|r| t + Duration::days(r as i64)).collect(),
            // One feature equal to the row number, label equal to ten times the row number
            data: (0..rows)
                .flat_map(|r| vec![r as f32, 10.0 * r as f32])
                .collect(),
        }
    }

    #[test]
    fn windows_are_padded_and_filled() {
        let blocks = Arc::new(vec![block("A", 4), block("B", 2)]);
        let mut sampler = TsSampler::new(blocks, vec![(0, 0), (0, 3), (1, 1)], 3, 1);
        assert_eq!(sampler.len(), 3);
        assert_eq!(sampler.cols(), 2);

        let first = sampler.window(0);
        assert_eq!(first.len(), 6);
        assert!(first[..4].iter().all(|v| v.is_nan()));
        assert_eq!(&first[4..], &[0.0, 0.0]);
        assert_eq!(sampler.window(1), vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);

        sampler.config(FillNa::FfillBfill);
        assert_eq!(sampler.window(0), vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(sampler.window(2), vec![0.0, 0.0, 0.0, 0.0, 1.0, 10.0]);
    }

    #[test]
    fn leftover_feature_nans_are_filled() {
        let mut a = block("A", 3);
        // Feature missing on every row the first window sees, and one label missing
        a.data[0] = f32::NAN;
        a.data[3] = f32::NAN;
        let blocks = Arc::new(vec![a]);
        let mut sampler = TsSampler::new(blocks, vec![(0, 0), (0, 2)], 2, 1);
        sampler.config(FillNa::FfillBfill);
        assert!(sampler.window(0)[0].is_nan());

        sampler.fill_features(Some(0.0));
        assert_eq!(sampler.feature_fill(), Some(0.0));
        assert_eq!(sampler.window(0), vec![0.0, 0.0, 0.0, 0.0]);
        let last = sampler.window(1);
        assert_eq!(&last[..], &[1.0, 20.0, 2.0, 20.0]);

        sampler.config(FillNa::None);
        let raw = sampler.window(1);
        assert_eq!(raw[0], 1.0);
        assert!(raw[1].is_nan());
    }

    #[test]
    fn index_follows_samples() {
        let blocks = Arc::new(vec![block("A", 4), block("B", 2)]);
        let sampler = TsSampler::new(blocks.clone(), vec![(1, 1), (0, 2)], 2, 1);
        let index = sampler.index();
        assert_eq!(index[0].instrument, "B");
        assert_eq!(index[0].datetime, blocks[1].datetimes[1]);
        assert_eq!(index[1].instrument, "A");
        assert_eq!(index[1].datetime, blocks[0].datetimes[2]);
    }

    #[test]
    fn batches_have_window_shape() {
        let blocks = Arc::new(vec![block("A", 5)]);
        let sampler = TsSampler::new(blocks, (0..5).map(|r| (0, r)).collect(), 3, 1);
        let batch = sampler.batch(&[4, 2]);
        assert_eq!(batch.size3().unwrap(), (2, 3, 2));
        assert_eq!(batch.double_value(&[0, 2, 0]), 4.0);
        assert_eq!(batch.double_value(&[1, 2, 1]), 20.0);
    }
}
