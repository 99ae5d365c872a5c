/*!
Data processing and IO functions
*/
use crate::error::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub mod fake;
pub mod fill;
pub mod loader;
pub mod panel;
pub mod sampler;

pub use fill::FillNa;
pub use loader::DataLoader;
pub use panel::{PanelDataset, SegmentRange, Segments};
pub use sampler::TsSampler;

/// A single observation of an instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRow {
    /// This observation's timestamp
    pub datetime: NaiveDateTime,
    /// The instrument observed
    pub instrument: String,
    /// The feature values, NaN where missing
    pub features: Vec<f64>,
    /// The regression target, NaN where unknown
    pub label: f64,
}

/// The label index of a sample
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SampleIndex {
    /// The instrument the sample belongs to
    pub instrument: String,
    /// The timestamp of the sample's last time step
    pub datetime: NaiveDateTime,
}

/// A segment of a dataset
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Segment {
    /// Data used to fit parameters
    Train,
    /// Data used for early stopping
    Valid,
    /// Held-out data to predict
    Test,
}

/// Which processed view of the data to prepare
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DataKey {
    /// Data processed for learning: samples may be dropped
    Learn,
    /// Data processed for inference: every sample is kept
    Infer,
}

/// A dataset which can prepare windowed samples of its segments
pub trait TsDataset {
    /// Prepare a sampler over a segment of this dataset
    fn prepare(&self, segment: Segment, key: DataKey) -> Result<TsSampler>;
}
