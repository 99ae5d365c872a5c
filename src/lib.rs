/*!
An LSTM regressor for multivariate financial time series, written in Rust using PyTorch bindings.

Samples are windows of per-instrument feature history indexed by `(datetime, instrument)`, and the
model predicts one scalar (typically a forward return) per window. Training runs an epoch loop with
early stopping on a validation metric, keeps the best parameters seen, and persists them as a checkpoint.
*/
#![forbid(missing_docs)]

pub mod config;
pub mod data;
pub mod error;
pub mod lstm;
pub mod train;
pub mod util;

pub use config::LstmConfig;
pub use error::{LstmError, Result};
pub use train::{EvalsResult, FitSummary, LstmRegressor, PredSeries};
