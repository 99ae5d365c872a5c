/*!
Errors produced while configuring, training and applying the regressor
*/
use thiserror::Error;

/// A result with an `LstmError`
pub type Result<T, E = LstmError> = std::result::Result<T, E>;

/// Everything that can go wrong in `lstm-ts`
#[derive(Debug, Error)]
pub enum LstmError {
    /// Prediction was requested before the model was fitted or loaded
    #[error("model is not fitted yet!")]
    NotFitted,
    /// An unknown loss name
    #[error("unknown loss `{0}`")]
    UnsupportedLoss(String),
    /// An unknown early stopping metric name
    #[error("unknown metric `{0}`")]
    UnsupportedMetric(String),
    /// An unknown optimizer name
    #[error("optimizer {0} is not supported!")]
    UnsupportedOptimizer(String),
    /// A hyperparameter outside of its valid range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The data does not carry the number of features the model expects
    #[error("expected {expected} features per time step, got {got}")]
    FeatureMismatch {
        /// Features the model was built for
        expected: usize,
        /// Features found in the data
        got: usize,
    },
    /// A dataset or segment contained no usable rows
    #[error("empty dataset: {0}")]
    EmptyDataset(String),
    /// A malformed panel record
    #[error("bad record at line {line}: {msg}")]
    BadRecord {
        /// The (1-based) line of the record
        line: u64,
        /// What was wrong with it
        msg: String,
    },
    /// A checkpoint does not match the parameters of the model it is restored into
    #[error("checkpoint mismatch: {0}")]
    CheckpointMismatch(String),
    /// An error from libtorch
    #[error(transparent)]
    Tch(#[from] tch::TchError),
    /// An IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A CSV error
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A JSON error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The loader's worker pool could not be started
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
