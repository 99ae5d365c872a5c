/*!
Hyperparameters for the LSTM regressor
*/
use crate::error::{LstmError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tch::nn::{self, OptimizerConfig, VarStore};

/// Hyperparameters of an `LstmRegressor`. Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmConfig {
    /// Input dimension for each time step
    pub d_feat: usize,
    /// The size of the hidden LSTM layers
    pub hidden_size: usize,
    /// The number of stacked LSTM layers, at least one
    pub num_layers: usize,
    /// Dropout applied between LSTM layers while training
    pub dropout: f64,
    /// The maximum number of epochs to train for
    pub n_epochs: usize,
    /// The learning rate
    pub lr: f64,
    /// The metric used for early stopping
    pub metric: String,
    /// The number of samples per batch
    pub batch_size: usize,
    /// The number of epochs without improvement after which training stops
    pub early_stop: usize,
    /// The loss name
    pub loss: String,
    /// The optimizer name
    pub optimizer: String,
    /// Worker threads used to assemble batches
    pub n_jobs: usize,
    /// The CUDA device ordinal, used when CUDA is available
    pub gpu: usize,
    /// The random seed, if any
    pub seed: Option<u64>,
    /// Gradients are clipped to `[-clip_value, clip_value]` before each step
    pub clip_value: f64,
    /// Where to persist the best checkpoint
    pub save_path: Option<PathBuf>,
}

impl Default for LstmConfig {
    fn default() -> LstmConfig {
        LstmConfig {
            d_feat: 6,
            hidden_size: 64,
            num_layers: 2,
            dropout: 0.0,
            n_epochs: 200,
            lr: 0.001,
            metric: String::new(),
            batch_size: 2000,
            early_stop: 20,
            loss: "mse".into(),
            optimizer: "adam".into(),
            n_jobs: 10,
            gpu: 0,
            seed: None,
            clip_value: 3.0,
            save_path: None,
        }
    }
}

impl LstmConfig {
    /// Read a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<LstmConfig> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
    /// Parse the loss name
    pub fn loss_kind(&self) -> Result<LossKind> {
        self.loss.parse()
    }
    /// Parse the metric name
    pub fn metric_kind(&self) -> Result<MetricKind> {
        self.metric.parse()
    }
    /// Parse the optimizer name
    pub fn optimizer_kind(&self) -> Result<OptimizerKind> {
        self.optimizer.parse()
    }
}

impl Display for LstmConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "LSTM parameters setting:")?;
        writeln!(f, "d_feat : {}", self.d_feat)?;
        writeln!(f, "hidden_size : {}", self.hidden_size)?;
        writeln!(f, "num_layers : {}", self.num_layers)?;
        writeln!(f, "dropout : {}", self.dropout)?;
        writeln!(f, "n_epochs : {}", self.n_epochs)?;
        writeln!(f, "lr : {}", self.lr)?;
        writeln!(f, "metric : {}", self.metric)?;
        writeln!(f, "batch_size : {}", self.batch_size)?;
        writeln!(f, "early_stop : {}", self.early_stop)?;
        writeln!(f, "optimizer : {}", self.optimizer.to_lowercase())?;
        writeln!(f, "loss_type : {}", self.loss)?;
        writeln!(f, "visible_GPU : {}", self.gpu)?;
        writeln!(f, "n_jobs : {}", self.n_jobs)?;
        writeln!(f, "clip_value : {}", self.clip_value)?;
        write!(f, "seed : {:?}", self.seed)
    }
}

/// Supported losses
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LossKind {
    /// Mean squared error over non-NaN labels
    Mse,
}

impl FromStr for LossKind {
    type Err = LstmError;
    fn from_str(s: &str) -> Result<LossKind> {
        match s {
            "mse" => Ok(LossKind::Mse),
            other => Err(LstmError::UnsupportedLoss(other.into())),
        }
    }
}

/// Supported early stopping metrics
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MetricKind {
    /// The negated loss over finite labels
    NegLoss,
}

impl FromStr for MetricKind {
    type Err = LstmError;
    fn from_str(s: &str) -> Result<MetricKind> {
        match s {
            "" | "loss" => Ok(MetricKind::NegLoss),
            other => Err(LstmError::UnsupportedMetric(other.into())),
        }
    }
}

/// Supported optimizers
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OptimizerKind {
    /// Adam with default moments
    Adam,
    /// Plain stochastic gradient descent
    Gd,
}

impl FromStr for OptimizerKind {
    type Err = LstmError;
    fn from_str(s: &str) -> Result<OptimizerKind> {
        match s.to_lowercase().as_str() {
            "adam" => Ok(OptimizerKind::Adam),
            "gd" => Ok(OptimizerKind::Gd),
            _ => Err(LstmError::UnsupportedOptimizer(s.into())),
        }
    }
}

impl OptimizerKind {
    /// Build an optimizer of this kind over a `VarStore`
    pub fn build(self, vs: &VarStore, lr: f64) -> Result<nn::Optimizer> {
        let opt = match self {
            OptimizerKind::Adam => nn::Adam::default().build(vs, lr)?,
            OptimizerKind::Gd => nn::Sgd::default().build(vs, lr)?,
        };
        Ok(opt)
    }
}
