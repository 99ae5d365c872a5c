/*!
Training, early stopping and inference for the LSTM regressor
*/
use crate::config::LstmConfig;
use crate::data::panel::PANEL_DATETIME;
use crate::data::{DataKey, DataLoader, FillNa, SampleIndex, Segment, TsDataset, TsSampler};
use crate::error::{LstmError, Result};
use crate::lstm::{LstmNet, LstmNetDesc};
use crate::util::{create_save_path, mean, pick_device};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::io::Write;
use std::path::{Path, PathBuf};
use tch::nn::{self, ModuleT, VarStore};
use tch::{Device, Kind, Tensor};

pub mod checkpoint;
pub mod loss;

pub use checkpoint::Checkpoint;
pub use loss::Evaluator;

/// Per-epoch scores recorded during training
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalsResult {
    /// The metric over the training segment after each epoch
    pub train: Vec<f64>,
    /// The metric over the validation segment after each epoch
    pub valid: Vec<f64>,
}

/// The outcome of a call to `LstmRegressor::fit`
#[derive(Debug, Clone, PartialEq)]
pub struct FitSummary {
    /// The best validation score
    pub best_score: f64,
    /// The epoch which achieved the best validation score
    pub best_epoch: usize,
    /// The number of epochs trained before stopping
    pub epochs_run: usize,
    /// Where the best checkpoint was saved
    pub save_path: PathBuf,
}

/// Predictions indexed by sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredSeries {
    /// The index of each prediction
    pub index: Vec<SampleIndex>,
    /// The predictions
    pub values: Vec<f64>,
}

impl PredSeries {
    /// The number of predictions
    pub fn len(&self) -> usize {
        self.values.len()
    }
    /// Whether there are no predictions
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// Iterate over `(index, prediction)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&SampleIndex, f64)> {
        self.index.iter().zip(self.values.iter().copied())
    }
    /// Get the prediction for a sample
    pub fn get(&self, index: &SampleIndex) -> Option<f64> {
        self.index
            .iter()
            .position(|i| i == index)
            .map(|pos| self.values[pos])
    }
    /// Write this series as CSV with columns `datetime,instrument,score`.
    /// On success, return how many predictions were written
    pub fn write_csv<W: Write>(&self, wtr: W) -> Result<usize> {
        let mut wtr = csv::Writer::from_writer(wtr);
        wtr.write_record(&["datetime", "instrument", "score"])?;
        for (index, value) in self.iter() {
            wtr.write_record(&[
                index.datetime.format(PANEL_DATETIME).to_string(),
                index.instrument.clone(),
                value.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(self.len())
    }
}

/// Split a `[batch, step_len, d_feat + 1]` batch into `[batch, step_len, d_feat]` features and the
/// `[batch]` labels of the last time step
pub fn split_batch(data: &Tensor, d_feat: usize) -> (Tensor, Tensor) {
    let feature = data.narrow(2, 0, d_feat as i64);
    let label = data.select(1, -1).select(1, -1);
    (feature, label)
}

/// An LSTM regressor over windowed time-series samples
pub struct LstmRegressor {
    config: LstmConfig,
    evaluator: Evaluator,
    device: Device,
    vs: VarStore,
    net: LstmNet,
    opt: nn::Optimizer,
    fitted: bool,
}

impl LstmRegressor {
    /// Create a new, unfitted regressor, validating the configured loss, metric and optimizer names
    /// and the number of layers
    pub fn new(config: LstmConfig) -> Result<LstmRegressor> {
        info!("LSTM pytorch version...");
        let evaluator = Evaluator {
            loss: config.loss_kind()?,
            metric: config.metric_kind()?,
        };
        let optimizer = config.optimizer_kind()?;
        if config.num_layers == 0 {
            return Err(LstmError::InvalidConfig("num_layers must be at least 1".into()));
        }
        let device = pick_device(config.gpu);
        info!("{}\nuse_GPU : {}", config, device.is_cuda());

        if let Some(seed) = config.seed {
            tch::manual_seed(seed as i64);
        }

        let vs = VarStore::new(device);
        let net = LstmNetDesc::from(&config).build(&vs);
        let opt = optimizer.build(&vs, config.lr)?;
        Ok(LstmRegressor {
            config,
            evaluator,
            device,
            vs,
            net,
            opt,
            fitted: false,
        })
    }
    /// This regressor's configuration
    pub fn config(&self) -> &LstmConfig {
        &self.config
    }
    /// The device this regressor computes on
    pub fn device(&self) -> Device {
        self.device
    }
    /// The underlying network
    pub fn net(&self) -> &LstmNet {
        &self.net
    }
    /// Whether this regressor has been fitted or loaded
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }
    /// A deep copy of the current parameters
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::capture(&self.vs)
    }
    /// Load persisted parameters, marking this regressor as fitted
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        Checkpoint::load(path.as_ref())?.restore(&self.vs)?;
        info!("Loaded checkpoint from {}", path.as_ref().display());
        self.fitted = true;
        Ok(())
    }

    fn check_features(&self, sampler: &TsSampler) -> Result<()> {
        if sampler.d_feat() != self.config.d_feat {
            return Err(LstmError::FeatureMismatch {
                expected: self.config.d_feat,
                got: sampler.d_feat(),
            });
        }
        Ok(())
    }

    fn prepare<D>(&self, dataset: &D, segment: Segment, key: DataKey) -> Result<TsSampler>
    where
        D: TsDataset + ?Sized,
    {
        let mut sampler = dataset.prepare(segment, key)?;
        sampler.config(FillNa::FfillBfill);
        self.check_features(&sampler)?;
        Ok(sampler)
    }

    /// Run one training pass over a loader
    pub fn train_epoch(&mut self, loader: &mut DataLoader) -> Result<()> {
        let d_feat = self.config.d_feat;
        for data in loader.iter() {
            let data = data.to_device(self.device);
            let (feature, label) = split_batch(&data, d_feat);

            let pred = self.net.forward_t(&feature, true);
            let loss = self.evaluator.loss(&pred, &label);

            // Only a batch without any label gives a non-finite loss
            if !f64::try_from(&loss)?.is_finite() {
                debug!("Skipping batch with non-finite loss");
                continue;
            }
            self.opt.backward_step_clip(&loss, self.config.clip_value);
        }
        Ok(())
    }

    /// Evaluate the model over a loader, returning the mean loss and mean score over batches
    pub fn test_epoch(&self, loader: &mut DataLoader) -> Result<(f64, f64)> {
        let d_feat = self.config.d_feat;
        let mut losses = Vec::with_capacity(loader.len());
        let mut scores = Vec::with_capacity(loader.len());
        for data in loader.iter() {
            let data = data.to_device(self.device);
            let (feature, label) = split_batch(&data, d_feat);
            let (loss, score) = tch::no_grad(|| {
                let pred = self.net.forward_t(&feature, false);
                (
                    self.evaluator.loss(&pred, &label),
                    self.evaluator.metric(&pred, &label),
                )
            });
            losses.push(f64::try_from(&loss)?);
            scores.push(f64::try_from(&score)?);
        }
        Ok((mean(&losses), mean(&scores)))
    }

    /// Fit the model on the training segment of a dataset, early stopping on the validation segment.
    ///
    /// The best parameters are restored into the model and saved to `save_path`, falling back to
    /// the configured save path and then to a fresh temporary path. Per-epoch scores are recorded
    /// in `evals_result`, which is cleared first.
    pub fn fit<D>(
        &mut self,
        dataset: &D,
        evals_result: &mut EvalsResult,
        save_path: Option<&Path>,
    ) -> Result<FitSummary>
    where
        D: TsDataset + ?Sized,
    {
        let train = self.prepare(dataset, Segment::Train, DataKey::Learn)?;
        let valid = self.prepare(dataset, Segment::Valid, DataKey::Learn)?;
        if train.is_empty() {
            return Err(LstmError::EmptyDataset("train segment has no samples".into()));
        }
        if valid.is_empty() {
            return Err(LstmError::EmptyDataset("valid segment has no samples".into()));
        }

        let mut train_loader = DataLoader::new(&train, self.config.batch_size, self.config.n_jobs)?
            .shuffled(self.config.seed);
        let mut valid_loader = DataLoader::new(&valid, self.config.batch_size, self.config.n_jobs)?;

        let save_path = match save_path {
            Some(path) => path.to_path_buf(),
            None => match &self.config.save_path {
                Some(path) => path.clone(),
                None => create_save_path()?,
            },
        };

        let mut stop_steps = 0;
        let mut best_score = -f64::INFINITY;
        let mut best_epoch = 0;
        let mut best_param: Option<Checkpoint> = None;
        let mut epochs_run = 0;
        evals_result.train.clear();
        evals_result.valid.clear();

        info!("training...");
        self.fitted = true;

        for step in 0..self.config.n_epochs {
            info!("Epoch{}:", step);
            info!("training...");
            self.train_epoch(&mut train_loader)?;
            info!("evaluating...");
            let (train_loss, train_score) = self.test_epoch(&mut train_loader)?;
            let (val_loss, val_score) = self.test_epoch(&mut valid_loader)?;
            debug!("train loss {:.6}, valid loss {:.6}", train_loss, val_loss);
            info!("train {:.6}, valid {:.6}", train_score, val_score);
            evals_result.train.push(train_score);
            evals_result.valid.push(val_score);
            epochs_run += 1;

            if val_score > best_score {
                best_score = val_score;
                stop_steps = 0;
                best_epoch = step;
                best_param = Some(Checkpoint::capture(&self.vs));
            } else {
                stop_steps += 1;
                if stop_steps >= self.config.early_stop {
                    info!("early stop");
                    break;
                }
            }
        }

        info!("best score: {:.6} @ {}", best_score, best_epoch);
        let best_param = match best_param {
            Some(best_param) => {
                best_param.restore(&self.vs)?;
                best_param
            }
            None => {
                warn!("No epoch improved the validation score, keeping the current parameters");
                Checkpoint::capture(&self.vs)
            }
        };
        best_param.save(&save_path)?;
        info!("Saved best parameters to {}", save_path.display());

        Ok(FitSummary {
            best_score,
            best_epoch,
            epochs_run,
            save_path,
        })
    }

    /// Predict the test segment of a dataset
    pub fn predict<D>(&self, dataset: &D) -> Result<PredSeries>
    where
        D: TsDataset + ?Sized,
    {
        if !self.fitted {
            return Err(LstmError::NotFitted);
        }
        let test = self.prepare(dataset, Segment::Test, DataKey::Infer)?;
        let mut test_loader = DataLoader::new(&test, self.config.batch_size, self.config.n_jobs)?;
        let mut values = Vec::with_capacity(test.len());
        for data in test_loader.iter() {
            let data = data.to_device(self.device);
            let (feature, _label) = split_batch(&data, self.config.d_feat);
            let pred = tch::no_grad(|| self.net.forward_t(&feature, false))
                .to_device(Device::Cpu)
                .to_kind(Kind::Double);
            values.extend(Vec::<f64>::try_from(&pred)?);
        }
        Ok(PredSeries {
            index: test.index(),
            values,
        })
    }
}
