/*!
Snapshots of model parameters
*/
use crate::error::{LstmError, Result};
use std::path::Path;
use tch::nn::VarStore;
use tch::Tensor;

/// A deep copy of every named parameter of a model
#[derive(Debug)]
pub struct Checkpoint {
    vars: Vec<(String, Tensor)>,
}

impl Checkpoint {
    /// Copy the current parameters out of a `VarStore`
    pub fn capture(vs: &VarStore) -> Checkpoint {
        let mut vars: Vec<(String, Tensor)> = tch::no_grad(|| {
            vs.variables()
                .into_iter()
                .map(|(name, var)| (name, var.detach().copy()))
                .collect()
        });
        vars.sort_by(|(l, _), (r, _)| l.cmp(r));
        Checkpoint { vars }
    }
    /// Overwrite the parameters of a `VarStore` with this checkpoint's.
    ///
    /// Every parameter of the store must be present in the checkpoint, with the same shape.
    pub fn restore(&self, vs: &VarStore) -> Result<()> {
        let mut live = vs.variables();
        if live.len() != self.vars.len() {
            return Err(LstmError::CheckpointMismatch(format!(
                "model has {} parameters, checkpoint has {}",
                live.len(),
                self.vars.len()
            )));
        }
        tch::no_grad(|| {
            for (name, value) in &self.vars {
                let var = live.get_mut(name).ok_or_else(|| {
                    LstmError::CheckpointMismatch(format!("unknown parameter {}", name))
                })?;
                if var.size() != value.size() {
                    return Err(LstmError::CheckpointMismatch(format!(
                        "parameter {} has shape {:?}, checkpoint has {:?}",
                        name,
                        var.size(),
                        value.size()
                    )));
                }
                var.f_copy_(value)?;
            }
            Ok(())
        })
    }
    /// The number of parameters in this checkpoint
    pub fn len(&self) -> usize {
        self.vars.len()
    }
    /// Whether this checkpoint holds no parameters
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
    /// The value of a named parameter
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }
    /// Persist this checkpoint
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Ok(Tensor::save_multi(&self.vars, path)?)
    }
    /// Load a persisted checkpoint
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Checkpoint> {
        let mut vars = Tensor::load_multi(path)?;
        vars.sort_by(|(l, _), (r, _)| l.cmp(r));
        Ok(Checkpoint { vars })
    }
}
