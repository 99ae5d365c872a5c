/*!
Miscellaneous utilities for `lstm-ts`
*/

use num::{Float, NumCast};
use std::path::PathBuf;
use tch::{Cuda, Device};

/// Pick the CUDA device with the given ordinal if CUDA is available, and the CPU otherwise
pub fn pick_device(gpu: usize) -> Device {
    if Cuda::is_available() {
        Device::Cuda(gpu)
    } else {
        Device::Cpu
    }
}

/// A fresh checkpoint path in the system temporary directory.
///
/// The file is created empty so that concurrent callers never receive the same path; it is not
/// removed when the path is dropped.
pub fn create_save_path() -> std::io::Result<PathBuf> {
    let dir = std::env::temp_dir().join("lstm-ts");
    std::fs::create_dir_all(&dir)?;
    let path = tempfile::Builder::new()
        .prefix("model_")
        .suffix(".ot")
        .tempfile_in(&dir)?
        .into_temp_path()
        .keep()?;
    Ok(path)
}

/// The arithmetic mean of a slice of values. NaN if the slice is empty; NaNs propagate.
pub fn mean<F: Float>(values: &[F]) -> F {
    if values.is_empty() {
        return F::nan();
    }
    let n: F = NumCast::from(values.len()).unwrap_or_else(F::nan);
    values.iter().fold(F::zero(), |acc, v| acc + *v) / n
}

/// Serializes tests which seed or draw from libtorch's global generator
#[cfg(test)]
pub(crate) fn torch_rng_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
