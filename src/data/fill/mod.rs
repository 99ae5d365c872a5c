/*!
Missing value filling for sample windows
*/
use num::Float;

/// How to fill NaNs in a sample window, column by column
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FillNa {
    /// Leave NaNs in place
    None,
    /// Propagate the last valid value forwards
    Ffill,
    /// Propagate the next valid value backwards
    Bfill,
    /// Forward fill, then backward fill whatever leading NaNs remain
    FfillBfill,
}

impl Default for FillNa {
    fn default() -> FillNa {
        FillNa::None
    }
}

/// Forward fill a strided column of a row-major matrix
pub fn ffill<F: Float>(data: &mut [F], col: usize, cols: usize) {
    let mut last: Option<F> = None;
    for row in data.chunks_mut(cols) {
        let v = &mut row[col];
        if v.is_nan() {
            if let Some(last) = last {
                *v = last
            }
        } else {
            last = Some(*v)
        }
    }
}

/// Backward fill a strided column of a row-major matrix
pub fn bfill<F: Float>(data: &mut [F], col: usize, cols: usize) {
    let mut next: Option<F> = None;
    for row in data.chunks_mut(cols).rev() {
        let v = &mut row[col];
        if v.is_nan() {
            if let Some(next) = next {
                *v = next
            }
        } else {
            next = Some(*v)
        }
    }
}

/// Replace the NaNs of a strided column of a row-major matrix with a constant
pub fn fill_value<F: Float>(data: &mut [F], col: usize, cols: usize, value: F) {
    for row in data.chunks_mut(cols) {
        if row[col].is_nan() {
            row[col] = value
        }
    }
}

impl FillNa {
    /// Fill a row-major `[rows, cols]` window in place
    pub fn apply<F: Float>(self, data: &mut [F], cols: usize) {
        if cols == 0 {
            return;
        }
        debug_assert_eq!(data.len() % cols, 0, "Window is not a whole number of rows");
        for col in 0..cols {
            match self {
                FillNa::None => return,
                FillNa::Ffill => ffill(data, col, cols),
                FillNa::Bfill => bfill(data, col, cols),
                FillNa::FfillBfill => {
                    ffill(data, col, cols);
                    bfill(data, col, cols);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: f32 = f32::NAN;

    fn same(left: &[f32], right: &[f32]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|(l, r)| l == r || (l.is_nan() && r.is_nan()))
    }

    #[test]
    fn fill_policies() {
        // 4 rows, 2 columns
        let window = [N, 1.0, 2.0, N, N, N, 4.0, 3.0];
        let mut ff = window;
        FillNa::Ffill.apply(&mut ff, 2);
        assert!(same(&ff, &[N, 1.0, 2.0, 1.0, 2.0, 1.0, 4.0, 3.0]));
        let mut bf = window;
        FillNa::Bfill.apply(&mut bf, 2);
        assert!(same(&bf, &[2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 4.0, 3.0]));
        let mut fb = window;
        FillNa::FfillBfill.apply(&mut fb, 2);
        assert!(same(&fb, &[2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 4.0, 3.0]));
        let mut none = window;
        FillNa::None.apply(&mut none, 2);
        assert!(same(&none, &window));
    }

    #[test]
    fn all_nan_column_stays_nan() {
        let mut window = [N, 1.0, N, 2.0];
        FillNa::FfillBfill.apply(&mut window, 2);
        assert!(window[0].is_nan() && window[2].is_nan());
        assert_eq!(window[1], 1.0);
        assert_eq!(window[3], 2.0);
    }

    #[test]
    fn constant_fill_touches_one_column() {
        let mut window = [N, N, 1.0, N];
        fill_value(&mut window, 0, 2, 0.0);
        assert!(same(&window, &[0.0, N, 1.0, N]));
    }
}
