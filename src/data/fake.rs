/*!
Generate fake panel data, for testing purposes
*/
use super::PanelRow;
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError};

/// Generate panel rows whose label is a noisy linear function of the current features.
///
/// Every feature of every instrument follows its own random walk from zero, stepping by a draw from
/// `features` each period.
///
/// Rows are produced time-major: every instrument at one timestamp, then the next timestamp.
#[derive(Debug, Clone)]
pub struct PanelGen<R> {
    /// The RNG used by this generator
    pub rng: R,
    /// The instruments to generate
    pub instruments: Vec<String>,
    /// The weight of each feature in the label
    pub weights: Vec<f64>,
    /// The distribution of feature steps
    pub features: Normal<f64>,
    /// The distribution of label noise
    pub noise: Normal<f64>,
    /// The probability of any single feature being missing
    pub missing_feature: f64,
    /// The probability of a label being missing
    pub missing_label: f64,
    /// The current time
    pub t: NaiveDateTime,
    /// The time between consecutive observations
    pub period: Duration,
    instrument: usize,
    levels: Vec<Vec<f64>>,
}

impl<R: Rng> PanelGen<R> {
    /// Create a generator of `instruments` instruments with `d_feat` features, starting at `t`.
    /// Feature weights are drawn uniformly from `[-1, 1)`.
    pub fn new(
        mut rng: R,
        instruments: usize,
        d_feat: usize,
        t: NaiveDateTime,
        noise: f64,
    ) -> Result<PanelGen<R>, NormalError> {
        let weights = (0..d_feat).map(|_| rng.gen_range(-1.0, 1.0)).collect();
        Ok(PanelGen {
            rng,
            instruments: (0..instruments).map(|i| format!("INST{:04}", i)).collect(),
            weights,
            features: Normal::new(0.0, 1.0)?,
            noise: Normal::new(0.0, noise)?,
            missing_feature: 0.0,
            missing_label: 0.0,
            t,
            period: Duration::days(1),
            instrument: 0,
            levels: vec![vec![0.0; d_feat]; instruments],
        })
    }
    /// Generate complete periods: `periods` rows for every instrument
    pub fn periods(&mut self, periods: usize) -> Vec<PanelRow> {
        let n = periods * self.instruments.len();
        self.take(n).collect()
    }
}

impl<R: Rng> Iterator for PanelGen<R> {
    type Item = PanelRow;
    fn next(&mut self) -> Option<PanelRow> {
        if self.instruments.is_empty() {
            return None;
        }
        let mut features = Vec::with_capacity(self.weights.len());
        let mut label = self.noise.sample(&mut self.rng);
        for (&w, level) in self.weights.iter().zip(&mut self.levels[self.instrument]) {
            *level += self.features.sample(&mut self.rng);
            let x = *level;
            label += w * x;
            if self.rng.gen_bool(self.missing_feature) {
                features.push(f64::NAN)
            } else {
                features.push(x)
            }
        }
        if self.rng.gen_bool(self.missing_label) {
            label = f64::NAN
        }
        let row = PanelRow {
            datetime: self.t,
            instrument: self.instruments[self.instrument].clone(),
            features,
            label,
        };
        self.instrument += 1;
        if self.instrument == self.instruments.len() {
            self.instrument = 0;
            self.t += self.period;
        }
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rows_are_time_major() {
        let t = NaiveDate::from_ymd(2020, 1, 1).and_hms(0, 0, 0);
        let mut gen = PanelGen::new(StdRng::seed_from_u64(1), 3, 4, t, 0.1).unwrap();
        let rows = gen.periods(2);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].instrument, "INST0000");
        assert_eq!(rows[2].instrument, "INST0002");
        assert_eq!(rows[2].datetime, t);
        assert_eq!(rows[3].instrument, "INST0000");
        assert_eq!(rows[3].datetime, t + Duration::days(1));
        assert!(rows.iter().all(|row| row.features.len() == 4));
        assert!(rows.iter().all(|row| row.label.is_finite()));
    }

    #[test]
    fn missing_values() {
        let t = NaiveDate::from_ymd(2020, 1, 1).and_hms(0, 0, 0);
        let mut gen = PanelGen::new(StdRng::seed_from_u64(2), 2, 3, t, 0.1).unwrap();
        gen.missing_feature = 1.0;
        gen.missing_label = 1.0;
        let row = gen.next().unwrap();
        assert!(row.features.iter().all(|f| f.is_nan()));
        assert!(row.label.is_nan());
    }

    #[test]
    fn features_walk_per_instrument() {
        let t = NaiveDate::from_ymd(2020, 1, 1).and_hms(0, 0, 0);
        let mut gen = PanelGen::new(StdRng::seed_from_u64(3), 2, 2, t, 0.0).unwrap();
        gen.features = Normal::new(1.0, 0.0).unwrap();
        let rows = gen.periods(3);
        for (i, row) in rows.iter().enumerate() {
            let steps = (i / 2 + 1) as f64;
            assert_eq!(row.features, vec![steps, steps]);
            let expected: f64 = gen.weights.iter().map(|w| w * steps).sum();
            assert!((row.label - expected).abs() < 1e-12);
        }
    }
}
