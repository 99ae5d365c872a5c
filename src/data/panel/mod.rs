/*!
In-memory panel datasets, and their CSV representation
*/
use super::sampler::InstrumentBlock;
use super::{DataKey, PanelRow, Segment, TsDataset, TsSampler};
use crate::error::{LstmError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use log::debug;
use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::Arc;

/// The panel DateTime format
pub const PANEL_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// The panel Date format, accepted when reading
pub const PANEL_DATE: &str = "%Y-%m-%d";

/// An inclusive range of timestamps
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SegmentRange {
    /// The first timestamp in the range
    pub start: NaiveDateTime,
    /// The last timestamp in the range
    pub end: NaiveDateTime,
}

impl SegmentRange {
    /// Create a new range
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> SegmentRange {
        SegmentRange { start, end }
    }
    /// Whether a timestamp lies in this range
    #[inline]
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }
}

/// The time ranges of a dataset's segments
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Segments {
    /// The training range
    pub train: SegmentRange,
    /// The validation range
    pub valid: SegmentRange,
    /// The test range
    pub test: SegmentRange,
}

impl Segments {
    /// Get the range of a segment
    pub fn get(&self, segment: Segment) -> SegmentRange {
        match segment {
            Segment::Train => self.train,
            Segment::Valid => self.valid,
            Segment::Test => self.test,
        }
    }
    /// Split the distinct timestamps of a panel chronologically: the first `train_ratio` of them
    /// train, the next `valid_ratio` validate, and the rest are held out for testing.
    /// Returns `None` if any segment would be empty.
    pub fn split_by_ratio<I>(datetimes: I, train_ratio: f64, valid_ratio: f64) -> Option<Segments>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let times: Vec<NaiveDateTime> = datetimes.into_iter().sorted().dedup().collect();
        let n = times.len();
        let train_end = ((n as f64 * train_ratio) as usize).min(n);
        let valid_end = ((n as f64 * (train_ratio + valid_ratio)) as usize).min(n);
        if train_end == 0 || valid_end <= train_end || valid_end >= n {
            return None;
        }
        Some(Segments {
            train: SegmentRange::new(times[0], times[train_end - 1]),
            valid: SegmentRange::new(times[train_end], times[valid_end - 1]),
            test: SegmentRange::new(times[valid_end], times[n - 1]),
        })
    }
}

/// A panel of observations over many instruments, sampled in windows of `step_len` rows
#[derive(Debug, Clone)]
pub struct PanelDataset {
    blocks: Arc<Vec<InstrumentBlock>>,
    d_feat: usize,
    step_len: usize,
    segments: Segments,
    drop_nan_label: bool,
    feature_fill: Option<f32>,
}

impl PanelDataset {
    /// Build a dataset from panel rows. Every row must carry the same number of features.
    pub fn new(rows: Vec<PanelRow>, step_len: usize, segments: Segments) -> Result<PanelDataset> {
        let d_feat = match rows.first() {
            Some(row) => row.features.len(),
            None => return Err(LstmError::EmptyDataset("panel has no rows".into())),
        };
        if let Some(bad) = rows.iter().find(|row| row.features.len() != d_feat) {
            return Err(LstmError::FeatureMismatch {
                expected: d_feat,
                got: bad.features.len(),
            });
        }
        let cols = d_feat + 1;
        let mut rows = rows;
        rows.sort_by(|l, r| {
            l.instrument
                .cmp(&r.instrument)
                .then(l.datetime.cmp(&r.datetime))
        });
        let mut blocks = Vec::new();
        for (instrument, group) in &rows.iter().group_by(|row| row.instrument.clone()) {
            let mut datetimes = Vec::new();
            let mut data = Vec::new();
            for row in group {
                datetimes.push(row.datetime);
                data.extend(row.features.iter().map(|&f| f as f32));
                data.push(row.label as f32);
            }
            debug_assert_eq!(data.len(), datetimes.len() * cols);
            blocks.push(InstrumentBlock {
                instrument,
                datetimes,
                data,
            });
        }
        debug!(
            "Built panel of {} rows over {} instruments",
            rows.len(),
            blocks.len()
        );
        Ok(PanelDataset {
            blocks: Arc::new(blocks),
            d_feat,
            step_len: step_len.max(1),
            segments,
            drop_nan_label: true,
            feature_fill: Some(0.0),
        })
    }
    /// Set whether learn data drops samples with a NaN label. Defaults to `true`.
    pub fn with_drop_nan_label(mut self, drop_nan_label: bool) -> PanelDataset {
        self.drop_nan_label = drop_nan_label;
        self
    }
    /// Set the value replacing feature NaNs that window filling cannot reach, such as a feature
    /// missing from every row of a window. `None` leaves them in place. Defaults to `Some(0.0)`, for
    /// both learn and infer data.
    pub fn with_feature_fill(mut self, feature_fill: Option<f32>) -> PanelDataset {
        self.feature_fill = feature_fill;
        self
    }
    /// The number of features per time step
    pub fn d_feat(&self) -> usize {
        self.d_feat
    }
    /// The number of time steps per window
    pub fn step_len(&self) -> usize {
        self.step_len
    }
    /// The segment ranges of this dataset
    pub fn segments(&self) -> &Segments {
        &self.segments
    }
    /// Iterate over the rows of this panel, grouped by instrument and sorted by time
    pub fn rows(&self) -> impl Iterator<Item = PanelRow> + '_ {
        let cols = self.d_feat + 1;
        self.blocks.iter().flat_map(move |block| {
            block
                .datetimes
                .iter()
                .zip(block.data.chunks(cols))
                .map(move |(&datetime, values)| PanelRow {
                    datetime,
                    instrument: block.instrument.clone(),
                    features: values[..cols - 1].iter().map(|&v| v as f64).collect(),
                    label: values[cols - 1] as f64,
                })
        })
    }
}

impl TsDataset for PanelDataset {
    fn prepare(&self, segment: Segment, key: DataKey) -> Result<TsSampler> {
        let range = self.segments.get(segment);
        let cols = self.d_feat + 1;
        let drop_nan = key == DataKey::Learn && self.drop_nan_label;
        let mut samples = Vec::new();
        for (b, block) in self.blocks.iter().enumerate() {
            for (r, &t) in block.datetimes.iter().enumerate() {
                if !range.contains(t) {
                    continue;
                }
                if drop_nan && block.data[r * cols + self.d_feat].is_nan() {
                    continue;
                }
                samples.push((b, r));
            }
        }
        debug!("Prepared {} samples for {:?} ({:?})", samples.len(), segment, key);
        let mut sampler = TsSampler::new(self.blocks.clone(), samples, self.step_len, self.d_feat);
        sampler.fill_features(self.feature_fill);
        Ok(sampler)
    }
}

fn parse_datetime(field: &str, date_format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(field, date_format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(field, PANEL_DATE)
                .ok()
                .map(|date| date.and_hms(0, 0, 0))
        })
}

/// Read panel rows from a Reader.
///
/// The CSV must have a header; columns are `datetime,instrument,<features...>,label`. Empty or
/// unparseable values are read as NaN. Datetimes use `date_format`, or `PANEL_DATETIME` by default,
/// and bare `PANEL_DATE` dates are always accepted.
pub fn read_panel<R: Read>(rdr: R, date_format: Option<&str>) -> Result<Vec<PanelRow>> {
    let date_format = date_format.unwrap_or(PANEL_DATETIME);
    let mut rdr = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        if record.len() < 3 {
            return Err(LstmError::BadRecord {
                line,
                msg: format!("expected at least 3 fields, got {}", record.len()),
            });
        }
        let datetime = parse_datetime(&record[0], date_format).ok_or_else(|| {
            LstmError::BadRecord {
                line,
                msg: format!("bad datetime {:?}", &record[0]),
            }
        })?;
        let mut features: Vec<f64> = record
            .iter()
            .skip(2)
            .map(|field| f64::from_str(field.trim()).unwrap_or(f64::NAN))
            .collect();
        let label = features.pop().unwrap_or(f64::NAN);
        rows.push(PanelRow {
            datetime,
            instrument: record[1].to_string(),
            features,
            label,
        })
    }
    Ok(rows)
}

/// Write panel rows to a Writer, with feature columns named `feature_names`.
/// On success, return how many rows were written
pub fn write_panel<'a, W, I>(wtr: W, feature_names: &[&str], rows: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a PanelRow>,
{
    let mut wtr = csv::Writer::from_writer(wtr);
    let mut header = vec!["datetime", "instrument"];
    header.extend_from_slice(feature_names);
    header.push("label");
    wtr.write_record(&header)?;
    let mut written = 0;
    for row in rows {
        if row.features.len() != feature_names.len() {
            return Err(LstmError::FeatureMismatch {
                expected: feature_names.len(),
                got: row.features.len(),
            });
        }
        let mut record = Vec::with_capacity(row.features.len() + 3);
        record.push(row.datetime.format(PANEL_DATETIME).to_string());
        record.push(row.instrument.clone());
        record.extend(row.features.iter().map(|f| f.to_string()));
        record.push(row.label.to_string());
        wtr.write_record(&record)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}
