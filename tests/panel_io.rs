/*!
Test panel IO
*/
use chrono::NaiveDate;
use lstm_ts::data::{fake::*, panel::*, *};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{Seek, SeekFrom};
use tempfile::tempfile;

#[test]
fn fake_data_roundtrip() {
    const TEST_PERIODS: usize = 250;
    let t = NaiveDate::from_ymd(2019, 1, 2).and_hms(15, 0, 0);
    let mut gen = PanelGen::new(StdRng::seed_from_u64(42), 8, 3, t, 0.1)
        .expect("Generator creation should not fail!");
    gen.missing_feature = 0.05;
    let rows = gen.periods(TEST_PERIODS);
    let mut tmp = tempfile().expect("Tempfile creation should not fail!");
    let written = write_panel(&mut tmp, &["a", "b", "c"], &rows)
        .expect("Writing test data should not fail!");
    assert_eq!(written, rows.len());
    tmp.seek(SeekFrom::Start(0)).expect("Seek should not fail");
    let read_rows = read_panel(&mut tmp, None).expect("Reading test data should not fail");
    assert_eq!(read_rows.len(), rows.len());
    for (read, row) in read_rows.iter().zip(&rows) {
        assert_eq!(read.datetime, row.datetime);
        assert_eq!(read.instrument, row.instrument);
        assert_eq!(read.label, row.label);
        for (r, f) in read.features.iter().zip(&row.features) {
            assert!(r == f || (r.is_nan() && f.is_nan()));
        }
    }
}

#[test]
fn dataset_rows_roundtrip() {
    let t = NaiveDate::from_ymd(2019, 1, 2).and_hms(0, 0, 0);
    let mut gen = PanelGen::new(StdRng::seed_from_u64(7), 3, 2, t, 0.1).unwrap();
    let rows = gen.periods(20);
    let segments = Segments::split_by_ratio(rows.iter().map(|row| row.datetime), 0.5, 0.25)
        .expect("Twenty periods split into three segments");
    let dataset = PanelDataset::new(rows.clone(), 4, segments).unwrap();
    let mut sorted = rows;
    sorted.sort_by(|l, r| {
        l.instrument
            .cmp(&r.instrument)
            .then(l.datetime.cmp(&r.datetime))
    });
    // Values pass through f32 storage
    for (back, row) in dataset.rows().zip(&sorted) {
        assert_eq!(back.datetime, row.datetime);
        assert_eq!(back.instrument, row.instrument);
        assert_eq!(back.label, row.label as f32 as f64);
    }
    assert_eq!(dataset.rows().count(), sorted.len());
}
