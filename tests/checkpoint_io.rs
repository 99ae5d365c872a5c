/*!
Test persisting and reloading fitted models
*/
use chrono::NaiveDate;
use lstm_ts::data::{fake::PanelGen, PanelDataset, Segments};
use lstm_ts::{EvalsResult, LstmConfig, LstmRegressor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

fn dataset() -> PanelDataset {
    let t = NaiveDate::from_ymd(2020, 3, 2).and_hms(0, 0, 0);
    let mut gen = PanelGen::new(StdRng::seed_from_u64(9), 5, 4, t, 0.05)
        .expect("Generator creation should not fail!");
    gen.missing_feature = 0.02;
    gen.missing_label = 0.02;
    let rows = gen.periods(60);
    let segments = Segments::split_by_ratio(rows.iter().map(|row| row.datetime), 0.6, 0.2)
        .expect("Sixty periods split into three segments");
    PanelDataset::new(rows, 8, segments).expect("Dataset creation should not fail!")
}

fn config() -> LstmConfig {
    LstmConfig {
        d_feat: 4,
        hidden_size: 16,
        num_layers: 2,
        dropout: 0.1,
        n_epochs: 4,
        lr: 0.01,
        batch_size: 32,
        early_stop: 2,
        n_jobs: 2,
        seed: Some(17),
        ..Default::default()
    }
}

#[test]
fn reloaded_model_predicts_identically() {
    let dir = tempdir().expect("Tempdir creation should not fail!");
    let path = dir.path().join("best.ot");
    let dataset = dataset();

    let mut model = LstmRegressor::new(config()).unwrap();
    let mut evals = EvalsResult::default();
    let summary = model.fit(&dataset, &mut evals, Some(&path)).unwrap();
    assert_eq!(summary.save_path, path);
    assert!(summary.epochs_run >= 1 && summary.epochs_run <= 4);
    let preds = model.predict(&dataset).unwrap();
    assert!(!preds.is_empty());

    let mut reloaded = LstmRegressor::new(LstmConfig {
        seed: Some(18),
        ..config()
    })
    .unwrap();
    assert!(!reloaded.is_fitted());
    reloaded.load_checkpoint(&path).unwrap();
    assert!(reloaded.is_fitted());
    let reloaded_preds = reloaded.predict(&dataset).unwrap();
    assert_eq!(preds.index, reloaded_preds.index);
    for (l, r) in preds.values.iter().zip(&reloaded_preds.values) {
        assert!((l - r).abs() < 1e-6, "{} != {}", l, r);
    }
}

#[test]
fn configured_save_path_is_used() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("configured.ot");
    let mut model = LstmRegressor::new(LstmConfig {
        save_path: Some(path.clone()),
        n_epochs: 1,
        ..config()
    })
    .unwrap();
    let summary = model
        .fit(&dataset(), &mut EvalsResult::default(), None)
        .unwrap();
    assert_eq!(summary.save_path, path);
    assert!(path.exists());
}

#[test]
fn predictions_write_as_csv() {
    let dir = tempdir().unwrap();
    let dataset = dataset();
    let mut model = LstmRegressor::new(LstmConfig {
        n_epochs: 1,
        ..config()
    })
    .unwrap();
    model
        .fit(&dataset, &mut EvalsResult::default(), Some(&dir.path().join("m.ot")))
        .unwrap();
    let preds = model.predict(&dataset).unwrap();
    let csv_path = dir.path().join("preds.csv");
    let mut file = File::create(&csv_path).unwrap();
    assert_eq!(preds.write_csv(&mut file).unwrap(), preds.len());
    file.flush().unwrap();
    let text = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("datetime,instrument,score"));
    assert_eq!(lines.count(), preds.len());
    let (first_index, first_value) = preds.iter().next().unwrap();
    assert_eq!(preds.get(first_index), Some(first_value));
}

#[test]
fn config_reads_from_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"d_feat": 4, "hidden_size": 16, "loss": "mse"}"#).unwrap();
    let config = LstmConfig::from_json_file(&path).unwrap();
    assert_eq!(config.d_feat, 4);
    assert_eq!(config.hidden_size, 16);
    assert_eq!(config.n_epochs, 200);
}
