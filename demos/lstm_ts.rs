/*!
Train an LSTM regressor on a panel of instruments and predict its test segment
*/

use anyhow::format_err;
use chrono::NaiveDate;
use clap::{App, Arg};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use lstm_ts::data::{
    fake::PanelGen,
    panel::{read_panel, PANEL_DATETIME},
    PanelDataset, PanelRow, Segments,
};
use lstm_ts::{EvalsResult, LstmConfig, LstmRegressor};
use rand::thread_rng;
use std::fs::File;
use std::path::Path;

const STEP_LEN: usize = 20;
const TRAIN_RATIO: f64 = 0.7;
const VALID_RATIO: f64 = 0.15;
const FAKE_INSTRUMENTS: usize = 50;
const FAKE_PERIODS: usize = 300;

fn load_rows(input: Option<&str>, d_feat: usize) -> anyhow::Result<Vec<PanelRow>> {
    match input {
        Some(path) => {
            let file = File::open(Path::new(path))?;
            Ok(read_panel(file, Some(PANEL_DATETIME))?)
        }
        None => {
            let start = NaiveDate::from_ymd(2015, 1, 5).and_hms(0, 0, 0);
            let mut gen = PanelGen::new(thread_rng(), FAKE_INSTRUMENTS, d_feat, start, 0.1)
                .map_err(|err| format_err!("Error building generator: {:?}", err))?;
            gen.missing_feature = 0.01;
            gen.missing_label = 0.01;
            Ok(gen.periods(FAKE_PERIODS))
        }
    }
}

pub fn run(
    input: Option<&str>,
    output: Option<&str>,
    save_path: Option<&str>,
    mut config: LstmConfig,
) -> anyhow::Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}"));
    spinner.enable_steady_tick(100);

    spinner.set_message("Loading data");
    let rows = load_rows(input, config.d_feat)?;
    let segments = Segments::split_by_ratio(
        rows.iter().map(|row| row.datetime),
        TRAIN_RATIO,
        VALID_RATIO,
    )
    .ok_or_else(|| format_err!("Too few timestamps to split into train, valid and test"))?;
    let dataset = PanelDataset::new(rows, STEP_LEN, segments)?;
    if dataset.d_feat() != config.d_feat {
        log::warn!(
            "Input has {} features, overriding d_feat = {}",
            dataset.d_feat(),
            config.d_feat
        );
        config.d_feat = dataset.d_feat();
    }

    spinner.set_message("Training");
    let mut model = LstmRegressor::new(config)?;
    let mut evals = EvalsResult::default();
    let summary = model.fit(&dataset, &mut evals, save_path.map(Path::new))?;
    spinner.println(format!(
        "Best valid score {:.6} at epoch {} of {}, saved to {}",
        summary.best_score,
        summary.best_epoch,
        summary.epochs_run,
        summary.save_path.display()
    ));

    spinner.set_message("Predicting");
    let preds = model.predict(&dataset)?;
    spinner.finish_and_clear();

    match output {
        Some(path) => {
            let written = preds.write_csv(File::create(Path::new(path))?)?;
            eprintln!("Wrote {} predictions to {}", written, path);
        }
        None => {
            preds.write_csv(std::io::stdout())?;
        }
    }
    Ok(())
}

pub fn main() -> anyhow::Result<()> {
    let matches = App::new("LSTM time series regressor")
        .version("1.0")
        .author("Jad Elkhaleq Ghalayini <jad.ghalayini@mail.utoronto.ca>")
        .about("Trains an LSTM on windows of panel data and predicts the held-out segment")
        .arg(
            Arg::with_name("INPUT")
                .help("Input panel CSV (datetime,instrument,features...,label). Fake data if absent")
                .index(1),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .help("JSON file of hyperparameters")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .help("Where to write predictions. Defaults to stdout")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("save")
                .short("s")
                .long("save")
                .help("Where to save the best checkpoint")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Sets the level of verbosity")
                .takes_value(true),
        )
        .get_matches();

    let verbosity = matches
        .value_of("verbose")
        .map(|v| usize::from_str_radix(v, 10))
        .unwrap_or(Ok(1))?;
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();

    let config = match matches.value_of("config") {
        Some(path) => LstmConfig::from_json_file(path)?,
        None => LstmConfig::default(),
    };

    run(
        matches.value_of("INPUT"),
        matches.value_of("output"),
        matches.value_of("save"),
        config,
    )
}
