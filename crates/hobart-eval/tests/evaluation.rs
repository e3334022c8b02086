//! IC evaluation on alpha tables produced by the signal stages.

use chrono::{Duration, NaiveDate};
use hobart_data::schema::{DATE, ENTITY_ID, FORWARD_RETURN};
use hobart_data::{PrepareOptions, forward_returns, prepare_panel};
use hobart_eval::{IcEvaluator, IcMethod, join_forward_returns};
use hobart_signals::{
    ALPHA, AlphaConverter, SignalBuilder, SignalConfig, SignalSource, UniverseFilter,
    score_signals,
};
use polars::df;
use polars::prelude::*;
use std::collections::HashSet;

fn day(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 6, 1).unwrap() + Duration::days(offset as i64)
}

/// Five entities with deterministic, entity-specific return patterns.
fn alphas_and_forward() -> (DataFrame, DataFrame) {
    let rows = 60;
    let entities = ["A", "B", "C", "D", "E"];

    let mut dates = Vec::new();
    let mut ids = Vec::new();
    let mut returns = Vec::new();
    let mut prices = Vec::new();
    for (e, id) in entities.iter().enumerate() {
        // E lists late, so its first dates have no previous price.
        let first = if *id == "E" { 20 } else { 0 };
        for t in first..rows {
            dates.push(day(t));
            ids.push(*id);
            let drift = 0.05 * (e as f64 - 2.0);
            let wiggle = (((t * (e + 3)) % 7) as f64 - 3.0) * 0.3;
            returns.push(drift + wiggle);
            prices.push(if *id == "D" { 3.0 } else { 10.0 + e as f64 });
        }
    }
    let n = dates.len();
    let assets = df![
        "date" => dates.clone(),
        "entity_id" => ids,
        "ticker" => vec!["T"; n],
        "price" => prices,
        "return" => returns.clone(),
        "specific_return" => returns,
        "specific_risk" => vec![30.0; n],
        "predicted_beta" => vec![1.0; n],
    ]
    .unwrap();
    let factors = df![
        "date" => (0..rows).map(day).collect::<Vec<_>>(),
        "rf" => vec![0.0; rows],
    ]
    .unwrap();

    let options = PrepareOptions::new(day(0), day(rows));
    let panel = prepare_panel(assets.lazy(), factors.lazy(), &options).unwrap();

    let config = SignalConfig::new(SignalSource::Return)
        .with_window(10)
        .with_lag(2);
    let signals = SignalBuilder::new(config).unwrap().build(&panel).unwrap();
    let filtered = UniverseFilter::new(5.0).apply(signals.lazy());
    let alphas = AlphaConverter::new(0.05)
        .convert(score_signals(filtered))
        .collect()
        .unwrap();
    let forward = forward_returns(&panel).unwrap();
    (alphas, forward)
}

fn keys(frame: &DataFrame) -> HashSet<(i32, String)> {
    let dates = frame.column(DATE).unwrap().cast(&DataType::Int32).unwrap();
    let dates = dates.i32().unwrap();
    let ids = frame.column(ENTITY_ID).unwrap().str().unwrap();
    dates
        .into_iter()
        .zip(ids)
        .map(|(d, id)| (d.unwrap(), id.unwrap().to_string()))
        .collect()
}

#[test]
fn test_join_never_introduces_rows() {
    let (alphas, forward) = alphas_and_forward();
    let joined = join_forward_returns(alphas.clone().lazy(), forward.lazy())
        .collect()
        .unwrap();

    assert!(joined.height() > 0);
    assert!(keys(&joined).is_subset(&keys(&alphas)));
    assert_eq!(joined.column(ALPHA).unwrap().null_count(), 0);
    assert_eq!(joined.column(FORWARD_RETURN).unwrap().null_count(), 0);
}

#[test]
fn test_filtered_entity_never_evaluated() {
    let (alphas, _) = alphas_and_forward();
    let ids = alphas.column(ENTITY_ID).unwrap().str().unwrap();
    assert!(ids.into_iter().all(|id| id != Some("D")));
}

#[test]
fn test_report() {
    let (alphas, forward) = alphas_and_forward();
    let report = IcEvaluator::new(5).unwrap().evaluate(&alphas, &forward).unwrap();

    assert!(!report.series.is_empty());
    for point in report.series.points() {
        if let Some(ic) = point.rank {
            assert!((-1.0..=1.0).contains(&ic));
            assert!(point.observations >= 2);
        }
    }
    assert_eq!(
        report.summary(IcMethod::Rank).count,
        report.series.defined(IcMethod::Rank).len()
    );

    let table = report.to_dataframe().unwrap();
    assert_eq!(table.height(), report.series.len());
    let cumulative = table.column("pearson_ic_cumulative").unwrap().f64().unwrap();
    let last_defined = cumulative.into_iter().flatten().last().unwrap();
    let total: f64 = report.series.defined(IcMethod::Pearson).iter().sum();
    assert!((last_defined - total).abs() < 1e-12);
}
