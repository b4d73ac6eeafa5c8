//! Terminal tables for command output.

use tabled::{Table, Tabled, settings::Style};

use crate::{
    analysis::{CandidateScore, RegimeStats, SupertrendPoint},
    domain::PriceSeries,
    engine::BacktestReport,
    models::{ChangeEvent, GaussianHmm},
    utils::epoch_ms_to_date_string,
};

fn render<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn opt_float(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(x) => format!("{:.*}", precision, x),
        None => "-".to_string(),
    }
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Index")]
    index: usize,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Direction")]
    direction: String,
}

pub fn events_table(series: &PriceSeries, events: &[ChangeEvent]) -> String {
    render(
        events
            .iter()
            .map(|ev| EventRow {
                index: ev.index,
                date: series
                    .timestamps
                    .get(ev.index)
                    .map(|&ts| epoch_ms_to_date_string(ts))
                    .unwrap_or_default(),
                price: format!("{:.4}", ev.price),
                direction: ev.direction.to_string(),
            })
            .collect(),
    )
}

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Threshold")]
    threshold: String,
    #[tabled(rename = "Events")]
    events: usize,
    #[tabled(rename = "Log-Likelihood")]
    score: String,
    #[tabled(rename = "Note")]
    note: String,
}

pub fn candidates_table(candidates: &[CandidateScore], selected: f64) -> String {
    render(
        candidates
            .iter()
            .map(|c| CandidateRow {
                threshold: format!("{:.4}", c.threshold),
                events: c.n_events,
                score: if c.is_viable() {
                    format!("{:.4}", c.score)
                } else {
                    "-inf".to_string()
                },
                note: match &c.failure {
                    Some(reason) => reason.clone(),
                    None if c.threshold == selected => "selected".to_string(),
                    None => String::new(),
                },
            })
            .collect(),
    )
}

#[derive(Tabled)]
struct RegimeRow {
    #[tabled(rename = "State")]
    state: usize,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std Dev")]
    std_dev: String,
    #[tabled(rename = "Model Mean")]
    model_mean: String,
    #[tabled(rename = "Model Var")]
    model_var: String,
    #[tabled(rename = "Up DCs")]
    up: usize,
    #[tabled(rename = "Down DCs")]
    down: usize,
}

pub fn regimes_table(regimes: &[RegimeStats], model: &GaussianHmm) -> String {
    render(
        regimes
            .iter()
            .map(|r| RegimeRow {
                state: r.state,
                samples: r.samples,
                mean: format!("{:.6}", r.mean),
                std_dev: format!("{:.6}", r.std_dev),
                model_mean: opt_float(model.means.get(r.state).copied(), 6),
                model_var: opt_float(model.variances.get(r.state).copied(), 8),
                up: r.up_events,
                down: r.down_events,
            })
            .collect(),
    )
}

pub fn transitions_table(model: &GaussianHmm) -> String {
    let mut builder = tabled::builder::Builder::default();
    let mut header = vec!["From \\ To".to_string()];
    header.extend((0..model.n_states).map(|j| j.to_string()));
    builder.push_record(header);
    for (i, row) in model.transitions.iter().enumerate() {
        let mut record = vec![i.to_string()];
        record.extend(row.iter().map(|p| format!("{:.4}", p)));
        builder.push_record(record);
    }
    builder.build().with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct BacktestRow {
    #[tabled(rename = "Strategy")]
    name: String,
    #[tabled(rename = "Total Return")]
    total_return: String,
    #[tabled(rename = "Sharpe")]
    sharpe: String,
    #[tabled(rename = "Position Changes")]
    changes: usize,
    #[tabled(rename = "Exposure")]
    exposure: String,
}

pub fn backtest_table(reports: &[&BacktestReport]) -> String {
    render(
        reports
            .iter()
            .map(|r| BacktestRow {
                name: r.name.clone(),
                total_return: format!("{:+.2}%", r.total_return * 100.0),
                sharpe: format!("{:.4}", r.sharpe_ratio),
                changes: r.position_changes,
                exposure: format!("{:.1}%", r.exposure * 100.0),
            })
            .collect(),
    )
}

#[derive(Tabled)]
struct SupertrendRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Close")]
    close: String,
    #[tabled(rename = "Supertrend")]
    value: String,
    #[tabled(rename = "Trend")]
    direction: String,
}

pub fn supertrend_table(series: &PriceSeries, points: &[SupertrendPoint], skip: usize) -> String {
    render(
        points
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(i, p)| SupertrendRow {
                date: epoch_ms_to_date_string(series.timestamps[i]),
                close: format!("{:.4}", series.close_prices[i]),
                value: opt_float(p.value, 4),
                direction: p
                    .direction
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            })
            .collect(),
    )
}
