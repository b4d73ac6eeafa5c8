//! Command handlers behind the `dc-regime` binary.

mod args;
pub mod report;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use crate::{
    analysis::{DirectionalChangeDetector, Selection, ThresholdSelector, change_count, supertrend},
    config::{ANALYSIS, Threshold},
    data::source_for_path,
    domain::PriceSeries,
    engine::{compare_strategies, run_analysis},
};

pub use args::{Command, GridArgs, InputArgs, ModelArgs, analysis_config};

async fn load_input(input: &InputArgs) -> Result<PriceSeries> {
    let path = input.path();
    let source = source_for_path(&path, &input.symbol());
    log::info!("Loading prices via {}: {}", source.signature(), path.display());
    source.load().await
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

fn print_selection(selection: &Selection) {
    println!(
        "Selected threshold {} | log-likelihood {:.4} | {} events | {} iterations{}",
        selection.threshold,
        selection.score,
        change_count(&selection.events),
        selection.model.iterations,
        if selection.model.converged { "" } else { " (not converged)" }
    );
}

pub async fn run(command: Command, json_output: bool) -> Result<()> {
    match command {
        Command::Detect { input, threshold } => {
            let series = load_input(&input).await?;
            let threshold = Threshold::new(threshold)?;
            let events = DirectionalChangeDetector::new(threshold).detect(series.closes());

            if json_output {
                return print_json(&json!({
                    "symbol": series.symbol,
                    "threshold": threshold,
                    "events": events,
                }));
            }
            println!("{}", report::events_table(&series, &events));
            println!(
                "{} directional changes at {} over {} prices",
                change_count(&events),
                threshold,
                series.len()
            );
        }

        Command::Select { input, grid, model } => {
            let series = load_input(&input).await?;
            let selector = ThresholdSelector::new(model.hmm(), model.mode);
            let candidates = grid.candidates();
            let selection = if grid.parallel {
                selector.select_parallel(series.closes(), &candidates)?
            } else {
                selector.select(series.closes(), &candidates)?
            };

            if json_output {
                return print_json(&selection);
            }
            println!(
                "{}",
                report::candidates_table(&selection.candidates, selection.threshold.value())
            );
            print_selection(&selection);
        }

        Command::Analyze {
            input,
            grid,
            model,
            window,
        } => {
            let series = load_input(&input).await?;
            let config = analysis_config(&grid, &model, window);
            let outcome = run_analysis(&series, &config)?;

            if json_output {
                return print_json(&outcome);
            }
            let selection = &outcome.selection;
            println!(
                "{}",
                report::candidates_table(&selection.candidates, selection.threshold.value())
            );
            print_selection(selection);
            println!("BIC {:.4}", outcome.bic);
            println!("{}", report::regimes_table(&outcome.regimes, &selection.model));
            println!("{}", report::transitions_table(&selection.model));
            println!("{}", report::backtest_table(&outcome.comparison.reports()));
        }

        Command::Backtest {
            input,
            window,
            threshold,
        } => {
            let series = load_input(&input).await?;
            let settings = ANALYSIS.backtest;
            let comparison = compare_strategies(series.closes(), window, threshold, &settings)?;

            if json_output {
                return print_json(&comparison);
            }
            println!("{}", report::backtest_table(&comparison.reports()));
        }

        Command::Supertrend {
            input,
            window,
            multiplier,
            tail,
        } => {
            let series = load_input(&input).await?;
            let points = supertrend(
                &series.high_prices,
                &series.low_prices,
                &series.close_prices,
                window,
                multiplier,
            )?;

            if json_output {
                return print_json(&points);
            }
            let skip = tail.map_or(0, |n| points.len().saturating_sub(n));
            println!("{}", report::supertrend_table(&series, &points, skip));
        }
    }

    Ok(())
}
