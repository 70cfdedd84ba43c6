//! `callisto health`, `snapshot`, `trend` and `forecast` command implementations.

use std::path::Path;

use callisto::query::ForecastStatus;
use callisto::{Callisto, Snapshot};
use chrono::{DateTime, Utc};
use colored::Colorize;

use super::display::{print_json, score};

/// Run the health command.
pub fn health(workspace: &Path, json: bool) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let snapshot = callisto.health()?;
    if json {
        return print_json(&snapshot);
    }
    print_snapshot(&snapshot);
    Ok(())
}

/// Run the snapshot command.
pub fn snapshot(
    workspace: &Path,
    tag: Option<&str>,
    git_branch: Option<&str>,
    git_commit: Option<&str>,
) -> Result<(), callisto::Error> {
    let mut callisto = Callisto::new(workspace)?;
    let snapshot = callisto.append_snapshot(tag, git_branch, git_commit)?;
    println!(
        "{} snapshot #{}{}",
        "Recorded".green().bold(),
        snapshot.id,
        snapshot
            .tag
            .as_deref()
            .map(|t| format!(" ({t})"))
            .unwrap_or_default()
    );
    println!();
    print_snapshot(&snapshot);
    Ok(())
}

/// Run the trend command.
pub fn trend(
    workspace: &Path,
    metric: &str,
    limit: usize,
    json: bool,
) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let points = callisto.trend(metric, Some(limit))?;
    if json {
        return print_json(&points);
    }

    if points.is_empty() {
        println!(
            "{}",
            "No snapshots recorded. Run `callisto snapshot` first.".dimmed()
        );
        return Ok(());
    }

    println!("{} {}", "Trend of".cyan().bold(), metric.white().bold());
    for point in &points {
        let delta = match point.delta {
            Some(d) if d > 0.0 => format!("+{d}").normal(),
            Some(d) if d < 0.0 => format!("{d}").normal(),
            Some(_) => "±0".dimmed(),
            None => "".normal(),
        };
        println!(
            "  {} {} {:>12} {}",
            format!("#{}", point.snapshot_id).dimmed(),
            format_timestamp(point.timestamp),
            point.value,
            delta
        );
    }
    Ok(())
}

/// Run the forecast command.
pub fn forecast(workspace: &Path, horizon: Option<u32>, json: bool) -> Result<(), callisto::Error> {
    let callisto = Callisto::new(workspace)?;
    let forecasts = callisto.forecast(horizon)?;
    if json {
        return print_json(&forecasts);
    }

    if forecasts.is_empty() {
        println!(
            "{}",
            "Not enough snapshots to forecast. Record a few with `callisto snapshot`.".dimmed()
        );
        return Ok(());
    }

    println!("{}", "Forecast".cyan().bold());
    for f in &forecasts {
        let status = match f.status {
            ForecastStatus::Stable => f.status.to_string().green(),
            ForecastStatus::Trending => f.status.to_string().normal(),
            ForecastStatus::Warning => f.status.to_string().yellow().bold(),
            ForecastStatus::Alert => f.status.to_string().red().bold(),
        };
        println!(
            "  {:<20} {:>10.2} → {:>10.2} in {} snapshots (slope {:+.3}) [{}]",
            f.metric, f.current, f.forecast_value, f.horizon, f.slope, status
        );
    }
    Ok(())
}

fn print_snapshot(s: &Snapshot) {
    println!("  {}: {}", "Health score".white().bold(), score(s.health_score));
    println!(
        "  {}: {} files, {} symbols, {} edges",
        "Size".white().bold(),
        s.files,
        s.symbols,
        s.edges
    );
    println!(
        "  {}: {} ({:.1}% tangled)",
        "Cycles".white().bold(),
        s.cycles,
        s.tangle_ratio * 100.0
    );
    println!(
        "  {}: {}",
        "Layer violations".white().bold(),
        s.layer_violations
    );
    println!(
        "  {}: {} god components, {} bottlenecks",
        "Hotspots".white().bold(),
        s.god_components,
        s.bottlenecks
    );
    println!("  {}: {}", "Dead exports".white().bold(), s.dead_exports);
    println!(
        "  {}: {:.2} average, {} brain methods",
        "Complexity".white().bold(),
        s.avg_complexity,
        s.brain_methods
    );
}

fn format_timestamp(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map_or_else(|| secs.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}
