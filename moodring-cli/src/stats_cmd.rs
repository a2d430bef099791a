use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use moodring_core::{BlobStore, DailyMoodStats, MoodPipeline, MoodStat, TimeRange, TimeRangeStats, TrendDataPoint};
use rand::Rng;
use std::fmt::Write as _;

#[derive(Subcommand, Debug)]
pub enum StatsCommand {
    /// Top three moods recorded today
    Today {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Every mood over a range, with the average number of records per day
    Range {
        /// today | week | month
        #[arg(long, default_value = "week")]
        range: TimeRange,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Recorded points in time order
    Trend {
        /// today | week | month
        #[arg(long, default_value = "today")]
        range: TimeRange,

        /// Show only the most recent N points
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

pub fn run_stats<B: BlobStore, R: Rng>(
    cmd: StatsCommand,
    pipeline: &mut MoodPipeline<B, R>,
    now: DateTime<Utc>,
) -> Result<()> {
    match cmd {
        StatsCommand::Today { json } => {
            let daily = pipeline.daily_stats(now);
            if json {
                println!("{}", serde_json::to_string_pretty(&daily).context("serialize stats")?);
            } else {
                print!("{}", render_daily(daily.as_ref()));
            }
        }
        StatsCommand::Range { range, json } => {
            let stats = pipeline.range_stats(range, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats).context("serialize stats")?);
            } else {
                print!("{}", render_range(&stats));
            }
        }
        StatsCommand::Trend { range, limit, json } => {
            let mut points = pipeline.trend(range, now);
            if let Some(n) = limit {
                let skip = points.len().saturating_sub(n);
                points.drain(..skip);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&points).context("serialize trend")?);
            } else {
                print!("{}", render_trend(range, &points));
            }
        }
    }
    Ok(())
}

fn bar(percentage: f64) -> String {
    let width = (percentage / 5.0).round().clamp(0.0, 20.0) as usize;
    "#".repeat(width)
}

fn push_stat_lines(out: &mut String, stats: &[MoodStat]) {
    for s in stats {
        let _ = writeln!(
            out,
            "  {}. {:<14} {:>4}  {:>5.1}%  {}",
            s.rank,
            s.mood_type.profile().label,
            s.count,
            s.percentage,
            bar(s.percentage)
        );
    }
}

pub fn render_daily(daily: Option<&DailyMoodStats>) -> String {
    let Some(d) = daily else {
        return "No mood records today yet.\n".to_string();
    };
    let mut out = String::new();
    let _ = writeln!(out, "# Today ({}) - {} records\n", d.date, d.total_records);
    push_stat_lines(&mut out, &d.top_moods);
    out
}

pub fn render_range(stats: &TimeRangeStats) -> String {
    if stats.total_records == 0 {
        return format!("No mood records for range '{}'.\n", stats.range);
    }
    let mut out = String::new();
    let span = match (stats.start_date, stats.end_date) {
        (Some(a), Some(b)) if a != b => format!("{a} .. {b}"),
        (Some(a), _) => a.to_string(),
        _ => String::new(),
    };
    let _ = writeln!(out, "# Range: {} ({span})\n", stats.range);
    push_stat_lines(&mut out, &stats.all_moods);
    let _ = writeln!(out);
    let _ = writeln!(out, "Total records:      {}", stats.total_records);
    let _ = writeln!(out, "Avg records / day:  {:.1}", stats.avg_daily_changes);
    if let Some(m) = stats.most_frequent_mood {
        let _ = writeln!(out, "Most frequent:      {}", m.profile().label);
    }
    out
}

pub fn render_trend(range: TimeRange, points: &[TrendDataPoint]) -> String {
    if points.is_empty() {
        return format!("No trend data for range '{range}'.\n");
    }
    let mut out = String::new();
    for p in points {
        let _ = writeln!(out, "{}  {:>3}  {:<14} {}", p.time, p.sensor_value, p.label, p.color);
    }
    out
}
