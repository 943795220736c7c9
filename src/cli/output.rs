use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::{
    daemon::storage::entities::{AppUsage, DayUsage},
    stats::{AppHistory, WeeklyUsage},
    utils::{percentage::seconds_percentage, time::date_to_key},
};

pub fn format_duration(seconds: u64) -> String {
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn print_json(output: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, value)?;
    writeln!(output)?;
    Ok(())
}

fn print_apps(output: &mut impl Write, apps: &[AppUsage], whole: u64) -> Result<()> {
    let width = apps.iter().map(|v| v.app_name.len()).max().unwrap_or(0);
    for app in apps {
        writeln!(
            output,
            "  {:<width$}  {:>10}  {:>5.1}%",
            app.app_name,
            format_duration(app.duration_seconds),
            *seconds_percentage(app.duration_seconds, whole),
        )?;
    }
    Ok(())
}

pub fn print_day(output: &mut impl Write, day: &DayUsage) -> Result<()> {
    writeln!(
        output,
        "{}: {} across {} app(s)",
        date_to_key(day.date),
        format_duration(day.total_seconds),
        day.app_count
    )?;
    print_apps(output, &day.top_apps, day.total_seconds)
}

pub fn print_weekly(output: &mut impl Write, weekly: &WeeklyUsage) -> Result<()> {
    writeln!(
        output,
        "{} - {}: {}",
        date_to_key(weekly.from),
        date_to_key(weekly.to),
        format_duration(weekly.total_seconds)
    )?;
    for day in &weekly.days {
        writeln!(
            output,
            "  {} {} {:>10}",
            date_to_key(day.date),
            day.date.format("%a"),
            format_duration(day.seconds)
        )?;
    }
    writeln!(output, "Top apps")?;
    print_apps(output, &weekly.top_apps, weekly.total_seconds)
}

pub fn print_history(output: &mut impl Write, history: &AppHistory) -> Result<()> {
    writeln!(
        output,
        "{}: {} over {} day(s)",
        history.app_name,
        format_duration(history.total_seconds),
        history.days.len()
    )?;
    for day in history.days.iter().filter(|v| v.seconds > 0) {
        writeln!(
            output,
            "  {} {:>10}",
            date_to_key(day.date),
            format_duration(day.seconds)
        )?;
    }
    Ok(())
}
