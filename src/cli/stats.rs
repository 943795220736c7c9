use std::{fmt::Display, io::Write, path::Path};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{Args, Subcommand, ValueEnum};

use super::output::{print_day, print_history, print_json, print_weekly};
use crate::{
    daemon::{naming::normalize_app_name, storage::usage_storage::SqliteUsageStorage},
    stats::{UsageQueries, DEFAULT_HISTORY_DAYS, DEFAULT_TOP_APPS, MAX_HISTORY_DAYS},
    utils::{clock::DefaultClock, dir::database_path, time::date_from_key},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, help = "Print as json")]
    json: bool,
    #[arg(long, default_value_t = DEFAULT_TOP_APPS, help = "Number of apps to show")]
    top: usize,
}

#[derive(Debug, Subcommand)]
pub enum StatsCommand {
    #[command(about = "Usage for today")]
    Today {
        #[command(flatten)]
        output: OutputArgs,
    },
    #[command(about = "Usage for yesterday")]
    Yesterday {
        #[command(flatten)]
        output: OutputArgs,
    },
    #[command(about = "Usage for a single day")]
    Date {
        #[arg(
            help = "Day to show. Examples are \"2025-03-15\", \"15/03/2025\", \"3 days ago\", \"last friday\""
        )]
        when: String,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
        #[command(flatten)]
        output: OutputArgs,
    },
    #[command(about = "Usage for the last 7 days including today")]
    Week {
        #[command(flatten)]
        output: OutputArgs,
    },
    #[command(about = "Daily usage of a single app")]
    History {
        #[arg(help = "App name. Process names like \"chrome.exe\" are normalized")]
        app: String,
        #[arg(
            long,
            default_value_t = DEFAULT_HISTORY_DAYS,
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_HISTORY_DAYS)),
            help = "Number of days including today"
        )]
        days: u32,
        #[arg(long, help = "Print as json")]
        json: bool,
    },
}

/// Accepts an ISO date first, then anything `chrono_english` understands relative to `now`.
pub fn parse_day(when: &str, now: DateTime<Local>, date_style: DateStyle) -> Result<NaiveDate> {
    if let Ok(date) = date_from_key(when.trim()) {
        return Ok(date);
    }
    let parsed = parse_date_string(when, now, date_style.into())
        .map_err(|e| anyhow::anyhow!("Failed to parse date {when:?}: {e}"))?;
    Ok(parsed.with_timezone(&Local).date_naive())
}

pub fn process_stats_command(app_dir: &Path, command: StatsCommand) -> Result<()> {
    let storage = SqliteUsageStorage::open(&database_path(app_dir))?;
    let queries = UsageQueries::new(storage, Box::new(DefaultClock));
    let mut stdout = std::io::stdout().lock();
    run_stats_command(&mut stdout, queries, command, Local::now())
}

fn run_stats_command(
    output: &mut impl Write,
    queries: UsageQueries<SqliteUsageStorage>,
    command: StatsCommand,
    now: DateTime<Local>,
) -> Result<()> {
    match command {
        StatsCommand::Today { output: args } => {
            let day = queries.with_top_apps(args.top).today()?;
            print_or_json(output, args.json, &day, print_day)
        }
        StatsCommand::Yesterday { output: args } => {
            let day = queries.with_top_apps(args.top).yesterday()?;
            print_or_json(output, args.json, &day, print_day)
        }
        StatsCommand::Date {
            when,
            date_style,
            output: args,
        } => {
            let date = parse_day(&when, now, date_style)?;
            let day = queries.with_top_apps(args.top).date(date)?;
            print_or_json(output, args.json, &day, print_day)
        }
        StatsCommand::Week { output: args } => {
            let weekly = queries.with_top_apps(args.top).weekly()?;
            print_or_json(output, args.json, &weekly, print_weekly)
        }
        StatsCommand::History { app, days, json } => {
            let history = queries.app_history(&normalize_app_name(&app), days)?;
            print_or_json(output, json, &history, print_history)
        }
    }
}

fn print_or_json<W: Write, T: serde::Serialize>(
    output: &mut W,
    json: bool,
    value: &T,
    print: impl FnOnce(&mut W, &T) -> Result<()>,
) -> Result<()> {
    if json {
        print_json(output, value)
    } else {
        print(output, value)
    }
}
