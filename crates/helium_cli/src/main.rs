//! Operator entry point: prints delivery statistics for a Helium database.
//!
//! Usage: `helium [stats|check] [--json]` (default `stats`). Settings come from
//! `configuration/` in the working directory.

mod configuration;

use configuration::{get_configuration, Settings};
use helium_core::db::open_db;
use helium_core::{
    core_version, default_log_level, init_logging, DailySendCount, DeliveryStats,
    NewsletterService, SqliteNewsletterRepository, SqliteSubscriberRepository,
    SubscriberRepository, SubscriberStatus,
};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

/// Everything `helium stats` reports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    newsletters: DeliveryStats,
    subscribers: SubscriberCounts,
    window_days: u32,
    sent_out: Vec<DailySendCount>,
}

#[derive(Debug, Serialize)]
struct SubscriberCounts {
    total: u64,
    verified: u64,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("helium: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|arg| arg == "--json");
    let command = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .map_or("stats", String::as_str);

    let base_dir = std::env::current_dir()?;
    let settings = get_configuration(&base_dir)?.resolve_paths(&base_dir);

    let level = settings
        .logging
        .level
        .as_deref()
        .unwrap_or_else(|| default_log_level());
    let log_dir = settings
        .logging
        .dir
        .to_str()
        .ok_or("log directory must be valid UTF-8")?;
    init_logging(level, log_dir)?;
    info!("event=cli_start module=cli status=ok command={command} json={json}");

    match command {
        "stats" => print_stats(&settings, json),
        "check" => {
            open_database(settings.database.path.as_path())?;
            println!("helium_core version={} database=ok", core_version());
            Ok(())
        }
        other => Err(format!("unknown command `{other}`; expected stats|check").into()),
    }
}

fn print_stats(settings: &Settings, json: bool) -> Result<(), Box<dyn Error>> {
    let conn = open_database(settings.database.path.as_path())?;
    let report = collect_stats(&conn, settings.stats.window_days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stats = &report.newsletters;
    println!(
        "newsletters total={} on_hold={} pending={} in_progress={} finished={}",
        stats.total, stats.on_hold, stats.pending, stats.in_progress, stats.finished
    );
    println!(
        "subscribers total={} verified={}",
        report.subscribers.total, report.subscribers.verified
    );
    println!("sent out over the last {} days:", report.window_days);
    for day in &report.sent_out {
        println!("  {} {}", day.date, day.count);
    }
    Ok(())
}

fn collect_stats(conn: &Connection, window_days: u32) -> Result<StatsReport, Box<dyn Error>> {
    let newsletters = NewsletterService::new(SqliteNewsletterRepository::try_new(conn)?);
    let subscribers = SqliteSubscriberRepository::try_new(conn)?;

    Ok(StatsReport {
        newsletters: newsletters.delivery_stats()?,
        subscribers: SubscriberCounts {
            total: subscribers.count_all(None)?,
            verified: subscribers.count_all(Some(SubscriberStatus::Verified))?,
        },
        window_days,
        sent_out: newsletters.sent_out_over_time(window_days)?,
    })
}

fn open_database(path: &Path) -> Result<Connection, Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(open_db(path)?)
}
