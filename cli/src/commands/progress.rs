use anyhow::Result;
use chrono::Datelike;
use tabled::{Table, Tabled, settings::Style};

use platewise_core::achievements::{CalendarDay, MAX_STREAK_DAYS};
use platewise_core::ledger::DailyProgress;
use platewise_core::models::{StreakResult, group_thousands};
use platewise_core::service::Tracker;

use super::helpers::{parse_month, print_json, today};

const BAR_WIDTH: usize = 30;

fn progress_bar(percentage: u8, width: usize) -> String {
    let filled = usize::from(percentage.min(100)) * width / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub(super) fn print_progress(progress: &DailyProgress) {
    if !progress.goal_configured {
        println!(
            "Today: {} kcal (no daily goal set, see `platewise settings set --goal`)",
            group_thousands(progress.consumed)
        );
        return;
    }
    println!(
        "Today: {} / {} kcal",
        group_thousands(progress.consumed),
        group_thousands(progress.goal)
    );
    println!(
        "  [{}] {}%",
        progress_bar(progress.percentage, BAR_WIDTH),
        progress.percentage
    );
    if progress.over_goal {
        println!(
            "  Over goal by {} kcal",
            group_thousands(progress.consumed - progress.goal)
        );
    } else {
        println!("  {} kcal remaining", group_thousands(progress.remaining));
    }
}

pub(super) fn print_streak(streak: &StreakResult) {
    match (streak.count, streak.last_log_date) {
        (0, _) | (_, None) => println!("No active streak. Stay within your goal today to start one"),
        (1, Some(last)) => println!("🔥 1 day streak (last: {last})"),
        (n, Some(last)) if n >= MAX_STREAK_DAYS => {
            println!("🔥 {n}+ day streak (last: {last})");
        }
        (n, Some(last)) => println!("🔥 {n} day streak (last: {last})"),
    }
}

pub(crate) fn cmd_today(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let progress = tracker.daily_progress(&user, today())?;
    if json {
        print_json(&progress)
    } else {
        print_progress(&progress);
        Ok(())
    }
}

pub(crate) fn cmd_streak(tracker: &Tracker, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let streak = tracker.streak(&user, today())?;
    if json {
        print_json(&streak)
    } else {
        print_streak(&streak);
        Ok(())
    }
}

#[derive(Tabled, Default)]
struct WeekRow {
    #[tabled(rename = "Mon")]
    mon: String,
    #[tabled(rename = "Tue")]
    tue: String,
    #[tabled(rename = "Wed")]
    wed: String,
    #[tabled(rename = "Thu")]
    thu: String,
    #[tabled(rename = "Fri")]
    fri: String,
    #[tabled(rename = "Sat")]
    sat: String,
    #[tabled(rename = "Sun")]
    sun: String,
}

impl WeekRow {
    fn cell_mut(&mut self, weekday: u32) -> &mut String {
        match weekday {
            0 => &mut self.mon,
            1 => &mut self.tue,
            2 => &mut self.wed,
            3 => &mut self.thu,
            4 => &mut self.fri,
            5 => &mut self.sat,
            _ => &mut self.sun,
        }
    }
}

/// Lay the month out Monday-first, one row per week.
fn calendar_rows(days: &[CalendarDay]) -> Vec<WeekRow> {
    let mut rows = Vec::new();
    let mut week = WeekRow::default();
    for (i, day) in days.iter().enumerate() {
        let weekday = day.date.weekday().num_days_from_monday();
        if weekday == 0 && i > 0 {
            rows.push(std::mem::take(&mut week));
        }
        let symbol = day.status.symbol();
        *week.cell_mut(weekday) = if symbol.is_empty() {
            format!("{:>2}", day.date.day())
        } else {
            format!("{:>2} {symbol}", day.date.day())
        };
    }
    if !days.is_empty() {
        rows.push(week);
    }
    rows
}

pub(crate) fn cmd_calendar(tracker: &Tracker, month: Option<&str>, json: bool) -> Result<()> {
    let user = tracker.require_user()?;
    let (year, month) = parse_month(month)?;
    let days = tracker.calendar(&user, year, month, today())?;

    if json {
        return print_json(&days);
    }
    if let Some(first) = days.first() {
        println!("{}", first.date.format("%B %Y"));
    }
    let table = Table::new(calendar_rows(&days))
        .with(Style::rounded())
        .to_string();
    println!("{table}");
    println!("🔥 within goal   ⚠️ over goal   ❌ nothing logged");
    Ok(())
}
