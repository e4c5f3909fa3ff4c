use anyhow::Result;
use chrono::Local;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::engine::NutritionEngine;

use super::helpers::truncate;

pub(crate) fn cmd_history_show(engine: &NutritionEngine, days: u32, json: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let mut records = Vec::new();
    for i in 0..days {
        let date = (today - chrono::Duration::days(i64::from(i)))
            .format("%Y-%m-%d")
            .to_string();
        records.push((date.clone(), engine.daily_summary_record(&date)));
    }

    if json {
        let present: Vec<_> = records.iter().filter_map(|(_, r)| r.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&present)?);
        return Ok(());
    }

    if records.iter().all(|(_, r)| r.is_none()) {
        eprintln!("No records in the last {days} days");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Eaten kcal")]
        calories: String,
        #[tabled(rename = "Items")]
        items: String,
        #[tabled(rename = "Done")]
        pct: String,
        #[tabled(rename = "Complete")]
        complete: String,
    }

    let rows: Vec<DayRow> = records
        .iter()
        .map(|(date, record)| match record {
            Some(r) => {
                let cal = r.totals.calories;
                let consumed =
                    r.completion.consumed_food_count + r.completion.consumed_water_count;
                let total = consumed
                    + r.completion.planned_food_count
                    + r.completion.planned_water_count;
                let pct = r.completion.overall_completion_pct;
                DayRow {
                    date: date.clone(),
                    calories: format!("{cal:.0}"),
                    items: format!("{consumed}/{total}"),
                    pct: format!("{pct}%"),
                    complete: if r.is_completed { "yes".to_string() } else { String::new() },
                }
            }
            None => DayRow {
                date: date.clone(),
                calories: "-".to_string(),
                items: "-".to_string(),
                pct: "-".to_string(),
                complete: String::new(),
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_history_stats(engine: &NutritionEngine, json: bool) -> Result<()> {
    let stats = engine.history_stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let tracked = stats.days_tracked;
    let completed = stats.days_completed;
    let rate = stats.completion_rate_pct;
    let current = stats.current_streak;
    let longest = stats.longest_streak;
    let unlocked = stats.achievements_unlocked;
    println!("Days tracked:    {tracked} ({completed} completed, {rate}%)");
    println!("Current streak:  {current} days");
    println!("Longest streak:  {longest} days");
    println!("Achievements:    {unlocked} unlocked");
    if let Some(last) = &engine.streaks().last_completed_date {
        println!("Last completed:  {last}");
    }
    Ok(())
}

pub(crate) fn cmd_history_achievements(engine: &NutritionEngine, json: bool) -> Result<()> {
    let achievements = engine.achievements();
    if json {
        println!("{}", serde_json::to_string_pretty(achievements)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct AchievementRow {
        #[tabled(rename = "")]
        state: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "How")]
        description: String,
        #[tabled(rename = "Unlocked")]
        unlocked: String,
    }

    let rows: Vec<AchievementRow> = achievements
        .iter()
        .map(|a| AchievementRow {
            state: if a.is_unlocked() { "*".to_string() } else { String::new() },
            name: a.name.clone(),
            description: truncate(&a.description, 45),
            unlocked: a
                .unlocked_at
                .as_deref()
                .map(|ts| ts.get(..10).unwrap_or(ts).to_string())
                .unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
