use anyhow::Result;
use serde::Serialize;
use std::process;

use nosh_core::calc::StatusFilter;
use nosh_core::engine::NutritionEngine;
use nosh_core::models::{EntryStatus, MealType};

use super::helpers::{parse_date, short_id, status_mark};

pub(crate) fn cmd_day(
    engine: &mut NutritionEngine,
    date: Option<String>,
    meal: Option<&str>,
    status: &str,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let filter: StatusFilter = status.parse()?;
    // Visiting a date is what seeds it from its record or the active plan
    engine.set_selected_date(&date)?;

    if let Some(meal) = meal {
        let meal: MealType = meal.parse()?;
        let stats = engine.meal_planning_stats(meal, Some(&date));
        if json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }
        let planned = stats.planned_count;
        let consumed = stats.consumed_count;
        let pct = stats.completion_pct;
        let planned_cal = stats.planned_calories;
        let consumed_cal = stats.consumed_calories;
        println!("=== {date} / {meal} ===");
        println!("  items: {consumed} eaten, {planned} still planned ({pct}% done)");
        println!("  calories: {consumed_cal:.0} eaten, {planned_cal:.0} still planned");
        return Ok(());
    }

    let overview = engine.daily_planning_overview(Some(&date));
    let entries = engine.entries_by_status(filter, Some(&date));
    let water = engine.water_by_status(filter, Some(&date));

    if json {
        #[derive(Serialize)]
        struct DayView<'a> {
            overview: &'a nosh_core::calc::DailyPlanningOverview,
            entries: &'a [nosh_core::models::FoodEntry],
            water_entries: &'a [nosh_core::models::WaterEntry],
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&DayView {
                overview: &overview,
                entries: &entries,
                water_entries: &water,
            })?
        );
        return Ok(());
    }

    if entries.is_empty() && water.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    println!("=== {date} ===\n");

    for meal_stats in &overview.meals {
        let meal = meal_stats.meal;
        let meal_entries: Vec<_> = entries.iter().filter(|e| e.meal == meal).collect();
        if meal_entries.is_empty() {
            continue;
        }
        let meal_label = meal.as_str().to_uppercase();
        let pct = meal_stats.completion_pct;
        println!("  {meal_label} ({pct}% done)");
        for e in meal_entries {
            let mark = status_mark(e.status);
            let id = short_id(&e.id);
            let name = &e.name;
            let qty = e.quantity_g;
            let cal = e.calories;
            let protein = e.protein;
            let carbs = e.carbs;
            let fat = e.fat;
            println!(
                "    [{mark}] [{id}] {name} — {qty:.0}g — {cal:.0} kcal | P:{protein:.0}g C:{carbs:.0}g F:{fat:.0}g"
            );
        }
        println!();
    }

    if !water.is_empty() {
        let done_ml = overview.consumed_water_ml;
        let planned_ml = overview.planned_water_ml;
        println!("  WATER ({done_ml:.0} ml drunk, {planned_ml:.0} ml planned)");
        for e in &water {
            let mark = status_mark(e.status);
            let id = short_id(&e.id);
            let ml = e.amount_ml;
            let time = &e.time;
            println!("    [{mark}] [{id}] {ml:.0} ml at {time}");
        }
        println!();
    }

    let consumed: Vec<_> = entries
        .iter()
        .filter(|e| e.status == EntryStatus::Consumed)
        .collect();
    let total_cal: f64 = consumed.iter().map(|e| e.calories).sum();
    let total_p: f64 = consumed.iter().map(|e| e.protein).sum();
    let total_c: f64 = consumed.iter().map(|e| e.carbs).sum();
    let total_f: f64 = consumed.iter().map(|e| e.fat).sum();
    println!("  EATEN: {total_cal:.0} kcal | P:{total_p:.0}g C:{total_c:.0}g F:{total_f:.0}g");

    let goals = engine.goals();
    let gcal = goals.calories;
    let gp = goals.protein;
    let gc = goals.carbs;
    let gf = goals.fat;
    let gw = goals.water;
    println!("  GOAL:  {gcal:.0} kcal | P:{gp:.0}g C:{gc:.0}g F:{gf:.0}g | water {gw:.0} ml");
    let rcal = gcal - total_cal;
    let rw = gw - overview.consumed_water_ml;
    println!("  LEFT:  {rcal:.0} kcal | water {rw:.0} ml");

    let pct = overview.overall_completion_pct;
    println!("\n  DAY COMPLETION: {pct}%");

    Ok(())
}
