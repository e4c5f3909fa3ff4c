use anyhow::Result;
use std::process;

use nosh_core::engine::NutritionEngine;
use nosh_core::models::NewFoodEntry;

use super::helpers::{parse_date, resolve_food_id, resolve_water_id, short_id};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log_food(
    engine: &mut NutritionEngine,
    name: &str,
    calories: f64,
    quantity: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    meal: &str,
    date: Option<String>,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    let meal = meal.parse()?;
    let date = Some(parse_date(date)?);
    let entry = engine.add_food_entry(NewFoodEntry {
        name: name.to_string(),
        quantity_g: quantity,
        calories,
        protein,
        carbs,
        fat,
        meal,
        date,
        time,
        micronutrients: None,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let id = short_id(&entry.id);
    let entry_date = &entry.date;
    let qty = entry.quantity_g;
    let cal = entry.calories;
    println!("Planned for {entry_date} [{id}]: {name} — {qty:.0}g — {cal:.0} kcal ({meal})");
    println!("Mark it eaten with: nosh log done {id}");
    Ok(())
}

pub(crate) fn cmd_log_water(
    engine: &mut NutritionEngine,
    amount: f64,
    date: Option<String>,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    let date = Some(parse_date(date)?);
    let entry = engine.add_water_entry(amount, date, time)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let id = short_id(&entry.id);
    let entry_date = &entry.date;
    let ml = entry.amount_ml;
    println!("Planned for {entry_date} [{id}]: {ml:.0} ml water");
    println!("Mark it drunk with: nosh log done --water {id}");
    Ok(())
}

pub(crate) fn cmd_remove(
    engine: &mut NutritionEngine,
    id: &str,
    water: bool,
    json: bool,
) -> Result<()> {
    let removed = if water {
        let id = resolve_water_id(engine, id)?;
        engine.remove_water_entry(&id)
    } else {
        let id = resolve_food_id(engine, id)?;
        engine.remove_food_entry(&id)
    };

    if json {
        println!("{{\"removed\":{removed}}}");
        return Ok(());
    }
    if removed {
        println!("Removed.");
    } else {
        eprintln!("Nothing to remove");
        process::exit(2);
    }
    Ok(())
}

pub(crate) fn cmd_mark(
    engine: &mut NutritionEngine,
    id: &str,
    water: bool,
    consumed: bool,
    json: bool,
) -> Result<()> {
    let changed = if water {
        let id = resolve_water_id(engine, id)?;
        if consumed {
            engine.mark_water_consumed(&id)
        } else {
            engine.mark_water_planned(&id)
        }
    } else {
        let id = resolve_food_id(engine, id)?;
        if consumed {
            engine.mark_food_consumed(&id)
        } else {
            engine.mark_food_planned(&id)
        }
    };

    if json {
        println!("{{\"updated\":{changed}}}");
        return Ok(());
    }
    if consumed {
        println!("Marked as consumed.");
    } else {
        println!("Back to planned.");
    }
    let date = engine.selected_date().to_string();
    let overview = engine.daily_planning_overview(Some(&date));
    let pct = overview.overall_completion_pct;
    println!("Day completion: {pct}%");
    Ok(())
}
