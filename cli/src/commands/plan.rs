use anyhow::Result;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nosh_core::engine::NutritionEngine;
use nosh_core::models::{DailyGoals, FoodTemplate, NewMealPlan, WaterTemplate};

use super::helpers::{resolve_plan, short_id, truncate};

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_plan_create(
    engine: &mut NutritionEngine,
    name: &str,
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fat: Option<f64>,
    water: Option<f64>,
    json: bool,
) -> Result<()> {
    let daily_goals = if [calories, protein, carbs, fat, water]
        .iter()
        .any(Option::is_some)
    {
        let mut goals = DailyGoals::default();
        goals.apply(&nosh_core::models::GoalsPatch {
            calories,
            protein,
            carbs,
            fat,
            water,
        });
        Some(goals)
    } else {
        None
    };

    let plan = engine.create_meal_plan(NewMealPlan {
        name: name.to_string(),
        daily_goals,
        food_templates: Vec::new(),
        water_templates: Vec::new(),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    let id = short_id(&plan.id);
    println!("Created plan '{name}' [{id}]");
    if plan.is_active {
        println!("It is now the active plan; never-visited days will start from it.");
    } else {
        println!("Activate it with: nosh plan activate '{name}'");
    }
    Ok(())
}

pub(crate) fn cmd_plan_list(engine: &NutritionEngine, json: bool) -> Result<()> {
    let plans = engine.meal_plans();

    if json {
        println!("{}", serde_json::to_string_pretty(plans)?);
        return Ok(());
    }

    if plans.is_empty() {
        eprintln!("No meal plans yet. Create one with: nosh plan create <name>");
        process::exit(2);
    }

    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "Active")]
        active: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Id")]
        id: String,
        #[tabled(rename = "Foods")]
        foods: usize,
        #[tabled(rename = "Water")]
        water: usize,
        #[tabled(rename = "Goal kcal")]
        calories: String,
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            active: if p.is_active { "*".to_string() } else { String::new() },
            name: truncate(&p.name, 30),
            id: short_id(&p.id).to_string(),
            foods: p.food_templates.len(),
            water: p.water_templates.len(),
            calories: {
                let cal = p.daily_goals.calories;
                format!("{cal:.0}")
            },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_plan_show(
    engine: &NutritionEngine,
    plan: Option<&str>,
    json: bool,
) -> Result<()> {
    let plan = match plan {
        Some(needle) => resolve_plan(engine, needle)?,
        None => match engine.active_meal_plan() {
            Some(p) => p.clone(),
            None => {
                eprintln!("No active meal plan");
                process::exit(2);
            }
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let name = &plan.name;
    let active = if plan.is_active { " (active)" } else { "" };
    println!("=== {name}{active} ===\n");

    let goals = &plan.daily_goals;
    let cal = goals.calories;
    let p = goals.protein;
    let c = goals.carbs;
    let f = goals.fat;
    let w = goals.water;
    println!("  GOALS: {cal:.0} kcal | P:{p:.0}g C:{c:.0}g F:{f:.0}g | water {w:.0} ml\n");

    if plan.food_templates.is_empty() && plan.water_templates.is_empty() {
        println!("  (no templates yet — add with: nosh plan add-food '{name}' <food> --calories <kcal>)");
        return Ok(());
    }

    for t in &plan.food_templates {
        let meal = t.meal;
        let tname = &t.name;
        let qty = t.quantity_g;
        let tcal = t.calories;
        let time = t.time.as_deref().unwrap_or("-");
        println!("  {meal}: {tname} — {qty:.0}g — {tcal:.0} kcal (at {time})");
    }
    for t in &plan.water_templates {
        let ml = t.amount_ml;
        let time = t.time.as_deref().unwrap_or("-");
        println!("  water: {ml:.0} ml (at {time})");
    }
    Ok(())
}

pub(crate) fn cmd_plan_activate(
    engine: &mut NutritionEngine,
    needle: &str,
    json: bool,
) -> Result<()> {
    let plan = resolve_plan(engine, needle)?;
    engine.set_active_meal_plan(&plan.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&engine.active_meal_plan())?);
        return Ok(());
    }
    let name = &plan.name;
    println!("'{name}' is now the active plan.");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_plan_add_food(
    engine: &mut NutritionEngine,
    needle: &str,
    name: &str,
    calories: f64,
    quantity: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    meal: &str,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    let plan = resolve_plan(engine, needle)?;
    let meal = meal.parse()?;
    engine.add_food_to_meal_plan(
        &plan.id,
        FoodTemplate {
            name: name.to_string(),
            quantity_g: quantity,
            calories,
            protein,
            carbs,
            fat,
            meal,
            time,
            micronutrients: None,
        },
    )?;

    if json {
        let updated = resolve_plan(engine, &plan.id)?;
        println!("{}", serde_json::to_string_pretty(&updated)?);
        return Ok(());
    }
    let plan_name = &plan.name;
    println!("Added {name} ({meal}) to '{plan_name}'. Future untouched days will include it.");
    Ok(())
}

pub(crate) fn cmd_plan_remove_food(
    engine: &mut NutritionEngine,
    needle: &str,
    name: &str,
    meal: &str,
    json: bool,
) -> Result<()> {
    let plan = resolve_plan(engine, needle)?;
    let meal = meal.parse()?;
    let removed = engine.remove_food_from_meal_plan(&plan.id, name, meal)?;

    if json {
        println!("{{\"removed\":{removed}}}");
        return Ok(());
    }
    if removed {
        let plan_name = &plan.name;
        println!("Removed {name} ({meal}) from '{plan_name}'.");
    } else {
        eprintln!("No template '{name}' at {meal} in that plan");
        process::exit(2);
    }
    Ok(())
}

pub(crate) fn cmd_plan_add_water(
    engine: &mut NutritionEngine,
    needle: &str,
    amount: f64,
    time: Option<String>,
    json: bool,
) -> Result<()> {
    let plan = resolve_plan(engine, needle)?;
    engine.add_water_to_meal_plan(
        &plan.id,
        WaterTemplate {
            amount_ml: amount,
            time,
        },
    )?;

    if json {
        let updated = resolve_plan(engine, &plan.id)?;
        println!("{}", serde_json::to_string_pretty(&updated)?);
        return Ok(());
    }
    let plan_name = &plan.name;
    println!("Added {amount:.0} ml water to '{plan_name}'.");
    Ok(())
}
