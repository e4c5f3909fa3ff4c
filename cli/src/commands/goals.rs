use anyhow::Result;

use nosh_core::engine::NutritionEngine;
use nosh_core::models::GoalsPatch;

pub(crate) fn cmd_goals_set(
    engine: &mut NutritionEngine,
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fat: Option<f64>,
    water: Option<f64>,
    json: bool,
) -> Result<()> {
    engine.update_daily_goals(GoalsPatch {
        calories,
        protein,
        carbs,
        fat,
        water,
    });
    cmd_goals_show(engine, json)
}

pub(crate) fn cmd_goals_show(engine: &NutritionEngine, json: bool) -> Result<()> {
    let goals = engine.goals();
    if json {
        println!("{}", serde_json::to_string_pretty(goals)?);
        return Ok(());
    }
    let cal = goals.calories;
    let p = goals.protein;
    let c = goals.carbs;
    let f = goals.fat;
    let w = goals.water;
    println!("Daily goals: {cal:.0} kcal | P:{p:.0}g C:{c:.0}g F:{f:.0}g | water {w:.0} ml");
    Ok(())
}
