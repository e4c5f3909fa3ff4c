use std::str::FromStr;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::models::{
    EntryStatus, FoodEntry, MEAL_TYPES, MealType, WaterEntry, completion_percentage,
};
use crate::store::NutritionState;

/// Status filter for entry views. `All` returns the full date partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Planned,
    Consumed,
}

impl StatusFilter {
    fn matches(self, status: EntryStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Planned => status == EntryStatus::Planned,
            StatusFilter::Consumed => status == EntryStatus::Consumed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "planned" => Ok(StatusFilter::Planned),
            "consumed" => Ok(StatusFilter::Consumed),
            _ => bail!("Invalid status '{s}'. Must be one of: all, planned, consumed"),
        }
    }
}

/// Food entries for a date (default: the selected date), filtered by status.
#[must_use]
pub fn entries_by_status(
    state: &NutritionState,
    filter: StatusFilter,
    date: Option<&str>,
) -> Vec<FoodEntry> {
    let date = date.unwrap_or(&state.selected_date);
    state
        .entries
        .iter()
        .filter(|e| e.date == date && filter.matches(e.status))
        .cloned()
        .collect()
}

/// Water entries for a date (default: the selected date), filtered by status.
#[must_use]
pub fn water_by_status(
    state: &NutritionState,
    filter: StatusFilter,
    date: Option<&str>,
) -> Vec<WaterEntry> {
    let date = date.unwrap_or(&state.selected_date);
    state
        .water_entries
        .iter()
        .filter(|e| e.date == date && filter.matches(e.status))
        .cloned()
        .collect()
}

/// Planning numbers for one meal of one day.
#[derive(Debug, Clone, Serialize)]
pub struct MealPlanningStats {
    pub meal: MealType,
    pub planned_count: usize,
    pub consumed_count: usize,
    pub planned_calories: f64,
    pub consumed_calories: f64,
    pub completion_pct: u32,
}

#[must_use]
pub fn meal_planning_stats(
    state: &NutritionState,
    meal: MealType,
    date: Option<&str>,
) -> MealPlanningStats {
    let date = date.unwrap_or(&state.selected_date);
    let mut planned_count = 0;
    let mut consumed_count = 0;
    let mut planned_calories = 0.0;
    let mut consumed_calories = 0.0;

    for entry in state.entries.iter().filter(|e| e.date == date && e.meal == meal) {
        match entry.status {
            EntryStatus::Planned => {
                planned_count += 1;
                planned_calories += entry.calories;
            }
            EntryStatus::Consumed => {
                consumed_count += 1;
                consumed_calories += entry.calories;
            }
        }
    }

    MealPlanningStats {
        meal,
        planned_count,
        consumed_count,
        planned_calories,
        consumed_calories,
        completion_pct: completion_percentage(consumed_count, planned_count),
    }
}

/// The whole day at a glance: per-meal rows, water, and the overall item-count
/// completion percentage. Each logged item weighs the same here, so one
/// missed snack cannot visually outweigh a large finished meal.
#[derive(Debug, Clone, Serialize)]
pub struct DailyPlanningOverview {
    pub date: String,
    pub meals: Vec<MealPlanningStats>,
    pub planned_food_count: usize,
    pub consumed_food_count: usize,
    pub planned_calories: f64,
    pub consumed_calories: f64,
    pub planned_water_count: usize,
    pub consumed_water_count: usize,
    pub planned_water_ml: f64,
    pub consumed_water_ml: f64,
    pub overall_completion_pct: u32,
}

#[must_use]
pub fn daily_planning_overview(state: &NutritionState, date: Option<&str>) -> DailyPlanningOverview {
    let date = date.unwrap_or(&state.selected_date).to_string();
    let meals: Vec<MealPlanningStats> = MEAL_TYPES
        .iter()
        .map(|meal| meal_planning_stats(state, *meal, Some(&date)))
        .collect();

    let planned_food_count: usize = meals.iter().map(|m| m.planned_count).sum();
    let consumed_food_count: usize = meals.iter().map(|m| m.consumed_count).sum();
    let planned_calories: f64 = meals.iter().map(|m| m.planned_calories).sum();
    let consumed_calories: f64 = meals.iter().map(|m| m.consumed_calories).sum();

    let mut planned_water_count = 0;
    let mut consumed_water_count = 0;
    let mut planned_water_ml = 0.0;
    let mut consumed_water_ml = 0.0;
    for entry in state.water_entries.iter().filter(|e| e.date == date) {
        match entry.status {
            EntryStatus::Planned => {
                planned_water_count += 1;
                planned_water_ml += entry.amount_ml;
            }
            EntryStatus::Consumed => {
                consumed_water_count += 1;
                consumed_water_ml += entry.amount_ml;
            }
        }
    }

    let overall_completion_pct = completion_percentage(
        consumed_food_count + consumed_water_count,
        planned_food_count + planned_water_count,
    );

    DailyPlanningOverview {
        date,
        meals,
        planned_food_count,
        consumed_food_count,
        planned_calories,
        consumed_calories,
        planned_water_count,
        consumed_water_count,
        planned_water_ml,
        consumed_water_ml,
        overall_completion_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewFoodEntry;
    use crate::store::{Action, reduce};

    fn add_food(state: &mut NutritionState, name: &str, meal: MealType, calories: f64) -> String {
        reduce(
            state,
            Action::AddFoodEntry(NewFoodEntry {
                name: name.to_string(),
                quantity_g: 100.0,
                calories,
                protein: 10.0,
                carbs: 20.0,
                fat: 5.0,
                meal,
                date: None,
                time: None,
                micronutrients: None,
            }),
        );
        state.entries.last().unwrap().id.clone()
    }

    fn state_at(date: &str) -> NutritionState {
        NutritionState {
            selected_date: date.to_string(),
            ..NutritionState::default()
        }
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
        assert_eq!(
            "Planned".parse::<StatusFilter>().unwrap(),
            StatusFilter::Planned
        );
        assert!("eaten".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_entries_by_status_defaults_to_selected_date() {
        let mut state = state_at("2024-03-01");
        add_food(&mut state, "A", MealType::Lunch, 100.0);
        reduce(
            &mut state,
            Action::SetSelectedDate {
                date: "2024-03-02".to_string(),
            },
        );
        add_food(&mut state, "B", MealType::Lunch, 100.0);

        let visible = entries_by_status(&state, StatusFilter::All, None);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "B");

        let other = entries_by_status(&state, StatusFilter::All, Some("2024-03-01"));
        assert_eq!(other.len(), 1);
        assert_eq!(other[0].name, "A");
    }

    #[test]
    fn test_entries_by_status_filters() {
        let mut state = state_at("2024-03-01");
        let id = add_food(&mut state, "A", MealType::Lunch, 100.0);
        add_food(&mut state, "B", MealType::Lunch, 100.0);
        reduce(&mut state, Action::MarkFoodConsumed { id });

        assert_eq!(entries_by_status(&state, StatusFilter::All, None).len(), 2);
        assert_eq!(
            entries_by_status(&state, StatusFilter::Planned, None).len(),
            1
        );
        let consumed = entries_by_status(&state, StatusFilter::Consumed, None);
        assert_eq!(consumed.len(), 1);
        assert_eq!(consumed[0].name, "A");
    }

    #[test]
    fn test_meal_planning_stats_formula() {
        let mut state = state_at("2024-03-01");
        // 3 planned + 2 consumed at lunch
        let a = add_food(&mut state, "A", MealType::Lunch, 100.0);
        let b = add_food(&mut state, "B", MealType::Lunch, 150.0);
        add_food(&mut state, "C", MealType::Lunch, 200.0);
        add_food(&mut state, "D", MealType::Lunch, 250.0);
        add_food(&mut state, "E", MealType::Lunch, 300.0);
        reduce(&mut state, Action::MarkFoodConsumed { id: a });
        reduce(&mut state, Action::MarkFoodConsumed { id: b });

        let stats = meal_planning_stats(&state, MealType::Lunch, None);
        assert_eq!(stats.planned_count, 3);
        assert_eq!(stats.consumed_count, 2);
        assert!((stats.consumed_calories - 250.0).abs() < 0.01);
        assert!((stats.planned_calories - 750.0).abs() < 0.01);
        assert_eq!(stats.completion_pct, 40);
    }

    #[test]
    fn test_meal_planning_stats_empty_meal() {
        let state = state_at("2024-03-01");
        let stats = meal_planning_stats(&state, MealType::Breakfast, None);
        assert_eq!(stats.planned_count, 0);
        assert_eq!(stats.consumed_count, 0);
        assert_eq!(stats.completion_pct, 0);
    }

    #[test]
    fn test_overview_two_of_five_items_is_forty() {
        // 3 planned + 2 consumed food, no water: overall must be 40
        let mut state = state_at("2024-03-01");
        let a = add_food(&mut state, "A", MealType::Breakfast, 100.0);
        let b = add_food(&mut state, "B", MealType::Lunch, 100.0);
        add_food(&mut state, "C", MealType::Lunch, 100.0);
        add_food(&mut state, "D", MealType::Dinner, 100.0);
        add_food(&mut state, "E", MealType::Snack, 100.0);
        reduce(&mut state, Action::MarkFoodConsumed { id: a });
        reduce(&mut state, Action::MarkFoodConsumed { id: b });

        let overview = daily_planning_overview(&state, None);
        assert_eq!(overview.planned_food_count, 3);
        assert_eq!(overview.consumed_food_count, 2);
        assert_eq!(overview.overall_completion_pct, 40);
    }

    #[test]
    fn test_overview_counts_water_items_equally() {
        let mut state = state_at("2024-03-01");
        let a = add_food(&mut state, "A", MealType::Lunch, 900.0);
        reduce(&mut state, Action::MarkFoodConsumed { id: a });
        reduce(
            &mut state,
            Action::AddWaterEntry {
                amount_ml: 250.0,
                date: None,
                time: None,
            },
        );

        let overview = daily_planning_overview(&state, None);
        // 1 consumed of 2 items overall, regardless of calorie size
        assert_eq!(overview.overall_completion_pct, 50);
        assert_eq!(overview.planned_water_count, 1);
        assert!((overview.planned_water_ml - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overview_empty_day_is_zero() {
        let state = state_at("2024-03-01");
        let overview = daily_planning_overview(&state, None);
        assert_eq!(overview.overall_completion_pct, 0);
        assert_eq!(overview.meals.len(), 4);
    }

    #[test]
    fn test_views_are_rederivable() {
        let mut state = state_at("2024-03-01");
        let id = add_food(&mut state, "A", MealType::Lunch, 100.0);
        let first = daily_planning_overview(&state, None);
        let second = daily_planning_overview(&state, None);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        reduce(&mut state, Action::MarkFoodConsumed { id });
        let third = daily_planning_overview(&state, None);
        assert_eq!(third.overall_completion_pct, 100);
    }
}
