use tracing::debug;

use crate::models::{
    DailyGoals, DailySummaryRecord, EntryStatus, FoodEntry, MealPlan, WaterEntry, now_time_string,
    now_timestamp,
};
use uuid::Uuid;

/// What a freshly visited date starts with.
#[derive(Debug, Clone, Default)]
pub struct DaySeed {
    pub entries: Vec<FoodEntry>,
    pub water_entries: Vec<WaterEntry>,
    pub goals: Option<DailyGoals>,
}

impl DaySeed {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.water_entries.is_empty() && self.goals.is_none()
    }
}

/// Seed a date that has no entries in the store yet.
///
/// A persisted record wins over the active plan's templates: its existence,
/// not its non-emptiness, signals the user has already shaped that day. A day
/// the user cleared out must stay cleared on revisit. Only a never-visited
/// date expands the active plan into fresh planned entries.
#[must_use]
pub fn materialize_day(
    date: &str,
    record: Option<&DailySummaryRecord>,
    active_plan: Option<&MealPlan>,
) -> DaySeed {
    if let Some(record) = record {
        debug!(date, entries = record.entries.len(), "seeding date from record");
        return DaySeed {
            entries: record.entries.clone(),
            water_entries: record.water_entries.clone(),
            goals: Some(record.goals.clone()),
        };
    }

    if let Some(plan) = active_plan {
        let now = now_timestamp();
        let entries: Vec<FoodEntry> = plan
            .food_templates
            .iter()
            .map(|t| FoodEntry {
                id: Uuid::new_v4().to_string(),
                name: t.name.clone(),
                quantity_g: t.quantity_g,
                calories: t.calories,
                protein: t.protein,
                carbs: t.carbs,
                fat: t.fat,
                meal: t.meal,
                date: date.to_string(),
                time: t.time.clone().unwrap_or_else(now_time_string),
                status: EntryStatus::Planned,
                planned_at: now.clone(),
                consumed_at: None,
                micronutrients: t.micronutrients.clone(),
            })
            .collect();
        let water_entries: Vec<WaterEntry> = plan
            .water_templates
            .iter()
            .map(|t| WaterEntry {
                id: Uuid::new_v4().to_string(),
                amount_ml: t.amount_ml,
                date: date.to_string(),
                time: t.time.clone().unwrap_or_else(now_time_string),
                status: EntryStatus::Planned,
                planned_at: now.clone(),
                consumed_at: None,
            })
            .collect();
        debug!(
            date,
            plan = %plan.name,
            food = entries.len(),
            water = water_entries.len(),
            "materialized meal plan templates"
        );
        return DaySeed {
            entries,
            water_entries,
            goals: Some(plan.daily_goals.clone()),
        };
    }

    DaySeed::default()
}
