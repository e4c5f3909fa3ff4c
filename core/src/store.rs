use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    DailyGoals, EntryStatus, FoodEntry, GoalsPatch, NewFoodEntry, WaterEntry, now_timestamp,
    today_string,
};

/// The canonical in-memory nutrition state. Entries for every date live side
/// by side; `selected_date` is only a pointer, switching it never deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionState {
    #[serde(default)]
    pub entries: Vec<FoodEntry>,
    #[serde(default)]
    pub water_entries: Vec<WaterEntry>,
    pub goals: DailyGoals,
    pub selected_date: String,
}

impl Default for NutritionState {
    fn default() -> Self {
        NutritionState {
            entries: Vec::new(),
            water_entries: Vec::new(),
            goals: DailyGoals::default(),
            selected_date: today_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    AddFoodEntry(NewFoodEntry),
    RemoveFoodEntry {
        id: String,
    },
    AddWaterEntry {
        amount_ml: f64,
        date: Option<String>,
        time: Option<String>,
    },
    RemoveWaterEntry {
        id: String,
    },
    UpdateDailyGoals(GoalsPatch),
    SetSelectedDate {
        date: String,
    },
    MarkFoodConsumed {
        id: String,
    },
    MarkFoodPlanned {
        id: String,
    },
    MarkWaterConsumed {
        id: String,
    },
    MarkWaterPlanned {
        id: String,
    },
    /// One-time normalization for entries hydrated from legacy payloads.
    MigrateExistingData,
    /// Wholesale replacement, used when hydrating from persistence.
    LoadNutritionData {
        entries: Vec<FoodEntry>,
        water_entries: Vec<WaterEntry>,
        goals: DailyGoals,
    },
}

/// Apply one action. Transitions are synchronous, side-effect-free and total:
/// unknown ids are no-ops, nothing here can fail.
pub fn reduce(state: &mut NutritionState, action: Action) {
    match action {
        Action::AddFoodEntry(new) => {
            let entry = FoodEntry::from_new(new, &state.selected_date);
            debug!(id = %entry.id, date = %entry.date, meal = %entry.meal, "add food entry");
            state.entries.push(entry);
        }
        Action::RemoveFoodEntry { id } => {
            state.entries.retain(|e| e.id != id);
        }
        Action::AddWaterEntry {
            amount_ml,
            date,
            time,
        } => {
            let date = date.unwrap_or_else(|| state.selected_date.clone());
            let entry = WaterEntry::new_planned(amount_ml, date, time);
            debug!(id = %entry.id, date = %entry.date, amount_ml, "add water entry");
            state.water_entries.push(entry);
        }
        Action::RemoveWaterEntry { id } => {
            state.water_entries.retain(|e| e.id != id);
        }
        Action::UpdateDailyGoals(patch) => {
            state.goals.apply(&patch);
        }
        Action::SetSelectedDate { date } => {
            state.selected_date = date;
        }
        Action::MarkFoodConsumed { id } => {
            if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
                if entry.status != EntryStatus::Consumed {
                    entry.status = EntryStatus::Consumed;
                    entry.consumed_at = Some(now_timestamp());
                }
            }
        }
        Action::MarkFoodPlanned { id } => {
            if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
                if entry.status != EntryStatus::Planned {
                    entry.status = EntryStatus::Planned;
                    entry.consumed_at = None;
                }
            }
        }
        Action::MarkWaterConsumed { id } => {
            if let Some(entry) = state.water_entries.iter_mut().find(|e| e.id == id) {
                if entry.status != EntryStatus::Consumed {
                    entry.status = EntryStatus::Consumed;
                    entry.consumed_at = Some(now_timestamp());
                }
            }
        }
        Action::MarkWaterPlanned { id } => {
            if let Some(entry) = state.water_entries.iter_mut().find(|e| e.id == id) {
                if entry.status != EntryStatus::Planned {
                    entry.status = EntryStatus::Planned;
                    entry.consumed_at = None;
                }
            }
        }
        Action::MigrateExistingData => {
            migrate_existing_data(state);
        }
        Action::LoadNutritionData {
            entries,
            water_entries,
            goals,
        } => {
            debug!(
                entries = entries.len(),
                water = water_entries.len(),
                "load nutrition data"
            );
            state.entries = entries;
            state.water_entries = water_entries;
            state.goals = goals;
        }
    }
}

/// Back-fill fields that predate the planned/consumed split. `planned_at`
/// falls back to the entry's display time, then to now; a consumed entry
/// without `consumed_at` gets one so the status invariant holds. Idempotent.
fn migrate_existing_data(state: &mut NutritionState) {
    let now = now_timestamp();
    for entry in &mut state.entries {
        if entry.planned_at.is_empty() {
            entry.planned_at = if entry.time.is_empty() {
                now.clone()
            } else {
                entry.time.clone()
            };
        }
        match entry.status {
            EntryStatus::Consumed if entry.consumed_at.is_none() => {
                entry.consumed_at = Some(entry.planned_at.clone());
            }
            EntryStatus::Planned if entry.consumed_at.is_some() => {
                entry.consumed_at = None;
            }
            _ => {}
        }
    }
    for entry in &mut state.water_entries {
        if entry.planned_at.is_empty() {
            entry.planned_at = if entry.time.is_empty() {
                now.clone()
            } else {
                entry.time.clone()
            };
        }
        match entry.status {
            EntryStatus::Consumed if entry.consumed_at.is_none() => {
                entry.consumed_at = Some(entry.planned_at.clone());
            }
            EntryStatus::Planned if entry.consumed_at.is_some() => {
                entry.consumed_at = None;
            }
            _ => {}
        }
    }
}
