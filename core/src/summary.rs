use crate::models::{
    CompletionStats, DailySummaryRecord, EntryStatus, FoodEntry, NutrientTotals, WaterEntry,
    completion_percentage, now_timestamp,
};
use crate::store::NutritionState;

/// Completion triggers slightly short of 100 to absorb rounding in the item
/// percentages.
pub const COMPLETION_THRESHOLD_PCT: u32 = 95;

/// Build the daily summary record for one date from the store snapshot.
///
/// Totals come from consumed entries only; planned entries contribute nothing
/// to totals but count toward the completion denominators. `previous` is the
/// record already in history for this date, if any; a day that was already
/// completed keeps its original completion timestamp.
#[must_use]
pub fn build_daily_summary_record(
    state: &NutritionState,
    date: &str,
    previous: Option<&DailySummaryRecord>,
) -> DailySummaryRecord {
    let entries: Vec<FoodEntry> = state
        .entries
        .iter()
        .filter(|e| e.date == date)
        .cloned()
        .collect();
    let water_entries: Vec<WaterEntry> = state
        .water_entries
        .iter()
        .filter(|e| e.date == date)
        .cloned()
        .collect();

    let (consumed_food_entries, planned_food_entries): (Vec<FoodEntry>, Vec<FoodEntry>) = entries
        .iter()
        .cloned()
        .partition(|e| e.status == EntryStatus::Consumed);
    let (consumed_water_entries, planned_water_entries): (Vec<WaterEntry>, Vec<WaterEntry>) =
        water_entries
            .iter()
            .cloned()
            .partition(|e| e.status == EntryStatus::Consumed);

    let totals = NutrientTotals {
        calories: consumed_food_entries.iter().map(|e| e.calories).sum(),
        protein: consumed_food_entries.iter().map(|e| e.protein).sum(),
        carbs: consumed_food_entries.iter().map(|e| e.carbs).sum(),
        fat: consumed_food_entries.iter().map(|e| e.fat).sum(),
        water: consumed_water_entries.iter().map(|e| e.amount_ml).sum(),
    };

    let completion = CompletionStats {
        planned_food_count: planned_food_entries.len(),
        consumed_food_count: consumed_food_entries.len(),
        planned_water_count: planned_water_entries.len(),
        consumed_water_count: consumed_water_entries.len(),
        food_completion_pct: completion_percentage(
            consumed_food_entries.len(),
            planned_food_entries.len(),
        ),
        water_completion_pct: completion_percentage(
            consumed_water_entries.len(),
            planned_water_entries.len(),
        ),
        overall_completion_pct: completion_percentage(
            consumed_food_entries.len() + consumed_water_entries.len(),
            planned_food_entries.len() + planned_water_entries.len(),
        ),
    };

    let is_completed = completion.overall_completion_pct >= COMPLETION_THRESHOLD_PCT;
    let completed_at = if is_completed {
        previous
            .and_then(|p| p.completed_at.clone())
            .or_else(|| Some(now_timestamp()))
    } else {
        None
    };

    DailySummaryRecord {
        date: date.to_string(),
        entries,
        water_entries,
        totals,
        goals: state.goals.clone(),
        planned_food_entries,
        consumed_food_entries,
        planned_water_entries,
        consumed_water_entries,
        completion,
        is_completed,
        completed_at,
    }
}
