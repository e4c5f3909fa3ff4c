use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::history::{HistoryState, merged_achievements};
use crate::models::{
    Achievement, DailyGoals, DailySummaryRecord, FoodEntry, MealPlan, StreakData, WaterEntry,
    parse_date_key,
};
use crate::store::NutritionState;

/// Durable storage boundary: a string record per key. The engine only ever
/// needs load-by-key and save-by-key; quota failures surface as errors here
/// and are absorbed by the engine, never propagated further.
pub trait PersistenceAdapter {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, payload: &str) -> Result<()>;
}

/// Fixed key for the full engine snapshot; day records go under their date.
pub const HISTORY_KEY: &str = "history";

pub const STORAGE_VERSION: i64 = 1;

/// Rolling window for the reduced write when a full save fails.
pub const RETENTION_WINDOW_DAYS: i64 = 30;

/// The versioned persistence envelope: everything needed to reproduce the
/// entry store and the history map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredState {
    pub version: i64,
    #[serde(default)]
    pub entries: Vec<FoodEntry>,
    #[serde(default)]
    pub water_entries: Vec<WaterEntry>,
    #[serde(default)]
    pub goals: DailyGoals,
    #[serde(default)]
    pub daily_records: BTreeMap<String, DailySummaryRecord>,
    #[serde(default)]
    pub meal_plans: Vec<MealPlan>,
    #[serde(default)]
    pub active_meal_plan_id: Option<String>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default)]
    pub streaks: StreakData,
}

impl StoredState {
    #[must_use]
    pub fn assemble(state: &NutritionState, history: &HistoryState) -> Self {
        StoredState {
            version: STORAGE_VERSION,
            entries: state.entries.clone(),
            water_entries: state.water_entries.clone(),
            goals: state.goals.clone(),
            daily_records: history.daily_records.clone(),
            meal_plans: history.meal_plans.clone(),
            active_meal_plan_id: history.active_meal_plan_id.clone(),
            achievements: history.achievements.clone(),
            streaks: history.streaks.clone(),
        }
    }

    /// Rebuild the in-memory halves. Achievement unlocks are merged over the
    /// current catalogue; streaks come back as persisted (longest stays
    /// monotonic across loads).
    #[must_use]
    pub fn into_parts(self) -> (NutritionState, HistoryState) {
        let state = NutritionState {
            entries: self.entries,
            water_entries: self.water_entries,
            goals: self.goals,
            ..NutritionState::default()
        };
        let history = HistoryState {
            daily_records: self.daily_records,
            meal_plans: self.meal_plans,
            active_meal_plan_id: self.active_meal_plan_id,
            achievements: merged_achievements(&self.achievements),
            streaks: self.streaks,
        };
        (state, history)
    }
}

pub fn encode_stored_state(state: &NutritionState, history: &HistoryState) -> Result<String> {
    Ok(serde_json::to_string(&StoredState::assemble(state, history))?)
}

/// Decode a persisted envelope. Anything that does not parse as the envelope
/// shape (not an object, collections of the wrong kind, junk) is discarded and
/// the engine starts from empty defaults rather than crashing. Legacy entries
/// inside a valid envelope are repaired by serde defaults plus the store's
/// migration pass, not rejected.
#[must_use]
pub fn decode_stored_state(payload: &str) -> Option<StoredState> {
    match serde_json::from_str::<StoredState>(payload) {
        Ok(state) => Some(state),
        Err(err) => {
            warn!(%err, "discarding unreadable persisted state");
            None
        }
    }
}

/// Hex SHA-256 of a payload. Writes are content-addressed by this hash so a
/// mutation storm that settles on identical bytes costs one write.
#[must_use]
pub fn content_hash(payload: &str) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(payload.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Shrink a snapshot for a retry after a failed save: drop entries and day
/// records older than `keep_days` before `active_date`. `keep_days` 0 keeps
/// only the active date (the most aggressive fallback). Plans, achievements
/// and streaks are small and always kept.
#[must_use]
pub fn reduce_to_window(stored: &StoredState, keep_days: i64, active_date: &str) -> StoredState {
    let Ok(active) = parse_date_key(active_date) else {
        return stored.clone();
    };
    let cutoff = active - chrono::Duration::days(keep_days);
    let keep = |date: &str| parse_date_key(date).is_ok_and(|d| d >= cutoff);

    let mut reduced = stored.clone();
    reduced.entries.retain(|e| keep(&e.date));
    reduced.water_entries.retain(|e| keep(&e.date));
    reduced.daily_records.retain(|date, _| keep(date));
    reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealType, NewFoodEntry};
    use crate::store::{Action, reduce};

    fn populated_state() -> (NutritionState, HistoryState) {
        let mut state = NutritionState {
            selected_date: "2024-03-01".to_string(),
            ..NutritionState::default()
        };
        reduce(
            &mut state,
            Action::AddFoodEntry(NewFoodEntry {
                name: "Oats".to_string(),
                quantity_g: 60.0,
                calories: 228.0,
                protein: 8.0,
                carbs: 40.0,
                fat: 4.0,
                meal: MealType::Breakfast,
                date: None,
                time: None,
                micronutrients: None,
            }),
        );
        let mut history = HistoryState::default();
        let record = crate::summary::build_daily_summary_record(&state, "2024-03-01", None);
        history.update_daily_summary_record(record);
        (state, history)
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let (state, history) = populated_state();
        let payload = encode_stored_state(&state, &history).unwrap();
        let decoded = decode_stored_state(&payload).unwrap();
        let (state2, history2) = decoded.into_parts();
        assert_eq!(state2.entries, state.entries);
        assert_eq!(state2.goals, state.goals);
        assert_eq!(history2.daily_records, history.daily_records);
        assert_eq!(history2.streaks, history.streaks);
    }

    #[test]
    fn test_decode_rejects_malformed_payload() {
        assert!(decode_stored_state("not json").is_none());
        assert!(decode_stored_state("[1,2,3]").is_none());
        assert!(decode_stored_state("{\"version\":1,\"entries\":{}}").is_none());
    }

    #[test]
    fn test_decode_tolerates_missing_collections() {
        let decoded = decode_stored_state("{\"version\":1}").unwrap();
        assert!(decoded.entries.is_empty());
        assert!(decoded.daily_records.is_empty());
        let (state, history) = decoded.into_parts();
        assert!(state.entries.is_empty());
        // Achievement catalogue is restored even when absent from the payload
        assert_eq!(
            history.achievements.len(),
            crate::history::default_achievements().len()
        );
    }

    #[test]
    fn test_decode_repairs_legacy_entries() {
        // Entries missing status/planned_at parse as consumed legacy entries
        let payload = r#"{
            "version": 1,
            "entries": [{
                "id": "old-1", "name": "Toast", "quantity_g": 40.0,
                "calories": 106.0, "protein": 3.6, "carbs": 19.0, "fat": 1.3,
                "meal": "breakfast", "date": "2023-11-02", "time": "07:45"
            }]
        }"#;
        let decoded = decode_stored_state(payload).unwrap();
        assert_eq!(
            decoded.entries[0].status,
            crate::models::EntryStatus::Consumed
        );
    }

    #[test]
    fn test_content_hash_stability() {
        let a = content_hash("hello");
        let b = content_hash("hello");
        let c = content_hash("hello ");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_reduce_to_window_drops_old_days() {
        let (mut state, mut history) = populated_state();
        // An old day far outside any window
        reduce(
            &mut state,
            Action::AddFoodEntry(NewFoodEntry {
                name: "Ancient".to_string(),
                quantity_g: 100.0,
                calories: 100.0,
                protein: 0.0,
                carbs: 0.0,
                fat: 0.0,
                meal: MealType::Snack,
                date: Some("2023-01-01".to_string()),
                time: None,
                micronutrients: None,
            }),
        );
        let old_record = crate::summary::build_daily_summary_record(&state, "2023-01-01", None);
        history.update_daily_summary_record(old_record);

        let stored = StoredState::assemble(&state, &history);
        let reduced = reduce_to_window(&stored, RETENTION_WINDOW_DAYS, "2024-03-01");
        assert!(reduced.entries.iter().all(|e| e.date != "2023-01-01"));
        assert!(!reduced.daily_records.contains_key("2023-01-01"));
        assert!(reduced.daily_records.contains_key("2024-03-01"));
        // Achievements and streaks survive every reduction
        assert_eq!(reduced.achievements.len(), stored.achievements.len());
        assert_eq!(reduced.streaks, stored.streaks);
    }

    #[test]
    fn test_reduce_to_window_zero_keeps_active_date_only() {
        let (state, history) = populated_state();
        let stored = StoredState::assemble(&state, &history);
        let reduced = reduce_to_window(&stored, 0, "2024-03-01");
        assert_eq!(reduced.entries.len(), 1);

        let reduced_elsewhere = reduce_to_window(&stored, 0, "2024-04-01");
        assert!(reduced_elsewhere.entries.is_empty());
    }
}
