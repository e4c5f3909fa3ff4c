use std::fmt;
use std::sync::mpsc::{Receiver, Sender, channel};

use anyhow::Result;
use chrono::{DateTime, Local, LocalResult, NaiveTime};
use tracing::{info, warn};

use crate::calc::{
    DailyPlanningOverview, MealPlanningStats, StatusFilter, daily_planning_overview,
    entries_by_status, meal_planning_stats, water_by_status,
};
use crate::history::{HistoryState, HistoryStats};
use crate::materialize::materialize_day;
use crate::models::{
    Achievement, DailyGoals, DailySummaryRecord, FoodEntry, FoodTemplate, GoalsPatch, MealPlan,
    MealType, NewFoodEntry, NewMealPlan, StreakData, WaterEntry, WaterTemplate, today_string,
    validate_amount, validate_date, validate_new_food_entry,
};
use crate::persist::{
    HISTORY_KEY, PersistenceAdapter, RETENTION_WINDOW_DAYS, StoredState, content_hash,
    decode_stored_state, encode_stored_state, reduce_to_window,
};
use crate::store::{Action, NutritionState, reduce};
use crate::summary::build_daily_summary_record;

/// Broadcast to subscribers after the corresponding state change has been
/// applied. Persistence warnings are non-fatal by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    DateRolledOver { from: String, to: String },
    RecordWritten { date: String },
    AchievementUnlocked { id: String },
    GoalsUpdated,
    PersistenceWarning { message: String },
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::DateRolledOver { from, to } => write!(f, "date rolled over {from} -> {to}"),
            EngineEvent::RecordWritten { date } => write!(f, "daily record updated for {date}"),
            EngineEvent::AchievementUnlocked { id } => write!(f, "achievement unlocked: {id}"),
            EngineEvent::GoalsUpdated => write!(f, "daily goals updated"),
            EngineEvent::PersistenceWarning { message } => write!(f, "persistence warning: {message}"),
        }
    }
}

/// The engine facade: one logical owner processing one action to completion
/// before the next. Every mutation runs through the reducer, then the daily
/// aggregator, then history, then debounced persistence; reads are always
/// derived from the live snapshot.
pub struct NutritionEngine {
    state: NutritionState,
    history: HistoryState,
    adapter: Box<dyn PersistenceAdapter>,
    last_history_hash: Option<String>,
    subscribers: Vec<Sender<EngineEvent>>,
}

impl NutritionEngine {
    /// Load persisted state (repairing or discarding what cannot be read),
    /// select today, and seed it from its record or the active plan.
    pub fn new(adapter: Box<dyn PersistenceAdapter>) -> Result<Self> {
        let mut engine = NutritionEngine {
            state: NutritionState::default(),
            history: HistoryState::default(),
            adapter,
            last_history_hash: None,
            subscribers: Vec::new(),
        };
        engine.hydrate();
        let today = engine.state.selected_date.clone();
        engine.seed_day(&today);
        engine.persist_history();
        Ok(engine)
    }

    fn hydrate(&mut self) {
        let stored = match self.adapter.load(HISTORY_KEY) {
            Ok(Some(payload)) => decode_stored_state(&payload),
            Ok(None) => None,
            Err(err) => {
                warn!(%err, "failed to load persisted state; starting empty");
                None
            }
        };
        let Some(stored) = stored else {
            return;
        };
        let (state, history) = stored.into_parts();
        reduce(
            &mut self.state,
            Action::LoadNutritionData {
                entries: state.entries,
                water_entries: state.water_entries,
                goals: state.goals,
            },
        );
        reduce(&mut self.state, Action::MigrateExistingData);
        self.history = history;
        if let Ok(payload) = encode_stored_state(&self.state, &self.history) {
            self.last_history_hash = Some(content_hash(&payload));
        }
    }

    // --- Entry operations ---

    pub fn add_food_entry(&mut self, new: NewFoodEntry) -> Result<FoodEntry> {
        validate_new_food_entry(&new)?;
        reduce(&mut self.state, Action::AddFoodEntry(new));
        let entry = self
            .state
            .entries
            .last()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("entry was not appended"))?;
        self.refresh_record(&entry.date);
        self.persist_history();
        Ok(entry)
    }

    /// Removing an unknown id is a no-op; returns whether anything was removed.
    pub fn remove_food_entry(&mut self, id: &str) -> bool {
        let Some(date) = self
            .state
            .entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.date.clone())
        else {
            return false;
        };
        reduce(
            &mut self.state,
            Action::RemoveFoodEntry { id: id.to_string() },
        );
        self.refresh_record(&date);
        self.persist_history();
        true
    }

    pub fn add_water_entry(
        &mut self,
        amount_ml: f64,
        date: Option<String>,
        time: Option<String>,
    ) -> Result<WaterEntry> {
        validate_amount(amount_ml)?;
        let date = match date {
            Some(d) => Some(validate_date(&d)?),
            None => None,
        };
        reduce(
            &mut self.state,
            Action::AddWaterEntry {
                amount_ml,
                date,
                time,
            },
        );
        let entry = self
            .state
            .water_entries
            .last()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("entry was not appended"))?;
        self.refresh_record(&entry.date);
        self.persist_history();
        Ok(entry)
    }

    pub fn remove_water_entry(&mut self, id: &str) -> bool {
        let Some(date) = self
            .state
            .water_entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.date.clone())
        else {
            return false;
        };
        reduce(
            &mut self.state,
            Action::RemoveWaterEntry { id: id.to_string() },
        );
        self.refresh_record(&date);
        self.persist_history();
        true
    }

    pub fn mark_food_consumed(&mut self, id: &str) -> bool {
        self.toggle(id, false, true)
    }

    pub fn mark_food_planned(&mut self, id: &str) -> bool {
        self.toggle(id, false, false)
    }

    pub fn mark_water_consumed(&mut self, id: &str) -> bool {
        self.toggle(id, true, true)
    }

    pub fn mark_water_planned(&mut self, id: &str) -> bool {
        self.toggle(id, true, false)
    }

    fn toggle(&mut self, id: &str, water: bool, consumed: bool) -> bool {
        let date = if water {
            self.state
                .water_entries
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.date.clone())
        } else {
            self.state
                .entries
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.date.clone())
        };
        let Some(date) = date else {
            return false;
        };
        let id = id.to_string();
        let action = match (water, consumed) {
            (false, true) => Action::MarkFoodConsumed { id },
            (false, false) => Action::MarkFoodPlanned { id },
            (true, true) => Action::MarkWaterConsumed { id },
            (true, false) => Action::MarkWaterPlanned { id },
        };
        reduce(&mut self.state, action);
        self.refresh_record(&date);
        self.persist_history();
        true
    }

    pub fn update_daily_goals(&mut self, patch: GoalsPatch) {
        reduce(&mut self.state, Action::UpdateDailyGoals(patch));
        self.emit(EngineEvent::GoalsUpdated);
        let date = self.state.selected_date.clone();
        self.refresh_record(&date);
        self.persist_history();
    }

    // --- Date selection & rollover ---

    /// Point the engine at a date, seeding it from its persisted record or
    /// the active plan's templates when the store holds nothing for it yet.
    pub fn set_selected_date(&mut self, date: &str) -> Result<()> {
        let date = validate_date(date)?;
        if self.state.selected_date != date {
            reduce(
                &mut self.state,
                Action::SetSelectedDate { date: date.clone() },
            );
        }
        self.seed_day(&date);
        self.persist_history();
        Ok(())
    }

    /// Idempotent rollover entry point: re-selects the real today if the
    /// pointer went stale. All timers funnel into this.
    pub fn check_date_change(&mut self) -> Result<bool> {
        let today = today_string();
        if self.state.selected_date == today {
            return Ok(false);
        }
        let from = self.state.selected_date.clone();
        self.set_selected_date(&today)?;
        info!(%from, to = %today, "date rollover");
        self.emit(EngineEvent::DateRolledOver { from, to: today });
        Ok(true)
    }

    fn seed_day(&mut self, date: &str) {
        let has_food = self.state.entries.iter().any(|e| e.date == date);
        let has_water = self.state.water_entries.iter().any(|e| e.date == date);
        if has_food || has_water {
            return;
        }
        let seed = materialize_day(
            date,
            self.history.record(date),
            self.history.active_meal_plan(),
        );
        if seed.is_empty() {
            return;
        }
        self.state.entries.extend(seed.entries);
        self.state.water_entries.extend(seed.water_entries);
        if let Some(goals) = seed.goals {
            self.state.goals = goals;
        }
        self.refresh_record(date);
    }

    // --- Aggregation & persistence ---

    /// Recompute the daily record for a date and push it to history when it
    /// actually changed. An empty day with no prior record leaves no trace,
    /// so merely visiting a date never blocks future template application.
    fn refresh_record(&mut self, date: &str) {
        let previous = self.history.record(date).cloned();
        let record = build_daily_summary_record(&self.state, date, previous.as_ref());
        let empty = record.entries.is_empty() && record.water_entries.is_empty();
        if previous.is_none() && empty {
            return;
        }
        if previous.as_ref() == Some(&record) {
            return;
        }
        let unlocked = self.history.update_daily_summary_record(record.clone());
        self.emit(EngineEvent::RecordWritten {
            date: date.to_string(),
        });
        for id in unlocked {
            self.emit(EngineEvent::AchievementUnlocked { id });
        }
        self.persist_record(&record);
    }

    fn persist_record(&mut self, record: &DailySummaryRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(p) => p,
            Err(err) => {
                self.warn_persistence(format!("could not serialize record: {err}"));
                return;
            }
        };
        if let Err(err) = self.adapter.save(&record.date, &payload) {
            self.warn_persistence(format!("day record save failed for {}: {err:#}", record.date));
        }
    }

    /// Content-addressed full-state write. On failure, retries with a
    /// rolling-window payload and finally with only the active date; failures
    /// warn and never unwind past this boundary.
    fn persist_history(&mut self) {
        let payload = match encode_stored_state(&self.state, &self.history) {
            Ok(p) => p,
            Err(err) => {
                self.warn_persistence(format!("could not serialize state: {err}"));
                return;
            }
        };
        let hash = content_hash(&payload);
        if self.last_history_hash.as_deref() == Some(hash.as_str()) {
            return;
        }
        match self.adapter.save(HISTORY_KEY, &payload) {
            Ok(()) => {
                self.last_history_hash = Some(hash);
            }
            Err(err) => {
                self.last_history_hash = None;
                self.warn_persistence(format!(
                    "full save failed ({err:#}); retrying with reduced payload"
                ));
                self.persist_reduced();
            }
        }
    }

    fn persist_reduced(&mut self) {
        let stored = StoredState::assemble(&self.state, &self.history);
        let active_date = self.state.selected_date.clone();
        for keep_days in [RETENTION_WINDOW_DAYS, 0] {
            let reduced = reduce_to_window(&stored, keep_days, &active_date);
            let Ok(payload) = serde_json::to_string(&reduced) else {
                continue;
            };
            if self.adapter.save(HISTORY_KEY, &payload).is_ok() {
                info!(keep_days, "reduced save succeeded");
                return;
            }
        }
        self.warn_persistence("all reduced saves failed; state kept in memory only".to_string());
    }

    // --- Views ---

    #[must_use]
    pub fn entries_by_status(&self, filter: StatusFilter, date: Option<&str>) -> Vec<FoodEntry> {
        entries_by_status(&self.state, filter, date)
    }

    #[must_use]
    pub fn water_by_status(&self, filter: StatusFilter, date: Option<&str>) -> Vec<WaterEntry> {
        water_by_status(&self.state, filter, date)
    }

    #[must_use]
    pub fn daily_planning_overview(&self, date: Option<&str>) -> DailyPlanningOverview {
        daily_planning_overview(&self.state, date)
    }

    #[must_use]
    pub fn meal_planning_stats(&self, meal: MealType, date: Option<&str>) -> MealPlanningStats {
        meal_planning_stats(&self.state, meal, date)
    }

    #[must_use]
    pub fn daily_summary_record(&self, date: &str) -> Option<DailySummaryRecord> {
        self.history.record(date).cloned()
    }

    #[must_use]
    pub fn history_stats(&self) -> HistoryStats {
        self.history.stats()
    }

    /// All dates with a daily record, ascending.
    #[must_use]
    pub fn history_dates(&self) -> Vec<String> {
        self.history.daily_records.keys().cloned().collect()
    }

    #[must_use]
    pub fn achievements(&self) -> &[Achievement] {
        &self.history.achievements
    }

    #[must_use]
    pub fn streaks(&self) -> &StreakData {
        &self.history.streaks
    }

    #[must_use]
    pub fn goals(&self) -> &DailyGoals {
        &self.state.goals
    }

    #[must_use]
    pub fn selected_date(&self) -> &str {
        &self.state.selected_date
    }

    // --- Meal plans ---

    pub fn create_meal_plan(&mut self, new: NewMealPlan) -> Result<MealPlan> {
        let plan = self.history.create_meal_plan(new)?;
        self.persist_history();
        Ok(plan)
    }

    pub fn set_active_meal_plan(&mut self, id: &str) -> Result<()> {
        self.history.set_active_meal_plan(id)?;
        self.persist_history();
        Ok(())
    }

    #[must_use]
    pub fn active_meal_plan(&self) -> Option<&MealPlan> {
        self.history.active_meal_plan()
    }

    #[must_use]
    pub fn meal_plans(&self) -> &[MealPlan] {
        &self.history.meal_plans
    }

    pub fn add_food_to_meal_plan(&mut self, plan_id: &str, template: FoodTemplate) -> Result<()> {
        self.history.add_food_template(plan_id, template)?;
        self.persist_history();
        Ok(())
    }

    pub fn remove_food_from_meal_plan(
        &mut self,
        plan_id: &str,
        name: &str,
        meal: MealType,
    ) -> Result<bool> {
        let removed = self.history.remove_food_template(plan_id, name, meal)?;
        if removed {
            self.persist_history();
        }
        Ok(removed)
    }

    pub fn add_water_to_meal_plan(&mut self, plan_id: &str, template: WaterTemplate) -> Result<()> {
        self.history.add_water_template(plan_id, template)?;
        self.persist_history();
        Ok(())
    }

    // --- Events ---

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn warn_persistence(&mut self, message: String) {
        warn!(%message, "persistence warning");
        self.emit(EngineEvent::PersistenceWarning { message });
    }
}

/// The next local midnight after `now`. On the rare date where midnight does
/// not exist locally (a DST transition), falls back to 24h out.
#[must_use]
pub fn next_midnight(now: DateTime<Local>) -> DateTime<Local> {
    let tomorrow = now.date_naive() + chrono::Duration::days(1);
    match tomorrow.and_time(NaiveTime::MIN).and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt,
        LocalResult::None => now + chrono::Duration::days(1),
    }
}
