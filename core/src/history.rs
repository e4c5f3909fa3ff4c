use std::collections::BTreeMap;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    Achievement, AchievementKind, DailySummaryRecord, FoodTemplate, MealPlan, MealType,
    NewMealPlan, StreakData, WaterTemplate, now_timestamp, parse_date_key,
};

pub const FIRST_DAY_COMPLETE: &str = "first-day-complete";
pub const WEEK_STREAK: &str = "week-streak";
pub const MONTH_STREAK: &str = "month-streak";
pub const PROTEIN_MASTER: &str = "protein-master";
pub const WATER_CHAMPION: &str = "water-champion";

const WEEK_STREAK_DAYS: u32 = 7;
const MONTH_STREAK_DAYS: u32 = 30;
const PROTEIN_STREAK_DAYS: u32 = 10;
const WATER_STREAK_DAYS: u32 = 5;

/// The locked catalogue. Stored unlock timestamps are merged over this by id,
/// so renames and new achievements pick up cleanly on load.
#[must_use]
pub fn default_achievements() -> Vec<Achievement> {
    let locked = |id: &str, name: &str, description: &str, icon: &str, kind: AchievementKind| {
        Achievement {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
            kind,
            unlocked_at: None,
        }
    };
    vec![
        locked(
            FIRST_DAY_COMPLETE,
            "First Day Complete",
            "Finish everything you planned for one day",
            "star",
            AchievementKind::Completion,
        ),
        locked(
            WEEK_STREAK,
            "Week Streak",
            "Complete 7 days in a row",
            "flame",
            AchievementKind::Streak,
        ),
        locked(
            MONTH_STREAK,
            "Month Streak",
            "Complete 30 days in a row",
            "trophy",
            AchievementKind::Streak,
        ),
        locked(
            PROTEIN_MASTER,
            "Protein Master",
            "Hit your protein goal 10 days in a row",
            "muscle",
            AchievementKind::Nutrition,
        ),
        locked(
            WATER_CHAMPION,
            "Water Champion",
            "Hit your water goal 5 days in a row",
            "droplet",
            AchievementKind::Nutrition,
        ),
    ]
}

#[must_use]
pub fn merged_achievements(stored: &[Achievement]) -> Vec<Achievement> {
    let mut merged = default_achievements();
    for achievement in &mut merged {
        if let Some(prior) = stored.iter().find(|s| s.id == achievement.id) {
            achievement.unlocked_at.clone_from(&prior.unlocked_at);
        }
    }
    merged
}

/// Profile-header numbers derived from the whole history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub days_tracked: usize,
    pub days_completed: usize,
    pub completion_rate_pct: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub achievements_unlocked: usize,
}

/// Owns the append-only (by date) record map, meal plans, streaks, and
/// achievements. Records come in through `update_daily_summary_record`, which
/// re-evaluates streaks then achievements in that order.
#[derive(Debug, Clone)]
pub struct HistoryState {
    pub daily_records: BTreeMap<String, DailySummaryRecord>,
    pub meal_plans: Vec<MealPlan>,
    pub active_meal_plan_id: Option<String>,
    pub achievements: Vec<Achievement>,
    pub streaks: StreakData,
}

impl Default for HistoryState {
    fn default() -> Self {
        HistoryState {
            daily_records: BTreeMap::new(),
            meal_plans: Vec::new(),
            active_meal_plan_id: None,
            achievements: default_achievements(),
            streaks: StreakData::default(),
        }
    }
}

impl HistoryState {
    #[must_use]
    pub fn record(&self, date: &str) -> Option<&DailySummaryRecord> {
        self.daily_records.get(date)
    }

    /// Upsert a record, then recompute streaks and evaluate achievements.
    /// Returns the ids of achievements unlocked by this update.
    pub fn update_daily_summary_record(&mut self, record: DailySummaryRecord) -> Vec<String> {
        debug!(date = %record.date, completed = record.is_completed, "upsert daily record");
        self.daily_records.insert(record.date.clone(), record);
        self.recompute_streaks();
        self.evaluate_achievements()
    }

    fn recompute_streaks(&mut self) {
        let current = self.completion_streak_from_latest();
        let best = self.best_completion_streak();
        // Longest only ever grows, even when current resets to zero.
        let longest = self.streaks.longest.max(best).max(current);
        let last_completed_date = self
            .daily_records
            .values()
            .rev()
            .find(|r| r.is_completed)
            .map(|r| r.date.clone());
        self.streaks = StreakData {
            current,
            longest,
            last_completed_date,
        };
    }

    /// Consecutive completed days ending at the most recent known date. An
    /// incomplete most-recent day means no active streak at all.
    fn completion_streak_from_latest(&self) -> u32 {
        streak_from_latest(&self.daily_records, |r| r.is_completed)
    }

    /// Longest run of completed consecutive days anywhere in history. Keeps
    /// `longest` correct after a wholesale hydration, where updates did not
    /// arrive one day at a time.
    fn best_completion_streak(&self) -> u32 {
        let mut best: u32 = 0;
        let mut run: u32 = 0;
        let mut prev: Option<NaiveDate> = None;
        for record in self.daily_records.values() {
            let Ok(date) = parse_date_key(&record.date) else {
                continue;
            };
            if record.is_completed {
                let contiguous = prev.is_some_and(|p| date - p == chrono::Duration::days(1));
                run = if contiguous { run + 1 } else { 1 };
                best = best.max(run);
            } else {
                run = 0;
            }
            prev = Some(date);
        }
        best
    }

    /// Consecutive most-recent days where consumed protein met that day's own
    /// goals snapshot.
    #[must_use]
    pub fn protein_streak(&self) -> u32 {
        streak_from_latest(&self.daily_records, |r| r.totals.protein >= r.goals.protein)
    }

    /// Same walk for water.
    #[must_use]
    pub fn water_streak(&self) -> u32 {
        streak_from_latest(&self.daily_records, |r| r.totals.water >= r.goals.water)
    }

    /// Run after every record update. Unlocks are monotonic: once an
    /// `unlocked_at` is set it is never cleared, even if the underlying
    /// streak later breaks.
    fn evaluate_achievements(&mut self) -> Vec<String> {
        let any_completed = self.daily_records.values().any(|r| r.is_completed);
        let current = self.streaks.current;
        let protein = self.protein_streak();
        let water = self.water_streak();

        let now = now_timestamp();
        let mut unlocked = Vec::new();
        for achievement in &mut self.achievements {
            if achievement.unlocked_at.is_some() {
                continue;
            }
            let earned = match achievement.id.as_str() {
                FIRST_DAY_COMPLETE => any_completed,
                WEEK_STREAK => current >= WEEK_STREAK_DAYS,
                MONTH_STREAK => current >= MONTH_STREAK_DAYS,
                PROTEIN_MASTER => protein >= PROTEIN_STREAK_DAYS,
                WATER_CHAMPION => water >= WATER_STREAK_DAYS,
                _ => false,
            };
            if earned {
                achievement.unlocked_at = Some(now.clone());
                info!(id = %achievement.id, "achievement unlocked");
                unlocked.push(achievement.id.clone());
            }
        }
        unlocked
    }

    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        let days_tracked = self.daily_records.len();
        let days_completed = self
            .daily_records
            .values()
            .filter(|r| r.is_completed)
            .count();
        HistoryStats {
            days_tracked,
            days_completed,
            completion_rate_pct: crate::models::completion_percentage(
                days_completed,
                days_tracked - days_completed,
            ),
            current_streak: self.streaks.current,
            longest_streak: self.streaks.longest,
            achievements_unlocked: self
                .achievements
                .iter()
                .filter(|a| a.is_unlocked())
                .count(),
        }
    }

    // --- Meal plans ---

    /// Create a plan. The first plan auto-activates; later ones stay inactive
    /// until activated explicitly.
    pub fn create_meal_plan(&mut self, new: NewMealPlan) -> Result<MealPlan> {
        if new.name.trim().is_empty() {
            bail!("Meal plan name must not be empty");
        }
        for template in &new.food_templates {
            crate::models::validate_food_template(template)?;
        }
        let now = now_timestamp();
        let activate = self.active_meal_plan_id.is_none();
        let plan = MealPlan {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            daily_goals: new.daily_goals.unwrap_or_default(),
            food_templates: new.food_templates,
            water_templates: new.water_templates,
            is_active: activate,
            created_at: now.clone(),
            last_updated: now,
        };
        if activate {
            self.active_meal_plan_id = Some(plan.id.clone());
        }
        self.meal_plans.push(plan.clone());
        Ok(plan)
    }

    /// Exclusive activation: the chosen plan becomes active, every other plan
    /// is deactivated. Activating the already-active plan is a no-op.
    pub fn set_active_meal_plan(&mut self, id: &str) -> Result<()> {
        if !self.meal_plans.iter().any(|p| p.id == id) {
            bail!("No meal plan with id '{id}'");
        }
        for plan in &mut self.meal_plans {
            plan.is_active = plan.id == id;
        }
        self.active_meal_plan_id = Some(id.to_string());
        Ok(())
    }

    #[must_use]
    pub fn active_meal_plan(&self) -> Option<&MealPlan> {
        let id = self.active_meal_plan_id.as_deref()?;
        self.meal_plans.iter().find(|p| p.id == id)
    }

    /// Template edits never touch already-materialized daily entries.
    pub fn add_food_template(&mut self, plan_id: &str, template: FoodTemplate) -> Result<()> {
        crate::models::validate_food_template(&template)?;
        let plan = self.plan_mut(plan_id)?;
        plan.food_templates.push(template);
        plan.last_updated = now_timestamp();
        Ok(())
    }

    /// Remove a template by food name and meal. Returns false when absent.
    pub fn remove_food_template(
        &mut self,
        plan_id: &str,
        name: &str,
        meal: MealType,
    ) -> Result<bool> {
        let plan = self.plan_mut(plan_id)?;
        let before = plan.food_templates.len();
        plan.food_templates
            .retain(|t| !(t.meal == meal && t.name.eq_ignore_ascii_case(name)));
        let removed = plan.food_templates.len() < before;
        if removed {
            plan.last_updated = now_timestamp();
        }
        Ok(removed)
    }

    pub fn add_water_template(&mut self, plan_id: &str, template: WaterTemplate) -> Result<()> {
        let plan = self.plan_mut(plan_id)?;
        plan.water_templates.push(template);
        plan.last_updated = now_timestamp();
        Ok(())
    }

    fn plan_mut(&mut self, id: &str) -> Result<&mut MealPlan> {
        self.meal_plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow::anyhow!("No meal plan with id '{id}'"))
    }
}

/// Walk known dates from the most recent backward, counting consecutive
/// calendar days that satisfy `pred`. Stops at the first failing day or the
/// first gap larger than one day.
fn streak_from_latest<F>(records: &BTreeMap<String, DailySummaryRecord>, pred: F) -> u32
where
    F: Fn(&DailySummaryRecord) -> bool,
{
    let mut streak: u32 = 0;
    let mut expected: Option<NaiveDate> = None;
    for record in records.values().rev() {
        let Ok(date) = parse_date_key(&record.date) else {
            break;
        };
        if let Some(expected) = expected {
            if date != expected {
                break;
            }
        }
        if !pred(record) {
            break;
        }
        streak += 1;
        expected = Some(date - chrono::Duration::days(1));
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletionStats, DailyGoals, NutrientTotals};

    fn record(date: &str, completed: bool) -> DailySummaryRecord {
        DailySummaryRecord {
            date: date.to_string(),
            entries: Vec::new(),
            water_entries: Vec::new(),
            totals: NutrientTotals::default(),
            goals: DailyGoals::default(),
            planned_food_entries: Vec::new(),
            consumed_food_entries: Vec::new(),
            planned_water_entries: Vec::new(),
            consumed_water_entries: Vec::new(),
            completion: CompletionStats {
                overall_completion_pct: if completed { 100 } else { 50 },
                ..CompletionStats::default()
            },
            is_completed: completed,
            completed_at: completed.then(now_timestamp),
        }
    }

    fn record_with_nutrients(date: &str, protein: f64, water: f64) -> DailySummaryRecord {
        let mut r = record(date, true);
        r.totals.protein = protein;
        r.totals.water = water;
        r
    }

    #[test]
    fn test_streak_scenario_incomplete_latest() {
        // 01-01..01-05 completed, 01-06 incomplete → current 0, longest 5
        let mut history = HistoryState::default();
        for day in 1..=5 {
            history.update_daily_summary_record(record(&format!("2024-01-0{day}"), true));
        }
        history.update_daily_summary_record(record("2024-01-06", false));
        assert_eq!(history.streaks.current, 0);
        assert_eq!(history.streaks.longest, 5);
        assert_eq!(
            history.streaks.last_completed_date.as_deref(),
            Some("2024-01-05")
        );
    }

    #[test]
    fn test_streak_scenario_complete_latest() {
        let mut history = HistoryState::default();
        for day in 1..=5 {
            history.update_daily_summary_record(record(&format!("2024-01-0{day}"), true));
        }
        assert_eq!(history.streaks.current, 5);
        assert_eq!(history.streaks.longest, 5);
    }

    #[test]
    fn test_streak_stops_at_gap() {
        let mut history = HistoryState::default();
        history.update_daily_summary_record(record("2024-01-01", true));
        history.update_daily_summary_record(record("2024-01-02", true));
        // 01-03 missing entirely
        history.update_daily_summary_record(record("2024-01-04", true));
        history.update_daily_summary_record(record("2024-01-05", true));
        assert_eq!(history.streaks.current, 2);
        assert_eq!(history.streaks.longest, 2);
    }

    #[test]
    fn test_longest_never_decreases() {
        let mut history = HistoryState::default();
        for day in 1..=5 {
            history.update_daily_summary_record(record(&format!("2024-01-0{day}"), true));
        }
        assert_eq!(history.streaks.longest, 5);
        history.update_daily_summary_record(record("2024-01-06", false));
        history.update_daily_summary_record(record("2024-01-07", true));
        history.update_daily_summary_record(record("2024-01-08", true));
        assert_eq!(history.streaks.current, 2);
        assert_eq!(history.streaks.longest, 5);
    }

    #[test]
    fn test_longest_recovers_from_wholesale_history() {
        // Records inserted out of order, as after a hydration
        let mut history = HistoryState::default();
        history.update_daily_summary_record(record("2024-01-05", false));
        for day in 1..=4 {
            history.update_daily_summary_record(record(&format!("2024-01-0{day}"), true));
        }
        assert_eq!(history.streaks.current, 0);
        assert_eq!(history.streaks.longest, 4);
    }

    #[test]
    fn test_overwriting_a_day_reevaluates() {
        let mut history = HistoryState::default();
        history.update_daily_summary_record(record("2024-01-01", true));
        history.update_daily_summary_record(record("2024-01-02", false));
        assert_eq!(history.streaks.current, 0);
        history.update_daily_summary_record(record("2024-01-02", true));
        assert_eq!(history.streaks.current, 2);
    }

    #[test]
    fn test_first_day_complete_unlock() {
        let mut history = HistoryState::default();
        let unlocked = history.update_daily_summary_record(record("2024-01-01", false));
        assert!(unlocked.is_empty());
        let unlocked = history.update_daily_summary_record(record("2024-01-02", true));
        assert_eq!(unlocked, vec![FIRST_DAY_COMPLETE.to_string()]);
    }

    #[test]
    fn test_week_streak_unlock_and_monotonicity() {
        let mut history = HistoryState::default();
        for day in 1..=7 {
            history.update_daily_summary_record(record(&format!("2024-01-0{day}"), true));
        }
        let week = history
            .achievements
            .iter()
            .find(|a| a.id == WEEK_STREAK)
            .unwrap();
        assert!(week.is_unlocked());
        let unlocked_at = week.unlocked_at.clone();

        // Breaking the streak must not re-lock it
        history.update_daily_summary_record(record("2024-01-08", false));
        assert_eq!(history.streaks.current, 0);
        let week = history
            .achievements
            .iter()
            .find(|a| a.id == WEEK_STREAK)
            .unwrap();
        assert_eq!(week.unlocked_at, unlocked_at);
    }

    #[test]
    fn test_month_streak_unlock() {
        let mut history = HistoryState::default();
        for day in 1..=30 {
            history.update_daily_summary_record(record(&format!("2024-01-{day:02}"), true));
        }
        assert!(
            history
                .achievements
                .iter()
                .find(|a| a.id == MONTH_STREAK)
                .unwrap()
                .is_unlocked()
        );
    }

    #[test]
    fn test_protein_master_uses_each_days_own_goals() {
        let mut history = HistoryState::default();
        for day in 1..=10 {
            let mut r = record_with_nutrients(&format!("2024-01-{day:02}"), 150.0, 0.0);
            // Day 5 ran a lighter goal; its own snapshot is what counts
            if day == 5 {
                r.goals.protein = 120.0;
            }
            history.update_daily_summary_record(r);
        }
        assert!(
            history
                .achievements
                .iter()
                .find(|a| a.id == PROTEIN_MASTER)
                .unwrap()
                .is_unlocked()
        );
    }

    #[test]
    fn test_protein_streak_broken_by_shortfall() {
        let mut history = HistoryState::default();
        for day in 1..=9 {
            history
                .update_daily_summary_record(record_with_nutrients(&format!("2024-01-{day:02}"), 150.0, 0.0));
        }
        // Day 10 misses the goal
        history.update_daily_summary_record(record_with_nutrients("2024-01-10", 80.0, 0.0));
        assert_eq!(history.protein_streak(), 0);
        assert!(
            !history
                .achievements
                .iter()
                .find(|a| a.id == PROTEIN_MASTER)
                .unwrap()
                .is_unlocked()
        );
    }

    #[test]
    fn test_water_champion_unlock() {
        let mut history = HistoryState::default();
        for day in 1..=5 {
            history.update_daily_summary_record(record_with_nutrients(
                &format!("2024-01-0{day}"),
                0.0,
                2000.0,
            ));
        }
        assert_eq!(history.water_streak(), 5);
        assert!(
            history
                .achievements
                .iter()
                .find(|a| a.id == WATER_CHAMPION)
                .unwrap()
                .is_unlocked()
        );
    }

    #[test]
    fn test_create_plan_auto_activates_only_first() {
        let mut history = HistoryState::default();
        let first = history
            .create_meal_plan(NewMealPlan {
                name: "Base".to_string(),
                daily_goals: None,
                food_templates: Vec::new(),
                water_templates: Vec::new(),
            })
            .unwrap();
        assert!(first.is_active);
        assert_eq!(history.active_meal_plan_id.as_deref(), Some(first.id.as_str()));

        let second = history
            .create_meal_plan(NewMealPlan {
                name: "Cut".to_string(),
                daily_goals: None,
                food_templates: Vec::new(),
                water_templates: Vec::new(),
            })
            .unwrap();
        assert!(!second.is_active);
        assert_eq!(history.active_meal_plan_id.as_deref(), Some(first.id.as_str()));
    }

    #[test]
    fn test_activation_is_exclusive() {
        let mut history = HistoryState::default();
        let a = history
            .create_meal_plan(NewMealPlan {
                name: "A".to_string(),
                daily_goals: None,
                food_templates: Vec::new(),
                water_templates: Vec::new(),
            })
            .unwrap();
        let b = history
            .create_meal_plan(NewMealPlan {
                name: "B".to_string(),
                daily_goals: None,
                food_templates: Vec::new(),
                water_templates: Vec::new(),
            })
            .unwrap();

        history.set_active_meal_plan(&b.id).unwrap();
        assert_eq!(history.active_meal_plan().unwrap().id, b.id);
        assert!(history.meal_plans.iter().all(|p| p.is_active == (p.id == b.id)));

        // Idempotent
        history.set_active_meal_plan(&b.id).unwrap();
        assert_eq!(history.active_meal_plan().unwrap().id, b.id);

        history.set_active_meal_plan(&a.id).unwrap();
        assert!(history.meal_plans.iter().all(|p| p.is_active == (p.id == a.id)));
    }

    #[test]
    fn test_activate_unknown_plan_fails() {
        let mut history = HistoryState::default();
        assert!(history.set_active_meal_plan("nope").is_err());
    }

    #[test]
    fn test_template_edit_bumps_last_updated() {
        let mut history = HistoryState::default();
        let plan = history
            .create_meal_plan(NewMealPlan {
                name: "A".to_string(),
                daily_goals: None,
                food_templates: Vec::new(),
                water_templates: Vec::new(),
            })
            .unwrap();

        history
            .add_food_template(
                &plan.id,
                FoodTemplate {
                    name: "Oats".to_string(),
                    quantity_g: 60.0,
                    calories: 228.0,
                    protein: 8.0,
                    carbs: 40.0,
                    fat: 4.0,
                    meal: MealType::Breakfast,
                    time: None,
                    micronutrients: None,
                },
            )
            .unwrap();
        let stored = history.meal_plans.iter().find(|p| p.id == plan.id).unwrap();
        assert_eq!(stored.food_templates.len(), 1);

        assert!(
            history
                .remove_food_template(&plan.id, "oats", MealType::Breakfast)
                .unwrap()
        );
        assert!(
            !history
                .remove_food_template(&plan.id, "oats", MealType::Breakfast)
                .unwrap()
        );
    }

    #[test]
    fn test_stats() {
        let mut history = HistoryState::default();
        history.update_daily_summary_record(record("2024-01-01", true));
        history.update_daily_summary_record(record("2024-01-02", true));
        history.update_daily_summary_record(record("2024-01-03", false));
        let stats = history.stats();
        assert_eq!(stats.days_tracked, 3);
        assert_eq!(stats.days_completed, 2);
        assert_eq!(stats.completion_rate_pct, 67);
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 2);
        assert_eq!(stats.achievements_unlocked, 1);
    }

    #[test]
    fn test_merged_achievements_keeps_unlocks() {
        let mut stored = default_achievements();
        stored[0].unlocked_at = Some("2024-01-01T10:00:00+00:00".to_string());
        // A stale achievement no longer in the catalogue disappears
        stored.push(Achievement {
            id: "retired".to_string(),
            name: "Retired".to_string(),
            description: String::new(),
            icon: String::new(),
            kind: AchievementKind::Completion,
            unlocked_at: Some("2023-01-01T00:00:00+00:00".to_string()),
        });

        let merged = merged_achievements(&stored);
        assert_eq!(merged.len(), default_achievements().len());
        assert_eq!(
            merged[0].unlocked_at.as_deref(),
            Some("2024-01-01T10:00:00+00:00")
        );
        assert!(merged.iter().all(|a| a.id != "retired"));
    }
}
