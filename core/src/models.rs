use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MEAL_TYPES: &[MealType] = &[
    MealType::Breakfast,
    MealType::Lunch,
    MealType::Dinner,
    MealType::Snack,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => bail!("Invalid meal type '{s}'. Must be one of: breakfast, lunch, dinner, snack"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Planned,
    Consumed,
}

impl EntryStatus {
    /// Default for payloads written before the planned/consumed split existed:
    /// everything logged back then had actually been eaten.
    #[must_use]
    pub fn legacy_default() -> Self {
        EntryStatus::Consumed
    }
}

/// A single logged (or planned) food item. Nutrient values are absolute for
/// the entry, already scaled to `quantity_g`; `micronutrients` stays per-100g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: String,
    pub name: String,
    pub quantity_g: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub meal: MealType,
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default = "EntryStatus::legacy_default")]
    pub status: EntryStatus,
    #[serde(default)]
    pub planned_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micronutrients: Option<HashMap<String, f64>>,
}

/// Input shape for adding a food entry: no id, status, or planned-at yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFoodEntry {
    pub name: String,
    pub quantity_g: f64,
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    pub meal: MealType,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub micronutrients: Option<HashMap<String, f64>>,
}

impl FoodEntry {
    /// Build a planned entry from user input. `fallback_date` is the active
    /// date used when the input carries none.
    #[must_use]
    pub fn from_new(new: NewFoodEntry, fallback_date: &str) -> Self {
        FoodEntry {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            quantity_g: new.quantity_g,
            calories: new.calories,
            protein: new.protein,
            carbs: new.carbs,
            fat: new.fat,
            meal: new.meal,
            date: new.date.unwrap_or_else(|| fallback_date.to_string()),
            time: new.time.unwrap_or_else(now_time_string),
            status: EntryStatus::Planned,
            planned_at: now_timestamp(),
            consumed_at: None,
            micronutrients: new.micronutrients,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterEntry {
    pub id: String,
    pub amount_ml: f64,
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default = "EntryStatus::legacy_default")]
    pub status: EntryStatus,
    #[serde(default)]
    pub planned_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<String>,
}

impl WaterEntry {
    #[must_use]
    pub fn new_planned(amount_ml: f64, date: String, time: Option<String>) -> Self {
        WaterEntry {
            id: Uuid::new_v4().to_string(),
            amount_ml,
            date,
            time: time.unwrap_or_else(now_time_string),
            status: EntryStatus::Planned,
            planned_at: now_timestamp(),
            consumed_at: None,
        }
    }
}

/// Daily macro and water targets. Water is in millilitres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyGoals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub water: f64,
}

impl Default for DailyGoals {
    fn default() -> Self {
        DailyGoals {
            calories: 2000.0,
            protein: 150.0,
            carbs: 250.0,
            fat: 65.0,
            water: 2000.0,
        }
    }
}

/// Shallow-merge patch for `DailyGoals`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalsPatch {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
    #[serde(default)]
    pub water: Option<f64>,
}

impl DailyGoals {
    pub fn apply(&mut self, patch: &GoalsPatch) {
        if let Some(v) = patch.calories {
            self.calories = v;
        }
        if let Some(v) = patch.protein {
            self.protein = v;
        }
        if let Some(v) = patch.carbs {
            self.carbs = v;
        }
        if let Some(v) = patch.fat {
            self.fat = v;
        }
        if let Some(v) = patch.water {
            self.water = v;
        }
    }
}

/// Food-entry shape inside a meal plan: no id, date, or status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodTemplate {
    pub name: String,
    pub quantity_g: f64,
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    pub meal: MealType,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub micronutrients: Option<HashMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterTemplate {
    pub amount_ml: f64,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    pub name: String,
    pub daily_goals: DailyGoals,
    #[serde(default)]
    pub food_templates: Vec<FoodTemplate>,
    #[serde(default)]
    pub water_templates: Vec<WaterTemplate>,
    pub is_active: bool,
    pub created_at: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMealPlan {
    pub name: String,
    #[serde(default)]
    pub daily_goals: Option<DailyGoals>,
    #[serde(default)]
    pub food_templates: Vec<FoodTemplate>,
    #[serde(default)]
    pub water_templates: Vec<WaterTemplate>,
}

/// Consumed-only nutrient sums for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub water: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionStats {
    pub planned_food_count: usize,
    pub consumed_food_count: usize,
    pub planned_water_count: usize,
    pub consumed_water_count: usize,
    pub food_completion_pct: u32,
    pub water_completion_pct: u32,
    pub overall_completion_pct: u32,
}

/// The persisted per-day snapshot: entries, consumed-only totals, the goals in
/// effect when computed, status partitions, and completion state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummaryRecord {
    pub date: String,
    #[serde(default)]
    pub entries: Vec<FoodEntry>,
    #[serde(default)]
    pub water_entries: Vec<WaterEntry>,
    pub totals: NutrientTotals,
    pub goals: DailyGoals,
    #[serde(default)]
    pub planned_food_entries: Vec<FoodEntry>,
    #[serde(default)]
    pub consumed_food_entries: Vec<FoodEntry>,
    #[serde(default)]
    pub planned_water_entries: Vec<WaterEntry>,
    #[serde(default)]
    pub consumed_water_entries: Vec<WaterEntry>,
    pub completion: CompletionStats,
    pub is_completed: bool,
    #[serde(default)]
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakData {
    pub current: u32,
    pub longest: u32,
    #[serde(default)]
    pub last_completed_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementKind {
    Completion,
    Streak,
    Nutrition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub kind: AchievementKind,
    #[serde(default)]
    pub unlocked_at: Option<String>,
}

impl Achievement {
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

/// Item-count completion percentage: consumed out of everything logged for
/// the scope, rounded. 0 when nothing is logged.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn completion_percentage(consumed: usize, planned: usize) -> u32 {
    let total = consumed + planned;
    if total == 0 {
        return 0;
    }
    (consumed as f64 / total as f64 * 100.0).round() as u32
}

/// Validate and normalize a `YYYY-MM-DD` calendar-day key.
pub fn validate_date(date: &str) -> Result<String> {
    let parsed = parse_date_key(date)?;
    Ok(parsed.format("%Y-%m-%d").to_string())
}

pub fn parse_date_key(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date '{date}'. Must be YYYY-MM-DD"))
}

/// Today as a local-calendar day key. Built from date components, never by
/// shifting a UTC instant, so the day never drifts across timezones.
#[must_use]
pub fn today_string() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[must_use]
pub fn now_timestamp() -> String {
    Local::now().to_rfc3339()
}

#[must_use]
pub fn now_time_string() -> String {
    Local::now().format("%H:%M").to_string()
}

pub fn validate_amount(amount_ml: f64) -> Result<()> {
    if amount_ml <= 0.0 {
        bail!("Water amount must be greater than 0");
    }
    Ok(())
}

pub fn validate_new_food_entry(entry: &NewFoodEntry) -> Result<()> {
    if entry.name.trim().is_empty() {
        bail!("Food name must not be empty");
    }
    if entry.quantity_g <= 0.0 {
        bail!("quantity_g must be greater than 0");
    }
    if entry.calories < 0.0 || entry.protein < 0.0 || entry.carbs < 0.0 || entry.fat < 0.0 {
        bail!("Nutrient values must not be negative");
    }
    if let Some(date) = &entry.date {
        validate_date(date)?;
    }
    Ok(())
}

pub fn validate_food_template(template: &FoodTemplate) -> Result<()> {
    if template.name.trim().is_empty() {
        bail!("Template food name must not be empty");
    }
    if template.quantity_g <= 0.0 {
        bail!("Template quantity_g must be greater than 0");
    }
    if template.calories < 0.0 {
        bail!("Template calories must not be negative");
    }
    Ok(())
}
