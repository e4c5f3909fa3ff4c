use anyhow::{Context, Result, bail};
use chrono::Local;

use nosh_core::calc::StatusFilter;
use nosh_core::engine::NutritionEngine;
use nosh_core::models::{EntryStatus, MealPlan, validate_date};

/// Parse a date argument into a `YYYY-MM-DD` key. Accepts the ISO form plus
/// today/yesterday/tomorrow keywords; `None` means today.
pub(crate) fn parse_date(date_str: Option<String>) -> Result<String> {
    let today = Local::now().date_naive();
    match date_str {
        None => Ok(today.format("%Y-%m-%d").to_string()),
        Some(s) => match s.as_str() {
            "today" => Ok(today.format("%Y-%m-%d").to_string()),
            "yesterday" => Ok((today - chrono::Duration::days(1))
                .format("%Y-%m-%d")
                .to_string()),
            "tomorrow" => Ok((today + chrono::Duration::days(1))
                .format("%Y-%m-%d")
                .to_string()),
            _ => validate_date(&s).with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Resolve a food-entry id from a unique prefix, searching every date.
pub(crate) fn resolve_food_id(engine: &NutritionEngine, prefix: &str) -> Result<String> {
    let matches: Vec<String> = all_food_ids(engine)
        .into_iter()
        .filter(|id| id.starts_with(prefix))
        .collect();
    unique_match(matches, prefix, "food entry")
}

/// Resolve a water-entry id from a unique prefix.
pub(crate) fn resolve_water_id(engine: &NutritionEngine, prefix: &str) -> Result<String> {
    let matches: Vec<String> = all_water_ids(engine)
        .into_iter()
        .filter(|id| id.starts_with(prefix))
        .collect();
    unique_match(matches, prefix, "water entry")
}

fn all_food_ids(engine: &NutritionEngine) -> Vec<String> {
    let mut ids: Vec<String> = engine
        .history_dates()
        .into_iter()
        .flat_map(|date| {
            engine
                .entries_by_status(StatusFilter::All, Some(&date))
                .into_iter()
                .map(|e| e.id)
        })
        .collect();
    ids.extend(
        engine
            .entries_by_status(StatusFilter::All, None)
            .into_iter()
            .map(|e| e.id),
    );
    ids
}

fn all_water_ids(engine: &NutritionEngine) -> Vec<String> {
    let mut ids: Vec<String> = engine
        .history_dates()
        .into_iter()
        .flat_map(|date| {
            engine
                .water_by_status(StatusFilter::All, Some(&date))
                .into_iter()
                .map(|e| e.id)
        })
        .collect();
    ids.extend(
        engine
            .water_by_status(StatusFilter::All, None)
            .into_iter()
            .map(|e| e.id),
    );
    ids
}

fn unique_match(mut matches: Vec<String>, prefix: &str, kind: &str) -> Result<String> {
    matches.sort();
    matches.dedup();
    match matches.len() {
        0 => bail!("No {kind} with id '{prefix}'"),
        1 => Ok(matches.remove(0)),
        n => bail!("Id prefix '{prefix}' is ambiguous ({n} matches); give more characters"),
    }
}

/// Find a plan by exact name (case-insensitive) or id prefix.
pub(crate) fn resolve_plan(engine: &NutritionEngine, needle: &str) -> Result<MealPlan> {
    let plans = engine.meal_plans();
    if let Some(plan) = plans.iter().find(|p| p.name.eq_ignore_ascii_case(needle)) {
        return Ok(plan.clone());
    }
    let by_id: Vec<&MealPlan> = plans.iter().filter(|p| p.id.starts_with(needle)).collect();
    match by_id.len() {
        0 => bail!("No meal plan named '{needle}'"),
        1 => Ok(by_id[0].clone()),
        n => bail!("Plan '{needle}' is ambiguous ({n} matches); use the full name"),
    }
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub(crate) fn status_mark(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Consumed => "x",
        EntryStatus::Planned => "·",
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none_is_today() {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            (today - chrono::Duration::days(1))
                .format("%Y-%m-%d")
                .to_string()
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            (today + chrono::Duration::days(1))
                .format("%Y-%m-%d")
                .to_string()
        );
    }

    #[test]
    fn test_parse_date_iso() {
        assert_eq!(
            parse_date(Some("2024-01-15".to_string())).unwrap(),
            "2024-01-15"
        );
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        // Should not panic on multi-byte characters
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_unique_match() {
        assert_eq!(
            unique_match(vec!["abc".to_string(), "abc".to_string()], "a", "entry").unwrap(),
            "abc"
        );
        assert!(unique_match(Vec::new(), "a", "entry").is_err());
        assert!(
            unique_match(vec!["abc".to_string(), "abd".to_string()], "ab", "entry").is_err()
        );
    }
}
