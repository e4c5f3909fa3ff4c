use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use tracing::info;

use nosh_core::engine::{NutritionEngine, next_midnight};

/// Foreground rollover loop. Two timers funnel into the same idempotent
/// `check_date_change`: a midnight-aligned one-shot (recomputed after every
/// wakeup) and a coarse backup interval that also covers clock jumps and
/// suspend/resume, so a stale selected date self-corrects within one tick.
pub(crate) async fn cmd_watch(mut engine: NutritionEngine, interval_secs: u64) -> Result<()> {
    let events = engine.subscribe();
    engine.check_date_change()?;
    for event in events.try_iter() {
        println!("{event}");
    }

    let selected = engine.selected_date().to_string();
    println!("Watching for date rollover (active date {selected}). Ctrl-C to stop.");

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await; // first tick completes immediately

    loop {
        let now = Local::now();
        let midnight = next_midnight(now);
        let until_midnight = (midnight - now)
            .to_std()
            .unwrap_or(Duration::from_secs(1));
        info!(?until_midnight, "armed midnight timer");

        tokio::select! {
            _ = ticker.tick() => {
                engine.check_date_change()?;
            }
            () = tokio::time::sleep(until_midnight) => {
                engine.check_date_change()?;
            }
        }

        for event in events.try_iter() {
            println!("{event}");
        }
    }
}
