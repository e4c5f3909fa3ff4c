mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_day, cmd_goals_set, cmd_goals_show, cmd_history_achievements, cmd_history_show,
    cmd_history_stats, cmd_log_food, cmd_log_water, cmd_mark, cmd_plan_activate,
    cmd_plan_add_food, cmd_plan_add_water, cmd_plan_create, cmd_plan_list, cmd_plan_remove_food,
    cmd_plan_show, cmd_remove, cmd_watch,
};
use crate::config::Config;
use nosh_core::db::SqliteStore;
use nosh_core::engine::NutritionEngine;

#[derive(Parser)]
#[command(
    name = "nosh",
    version,
    about = "A simple nutrition planning & tracking CLI",
    long_about = "\n\n  ███╗   ██╗ ██████╗ ███████╗██╗  ██╗
  ████╗  ██║██╔═══██╗██╔════╝██║  ██║
  ██╔██╗ ██║██║   ██║███████╗███████║
  ██║╚██╗██║██║   ██║╚════██║██╔══██║
  ██║ ╚████║╚██████╔╝███████║██║  ██║
  ╚═╝  ╚═══╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝
      plan it, eat it, tick it off.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log food and water, mark items consumed or back to planned
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Show a day: planning overview, entries, totals vs goals
    Day {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Show stats for a single meal: breakfast, lunch, dinner, snack
        #[arg(short, long)]
        meal: Option<String>,
        /// Filter entries by status: all, planned, consumed
        #[arg(long, default_value = "all")]
        status: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage daily macro and water goals
    Goals {
        #[command(subcommand)]
        command: GoalsCommands,
    },
    /// Manage reusable meal plans (day templates)
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Daily records, streaks, and achievements
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Run in the foreground and roll the active date over at midnight
    Watch {
        /// Backup check interval in seconds
        #[arg(long, default_value = "60")]
        interval: u64,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Log a planned food entry
    Food {
        /// Food name
        name: String,
        /// Calories for this entry (already scaled to the quantity)
        #[arg(long)]
        calories: f64,
        /// Quantity in grams
        #[arg(short, long, default_value = "100")]
        quantity: f64,
        /// Protein in grams
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Carbs in grams
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fat in grams
        #[arg(long, default_value = "0")]
        fat: f64,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Display time (HH:MM, default: now)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a planned water entry
    Water {
        /// Amount in millilitres
        amount: f64,
        /// Date to log for (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Display time (HH:MM, default: now)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an entry by id (prefix is enough)
    Remove {
        /// Entry id or unique prefix
        id: String,
        /// The id names a water entry
        #[arg(long)]
        water: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark an entry as consumed
    Done {
        /// Entry id or unique prefix
        id: String,
        /// The id names a water entry
        #[arg(long)]
        water: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put a consumed entry back to planned
    Undo {
        /// Entry id or unique prefix
        id: String,
        /// The id names a water entry
        #[arg(long)]
        water: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalsCommands {
    /// Update goals; omitted values keep their current setting
    Set {
        /// Daily calorie goal
        #[arg(long)]
        calories: Option<f64>,
        /// Daily protein goal (g)
        #[arg(long)]
        protein: Option<f64>,
        /// Daily carbs goal (g)
        #[arg(long)]
        carbs: Option<f64>,
        /// Daily fat goal (g)
        #[arg(long)]
        fat: Option<f64>,
        /// Daily water goal (ml)
        #[arg(long)]
        water: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show current goals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Create a meal plan (auto-activates if none is active)
    Create {
        /// Plan name
        name: String,
        /// Calorie goal override for days on this plan
        #[arg(long)]
        calories: Option<f64>,
        /// Protein goal override (g)
        #[arg(long)]
        protein: Option<f64>,
        /// Carbs goal override (g)
        #[arg(long)]
        carbs: Option<f64>,
        /// Fat goal override (g)
        #[arg(long)]
        fat: Option<f64>,
        /// Water goal override (ml)
        #[arg(long)]
        water: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all plans
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a plan's templates (default: the active plan)
    Show {
        /// Plan name or id prefix
        plan: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Activate a plan (deactivates every other plan)
    Activate {
        /// Plan name or id prefix
        plan: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a food template to a plan
    AddFood {
        /// Plan name or id prefix
        plan: String,
        /// Food name
        name: String,
        /// Calories for the templated serving
        #[arg(long)]
        calories: f64,
        /// Quantity in grams
        #[arg(short, long, default_value = "100")]
        quantity: f64,
        /// Protein in grams
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Carbs in grams
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fat in grams
        #[arg(long, default_value = "0")]
        fat: f64,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long, default_value = "snack")]
        meal: String,
        /// Display time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a food template from a plan by name and meal
    RemoveFood {
        /// Plan name or id prefix
        plan: String,
        /// Food name
        name: String,
        /// Meal type: breakfast, lunch, dinner, snack
        #[arg(short, long)]
        meal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a water template to a plan
    AddWater {
        /// Plan name or id prefix
        plan: String,
        /// Amount in millilitres
        amount: f64,
        /// Display time (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// Show daily records for the last N days
    Show {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overall tracking stats and streaks
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Achievement list with unlock state
    Achievements {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let store = SqliteStore::open(&config.db_path)?;
    let mut engine = NutritionEngine::new(Box::new(store))?;

    match cli.command {
        Commands::Log { command } => match command {
            LogCommands::Food {
                name,
                calories,
                quantity,
                protein,
                carbs,
                fat,
                meal,
                date,
                time,
                json,
            } => cmd_log_food(
                &mut engine,
                &name,
                calories,
                quantity,
                protein,
                carbs,
                fat,
                &meal,
                date,
                time,
                json,
            ),
            LogCommands::Water {
                amount,
                date,
                time,
                json,
            } => cmd_log_water(&mut engine, amount, date, time, json),
            LogCommands::Remove { id, water, json } => cmd_remove(&mut engine, &id, water, json),
            LogCommands::Done { id, water, json } => {
                cmd_mark(&mut engine, &id, water, true, json)
            }
            LogCommands::Undo { id, water, json } => {
                cmd_mark(&mut engine, &id, water, false, json)
            }
        },
        Commands::Day {
            date,
            meal,
            status,
            json,
        } => cmd_day(&mut engine, date, meal.as_deref(), &status, json),
        Commands::Goals { command } => match command {
            GoalsCommands::Set {
                calories,
                protein,
                carbs,
                fat,
                water,
                json,
            } => cmd_goals_set(&mut engine, calories, protein, carbs, fat, water, json),
            GoalsCommands::Show { json } => cmd_goals_show(&engine, json),
        },
        Commands::Plan { command } => match command {
            PlanCommands::Create {
                name,
                calories,
                protein,
                carbs,
                fat,
                water,
                json,
            } => cmd_plan_create(&mut engine, &name, calories, protein, carbs, fat, water, json),
            PlanCommands::List { json } => cmd_plan_list(&engine, json),
            PlanCommands::Show { plan, json } => cmd_plan_show(&engine, plan.as_deref(), json),
            PlanCommands::Activate { plan, json } => cmd_plan_activate(&mut engine, &plan, json),
            PlanCommands::AddFood {
                plan,
                name,
                calories,
                quantity,
                protein,
                carbs,
                fat,
                meal,
                time,
                json,
            } => cmd_plan_add_food(
                &mut engine,
                &plan,
                &name,
                calories,
                quantity,
                protein,
                carbs,
                fat,
                &meal,
                time,
                json,
            ),
            PlanCommands::RemoveFood {
                plan,
                name,
                meal,
                json,
            } => cmd_plan_remove_food(&mut engine, &plan, &name, &meal, json),
            PlanCommands::AddWater {
                plan,
                amount,
                time,
                json,
            } => cmd_plan_add_water(&mut engine, &plan, amount, time, json),
        },
        Commands::History { command } => match command {
            HistoryCommands::Show { days, json } => cmd_history_show(&engine, days, json),
            HistoryCommands::Stats { json } => cmd_history_stats(&engine, json),
            HistoryCommands::Achievements { json } => cmd_history_achievements(&engine, json),
        },
        Commands::Watch { interval } => cmd_watch(engine, interval).await,
    }
}
