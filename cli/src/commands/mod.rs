mod day;
mod goals;
mod helpers;
mod history;
mod log;
mod plan;
mod watch;

pub(crate) use day::cmd_day;
pub(crate) use goals::{cmd_goals_set, cmd_goals_show};
pub(crate) use history::{cmd_history_achievements, cmd_history_show, cmd_history_stats};
pub(crate) use log::{cmd_log_food, cmd_log_water, cmd_mark, cmd_remove};
pub(crate) use plan::{
    cmd_plan_activate, cmd_plan_add_food, cmd_plan_add_water, cmd_plan_create, cmd_plan_list,
    cmd_plan_remove_food, cmd_plan_show,
};
pub(crate) use watch::cmd_watch;
