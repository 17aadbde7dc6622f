mod analyze;
mod auth;
mod dish;
mod helpers;
mod history;
mod ingredient;
mod meal;
mod progress;
mod settings;

pub(crate) use analyze::{cmd_analyze, cmd_quick_add};
pub(crate) use auth::{cmd_login, cmd_logout, cmd_whoami};
pub(crate) use dish::{DishEditArgs, OfflineProvider, cmd_dish_edit};
pub(crate) use helpers::json_error;
pub(crate) use history::{
    cmd_history_clear, cmd_history_list, cmd_history_share, cmd_history_show,
};
pub(crate) use ingredient::{cmd_ingredient_list, cmd_ingredient_lookup};
pub(crate) use meal::{cmd_meal_clear, cmd_meal_log, cmd_meal_show};
pub(crate) use progress::{cmd_calendar, cmd_streak, cmd_today};
pub(crate) use settings::{cmd_settings_reset, cmd_settings_set, cmd_settings_show};
