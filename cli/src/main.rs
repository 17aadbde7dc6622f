mod commands;
mod config;
mod gemini;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    DishEditArgs, OfflineProvider, cmd_analyze, cmd_calendar, cmd_dish_edit, cmd_history_clear,
    cmd_history_list, cmd_history_share, cmd_history_show, cmd_ingredient_list,
    cmd_ingredient_lookup, cmd_login, cmd_logout, cmd_meal_clear, cmd_meal_log, cmd_meal_show,
    cmd_quick_add, cmd_settings_reset, cmd_settings_set, cmd_settings_show, cmd_streak,
    cmd_today, cmd_whoami, json_error,
};
use crate::config::Config;
use crate::gemini::GeminiClient;
use platewise_core::models::QuickAdd;
use platewise_core::provider::NutritionProvider;
use platewise_core::service::Tracker;

#[derive(Parser)]
#[command(
    name = "platewise",
    version,
    about = "Photograph a meal, correct the estimate, keep a calorie streak"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Show debug logs on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with an allowed email address
    Login {
        /// Email address
        email: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in email
    Whoami,
    /// Analyze a meal photo and make it the pending meal
    Analyze {
        /// JPEG, PNG, WebP, or HEIC photo
        image: PathBuf,
    },
    /// Add a dish by hand to the pending meal
    QuickAdd {
        /// Dish name
        name: String,
        /// Calories (kcal)
        #[arg(long)]
        calories: Option<i64>,
        /// Protein in grams
        #[arg(long)]
        protein: Option<i64>,
        /// Carbohydrates in grams
        #[arg(long)]
        carbs: Option<i64>,
        /// Fat in grams
        #[arg(long)]
        fat: Option<i64>,
    },
    /// Show, discard, or log the pending meal
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Correct a dish in the pending meal
    Dish {
        #[command(subcommand)]
        command: DishCommands,
    },
    /// Show today's calories against the goal
    Today,
    /// Show the current streak
    Streak,
    /// Show a month of achievements
    Calendar {
        /// Month (YYYY-MM, default: this month)
        month: Option<String>,
    },
    /// Browse saved analyses
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// View or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Look up ingredient nutrition
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Show the pending meal
    Show,
    /// Discard the pending meal
    Clear,
    /// Add the pending meal to today's calories
    Log,
}

#[derive(Subcommand)]
enum DishCommands {
    /// Edit a dish by ingredients or by totals
    Edit(DishEditArgs),
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List saved analyses, newest first
    List,
    /// Show one saved analysis
    Show {
        /// Entry ID
        id: i64,
        /// Also make it the pending meal
        #[arg(long)]
        reopen: bool,
    },
    /// Print a shareable summary
    Share {
        /// Entry ID
        id: i64,
    },
    /// Delete all saved analyses
    Clear,
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show,
    /// Change settings
    Set {
        /// Nutrient unit: g or mg
        #[arg(long)]
        unit: Option<String>,
        /// Number of analyses to keep (10-100)
        #[arg(long)]
        history_limit: Option<usize>,
        /// Daily calorie goal in kcal (1000-10000)
        #[arg(long)]
        goal: Option<i64>,
    },
    /// Restore the defaults
    Reset,
}

#[derive(Subcommand)]
enum IngredientCommands {
    /// Nutrition per 100 g, from the built-in table or Gemini
    Lookup {
        /// Ingredient name
        name: String,
    },
    /// List the built-in ingredient table
    List,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    if let Err(e) = run(cli).await {
        if json {
            println!("{}", json_error(&format!("{e:#}")));
        } else {
            eprintln!("Error: {e:#}");
        }
        process::exit(1);
    }
}

fn gemini(config: &Config) -> Result<GeminiClient> {
    GeminiClient::new(config.require_api_key()?, &config.gemini_model)
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mut tracker = Tracker::new(&config.db_path, config.allow_list.clone())?;
    let json = cli.json;

    match cli.command {
        Commands::Login { email } => cmd_login(&tracker, &config, &email, json),
        Commands::Logout => cmd_logout(&tracker, json),
        Commands::Whoami => cmd_whoami(&tracker, json),
        Commands::Analyze { image } => {
            let client = gemini(&config)?;
            cmd_analyze(&tracker, &client, &image, json).await
        }
        Commands::QuickAdd {
            name,
            calories,
            protein,
            carbs,
            fat,
        } => {
            let form = QuickAdd {
                name,
                calories,
                protein,
                carbs,
                fat,
            };
            cmd_quick_add(&tracker, form, json)
        }
        Commands::Meal { command } => match command {
            MealCommands::Show => cmd_meal_show(&tracker, json),
            MealCommands::Clear => cmd_meal_clear(&tracker, json),
            MealCommands::Log => cmd_meal_log(&tracker, json),
        },
        Commands::Dish {
            command: DishCommands::Edit(args),
        } => {
            // Unknown ingredients are dropped when no key is configured.
            let client = config
                .gemini_api_key
                .as_deref()
                .map(|key| GeminiClient::new(key, &config.gemini_model))
                .transpose()?;
            let provider: &dyn NutritionProvider = match &client {
                Some(c) => c,
                None => &OfflineProvider,
            };
            cmd_dish_edit(&mut tracker, provider, &args, json).await
        }
        Commands::Today => cmd_today(&tracker, json),
        Commands::Streak => cmd_streak(&tracker, json),
        Commands::Calendar { month } => cmd_calendar(&tracker, month.as_deref(), json),
        Commands::History { command } => match command {
            HistoryCommands::List => cmd_history_list(&tracker, json),
            HistoryCommands::Show { id, reopen } => cmd_history_show(&tracker, id, reopen, json),
            HistoryCommands::Share { id } => cmd_history_share(&tracker, id, json),
            HistoryCommands::Clear => cmd_history_clear(&tracker, json),
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show => cmd_settings_show(&tracker, json),
            SettingsCommands::Set {
                unit,
                history_limit,
                goal,
            } => cmd_settings_set(&tracker, unit.as_deref(), history_limit, goal, json),
            SettingsCommands::Reset => cmd_settings_reset(&tracker, json),
        },
        Commands::Ingredient { command } => match command {
            IngredientCommands::Lookup { name } => {
                let client = gemini(&config)?;
                cmd_ingredient_lookup(&mut tracker, &client, &name, json).await
            }
            IngredientCommands::List => cmd_ingredient_list(&tracker, json),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_dish_edit() {
        let cli = Cli::try_parse_from([
            "platewise", "dish", "edit", "2", "--add", "Trứng gà=50", "--remove", "1", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Dish {
            command: DishCommands::Edit(args),
        } = cli.command
        else {
            panic!("expected dish edit");
        };
        assert_eq!(args.index, 2);
        assert_eq!(args.add, vec!["Trứng gà=50"]);
        assert_eq!(args.remove, vec!["1"]);
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = Cli::try_parse_from([
            "platewise", "settings", "set", "--unit", "mg", "--goal", "1800",
        ])
        .unwrap();
        let Commands::Settings {
            command: SettingsCommands::Set { unit, history_limit, goal },
        } = cli.command
        else {
            panic!("expected settings set");
        };
        assert_eq!(unit.as_deref(), Some("mg"));
        assert_eq!(history_limit, None);
        assert_eq!(goal, Some(1800));
    }
}
