use anyhow::{Result, bail};
use async_trait::async_trait;
use clap::Args;

use platewise_core::editor::{DishEdit, EditMode};
use platewise_core::error::TrackerError;
use platewise_core::models::{Dish, Ingredient, MacroKind, NutrientProfile};
use platewise_core::provider::NutritionProvider;
use platewise_core::service::Tracker;

use super::helpers::{parse_grams, parse_row, print_dish_detail, print_json, split_assignment};

#[derive(Args, Debug, Default)]
pub(crate) struct DishEditArgs {
    /// Dish number in the pending meal (from `platewise meal show`)
    pub index: usize,
    /// New dish name
    #[arg(long)]
    pub name: Option<String>,
    /// New description
    #[arg(long)]
    pub description: Option<String>,
    /// Add an ingredient: NAME=GRAMS (repeatable)
    #[arg(long, value_name = "NAME=GRAMS")]
    pub add: Vec<String>,
    /// Remove ingredient row (repeatable)
    #[arg(long, value_name = "ROW")]
    pub remove: Vec<String>,
    /// Rename ingredient row: ROW=NAME (repeatable)
    #[arg(long, value_name = "ROW=NAME")]
    pub rename: Vec<String>,
    /// Change ingredient amount: ROW=GRAMS (repeatable)
    #[arg(long, value_name = "ROW=GRAMS")]
    pub grams: Vec<String>,
    /// Edit totals directly and drop the ingredient list
    #[arg(long)]
    pub totals: bool,
    /// Total calories (implies --totals)
    #[arg(long)]
    pub calories: Option<i64>,
    /// Protein in grams (implies --totals)
    #[arg(long)]
    pub protein: Option<f64>,
    /// Carbohydrates in grams (implies --totals)
    #[arg(long)]
    pub carbs: Option<f64>,
    /// Fat in grams (implies --totals)
    #[arg(long)]
    pub fat: Option<f64>,
}

impl DishEditArgs {
    fn edits_totals(&self) -> bool {
        self.totals
            || self.calories.is_some()
            || self.protein.is_some()
            || self.carbs.is_some()
            || self.fat.is_some()
    }

    fn edits_ingredients(&self) -> bool {
        !(self.add.is_empty()
            && self.remove.is_empty()
            && self.rename.is_empty()
            && self.grams.is_empty())
    }
}

/// Turn the flags into editor operations. Row edits run before removals, and
/// removals run from the bottom up so earlier row numbers stay valid.
fn build_edits(args: &DishEditArgs) -> Result<Vec<DishEdit>> {
    if args.edits_totals() && args.edits_ingredients() {
        bail!("Edit either the ingredients or the totals, not both at once");
    }

    let mut edits = Vec::new();
    if let Some(name) = &args.name {
        edits.push(DishEdit::Name(name.clone()));
    }
    if let Some(description) = &args.description {
        edits.push(DishEdit::Description(description.clone()));
    }

    if args.edits_totals() {
        edits.push(DishEdit::Mode(EditMode::Totals));
        if let Some(calories) = args.calories {
            edits.push(DishEdit::Calories(calories));
        }
        for (kind, value) in [
            (MacroKind::Protein, args.protein),
            (MacroKind::Carbohydrates, args.carbs),
            (MacroKind::Fat, args.fat),
        ] {
            if let Some(grams) = value {
                edits.push(DishEdit::Macro(kind, grams));
            }
        }
        return Ok(edits);
    }

    for arg in &args.rename {
        let (row, name) = split_assignment(arg)?;
        edits.push(DishEdit::RenameIngredient {
            row: parse_row(row)?,
            name: name.to_string(),
        });
    }
    for arg in &args.grams {
        let (row, grams) = split_assignment(arg)?;
        edits.push(DishEdit::SetGrams {
            row: parse_row(row)?,
            grams: parse_grams(grams)?,
        });
    }

    let mut removals = args
        .remove
        .iter()
        .map(|r| parse_row(r))
        .collect::<Result<Vec<_>>>()?;
    removals.sort_unstable_by(|a, b| b.cmp(a));
    removals.dedup();
    edits.extend(removals.into_iter().map(DishEdit::RemoveIngredient));

    for arg in &args.add {
        let (name, grams) = split_assignment(arg)?;
        if name.is_empty() {
            bail!("Ingredient name must not be empty in '{arg}'");
        }
        edits.push(DishEdit::AddIngredient(Ingredient::new(name, parse_grams(grams)?)));
    }
    Ok(edits)
}

/// Stand-in when no API key is configured: every lookup fails and the
/// unknown ingredient is left out of the dish.
pub(crate) struct OfflineProvider;

#[async_trait]
impl NutritionProvider for OfflineProvider {
    async fn analyze_image(&self, _image: &[u8], _mime_type: &str) -> Result<Vec<Dish>> {
        Err(TrackerError::Analysis("GEMINI_API_KEY is not set".to_string()).into())
    }

    async fn lookup_ingredient(&self, name: &str) -> Result<NutrientProfile> {
        Err(TrackerError::IngredientLookup {
            name: name.to_string(),
            reason: "GEMINI_API_KEY is not set".to_string(),
        }
        .into())
    }
}

pub(crate) async fn cmd_dish_edit(
    tracker: &mut Tracker,
    provider: &dyn NutritionProvider,
    args: &DishEditArgs,
    json: bool,
) -> Result<()> {
    let user = tracker.require_user()?;
    if args.index == 0 {
        bail!("Dishes are numbered from 1");
    }
    let index = args.index - 1;
    let edits = build_edits(args)?;
    let edited = tracker.edit_dish(provider, &user, index, edits).await?;

    if json {
        return print_json(&edited);
    }
    for name in &edited.unresolved {
        eprintln!("Could not find nutrition for '{name}'; it was left out");
    }
    print_dish_detail(index, &edited.dish, tracker.settings(&user)?.nutrient_unit);
    Ok(())
}
