use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use serde::Serialize;
use tracing::debug;

use crate::achievements::{self, CalendarDay};
use crate::editor::{DishEdit, DishEditor, LookupOutcome, LookupTicket};
use crate::error::TrackerError;
use crate::food_table::IngredientTable;
use crate::history;
use crate::identity::{self, AllowList, Identity};
use crate::ledger::{self, DailyProgress};
use crate::models::{
    AchievementRecord, AnalysisResult, Dish, HistoryEntry, IngredientProfile, QuickAdd, Settings,
    StreakResult, total_calories,
};
use crate::provider::NutritionProvider;
use crate::settings;
use crate::store::{Database, KvStore, keys, load_json, save_json};

/// What logging the pending meal changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealLog {
    pub calories_added: i64,
    pub progress: DailyProgress,
    pub record: AchievementRecord,
    pub streak: StreakResult,
}

/// A committed dish edit. `unresolved` names the rows whose lookup failed;
/// they were left off the dish.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedDish {
    pub dish: Dish,
    pub unresolved: Vec<String>,
}

/// Everything a front end needs, over one database and one session's
/// ingredient table.
pub struct Tracker {
    db: Database,
    allow_list: AllowList,
    table: IngredientTable,
}

impl Tracker {
    pub fn new(db_path: &Path, allow_list: AllowList) -> Result<Self> {
        Ok(Self::with_database(Database::open(db_path)?, allow_list))
    }

    pub fn new_in_memory(allow_list: AllowList) -> Result<Self> {
        Ok(Self::with_database(Database::open_in_memory()?, allow_list))
    }

    #[must_use]
    pub fn with_database(db: Database, allow_list: AllowList) -> Self {
        Self {
            db,
            allow_list,
            table: IngredientTable::new(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &IngredientTable {
        &self.table
    }

    // --- Identity ---

    pub fn login(&self, email: &str) -> Result<Identity> {
        identity::login(&self.db, &self.allow_list, email)
    }

    pub fn logout(&self) -> Result<bool> {
        identity::logout(&self.db)
    }

    pub fn current_user(&self) -> Result<Option<Identity>> {
        identity::current_user(&self.db, &self.allow_list)
    }

    /// The logged-in user, or `TrackerError::NotLoggedIn`.
    pub fn require_user(&self) -> Result<Identity> {
        self.current_user()?
            .ok_or_else(|| TrackerError::NotLoggedIn.into())
    }

    // --- Settings ---

    pub fn settings(&self, user: &Identity) -> Result<Settings> {
        settings::load(&self.db, user)
    }

    /// Save settings and trim stored history to the new limit.
    pub fn save_settings(&self, user: &Identity, new: &Settings) -> Result<Settings> {
        settings::save(&self.db, user, new)?;
        self.trim_history(user, new.history_limit)?;
        Ok(*new)
    }

    pub fn reset_settings(&self, user: &Identity) -> Result<Settings> {
        let defaults = settings::reset(&self.db, user)?;
        self.trim_history(user, defaults.history_limit)?;
        Ok(defaults)
    }

    fn trim_history(&self, user: &Identity, limit: usize) -> Result<()> {
        let entries = history::load(&self.db, user)?;
        if entries.len() > limit {
            debug!(user = %user, from = entries.len(), to = limit, "trimming history");
            history::save(&self.db, user, &entries, limit)?;
        }
        Ok(())
    }

    // --- History ---

    pub fn history(&self, user: &Identity) -> Result<Vec<HistoryEntry>> {
        history::load(&self.db, user)
    }

    pub fn history_entry(&self, user: &Identity, id: i64) -> Result<Option<HistoryEntry>> {
        history::find(&self.db, user, id)
    }

    pub fn clear_history(&self, user: &Identity) -> Result<()> {
        history::clear(&self.db, user)
    }

    pub fn share_text(&self, user: &Identity, id: i64) -> Result<Option<String>> {
        let unit = self.settings(user)?.nutrient_unit;
        Ok(self
            .history_entry(user, id)?
            .map(|entry| history::share_text(&entry, unit)))
    }

    /// Make a saved analysis the pending meal again.
    pub fn reopen(&self, user: &Identity, id: i64) -> Result<Option<AnalysisResult>> {
        let Some(entry) = self.history_entry(user, id)? else {
            return Ok(None);
        };
        self.set_pending_meal(user, &entry.analysis_result)?;
        Ok(Some(entry.analysis_result))
    }

    // --- Pending meal ---

    pub fn pending_meal(&self, user: &Identity) -> Result<AnalysisResult> {
        Ok(load_json(&self.db, &keys::pending_meal(user))?.unwrap_or_default())
    }

    pub fn set_pending_meal(&self, user: &Identity, dishes: &[Dish]) -> Result<()> {
        save_json(&self.db, &keys::pending_meal(user), dishes)
    }

    pub fn clear_pending_meal(&self, user: &Identity) -> Result<bool> {
        self.db.remove(&keys::pending_meal(user))
    }

    /// Append a manually entered dish to the pending meal.
    pub fn quick_add(&self, user: &Identity, form: QuickAdd) -> Result<AnalysisResult> {
        let dish = form.into_dish()?;
        let mut dishes = self.pending_meal(user)?;
        dishes.push(dish);
        self.set_pending_meal(user, &dishes)?;
        Ok(dishes)
    }

    // --- Analysis & lookups ---

    /// Analyse a photo, make the result the pending meal, and save it to
    /// history when anything was found.
    pub async fn analyze(
        &self,
        provider: &dyn NutritionProvider,
        user: &Identity,
        image: &[u8],
        mime_type: &str,
        image_preview: String,
        now_millis: i64,
    ) -> Result<AnalysisResult> {
        let dishes = provider.analyze_image(image, mime_type).await?;
        self.set_pending_meal(user, &dishes)?;
        if !dishes.is_empty() {
            let limit = self.settings(user)?.history_limit;
            let existing = history::load(&self.db, user)?;
            let entry = HistoryEntry {
                id: history::next_id(&existing, now_millis),
                image_preview,
                analysis_result: dishes.clone(),
            };
            history::record(&self.db, user, entry, limit)?;
        }
        Ok(dishes)
    }

    /// Look up one ingredient: the table first, then the provider. Provider
    /// results are cached for the rest of the session.
    pub async fn lookup_ingredient(
        &mut self,
        provider: &dyn NutritionProvider,
        name: &str,
    ) -> Result<IngredientProfile> {
        if let Some(profile) = self.table.lookup(name) {
            return Ok(profile.clone());
        }
        if name.trim().is_empty() {
            return Err(TrackerError::validation("Please enter an ingredient name").into());
        }
        let profile = provider.lookup_ingredient(name).await?.named(name.trim());
        self.table.add_to_cache(profile.clone());
        Ok(profile)
    }

    /// Run the lookups concurrently and feed each result to the editor as it
    /// arrives.
    pub async fn resolve_lookups(
        &mut self,
        provider: &dyn NutritionProvider,
        editor: &mut DishEditor,
        tickets: Vec<LookupTicket>,
    ) -> Vec<(LookupTicket, LookupOutcome)> {
        let mut in_flight: FuturesUnordered<_> = tickets
            .into_iter()
            .map(|ticket| async move {
                let result = provider.lookup_ingredient(&ticket.name).await;
                (ticket, result)
            })
            .collect();

        let mut outcomes = Vec::new();
        while let Some((ticket, result)) = in_flight.next().await {
            let outcome = editor.complete_lookup(&ticket, result, &mut self.table);
            outcomes.push((ticket, outcome));
        }
        outcomes
    }

    /// Apply `edits` to pending dish `index`, resolve unknown ingredients,
    /// commit, and store the result back in the pending meal.
    ///
    /// Name and description changes alone leave totals and rows untouched.
    /// Otherwise every row the table cannot resolve is looked up before the
    /// commit, so known-good rows are not dropped for being unfamiliar.
    pub async fn edit_dish(
        &mut self,
        provider: &dyn NutritionProvider,
        user: &Identity,
        index: usize,
        edits: Vec<DishEdit>,
    ) -> Result<EditedDish> {
        let mut dishes = self.pending_meal(user)?;
        let Some(dish) = dishes.get(index).cloned() else {
            return Err(TrackerError::validation(format!(
                "No dish #{} in the pending meal ({} dishes)",
                index + 1,
                dishes.len()
            ))
            .into());
        };

        let touches_totals = edits.iter().any(DishEdit::touches_totals);
        if !touches_totals && !edits.iter().any(DishEdit::touches_ingredients) {
            let mut edited = dish;
            for edit in edits {
                match edit {
                    DishEdit::Name(name) => edited.name = name,
                    DishEdit::Description(text) => edited.description = text,
                    _ => {}
                }
            }
            dishes[index] = edited.clone();
            self.set_pending_meal(user, &dishes)?;
            return Ok(EditedDish {
                dish: edited,
                unresolved: Vec::new(),
            });
        }

        let mut editor = DishEditor::new(dish);
        editor.begin_edit().map_err(TrackerError::from)?;
        let mut tickets = if touches_totals {
            Vec::new()
        } else {
            editor.unresolved_tickets(&self.table).map_err(TrackerError::from)?
        };
        for edit in edits {
            if let Some(ticket) = editor.apply(edit, &self.table).map_err(TrackerError::from)? {
                tickets.push(ticket);
            }
        }
        let outcomes = self.resolve_lookups(provider, &mut editor, tickets).await;

        // Only failures for rows still on the dish matter to the caller.
        let unresolved = outcomes
            .into_iter()
            .filter(|(ticket, outcome)| {
                *outcome == LookupOutcome::Failed
                    && editor
                        .dish()
                        .ingredients
                        .iter()
                        .any(|i| i.name.trim().to_lowercase() == ticket.name.to_lowercase())
            })
            .map(|(ticket, _)| ticket.name)
            .collect();

        let committed = editor.commit(&self.table).map_err(TrackerError::from)?.clone();
        dishes[index] = committed.clone();
        self.set_pending_meal(user, &dishes)?;
        Ok(EditedDish {
            dish: committed,
            unresolved,
        })
    }

    // --- Daily tracking ---

    /// Add the pending meal to today's intake, record the achievement, and
    /// clear the pending meal.
    pub fn log_meal(&self, user: &Identity, today: NaiveDate) -> Result<MealLog> {
        let dishes = self.pending_meal(user)?;
        if dishes.is_empty() {
            return Err(TrackerError::validation(
                "Nothing to log. Analyze a photo or quick-add a dish first",
            )
            .into());
        }
        let calories = total_calories(&dishes);
        let goal = self.settings(user)?.daily_calorie_goal;

        let intake = ledger::log_meal(&self.db, user, calories, today)?;
        let history = achievements::update(&self.db, user, intake.consumed_calories, goal, today)?;
        let streak = achievements::calculate_streak(&history, today);
        self.clear_pending_meal(user)?;

        Ok(MealLog {
            calories_added: calories,
            progress: DailyProgress::new(&intake, goal),
            record: history.get(&today).copied().unwrap_or_default(),
            streak,
        })
    }

    pub fn daily_progress(&self, user: &Identity, today: NaiveDate) -> Result<DailyProgress> {
        let intake = ledger::get(&self.db, user, today)?;
        let goal = self.settings(user)?.daily_calorie_goal;
        Ok(DailyProgress::new(&intake, goal))
    }

    pub fn streak(&self, user: &Identity, today: NaiveDate) -> Result<StreakResult> {
        let history = achievements::load(&self.db, user)?;
        Ok(achievements::calculate_streak(&history, today))
    }

    pub fn calendar(
        &self,
        user: &Identity,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> Result<Vec<CalendarDay>> {
        let history = achievements::load(&self.db, user)?;
        Ok(achievements::month_calendar(&history, year, month, today))
    }
}
