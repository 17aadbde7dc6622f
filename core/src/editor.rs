//! Editing a single analyzed dish.
//!
//! A dish is either being viewed or being edited in exactly one of two
//! sub-modes. While editing by ingredients the totals are derived from the
//! ingredient rows; while editing totals the user types them in and the
//! ingredient rows are dropped on commit.
//!
//! Renaming a row to an ingredient the table does not know yields a
//! [`LookupTicket`]. The caller runs the lookup however it likes and hands the
//! result back through [`DishEditor::complete_lookup`]; tickets from a session
//! that has since been committed or cancelled are discarded.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EditError;
use crate::food_table::IngredientTable;
use crate::models::{Dish, Ingredient, MacroKind, NutrientProfile, format_entered_grams};
use crate::nutrition::{aggregate, resolvable_ingredients};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    Viewing,
    Ingredients,
    Totals,
}

/// The in-progress copy of a dish plus what is needed to cancel it.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCopy {
    committed: Dish,
    dish: Dish,
    /// Normalised names with a lookup in flight.
    pending: BTreeSet<String>,
    generation: u64,
}

impl WorkingCopy {
    fn new(committed: Dish, generation: u64) -> Self {
        Self {
            dish: committed.clone(),
            committed,
            pending: BTreeSet::new(),
            generation,
        }
    }

    fn recompute(&mut self, table: &IngredientTable) {
        let totals = aggregate(table, &self.dish.ingredients);
        self.dish.calories = totals.calories;
        self.dish.macros = totals.macros;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DishState {
    Viewing(Dish),
    EditingByIngredients(WorkingCopy),
    EditingByTotals(WorkingCopy),
}

impl DishState {
    #[must_use]
    pub fn begin_edit(self, generation: u64) -> Self {
        match self {
            Self::Viewing(dish) => Self::EditingByIngredients(WorkingCopy::new(dish, generation)),
            other => other,
        }
    }

    #[must_use]
    pub fn toggle_mode(self) -> Self {
        match self {
            Self::EditingByIngredients(w) => Self::EditingByTotals(w),
            Self::EditingByTotals(w) => Self::EditingByIngredients(w),
            viewing @ Self::Viewing(_) => viewing,
        }
    }

    #[must_use]
    pub fn commit(self, table: &IngredientTable) -> Self {
        match self {
            Self::EditingByIngredients(w) => {
                let mut dish = w.dish;
                dish.ingredients = resolvable_ingredients(table, &dish.ingredients);
                let totals = aggregate(table, &dish.ingredients);
                dish.calories = totals.calories;
                dish.macros = totals.macros;
                Self::Viewing(dish)
            }
            Self::EditingByTotals(w) => {
                let mut dish = w.dish;
                dish.ingredients.clear();
                Self::Viewing(dish)
            }
            viewing @ Self::Viewing(_) => viewing,
        }
    }

    #[must_use]
    pub fn cancel(self) -> Self {
        match self {
            Self::EditingByIngredients(w) | Self::EditingByTotals(w) => Self::Viewing(w.committed),
            viewing @ Self::Viewing(_) => viewing,
        }
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        match self {
            Self::Viewing(_) => EditMode::Viewing,
            Self::EditingByIngredients(_) => EditMode::Ingredients,
            Self::EditingByTotals(_) => EditMode::Totals,
        }
    }

    #[must_use]
    pub fn dish(&self) -> &Dish {
        match self {
            Self::Viewing(dish) => dish,
            Self::EditingByIngredients(w) | Self::EditingByTotals(w) => &w.dish,
        }
    }

    fn working_mut(&mut self) -> Result<&mut WorkingCopy, EditError> {
        match self {
            Self::EditingByIngredients(w) | Self::EditingByTotals(w) => Ok(w),
            Self::Viewing(_) => Err(EditError::NotEditing),
        }
    }
}

/// Handed out when a row needs an external nutrition lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub name: String,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The profile was cached and, when editing by ingredients, totals were refreshed.
    Applied,
    /// The lookup failed; the row stays unresolved.
    Failed,
    /// The session the ticket belonged to is over; the result was dropped.
    Stale,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct DishEditor {
    state: DishState,
    generation: u64,
}

impl DishEditor {
    #[must_use]
    pub fn new(dish: Dish) -> Self {
        Self {
            state: DishState::Viewing(dish),
            generation: 0,
        }
    }

    fn transition(&mut self, f: impl FnOnce(DishState) -> DishState) {
        let state = std::mem::replace(&mut self.state, DishState::Viewing(Dish::default()));
        self.state = f(state);
    }

    #[must_use]
    pub fn state(&self) -> &DishState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        self.state.mode()
    }

    /// The dish as currently shown: the working copy while editing.
    #[must_use]
    pub fn dish(&self) -> &Dish {
        self.state.dish()
    }

    #[must_use]
    pub fn into_dish(self) -> Dish {
        match self.state {
            DishState::Viewing(dish) => dish,
            DishState::EditingByIngredients(w) | DishState::EditingByTotals(w) => w.committed,
        }
    }

    pub fn begin_edit(&mut self) -> Result<(), EditError> {
        if self.mode() != EditMode::Viewing {
            return Err(EditError::AlreadyEditing);
        }
        self.generation += 1;
        let generation = self.generation;
        self.transition(|s| s.begin_edit(generation));
        Ok(())
    }

    pub fn toggle_mode(&mut self) -> Result<EditMode, EditError> {
        if self.mode() == EditMode::Viewing {
            return Err(EditError::NotEditing);
        }
        self.transition(DishState::toggle_mode);
        Ok(self.mode())
    }

    /// Switch to `mode` if not already there.
    pub fn set_mode(&mut self, mode: EditMode) -> Result<(), EditError> {
        match (self.mode(), mode) {
            (EditMode::Viewing, _) => Err(EditError::NotEditing),
            (_, EditMode::Viewing) => Err(EditError::AlreadyEditing),
            (current, wanted) if current == wanted => Ok(()),
            _ => self.toggle_mode().map(|_| ()),
        }
    }

    pub fn commit(&mut self, table: &IngredientTable) -> Result<&Dish, EditError> {
        if self.mode() == EditMode::Viewing {
            return Err(EditError::NotEditing);
        }
        self.generation += 1;
        self.transition(|s| s.commit(table));
        Ok(self.dish())
    }

    pub fn cancel(&mut self) -> Result<(), EditError> {
        if self.mode() == EditMode::Viewing {
            return Err(EditError::NotEditing);
        }
        self.generation += 1;
        self.transition(DishState::cancel);
        Ok(())
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), EditError> {
        self.state.working_mut()?.dish.name = name.to_string();
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) -> Result<(), EditError> {
        self.state.working_mut()?.dish.description = description.to_string();
        Ok(())
    }

    fn ingredients_mut(&mut self) -> Result<&mut WorkingCopy, EditError> {
        match &mut self.state {
            DishState::EditingByIngredients(w) => Ok(w),
            DishState::EditingByTotals(_) => Err(EditError::NotEditingIngredients),
            DishState::Viewing(_) => Err(EditError::NotEditing),
        }
    }

    fn totals_mut(&mut self) -> Result<&mut WorkingCopy, EditError> {
        match &mut self.state {
            DishState::EditingByTotals(w) => Ok(w),
            DishState::EditingByIngredients(_) => Err(EditError::NotEditingTotals),
            DishState::Viewing(_) => Err(EditError::NotEditing),
        }
    }

    /// Issue a ticket for `name` unless it resolves already or is in flight.
    fn ticket_for(w: &mut WorkingCopy, name: &str, table: &IngredientTable) -> Option<LookupTicket> {
        let key = normalize(name);
        if key.is_empty() || table.contains(&key) || !w.pending.insert(key) {
            return None;
        }
        Some(LookupTicket {
            name: name.trim().to_string(),
            generation: w.generation,
        })
    }

    /// Append a row. An unknown, non-empty name comes back as a lookup ticket.
    pub fn add_ingredient(
        &mut self,
        ingredient: Ingredient,
        table: &IngredientTable,
    ) -> Result<Option<LookupTicket>, EditError> {
        let w = self.ingredients_mut()?;
        let grams = sanitize(ingredient.grams);
        let ticket = Self::ticket_for(w, &ingredient.name, table);
        w.dish.ingredients.push(Ingredient {
            name: ingredient.name,
            grams,
        });
        w.recompute(table);
        Ok(ticket)
    }

    pub fn remove_ingredient(&mut self, row: usize, table: &IngredientTable) -> Result<Ingredient, EditError> {
        let w = self.ingredients_mut()?;
        if row >= w.dish.ingredients.len() {
            return Err(EditError::NoSuchRow(row));
        }
        let removed = w.dish.ingredients.remove(row);
        w.recompute(table);
        Ok(removed)
    }

    pub fn rename_ingredient(
        &mut self,
        row: usize,
        name: &str,
        table: &IngredientTable,
    ) -> Result<Option<LookupTicket>, EditError> {
        let w = self.ingredients_mut()?;
        let ingredient = w.dish.ingredients.get_mut(row).ok_or(EditError::NoSuchRow(row))?;
        ingredient.name = name.to_string();
        let ticket = Self::ticket_for(w, name, table);
        w.recompute(table);
        Ok(ticket)
    }

    pub fn set_grams(&mut self, row: usize, grams: f64, table: &IngredientTable) -> Result<(), EditError> {
        let w = self.ingredients_mut()?;
        let ingredient = w.dish.ingredients.get_mut(row).ok_or(EditError::NoSuchRow(row))?;
        ingredient.grams = sanitize(grams);
        w.recompute(table);
        Ok(())
    }

    pub fn set_calories(&mut self, calories: i64) -> Result<(), EditError> {
        self.totals_mut()?.dish.calories = calories.max(0);
        Ok(())
    }

    pub fn set_macro(&mut self, kind: MacroKind, grams: f64) -> Result<(), EditError> {
        let value = format_entered_grams(sanitize(grams));
        self.totals_mut()?.dish.macros.set(kind, value);
        Ok(())
    }

    /// Tickets for rows already on the dish that the table cannot resolve.
    /// Without them an ingredient-mode commit would drop those rows.
    pub fn unresolved_tickets(&mut self, table: &IngredientTable) -> Result<Vec<LookupTicket>, EditError> {
        let w = self.ingredients_mut()?;
        let names: Vec<String> = w.dish.ingredients.iter().map(|i| i.name.clone()).collect();
        Ok(names
            .iter()
            .filter_map(|name| Self::ticket_for(w, name, table))
            .collect())
    }

    /// Whether the row's ingredient has a lookup in flight.
    #[must_use]
    pub fn is_loading(&self, row: usize) -> bool {
        match &self.state {
            DishState::EditingByIngredients(w) | DishState::EditingByTotals(w) => w
                .dish
                .ingredients
                .get(row)
                .is_some_and(|i| w.pending.contains(&normalize(&i.name))),
            DishState::Viewing(_) => false,
        }
    }

    /// Feed a finished lookup back into the session that asked for it.
    pub fn complete_lookup(
        &mut self,
        ticket: &LookupTicket,
        result: anyhow::Result<NutrientProfile>,
        table: &mut IngredientTable,
    ) -> LookupOutcome {
        let w = match &mut self.state {
            DishState::EditingByIngredients(w) | DishState::EditingByTotals(w)
                if w.generation == ticket.generation =>
            {
                w
            }
            _ => {
                debug!(ingredient = %ticket.name, "dropping lookup result for a finished edit session");
                return LookupOutcome::Stale;
            }
        };
        w.pending.remove(&normalize(&ticket.name));

        match result {
            Ok(profile) => {
                table.add_to_cache(profile.named(ticket.name.clone()));
                if let DishState::EditingByIngredients(w) = &mut self.state {
                    w.recompute(table);
                }
                LookupOutcome::Applied
            }
            Err(e) => {
                warn!(ingredient = %ticket.name, error = %e, "ingredient lookup failed");
                LookupOutcome::Failed
            }
        }
    }
}

/// A single user edit, as collected from a form or the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum DishEdit {
    Name(String),
    Description(String),
    Mode(EditMode),
    AddIngredient(Ingredient),
    RemoveIngredient(usize),
    RenameIngredient { row: usize, name: String },
    SetGrams { row: usize, grams: f64 },
    Calories(i64),
    Macro(MacroKind, f64),
}

impl DishEdit {
    /// Adds, removes, renames, or reweighs a row, or asks for ingredient mode.
    #[must_use]
    pub fn touches_ingredients(&self) -> bool {
        matches!(
            self,
            Self::AddIngredient(_)
                | Self::RemoveIngredient(_)
                | Self::RenameIngredient { .. }
                | Self::SetGrams { .. }
                | Self::Mode(EditMode::Ingredients)
        )
    }

    #[must_use]
    pub fn touches_totals(&self) -> bool {
        matches!(
            self,
            Self::Calories(_) | Self::Macro(..) | Self::Mode(EditMode::Totals)
        )
    }
}

impl DishEditor {
    pub fn apply(
        &mut self,
        edit: DishEdit,
        table: &IngredientTable,
    ) -> Result<Option<LookupTicket>, EditError> {
        match edit {
            DishEdit::Name(name) => self.set_name(&name).map(|()| None),
            DishEdit::Description(text) => self.set_description(&text).map(|()| None),
            DishEdit::Mode(mode) => self.set_mode(mode).map(|()| None),
            DishEdit::AddIngredient(ingredient) => self.add_ingredient(ingredient, table),
            DishEdit::RemoveIngredient(row) => self.remove_ingredient(row, table).map(|_| None),
            DishEdit::RenameIngredient { row, name } => self.rename_ingredient(row, &name, table),
            DishEdit::SetGrams { row, grams } => self.set_grams(row, grams, table).map(|()| None),
            DishEdit::Calories(calories) => self.set_calories(calories).map(|()| None),
            DishEdit::Macro(kind, grams) => self.set_macro(kind, grams).map(|()| None),
        }
    }
}

fn sanitize(grams: f64) -> f64 {
    if grams.is_finite() { grams.max(0.0) } else { 0.0 }
}
