use thiserror::Error;

/// Failures the tracker reports to its callers.
///
/// Service functions return `anyhow::Result` and wrap these, so front ends can
/// `downcast_ref::<TrackerError>()` to pick a message or exit code.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The image analysis call failed or returned something other than a dish list.
    #[error("Failed to analyze the image: {0}")]
    Analysis(String),

    /// A single ingredient lookup failed. Never fatal to an edit session.
    #[error("Failed to look up nutrition for '{name}': {reason}")]
    IngredientLookup { name: String, reason: String },

    /// A required field is missing or out of range.
    #[error("{0}")]
    Validation(String),

    #[error("'{0}' is not allowed to use this app")]
    NotAllowed(String),

    #[error("Not logged in. Run `platewise login <email>` first")]
    NotLoggedIn,

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Dish editor operations attempted from the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("The dish is not being edited")]
    NotEditing,

    #[error("The dish is already being edited")]
    AlreadyEditing,

    #[error("Ingredients can only be changed while editing by ingredients")]
    NotEditingIngredients,

    #[error("Totals can only be changed while editing totals directly")]
    NotEditingTotals,

    #[error("No ingredient at row {0}")]
    NoSuchRow(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_error_converts_into_tracker_error() {
        let err: TrackerError = EditError::NoSuchRow(3).into();
        assert_eq!(err.to_string(), "No ingredient at row 3");
    }

    #[test]
    fn test_tracker_error_downcasts_through_anyhow() {
        let err = anyhow::Error::new(TrackerError::NotLoggedIn);
        assert!(matches!(
            err.downcast_ref::<TrackerError>(),
            Some(TrackerError::NotLoggedIn)
        ));
    }
}
