use std::fmt;

/// Failures a recipe's `cook` hook can surface (spec §4.6/§4.7).
#[derive(Debug)]
pub enum RecipeError {
    Channel(scone_core::ChannelError),
    Core(scone_core::CoreError),
    /// A utensil's structured reply didn't match the shape the recipe
    /// asked for via `start_and_consume_attrs`.
    Decode(serde_json::Error),
    /// Anything recipe-specific (a failed precondition, a utensil that
    /// reported its own failure in-band).
    Message(String),
}

impl fmt::Display for RecipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeError::Channel(e) => write!(f, "{e}"),
            RecipeError::Core(e) => write!(f, "{e}"),
            RecipeError::Decode(e) => write!(f, "failed to decode utensil reply: {e}"),
            RecipeError::Message(m) => write!(f, "{m}"),
        }
    }
}

impl std::error::Error for RecipeError {}

impl From<scone_core::ChannelError> for RecipeError {
    fn from(e: scone_core::ChannelError) -> Self {
        RecipeError::Channel(e)
    }
}

impl From<scone_core::CoreError> for RecipeError {
    fn from(e: scone_core::CoreError) -> Self {
        RecipeError::Core(e)
    }
}
