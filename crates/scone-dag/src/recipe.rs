/// Opaque handle the DAG hands out when a recipe is added. Recipes
/// themselves live in `scone-recipe`; the DAG only ever sees this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecipeId(pub u64);

/// Lifecycle states from spec §3: "LOADED → PREPARED → PENDING →
/// COOKABLE → BEING_COOKED → {COOKED | SKIPPED | FAILED}".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecipeState {
    Loaded,
    Prepared,
    Pending,
    Cookable,
    BeingCooked,
    Cooked,
    Skipped,
    Failed,
}

impl RecipeState {
    /// `is_completed ≡ state ∈ {COOKED, SKIPPED}` (spec §3).
    pub fn is_completed(self) -> bool {
        matches!(self, RecipeState::Cooked | RecipeState::Skipped)
    }
}

/// Host, user, slug, source reference, human label — used to key the
/// dependency cache alongside the argument hash (spec §3).
#[derive(Clone, Debug)]
pub struct RecipeContext {
    pub sous: String,
    pub user: String,
    pub slug: String,
    pub source: Option<String>,
    pub label: Option<String>,
}

impl RecipeContext {
    pub fn new(sous: impl Into<String>, user: impl Into<String>, slug: impl Into<String>) -> Self {
        RecipeContext {
            sous: sous.into(),
            user: user.into(),
            slug: slug.into(),
            source: None,
            label: None,
        }
    }
}
