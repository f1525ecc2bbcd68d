//! Scone: a head converges a declared menu of recipes onto SSH-reachable
//! sous hosts. This crate is a thin facade over the seven crates that
//! implement the system — wire format, transport, SSH adapter,
//! recipe/resource DAG, dependency cache, recipe framework and the
//! Kitchen scheduler — plus one convenience entry point that wires them
//! together the way a head binary would.

use std::sync::Arc;

use scone_dag::Dag;
use scone_kitchen::{HeadConfig, Kitchen, KitchenError};
use scone_recipe::{Head, Recipe};

/// Run preparation over `menu`, then hand the prepared DAG to a Kitchen
/// and drive every recipe to completion (spec §4: Preparation followed
/// by execution). This is the orchestration a head binary's `main`
/// would otherwise have to assemble itself from
/// [`scone_kitchen::run_preparation`] and [`Kitchen::new`].
pub async fn converge(
    config: HeadConfig,
    cache: scone_cache::DependencyCache,
    head: &Head,
    menu: Vec<Box<dyn Recipe>>,
) -> Result<(), KitchenError> {
    let dag = Arc::new(Dag::new());
    let prepared = scone_kitchen::run_preparation(&dag, menu);
    let kitchen = Kitchen::new(config, cache, dag, prepared, head.variables.clone());
    kitchen.run().await
}

/// Convenient glob import for a recipe implementation: everything a
/// `Recipe` and its `prepare`/`cook` hooks need, plus
/// [`scone_recipe::register_recipe!`] to self-register it.
pub mod prelude {
    pub use scone_cache::DependencyCache;
    pub use scone_core::{ChanPro, Channel};
    pub use scone_dag::{os_user_resource, RecipeContext, RecipeId, Resource};
    pub use scone_kitchen::{HeadConfig, Kitchen, KitchenError, RecipeFailureReport, UnsatisfiableNeed};
    pub use scone_recipe::{
        construct, register_recipe, start_and_consume_attrs, BoxFuture, DependencyTracker, Head, Preparer, Recipe,
        RecipeControl, RecipeError, VarAccess, VarProxy, Variables,
    };
    pub use scone_ssh::{SousConfig, SousPool};
    pub use scone_wire::Value;

    pub use crate::converge;
}

#[cfg(test)]
mod tests {
    // Scenario-based integration coverage lives in `tests/scenarios.rs`,
    // matching the scenarios named in spec §8 (S1-S6).
}
