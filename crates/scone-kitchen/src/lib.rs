//! Preparation phase and the Kitchen scheduler (spec §4.4/§4.6): wires
//! the recipe framework in `scone-recipe` to a live [`scone_dag::Dag`],
//! a [`scone_cache::DependencyCache`] and a [`scone_ssh::SousPool`], and
//! drives a menu of recipes to completion.

mod config;
mod control;
mod error;
mod preparation;
mod scheduler;

pub use config::{HeadConfig, DEFAULT_POOL_SIZE};
pub use error::{KitchenError, RecipeFailureReport, UnsatisfiableNeed};
pub use preparation::run_preparation;
pub use scheduler::Kitchen;
