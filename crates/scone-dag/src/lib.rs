//! The bipartite recipe/resource dependency graph (spec §3, §4.3):
//! vertices are recipes or resources, edges mean "may not start until
//! completed", and every vertex tracks how many of its in-neighbours
//! are still uncompleted.

mod graph;
mod recipe;
mod resource;

pub use graph::{Dag, ProvideEdgeOutcome, VertexId};
pub use recipe::{RecipeContext, RecipeId, RecipeState};
pub use resource::{os_user_resource, Resource};
