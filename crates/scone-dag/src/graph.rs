use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::recipe::{RecipeId, RecipeState};
use crate::resource::Resource;

/// Either kind of DAG vertex (spec §3: "Vertices are `Recipe | Resource`").
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VertexId {
    Recipe(RecipeId),
    Resource(Resource),
}

impl VertexId {
    pub fn as_recipe(&self) -> Option<RecipeId> {
        match self {
            VertexId::Recipe(id) => Some(*id),
            VertexId::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            VertexId::Resource(r) => Some(r),
            VertexId::Recipe(_) => None,
        }
    }
}

struct ResourceNode {
    completed: bool,
    incoming_uncompleted: u32,
    hard_need: bool,
    /// Set once any provider of this resource has completed
    /// successfully. Distinguishes "every provider is done, and at
    /// least one of them actually provided it" from "every provider is
    /// done, and none of them did" (all failed) when deciding whether
    /// a hard need can still be satisfied.
    any_provided: bool,
}

/// Result of a provider recipe finishing (successfully or not) and
/// that completion being applied to one of its `provides` edges
/// (spec §7: "edge decrements still happen so that dependents with
/// other providers can proceed").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvideEdgeOutcome {
    /// Other providers of this resource are still outstanding.
    Pending,
    /// Every provider has finished and at least one succeeded (or the
    /// resource was never a hard need) — the resource is usable.
    Completed,
    /// Every provider has finished and none succeeded, and the
    /// resource is a hard need — it can never be satisfied.
    Exhausted,
}

struct RecipeNode {
    state: RecipeState,
    incoming_uncompleted: u32,
}

struct DagInner {
    recipes: HashMap<RecipeId, RecipeNode>,
    resources: HashMap<Resource, ResourceNode>,
    out_edges: HashMap<VertexId, HashSet<VertexId>>,
    /// Monotonic "last changed" timestamp per resource, bumped by a
    /// recipe's `DependencyTracker::provide` (spec §4.5: "a recipe's
    /// providers set `resource_time[res] := now` on successful
    /// completion").
    resource_time: HashMap<Resource, i64>,
    next_recipe_id: u64,
}

/// The bipartite recipe/resource dependency graph (spec §4.3). All
/// mutations take a single coarse lock; graphs stay small enough
/// (thousands of vertices, not millions) that this never shows up as a
/// bottleneck next to the RPC round-trips the scheduler is waiting on.
pub struct Dag {
    inner: Mutex<DagInner>,
}

impl Dag {
    pub fn new() -> Self {
        Dag {
            inner: Mutex::new(DagInner {
                recipes: HashMap::new(),
                resources: HashMap::new(),
                out_edges: HashMap::new(),
                resource_time: HashMap::new(),
                next_recipe_id: 0,
            }),
        }
    }

    /// Allocate a fresh recipe vertex in state LOADED.
    pub fn add_recipe(&self) -> RecipeId {
        let mut inner = self.inner.lock();
        let id = RecipeId(inner.next_recipe_id);
        inner.next_recipe_id += 1;
        inner.recipes.insert(
            id,
            RecipeNode {
                state: RecipeState::Loaded,
                incoming_uncompleted: 0,
            },
        );
        id
    }

    /// Idempotent insertion of a resource vertex (spec §4.3 `add(v)`).
    pub fn add_resource(&self, resource: &Resource) {
        let mut inner = self.inner.lock();
        inner.resources.entry(resource.clone()).or_insert(ResourceNode {
            completed: false,
            incoming_uncompleted: 0,
            hard_need: false,
            any_provided: false,
        });
    }

    /// `needs(r, res, hard)`: add edge `res → r`; if `!res.completed`,
    /// increment `r.incoming_uncompleted`. Any hard-need mark sticks.
    pub fn needs(&self, r: RecipeId, res: &Resource, hard: bool) {
        let mut inner = self.inner.lock();
        inner.resources.entry(res.clone()).or_insert(ResourceNode {
            completed: false,
            incoming_uncompleted: 0,
            hard_need: false,
            any_provided: false,
        });
        let res_completed = inner.resources[res].completed;
        let resource_node = inner.resources.get_mut(res).unwrap();
        resource_node.hard_need |= hard;

        let from = VertexId::Resource(res.clone());
        let to = VertexId::Recipe(r);
        let is_new = inner.out_edges.entry(from).or_default().insert(to);
        if is_new && !res_completed {
            if let Some(recipe_node) = inner.recipes.get_mut(&r) {
                recipe_node.incoming_uncompleted += 1;
            }
        }
    }

    /// `provides(r, res)`: add edge `r → res`; if `!r.completed`,
    /// increment `res.incoming_uncompleted` and clear `res.completed`.
    pub fn provides(&self, r: RecipeId, res: &Resource) {
        let mut inner = self.inner.lock();
        inner.resources.entry(res.clone()).or_insert(ResourceNode {
            completed: false,
            incoming_uncompleted: 0,
            hard_need: false,
            any_provided: false,
        });
        let recipe_completed = inner
            .recipes
            .get(&r)
            .map(|n| n.state.is_completed())
            .unwrap_or(false);

        let from = VertexId::Recipe(r);
        let to = VertexId::Resource(res.clone());
        let is_new = inner.out_edges.entry(from).or_default().insert(to);
        if is_new && !recipe_completed {
            let resource_node = inner.resources.get_mut(res).unwrap();
            resource_node.incoming_uncompleted += 1;
            resource_node.completed = false;
        }
    }

    /// `add_ordering(before, after)`: add edge `before → after` between
    /// two recipes; increment `after.incoming_uncompleted` unless
    /// `before` is already completed.
    pub fn add_ordering(&self, before: RecipeId, after: RecipeId) {
        let mut inner = self.inner.lock();
        let before_completed = inner
            .recipes
            .get(&before)
            .map(|n| n.state.is_completed())
            .unwrap_or(false);

        let from = VertexId::Recipe(before);
        let to = VertexId::Recipe(after);
        let is_new = inner.out_edges.entry(from).or_default().insert(to);
        if is_new && !before_completed {
            if let Some(after_node) = inner.recipes.get_mut(&after) {
                after_node.incoming_uncompleted += 1;
            }
        }
    }

    pub fn state(&self, id: RecipeId) -> RecipeState {
        self.inner.lock().recipes[&id].state
    }

    pub fn set_state(&self, id: RecipeId, state: RecipeState) {
        self.inner.lock().recipes.get_mut(&id).unwrap().state = state;
    }

    pub fn recipe_incoming_uncompleted(&self, id: RecipeId) -> u32 {
        self.inner.lock().recipes[&id].incoming_uncompleted
    }

    pub fn resource_incoming_uncompleted(&self, res: &Resource) -> u32 {
        self.inner.lock().resources[res].incoming_uncompleted
    }

    pub fn is_hard_need(&self, res: &Resource) -> bool {
        self.inner.lock().resources[res].hard_need
    }

    pub fn resource_completed(&self, res: &Resource) -> bool {
        self.inner.lock().resources[res].completed
    }

    /// Recipes with a `needs` edge on `res` — used to build the
    /// `UnsatisfiableHardNeed` report (spec §4.6).
    pub fn needers(&self, res: &Resource) -> Vec<RecipeId> {
        let inner = self.inner.lock();
        inner
            .out_edges
            .get(&VertexId::Resource(res.clone()))
            .into_iter()
            .flatten()
            .filter_map(VertexId::as_recipe)
            .collect()
    }

    /// Mark a resource completed without going through `provides` (used
    /// when a resource has no providers at all, spec §4.6 init rule 2).
    pub fn mark_resource_completed(&self, res: &Resource) {
        self.inner.lock().resources.get_mut(res).unwrap().completed = true;
    }

    /// Snapshot of `v`'s out-neighbours.
    pub fn out_edges(&self, v: &VertexId) -> Vec<VertexId> {
        self.inner.lock().out_edges.get(v).into_iter().flatten().cloned().collect()
    }

    /// Decrement `w`'s `incoming_uncompleted` and return the new value.
    pub fn decrement_incoming(&self, w: &VertexId) -> u32 {
        let mut inner = self.inner.lock();
        match w {
            VertexId::Recipe(id) => {
                let node = inner.recipes.get_mut(id).unwrap();
                node.incoming_uncompleted = node.incoming_uncompleted.saturating_sub(1);
                node.incoming_uncompleted
            }
            VertexId::Resource(res) => {
                let node = inner.resources.get_mut(res).unwrap();
                node.incoming_uncompleted = node.incoming_uncompleted.saturating_sub(1);
                node.incoming_uncompleted
            }
        }
    }

    /// Apply one provider's completion to a `provides` edge into `res`
    /// (spec §7). `succeeded` is whether that provider itself finished
    /// successfully; a resource with more than one provider only
    /// becomes [`ProvideEdgeOutcome::Exhausted`] once every provider has
    /// finished and none of them succeeded, so a consumer with one
    /// failing and one succeeding provider still proceeds.
    pub fn complete_provide_edge(&self, res: &Resource, succeeded: bool) -> ProvideEdgeOutcome {
        let mut inner = self.inner.lock();
        let node = inner.resources.get_mut(res).unwrap();
        if succeeded {
            node.any_provided = true;
        }
        node.incoming_uncompleted = node.incoming_uncompleted.saturating_sub(1);
        if node.incoming_uncompleted != 0 {
            return ProvideEdgeOutcome::Pending;
        }
        if node.any_provided || !node.hard_need {
            node.completed = true;
            ProvideEdgeOutcome::Completed
        } else {
            ProvideEdgeOutcome::Exhausted
        }
    }

    pub fn all_recipes(&self) -> Vec<RecipeId> {
        self.inner.lock().recipes.keys().copied().collect()
    }

    pub fn all_resources(&self) -> Vec<Resource> {
        self.inner.lock().resources.keys().cloned().collect()
    }

    /// Current `resource_time[res]`, or 0 if it has never changed in
    /// this run.
    pub fn resource_time(&self, res: &Resource) -> i64 {
        self.inner.lock().resource_time.get(res).copied().unwrap_or(0)
    }

    pub fn set_resource_time(&self, res: &Resource, time: i64) {
        self.inner.lock().resource_time.insert(res.clone(), time);
    }
}

impl Default for Dag {
    fn default() -> Self {
        Self::new()
    }
}
