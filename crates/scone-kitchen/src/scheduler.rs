use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use scone_cache::{paramhash, DependencyCache, SkipDecision};
use scone_dag::{Dag, ProvideEdgeOutcome, RecipeId, RecipeState, VertexId};
use scone_recipe::{DependencyTracker, Recipe, RecipeContext, Variables};
use scone_ssh::SousPool;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::config::HeadConfig;
use crate::control::WorkerControl;
use crate::error::{KitchenError, RecipeFailureReport, UnsatisfiableNeed};

fn now_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

struct KitchenInner {
    dag: Arc<Dag>,
    cache: DependencyCache,
    sous_pool: Arc<SousPool>,
    config: Arc<HeadConfig>,
    recipes: HashMap<RecipeId, Box<dyn Recipe>>,
    variables: Variables,
}

/// The Kitchen scheduler (spec §4.6): a fixed worker pool that walks
/// the prepared recipe/resource DAG, dispatching each COOKABLE recipe's
/// `cook` hook (after consulting the dependency cache) and propagating
/// completion through the DAG's edge counters until every recipe has
/// reached a terminal state.
#[derive(Clone)]
pub struct Kitchen {
    inner: Arc<KitchenInner>,
}

impl Kitchen {
    pub fn new(
        config: HeadConfig,
        cache: DependencyCache,
        dag: Arc<Dag>,
        prepared: Vec<(RecipeId, Box<dyn Recipe>)>,
        variables: Variables,
    ) -> Self {
        Kitchen {
            inner: Arc::new(KitchenInner {
                dag,
                cache,
                sous_pool: Arc::new(SousPool::new()),
                config: Arc::new(config),
                recipes: prepared.into_iter().collect(),
                variables,
            }),
        }
    }

    /// Drive every prepared recipe to completion. Returns
    /// [`KitchenError::UnsatisfiableHardNeed`] before any recipe runs if
    /// a hard need has no provider, or [`KitchenError::Failed`] after
    /// the run if one or more recipes failed.
    pub async fn run(&self) -> Result<(), KitchenError> {
        let total = self.inner.recipes.len();
        if total == 0 {
            return Ok(());
        }

        let (ready_tx, ready_rx) = mpsc::unbounded_channel::<RecipeId>();
        let failures: Arc<SyncMutex<Vec<RecipeFailureReport>>> = Arc::new(SyncMutex::new(Vec::new()));
        self.init(&ready_tx, &failures)?;

        let ready_rx = Arc::new(AsyncMutex::new(ready_rx));
        let remaining = Arc::new(AtomicUsize::new(total));

        let pool_size = self.inner.config.pool_size.max(1);
        let mut workers = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let kitchen = self.clone();
            let ready_rx = ready_rx.clone();
            let ready_tx = ready_tx.clone();
            let failures = failures.clone();
            let remaining = remaining.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let next = ready_rx.lock().await.recv().await;
                    let Some(id) = next else { break };
                    let cascaded = kitchen.process_one(id, &ready_tx, &failures).await;
                    let consumed = 1 + cascaded;
                    let prior = remaining.fetch_sub(consumed, Ordering::AcqRel);
                    if prior == consumed {
                        ready_rx.lock().await.close();
                    }
                }
            }));
        }
        drop(ready_tx);

        for worker in workers {
            let _ = worker.await;
        }

        let failed = std::mem::take(&mut *failures.lock());
        if failed.is_empty() {
            Ok(())
        } else {
            Err(KitchenError::Failed { failed })
        }
    }

    /// Init scan (spec §4.6): mark every resource with no pending
    /// providers as completed (or, if it's a hard need, collect it as
    /// unsatisfiable), then seed the ready queue with every recipe whose
    /// incoming edges are already satisfied.
    fn init(
        &self,
        ready_tx: &mpsc::UnboundedSender<RecipeId>,
        failures: &SyncMutex<Vec<RecipeFailureReport>>,
    ) -> Result<(), KitchenError> {
        let dag = &self.inner.dag;
        for id in dag.all_recipes() {
            dag.set_state(id, RecipeState::Pending);
        }

        let mut unsatisfiable = Vec::new();
        for res in dag.all_resources() {
            if dag.resource_completed(&res) || dag.resource_incoming_uncompleted(&res) != 0 {
                continue;
            }
            if dag.is_hard_need(&res) {
                unsatisfiable.push(UnsatisfiableNeed { resource: res.clone(), needed_by: dag.needers(&res) });
            } else {
                dag.mark_resource_completed(&res);
                for w in dag.out_edges(&VertexId::Resource(res)) {
                    self.complete_edge(&w, ready_tx, true, failures);
                }
            }
        }
        if !unsatisfiable.is_empty() {
            return Err(KitchenError::UnsatisfiableHardNeed(unsatisfiable));
        }

        for id in dag.all_recipes() {
            if dag.state(id) == RecipeState::Pending && dag.recipe_incoming_uncompleted(id) == 0 {
                dag.set_state(id, RecipeState::Cookable);
                let _ = ready_tx.send(id);
            }
        }
        Ok(())
    }

    /// Consult the dependency cache, cook (or skip) one recipe, and
    /// propagate its completion through the DAG. Returns the number of
    /// additional recipes that were transitively failed as a result
    /// (zero unless this recipe's `cook` hook errored).
    async fn process_one(
        &self,
        id: RecipeId,
        ready_tx: &mpsc::UnboundedSender<RecipeId>,
        failures: &SyncMutex<Vec<RecipeFailureReport>>,
    ) -> usize {
        self.inner.dag.set_state(id, RecipeState::BeingCooked);
        let recipe = &self.inner.recipes[&id];
        let context = recipe.context().clone();
        let hash = paramhash(&recipe.cache_args(), &context.sous, &context.user);

        let hit = match self.inner.cache.inquire(recipe.kind(), &hash).await {
            Ok(hit) => hit,
            Err(e) => {
                return self.record_failure(
                    id,
                    context,
                    format!("dependency cache lookup failed: {e}"),
                    ready_tx,
                    failures,
                );
            }
        };

        match scone_cache::decide(hit, &self.inner.dag) {
            SkipDecision::Skip { row_id, .. } => {
                tracing::info!(kind = recipe.kind(), sous = %context.sous, "skipping, dependencies unchanged");
                if let Err(e) = self.inner.cache.renew(row_id, now_ts()).await {
                    tracing::warn!(error = %e, "failed to renew dependency cache row");
                }
                self.inner.dag.set_state(id, RecipeState::Skipped);
            }
            SkipDecision::MustRun => {
                let tracker = DependencyTracker::new(self.inner.dag.clone(), context.sous.clone(), now_ts());
                let control = WorkerControl::new(
                    context.clone(),
                    self.inner.variables.clone(),
                    tracker,
                    self.inner.sous_pool.clone(),
                    self.inner.config.clone(),
                );
                match recipe.cook(&control).await {
                    Ok(()) => {
                        if let Some(book) = control.tracker.into_book() {
                            if let Err(e) = self.inner.cache.register(recipe.kind(), &hash, &context.sous, &book, now_ts()).await {
                                tracing::warn!(error = %e, "failed to persist dependency cache row");
                            }
                        }
                        self.inner.dag.set_state(id, RecipeState::Cooked);
                    }
                    Err(e) => return self.record_failure(id, context, e.to_string(), ready_tx, failures),
                }
            }
        }

        self.inner
            .dag
            .out_edges(&VertexId::Recipe(id))
            .into_iter()
            .map(|v| self.complete_edge(&v, ready_tx, true, failures))
            .sum()
    }

    /// The recipe actually being cooked failed. Record it, then apply
    /// the failure to its own out-edges exactly as a success would be
    /// applied (spec §7: "edge decrements still happen so that
    /// dependents with other providers can proceed") — just marked
    /// unsuccessful, so a resource this recipe alone provided becomes
    /// [`scone_dag::ProvideEdgeOutcome::Exhausted`] instead of
    /// `Completed`. Returns the total number of additional recipes
    /// this failure forced into FAILED.
    fn record_failure(
        &self,
        id: RecipeId,
        context: RecipeContext,
        reason: String,
        ready_tx: &mpsc::UnboundedSender<RecipeId>,
        failures: &SyncMutex<Vec<RecipeFailureReport>>,
    ) -> usize {
        tracing::error!(slug = %context.slug, sous = %context.sous, %reason, "recipe failed");
        self.inner.dag.set_state(id, RecipeState::Failed);
        failures.lock().push(RecipeFailureReport { recipe: id, context, reason });
        self.inner
            .dag
            .out_edges(&VertexId::Recipe(id))
            .into_iter()
            .map(|v| self.complete_edge(&v, ready_tx, false, failures))
            .sum()
    }

    /// Mark `id` FAILED as collateral damage (a resource it hard-needed
    /// has no remaining provider that can succeed) and keep propagating
    /// through its own out-edges, same as [`Self::record_failure`].
    /// Idempotent: a recipe already FAILED or completed is left alone,
    /// so a diamond-shaped DAG can't be double-counted.
    fn fail_recipe(
        &self,
        id: RecipeId,
        ready_tx: &mpsc::UnboundedSender<RecipeId>,
        failures: &SyncMutex<Vec<RecipeFailureReport>>,
    ) -> usize {
        let state = self.inner.dag.state(id);
        if state == RecipeState::Failed || state.is_completed() {
            return 0;
        }
        self.inner.dag.set_state(id, RecipeState::Failed);
        if let Some(recipe) = self.inner.recipes.get(&id) {
            failures.lock().push(RecipeFailureReport {
                recipe: id,
                context: recipe.context().clone(),
                reason: "blocked: a required resource has no successful provider".to_string(),
            });
        }
        1 + self
            .inner
            .dag
            .out_edges(&VertexId::Recipe(id))
            .into_iter()
            .map(|v| self.complete_edge(&v, ready_tx, false, failures))
            .sum::<usize>()
    }

    /// Apply one provider's completion (success or failure) to edge
    /// `v`. A recipe target just needs its predecessor done, so it
    /// becomes COOKABLE regardless of `succeeded`. A resource target
    /// goes through [`scone_dag::Dag::complete_provide_edge`]: other
    /// outstanding or already-successful providers let consumers
    /// proceed (`Completed`); a hard need with every provider failed
    /// (`Exhausted`) fails those consumers instead of leaving them
    /// waiting forever. Returns the number of recipes this call forced
    /// into FAILED.
    fn complete_edge(
        &self,
        v: &VertexId,
        ready_tx: &mpsc::UnboundedSender<RecipeId>,
        succeeded: bool,
        failures: &SyncMutex<Vec<RecipeFailureReport>>,
    ) -> usize {
        match v {
            VertexId::Recipe(id) => {
                if self.inner.dag.decrement_incoming(v) != 0 {
                    return 0;
                }
                self.inner.dag.set_state(*id, RecipeState::Cookable);
                let _ = ready_tx.send(*id);
                0
            }
            VertexId::Resource(res) => match self.inner.dag.complete_provide_edge(res, succeeded) {
                ProvideEdgeOutcome::Pending => 0,
                ProvideEdgeOutcome::Completed => self
                    .inner
                    .dag
                    .out_edges(v)
                    .into_iter()
                    .map(|w| self.complete_edge(&w, ready_tx, true, failures))
                    .sum(),
                ProvideEdgeOutcome::Exhausted => self
                    .inner
                    .dag
                    .out_edges(v)
                    .into_iter()
                    .filter_map(|w| w.as_recipe())
                    .map(|rid| self.fail_recipe(rid, ready_tx, failures))
                    .sum(),
            },
        }
    }
}
