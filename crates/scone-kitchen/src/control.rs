use std::sync::Arc;

use scone_core::Channel;
use scone_dag::RecipeContext;
use scone_recipe::{BoxFuture, DependencyTracker, RecipeControl, RecipeError, Variables};
use scone_ssh::SousPool;
use scone_wire::Value;

use crate::config::HeadConfig;

/// The concrete [`RecipeControl`] a worker hands to a recipe's `cook`
/// hook (spec §4.6 "Dispatch to sous"): resolves `context.sous`/
/// `context.user` against the head's sous table, opens (or reuses) the
/// pooled SSH connection, and starts a command channel for the
/// requested utensil.
pub(crate) struct WorkerControl {
    pub(crate) context: RecipeContext,
    pub(crate) variables: Variables,
    pub(crate) tracker: DependencyTracker,
    sous_pool: Arc<SousPool>,
    config: Arc<HeadConfig>,
}

impl WorkerControl {
    pub(crate) fn new(
        context: RecipeContext,
        variables: Variables,
        tracker: DependencyTracker,
        sous_pool: Arc<SousPool>,
        config: Arc<HeadConfig>,
    ) -> Self {
        WorkerControl { context, variables, tracker, sous_pool, config }
    }
}

impl RecipeControl for WorkerControl {
    fn context(&self) -> &RecipeContext {
        &self.context
    }

    fn variables(&self) -> &Variables {
        &self.variables
    }

    fn dependency_tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    fn start<'a>(&'a self, utensil: &'a str, payload: Value) -> BoxFuture<'a, Result<Channel, RecipeError>> {
        Box::pin(async move {
            let sous_config = self.config.sous.get(&self.context.sous).ok_or_else(|| {
                RecipeError::Message(format!("no sous configuration for host '{}'", self.context.sous))
            })?;
            let conn = self
                .sous_pool
                .get_or_connect(sous_config, &self.context.user)
                .await
                .map_err(|e| RecipeError::Message(e.to_string()))?;
            let channel = conn.chanpro.open_command_channel(utensil, payload).await?;
            Ok(channel)
        })
    }
}
