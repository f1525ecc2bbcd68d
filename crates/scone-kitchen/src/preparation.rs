use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use scone_dag::{Dag, RecipeId, RecipeState, Resource};
use scone_recipe::{Preparer, Recipe};

/// The [`Preparer`] a recipe's `prepare` hook sees while the
/// preparation driver is running (spec §4.4). Each recipe gets one of
/// these, scoped to its own vertex; `subrecipe` pushes onto the shared
/// queue the driver keeps draining.
struct DagPreparer<'a> {
    dag: &'a Dag,
    recipe_id: RecipeId,
    queue: &'a Mutex<VecDeque<(RecipeId, Box<dyn Recipe>)>>,
}

impl<'a> Preparer for DagPreparer<'a> {
    fn this_recipe(&self) -> RecipeId {
        self.recipe_id
    }

    fn needs_resource(&self, res: Resource, hard: bool) {
        self.dag.needs(self.recipe_id, &res, hard);
    }

    fn provides(&self, res: Resource) {
        self.dag.provides(self.recipe_id, &res);
    }

    fn subrecipe(&self, recipe: Box<dyn Recipe>) -> RecipeId {
        let id = self.dag.add_recipe();
        self.queue.lock().push_back((id, recipe));
        id
    }

    fn before(&self, other: RecipeId) {
        self.dag.add_ordering(self.recipe_id, other);
    }

    fn after(&self, other: RecipeId) {
        self.dag.add_ordering(other, self.recipe_id);
    }
}

/// Run the preparation phase (spec §4.4): call `prepare` on every
/// recipe the menu loaded, transition each LOADED vertex to PREPARED,
/// and transitively drain subrecipes a `prepare` hook synthesizes so
/// they get prepared too before the Kitchen ever starts cooking.
///
/// Returns every recipe that was prepared, keyed by its DAG id, so the
/// scheduler can look them up during the cook phase.
pub fn run_preparation(dag: &Arc<Dag>, menu: Vec<Box<dyn Recipe>>) -> Vec<(RecipeId, Box<dyn Recipe>)> {
    let queue: Mutex<VecDeque<(RecipeId, Box<dyn Recipe>)>> = Mutex::new(VecDeque::new());
    for recipe in menu {
        let id = dag.add_recipe();
        queue.lock().push_back((id, recipe));
    }

    let mut prepared = Vec::new();
    loop {
        let next = queue.lock().pop_front();
        let Some((id, recipe)) = next else { break };

        let preparer = DagPreparer { dag, recipe_id: id, queue: &queue };
        recipe.prepare(&preparer);
        dag.set_state(id, RecipeState::Prepared);
        prepared.push((id, recipe));
    }
    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use scone_dag::RecipeContext;
    use scone_recipe::{BoxFuture, RecipeControl, RecipeError};

    struct Parent {
        context: RecipeContext,
    }

    impl Recipe for Parent {
        fn kind(&self) -> &'static str {
            "parent"
        }
        fn context(&self) -> &RecipeContext {
            &self.context
        }
        fn prepare(&self, preparer: &dyn Preparer) {
            preparer.provides(Resource::new("marker", "parent"));
            let child = Box::new(Child { context: self.context.clone() });
            let child_id = preparer.subrecipe(child);
            preparer.after(child_id);
        }
        fn cook<'a>(&'a self, _ctl: &'a dyn RecipeControl) -> BoxFuture<'a, Result<(), RecipeError>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct Child {
        context: RecipeContext,
    }

    impl Recipe for Child {
        fn kind(&self) -> &'static str {
            "child"
        }
        fn context(&self) -> &RecipeContext {
            &self.context
        }
        fn prepare(&self, preparer: &dyn Preparer) {
            preparer.provides(Resource::new("marker", "child"));
        }
        fn cook<'a>(&'a self, _ctl: &'a dyn RecipeControl) -> BoxFuture<'a, Result<(), RecipeError>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn subrecipes_are_prepared_transitively() {
        let dag = Arc::new(Dag::new());
        let ctx = RecipeContext::new("web1", "root", "parent-recipe");
        let parent = Box::new(Parent { context: ctx });
        let prepared = run_preparation(&dag, vec![parent]);

        assert_eq!(prepared.len(), 2);
        for (id, _) in &prepared {
            assert_eq!(dag.state(*id), RecipeState::Prepared);
        }
        // The `after(child_id)` ordering must have created a real edge:
        // parent has a pending incoming edge from the child.
        let parent_id = prepared.iter().find(|(_, r)| r.kind() == "parent").unwrap().0;
        assert_eq!(dag.recipe_incoming_uncompleted(parent_id), 1);
    }
}
