use std::future::Future;
use std::pin::Pin;

use scone_core::Channel;
use scone_dag::{RecipeContext, RecipeId, Resource};
use scone_wire::Value;

use crate::error::RecipeError;
use crate::tracker::DependencyTracker;
use crate::variables::Variables;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Head-side state available when a recipe is constructed. Menu/config
/// loading is out of this crate's scope; callers build one however
/// they assemble variables for a run.
pub struct Head {
    pub variables: Variables,
}

/// The declaration-phase surface a recipe's `prepare` hook is given
/// (spec §4.4): `needs`, `wants`, `provides`, `subrecipe`, `before`,
/// `after`. Implemented by the Kitchen's preparation driver, which owns
/// the DAG and the subrecipe queue.
pub trait Preparer: Send + Sync {
    /// The DAG vertex this recipe's declarations attach to.
    fn this_recipe(&self) -> RecipeId;
    fn needs_resource(&self, res: Resource, hard: bool);
    fn provides(&self, res: Resource);
    /// Add `recipe` to the DAG and enqueue it for preparation,
    /// returning its id so the caller can order against it.
    fn subrecipe(&self, recipe: Box<dyn Recipe>) -> RecipeId;
    /// This recipe must complete before `other`.
    fn before(&self, other: RecipeId);
    /// This recipe must complete after `other`.
    fn after(&self, other: RecipeId);

    /// Soft need (`hard=false`) sugar over `needs_resource`.
    fn wants(&self, res: Resource) {
        self.needs_resource(res, false);
    }

    /// Hard need (`hard=true`) sugar over `needs_resource`.
    fn needs(&self, res: Resource) {
        self.needs_resource(res, true);
    }
}

/// The execution-phase surface a recipe's `cook` hook is given (spec
/// §4.6 "Dispatch to sous"). Implemented by the Kitchen's per-recipe
/// worker context.
pub trait RecipeControl: Send + Sync {
    fn context(&self) -> &RecipeContext;
    fn variables(&self) -> &Variables;
    fn dependency_tracker(&self) -> &DependencyTracker;

    /// Resolve host+user from the current recipe context, open (or
    /// reuse) the sous connection, and start a new command channel for
    /// `utensil` carrying `payload`.
    fn start<'a>(&'a self, utensil: &'a str, payload: Value) -> BoxFuture<'a, Result<Channel, RecipeError>>;

    /// `start`, then `recv` one payload and wait for close.
    fn start_and_consume<'a>(&'a self, utensil: &'a str, payload: Value) -> BoxFuture<'a, Result<Value, RecipeError>> {
        Box::pin(async move {
            let channel = self.start(utensil, payload).await?;
            Ok(channel.consume().await?)
        })
    }

    /// `start`, then wait for close, discarding any payload.
    fn start_and_wait_close<'a>(&'a self, utensil: &'a str, payload: Value) -> BoxFuture<'a, Result<(), RecipeError>> {
        Box::pin(async move {
            let channel = self.start(utensil, payload).await?;
            channel.wait_close().await?;
            Ok(())
        })
    }
}

/// `start_and_consume`, then structure the reply into `T` (spec §4.6
/// `start_and_consume_attrs`). A free function rather than a trait
/// method so [`RecipeControl`] stays object-safe.
pub async fn start_and_consume_attrs<T: serde::de::DeserializeOwned>(
    ctl: &dyn RecipeControl,
    utensil: &str,
    payload: Value,
) -> Result<T, RecipeError> {
    let value = ctl.start_and_consume(utensil, payload).await?;
    value.into_typed().map_err(RecipeError::Decode)
}

/// A unit of declared state on a sous (spec §3/§4.7). `new` lives on
/// the concrete type (so it can take whatever constructor arguments it
/// needs) rather than on this trait, which keeps `Box<dyn Recipe>`
/// object-safe; concrete recipes register their constructor with
/// [`crate::register_recipe!`] instead.
pub trait Recipe: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Declarative; no I/O. Default adds the `("os-user", user, sous)`
    /// need every recipe gets (spec §4.4).
    fn prepare(&self, preparer: &dyn Preparer) {
        let ctx = self.context();
        preparer.needs(scone_dag::os_user_resource(&ctx.user, &ctx.sous));
    }

    fn context(&self) -> &RecipeContext;

    /// The declared arguments this recipe's cache key should incorporate
    /// (spec §4.5 paramhash). Defaults to none; a recipe constructed
    /// with meaningful parameters should override this to return them
    /// as a `Value::Map` so two differently-parameterised instances of
    /// the same kind don't share a cache row.
    fn cache_args(&self) -> Value {
        Value::Null
    }

    /// Imperative; may suspend on channel operations.
    fn cook<'a>(&'a self, ctl: &'a dyn RecipeControl) -> BoxFuture<'a, Result<(), RecipeError>>;
}
