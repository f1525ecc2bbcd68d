use scone_dag::RecipeContext;
use scone_wire::Value;

use crate::recipe::{Head, Recipe};

/// A recipe kind's name and constructor, submitted to the compile-time
/// registry by [`register_recipe!`] (spec §9: "replace with an explicit
/// compile-time registry (inventory/linker-section pattern)").
pub struct RecipeKind {
    pub name: &'static str,
    pub constructor: fn(RecipeContext, Value, &Head) -> Box<dyn Recipe>,
}

inventory::collect!(RecipeKind);

/// Find a registered recipe kind by name.
pub fn lookup(name: &str) -> Option<&'static RecipeKind> {
    inventory::iter::<RecipeKind>().find(|k| k.name == name)
}

/// Construct a recipe by kind name (menu loading itself is out of
/// scope; this is the seam a menu loader would call into).
pub fn construct(name: &str, context: RecipeContext, args: Value, head: &Head) -> Option<Box<dyn Recipe>> {
    lookup(name).map(|kind| (kind.constructor)(context, args, head))
}

/// Register a concrete recipe type under `name`. The type must expose
/// an inherent `fn new(context: RecipeContext, args: Value, head: &Head) -> Self`.
#[macro_export]
macro_rules! register_recipe {
    ($ty:ty, $name:expr) => {
        inventory::submit! {
            $crate::RecipeKind {
                name: $name,
                constructor: |context, args, head| ::std::boxed::Box::new(<$ty>::new(context, args, head)),
            }
        }
    };
}
