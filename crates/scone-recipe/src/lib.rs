//! The recipe framework (spec §4.7): the [`Recipe`] trait every recipe
//! implements, the [`DependencyTracker`] it reports watches/provides
//! through, the [`VarProxy`] template-facing variable surface, and a
//! compile-time kind registry recipes self-register with.

mod error;
mod proxy;
mod recipe;
mod registry;
mod tracker;
mod variables;

pub use error::RecipeError;
pub use proxy::{VarAccess, VarProxy};
pub use recipe::{start_and_consume_attrs, BoxFuture, Head, Preparer, Recipe, RecipeControl};
pub use registry::{construct, lookup, RecipeKind};
pub use tracker::DependencyTracker;
pub use variables::Variables;

pub use scone_dag::{RecipeContext, Resource};

#[cfg(test)]
mod tests {
    use super::*;
    use scone_core::Channel;
    use scone_dag::Dag;
    use std::sync::Arc;

    struct InstallPackage {
        context: RecipeContext,
        package: String,
    }

    impl InstallPackage {
        fn new(context: RecipeContext, args: scone_wire::Value, _head: &Head) -> Self {
            let package = args.get("package").and_then(scone_wire::Value::as_str).unwrap_or("").to_string();
            InstallPackage { context, package }
        }
    }

    impl Recipe for InstallPackage {
        fn kind(&self) -> &'static str {
            "install_package"
        }

        fn context(&self) -> &RecipeContext {
            &self.context
        }

        fn prepare(&self, preparer: &dyn Preparer) {
            preparer.needs(scone_dag::os_user_resource(&self.context.user, &self.context.sous));
            preparer.provides(Resource::new("package", &self.package).on_host(&self.context.sous));
        }

        fn cook<'a>(&'a self, ctl: &'a dyn RecipeControl) -> BoxFuture<'a, Result<(), RecipeError>> {
            Box::pin(async move {
                ctl.dependency_tracker().provide(
                    Resource::new("package", &self.package).on_host(&self.context.sous),
                    None,
                );
                Ok(())
            })
        }
    }

    register_recipe!(InstallPackage, "install_package");

    #[test]
    fn registered_recipe_is_constructible_by_name() {
        let head = Head { variables: Variables::new(scone_wire::Value::Map(vec![])) };
        let ctx = RecipeContext::new("web1", "root", "install-curl");
        let args = scone_wire::Value::map([("package", scone_wire::Value::from("curl"))]);
        let recipe = construct("install_package", ctx, args, &head).expect("registered");
        assert_eq!(recipe.kind(), "install_package");
    }

    struct NullControl {
        ctx: RecipeContext,
        vars: Variables,
        tracker: DependencyTracker,
    }

    impl RecipeControl for NullControl {
        fn context(&self) -> &RecipeContext {
            &self.ctx
        }
        fn variables(&self) -> &Variables {
            &self.vars
        }
        fn dependency_tracker(&self) -> &DependencyTracker {
            &self.tracker
        }
        fn start<'a>(&'a self, _utensil: &'a str, _payload: scone_wire::Value) -> BoxFuture<'a, Result<Channel, RecipeError>> {
            Box::pin(async move { unreachable!("this test's recipe never calls start") })
        }
    }

    #[tokio::test]
    async fn cook_provides_bump_resource_time() {
        let dag = Arc::new(Dag::new());
        let ctx = RecipeContext::new("web1", "root", "install-curl");
        let recipe = InstallPackage { context: ctx.clone(), package: "curl".into() };
        let ctl = NullControl {
            ctx: ctx.clone(),
            vars: Variables::new(scone_wire::Value::Map(vec![])),
            tracker: DependencyTracker::new(dag.clone(), "web1", 55),
        };

        recipe.cook(&ctl).await.unwrap();

        let res = Resource::new("package", "curl").on_host("web1");
        assert_eq!(dag.resource_time(&res), 55);
    }
}
