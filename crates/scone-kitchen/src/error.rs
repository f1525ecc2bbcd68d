use std::fmt;

use scone_dag::{RecipeContext, RecipeId, Resource};

/// A hard-need resource with zero providers, discovered pre-execution
/// (spec §4.6 init, §7 `UnsatisfiableHardNeed`).
#[derive(Debug)]
pub struct UnsatisfiableNeed {
    pub resource: Resource,
    pub needed_by: Vec<RecipeId>,
}

impl fmt::Display for UnsatisfiableNeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "resource {} is a hard need with no provider, needed by {} recipe(s)",
            self.resource,
            self.needed_by.len()
        )
    }
}

/// One recipe's failure report in a composite run failure (SPEC_FULL
/// §4, resolving spec §4.6's underspecified "composite error listing
/// all FAILED recipes").
#[derive(Debug)]
pub struct RecipeFailureReport {
    pub recipe: RecipeId,
    pub context: RecipeContext,
    pub reason: String,
}

impl fmt::Display for RecipeFailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}@{}): {}", self.context.slug, self.context.user, self.context.sous, self.reason)
    }
}

/// Top-level run failure (spec §7).
#[derive(Debug)]
pub enum KitchenError {
    /// Pre-execution: at least one hard-need resource has no provider.
    UnsatisfiableHardNeed(Vec<UnsatisfiableNeed>),
    /// Post-execution: at least one recipe transitioned to FAILED.
    Failed { failed: Vec<RecipeFailureReport> },
    Cache(scone_cache::CacheError),
    Ssh(scone_ssh::SshError),
}

impl fmt::Display for KitchenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KitchenError::UnsatisfiableHardNeed(needs) => {
                writeln!(f, "{} unsatisfiable hard need(s):", needs.len())?;
                for need in needs {
                    writeln!(f, "  - {need}")?;
                }
                Ok(())
            }
            KitchenError::Failed { failed } => {
                writeln!(f, "{} recipe(s) failed:", failed.len())?;
                for failure in failed {
                    writeln!(f, "  - {failure}")?;
                }
                Ok(())
            }
            KitchenError::Cache(e) => write!(f, "{e}"),
            KitchenError::Ssh(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for KitchenError {}

impl From<scone_cache::CacheError> for KitchenError {
    fn from(e: scone_cache::CacheError) -> Self {
        KitchenError::Cache(e)
    }
}

impl From<scone_ssh::SshError> for KitchenError {
    fn from(e: scone_ssh::SshError) -> Self {
        KitchenError::Ssh(e)
    }
}
