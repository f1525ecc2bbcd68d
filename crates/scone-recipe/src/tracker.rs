use parking_lot::Mutex;
use scone_cache::DependencyBook;
use scone_dag::{Dag, Resource};
use scone_wire::Value;
use std::sync::Arc;

/// Per-recipe bookkeeping handle (spec §4.7): `watch`/`provide`/`ignore`
/// plus the specialised helpers, consumed into a [`DependencyBook`]
/// once the recipe reaches COOKED or SKIPPED.
pub struct DependencyTracker {
    dag: Arc<Dag>,
    sous: String,
    now: i64,
    book: Mutex<DependencyBook>,
}

impl DependencyTracker {
    pub fn new(dag: Arc<Dag>, sous: impl Into<String>, now: i64) -> Self {
        DependencyTracker {
            dag,
            sous: sous.into(),
            now,
            book: Mutex::new(DependencyBook::new()),
        }
    }

    /// Record a read dependency.
    pub fn watch(&self, resource: Resource) {
        let time = self.dag.resource_time(&resource);
        let mut book = self.book.lock();
        if let Some(entry) = book.watching.iter_mut().find(|(r, _)| *r == resource) {
            entry.1 = time;
        } else {
            book.watching.push((resource, time));
        }
    }

    /// Record that this recipe caused `resource` to change at `time`
    /// (defaults to the run's current monotonic integer).
    pub fn provide(&self, resource: Resource, time: Option<i64>) {
        let time = time.unwrap_or(self.now);
        self.dag.set_resource_time(&resource, time);
        let mut book = self.book.lock();
        if let Some(entry) = book.provided.iter_mut().find(|(r, _)| *r == resource) {
            entry.1 = time;
        } else {
            book.provided.push((resource, time));
        }
        book.last_changed = book.last_changed.max(time);
    }

    /// Disable caching for this recipe: it always runs.
    pub fn ignore(&self) {
        self.book.lock().ignored = true;
    }

    /// Register that a dotted variable path was read, stashing its
    /// current value for the next run's fingerprint comparison.
    pub fn register_variable(&self, dotted_name: &str, value: &Value) {
        self.book.lock().cache_data.insert(format!("var:{dotted_name}"), value.clone());
    }

    /// A head-local fridge file this recipe read; watched as a
    /// `fridge` resource.
    pub fn register_fridge_file(&self, path: &str) {
        self.watch(Resource::new("fridge", path));
    }

    /// A file on a sous this recipe read; watched as a `file` resource
    /// on `sous` (defaulting to this recipe's own host).
    pub fn register_remote_file(&self, path: &str, sous: Option<&str>) {
        let host = sous.unwrap_or(&self.sous);
        self.watch(Resource::new("file", path).on_host(host));
    }

    /// Finalize the tracker into the book the cache should persist.
    /// Returns `None` if `ignore()` was called: spec §4.6 "If the
    /// tracker is ignored, no cache row is written."
    pub fn into_book(self) -> Option<DependencyBook> {
        let book = self.book.into_inner();
        if book.ignored {
            None
        } else {
            Some(book)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provide_bumps_dag_resource_time() {
        let dag = Arc::new(Dag::new());
        let tracker = DependencyTracker::new(dag.clone(), "web1", 100);
        let res = Resource::new("file", "/etc/motd");
        tracker.provide(res.clone(), None);
        assert_eq!(dag.resource_time(&res), 100);
    }

    #[test]
    fn ignored_tracker_has_no_book() {
        let dag = Arc::new(Dag::new());
        let tracker = DependencyTracker::new(dag, "web1", 1);
        tracker.ignore();
        assert!(tracker.into_book().is_none());
    }

    #[test]
    fn watch_records_current_resource_time() {
        let dag = Arc::new(Dag::new());
        let res = Resource::new("package", "curl");
        dag.set_resource_time(&res, 7);
        let tracker = DependencyTracker::new(dag, "web1", 1);
        tracker.watch(res.clone());
        let book = tracker.into_book().unwrap();
        assert_eq!(book.watched_time(&res), Some(7));
    }
}
