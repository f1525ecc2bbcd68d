use scone_dag::{Dag, Resource};

use crate::book::DependencyBook;

/// Outcome of the skip-decision algorithm (spec §4.5).
#[derive(Debug, PartialEq)]
pub enum SkipDecision {
    /// Run the recipe's `cook` hook.
    MustRun,
    /// Safe to transition straight to SKIPPED and renew `row_id` — as
    /// far as watched resources go. `book.cache_data` is handed back so
    /// a recipe with dynamic fingerprints (remote/fridge file hashes)
    /// can still re-hash and compare before honouring the skip; see
    /// spec §4.5 "Dynamic dependencies (cache_data)".
    Skip { row_id: i64, book: DependencyBook },
}

/// Steps 1-3 of spec §4.5's skip decision:
/// 1. Miss → must run.
/// 2. Hit with `book.ignored` → must run.
/// 3. Hit → any watched resource whose recorded timestamp is older
///    than the DAG's current `resource_time[res]` → must run.
///    Otherwise safe to skip.
pub fn decide(hit: Option<(i64, DependencyBook)>, dag: &Dag) -> SkipDecision {
    let Some((row_id, book)) = hit else {
        return SkipDecision::MustRun;
    };
    if book.ignored {
        return SkipDecision::MustRun;
    }
    for (resource, recorded) in &book.watching {
        if dag.resource_time(resource) > *recorded {
            return SkipDecision::MustRun;
        }
    }
    SkipDecision::Skip { row_id, book }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scone_dag::Resource;

    #[test]
    fn miss_must_run() {
        let dag = Dag::new();
        assert_eq!(decide(None, &dag), SkipDecision::MustRun);
    }

    #[test]
    fn ignored_book_must_run() {
        let dag = Dag::new();
        let mut book = DependencyBook::new();
        book.ignored = true;
        assert_eq!(decide(Some((1, book)), &dag), SkipDecision::MustRun);
    }

    #[test]
    fn stale_watch_must_run() {
        let dag = Dag::new();
        let res = Resource::new("file", "/etc/motd");
        dag.set_resource_time(&res, 10);
        let mut book = DependencyBook::new();
        book.watching.push((res, 5));
        assert_eq!(decide(Some((1, book)), &dag), SkipDecision::MustRun);
    }

    #[test]
    fn unchanged_watch_can_skip() {
        let dag = Dag::new();
        let res = Resource::new("file", "/etc/motd");
        dag.set_resource_time(&res, 5);
        let mut book = DependencyBook::new();
        book.watching.push((res, 5));
        let decision = decide(Some((7, book.clone())), &dag);
        assert_eq!(decision, SkipDecision::Skip { row_id: 7, book });
    }
}
