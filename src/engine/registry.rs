// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Task;

/// Live tasks of one engine.
///
/// Append-mostly list: tasks are registered on creation, scanned by the dedup check and
/// removed when finished. Scans work on a snapshot and the check-then-register sequence is
/// not atomic, so two truly simultaneous equivalent calls may each create a task.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: RwLock<Vec<Arc<Task>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Arc<Task>> {
        self.read().clone()
    }

    pub fn register(&self, task: Arc<Task>) {
        self.write().push(task);
    }

    pub fn remove(&self, task_id: u64) -> Option<Arc<Task>> {
        let mut tasks = self.write();
        let position = tasks.iter().position(|t| t.id() == task_id)?;
        Some(tasks.remove(position))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live task serving the same method and canonical body with the fewest verdicts.
    ///
    /// Ties go to the earliest registered task.
    pub fn find_bindable(&self, method: &str, cache_key: &str) -> Option<Arc<Task>> {
        self.snapshot()
            .into_iter()
            .filter(|t| t.descriptor().bindable && !t.is_finished())
            .filter(|t| t.responds(method, Some(cache_key)))
            .min_by_key(|t| t.results_count())
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Task>>> {
        self.tasks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<Task>>> {
        self.tasks.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::json::JsonSerializer;
    use crate::backends::stub::EchoTransport;
    use crate::engine::Promise;
    use crate::rpc::{RequestDescriptor, RpcRequest};
    use crate::strategy::StageKind;
    use crate::traits::Transport;
    use serde_json::json;
    use tokio::sync::{broadcast, mpsc};

    fn task(method: &str, param: i64, bindable: bool) -> Arc<Task> {
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport::default());
        let mut body = RpcRequest::new(method);
        body.add_parameter("p", json!(param)).unwrap();
        let descriptor = RequestDescriptor::builder(body, transport)
            .bindable(bindable)
            .build(&JsonSerializer)
            .unwrap();
        let (bus, _) = broadcast::channel(4);
        Arc::new(Task::new(Arc::new(descriptor), bus))
    }

    #[test]
    fn binds_to_least_progressed_match() {
        let registry = TaskRegistry::new();
        let progressed = task("m", 1, true);
        let fresh = task("m", 1, true);
        let other = task("m", 2, true);
        let (tx, _rx) = mpsc::unbounded_channel();
        Promise::new(progressed.clone(), StageKind::Initial, tx).next(true);

        registry.register(progressed.clone());
        registry.register(fresh.clone());
        registry.register(other.clone());

        let found = registry
            .find_bindable("m", progressed.cache_key())
            .unwrap();
        assert_eq!(found.id(), fresh.id());
    }

    #[test]
    fn ties_go_to_earliest_task() {
        let registry = TaskRegistry::new();
        let first = task("m", 1, true);
        let second = task("m", 1, true);
        registry.register(first.clone());
        registry.register(second);

        let found = registry.find_bindable("m", first.cache_key()).unwrap();
        assert_eq!(found.id(), first.id());
    }

    #[test]
    fn never_binds_to_non_bindable_tasks() {
        let registry = TaskRegistry::new();
        let lone = task("m", 1, false);
        registry.register(lone.clone());

        assert!(registry.find_bindable("m", lone.cache_key()).is_none());
        assert_eq!(registry.remove(lone.id()).unwrap().id(), lone.id());
        assert!(registry.is_empty());
        assert!(registry.remove(lone.id()).is_none());
    }
}
