use tokio::task::JoinHandle;
use std::collections::HashMap;
use crate::error::{Error, Result};
use tracing::{info, error};

/// Tracks the feed, janitor and alert tasks and reports any that stopped.
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    /// Every supervised task runs forever, so a finished one is a failure.
    pub fn check_health(&mut self) -> Result<()> {
        let mut failed_tasks: Vec<String> = self.tasks
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if failed_tasks.is_empty() {
            return Ok(());
        }

        failed_tasks.sort();
        for name in &failed_tasks {
            self.tasks.remove(name);
        }
        let message = failed_tasks.join(", ");
        error!("Background tasks stopped: {}", message);
        Err(Error::TaskFailure(message))
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn shutdown_all(&mut self) {
        info!("Shutting down {} background tasks", self.tasks.len());

        for (name, handle) in self.tasks.drain() {
            handle.abort();
            info!("Aborted task: {}", name);
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_finished_tasks_once() {
        let mut supervisor = TaskSupervisor::new();
        supervisor.spawn("short", async {});
        supervisor.spawn("forever", std::future::pending::<()>());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        match supervisor.check_health() {
            Err(Error::TaskFailure(names)) => assert_eq!(names, "short"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(supervisor.check_health().is_ok());
        assert_eq!(supervisor.active_task_count(), 1);

        supervisor.shutdown_all();
        assert_eq!(supervisor.active_task_count(), 0);
    }
}
