use crate::domain::ports::BuildTask;
use crate::utils::console;
use crate::utils::error::{BuildError, Result};
use futures::future::join_all;

/// Runs the independent tasks of a command concurrently and waits for all
/// of them, so one failure never hides another.
pub struct BuildEngine {
    tasks: Vec<Box<dyn BuildTask>>,
}

impl BuildEngine {
    pub fn new(tasks: Vec<Box<dyn BuildTask>>) -> Self {
        Self { tasks }
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|task| task.name()).collect()
    }

    pub async fn run(&self) -> Result<()> {
        tracing::debug!("running tasks: {:?}", self.task_names());

        let outcomes = join_all(self.tasks.iter().map(|task| async move {
            let outcome = task.run().await;
            (task.name(), outcome)
        }))
        .await;

        let total = outcomes.len();
        let mut errors = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => tracing::debug!("task '{}' finished", name),
                Err(e) => {
                    tracing::error!("task '{}' failed: {}", name, e);
                    console::failure(&format!("{}: {}", name, e));
                    errors.push((name.to_string(), e));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BuildError::TasksFailed { total, errors })
        }
    }
}
