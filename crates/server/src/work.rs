// crates/server/src/work.rs
//! The demo workload started by `POST /api/jobs`.

use std::time::Duration;

use jobcast_jobs::JobContext;

use crate::error::{ApiError, ApiResult};

/// Shape of the simulated job.
#[derive(Debug, Clone)]
pub struct WorkConfig {
    /// Steps run when the request does not ask for a specific count.
    pub default_steps: u32,
    pub max_steps: u32,
    /// Pause before each step.
    pub step_interval: Duration,
}

impl WorkConfig {
    /// Resolve the requested step count against the configured bounds.
    pub fn steps(&self, requested: Option<u32>) -> ApiResult<u32> {
        match requested {
            None => Ok(self.default_steps),
            Some(0) => Err(ApiError::BadRequest("steps must be at least 1".into())),
            Some(n) if n > self.max_steps => Err(ApiError::BadRequest(format!(
                "steps must be at most {}",
                self.max_steps
            ))),
            Some(n) => Ok(n),
        }
    }
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            default_steps: 10,
            max_steps: 1000,
            step_interval: Duration::from_millis(500),
        }
    }
}

/// Publish `step i/n` lines, pausing `interval` before each, then `done`.
pub async fn simulated_work(ctx: JobContext, steps: u32, interval: Duration) -> Result<(), String> {
    ctx.publish(format!("job {} started: {} steps", ctx.id(), steps));
    for step in 1..=steps {
        tokio::time::sleep(interval).await;
        ctx.publish(format!("step {step}/{steps}"));
    }
    ctx.publish("done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobcast_jobs::{JobRegistry, JobRunner, Message};
    use std::sync::Arc;

    #[test]
    fn test_steps_resolution() {
        let config = WorkConfig {
            default_steps: 4,
            max_steps: 8,
            step_interval: Duration::ZERO,
        };
        assert_eq!(config.steps(None).unwrap(), 4);
        assert_eq!(config.steps(Some(8)).unwrap(), 8);
        assert!(matches!(config.steps(Some(0)), Err(ApiError::BadRequest(_))));
        assert!(matches!(config.steps(Some(9)), Err(ApiError::BadRequest(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_work_emits_steps_then_done() {
        let runner = JobRunner::new(Arc::new(JobRegistry::new()));
        let handle = runner.start_job("simulated", |ctx| {
            simulated_work(ctx, 3, Duration::from_millis(100))
        });
        let mut sub = runner.registry().subscribe(handle.id).unwrap();

        let mut lines = Vec::new();
        while let Some(msg) = sub.recv().await {
            match msg {
                Message::Payload(text) => lines.push(text),
                Message::EndOfStream => break,
            }
        }

        assert_eq!(
            lines,
            vec![
                format!("job {} started: 3 steps", handle.id),
                "step 1/3".to_string(),
                "step 2/3".to_string(),
                "step 3/3".to_string(),
                "done".to_string(),
            ]
        );
        assert!(!handle.is_running());
    }
}
