use serde::Serialize;
use std::sync::{Arc, Condvar, Mutex};

use crate::error::{CoreError, Result};

#[derive(Debug, Default)]
struct State {
    cancelled: bool,
    paused: bool,
}

/// Cancellation token with a pause gate, shared by every unit of work in a run.
#[derive(Debug, Clone, Default)]
pub struct JobControl {
    inner: Arc<(Mutex<State>, Condvar)>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn cancel(&self) {
        self.state().cancelled = true;
        self.inner.1.notify_all();
    }

    pub fn pause(&self) {
        self.state().paused = true;
    }

    pub fn resume(&self) {
        self.state().paused = false;
        self.inner.1.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state().cancelled
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    /// Blocks while paused; fails once cancelled.
    pub fn checkpoint(&self) -> Result<()> {
        let mut state = self.state();
        while state.paused && !state.cancelled {
            state = self.inner.1.wait(state).unwrap_or_else(|p| p.into_inner());
        }
        if state.cancelled {
            return Err(CoreError::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Progress {
    Message { message: String },
    Percent { done: usize, total: usize },
}

impl Progress {
    pub fn percent(&self) -> Option<f32> {
        match self {
            Progress::Percent { done, total } if *total > 0 => Some(*done as f32 * 100.0 / *total as f32),
            _ => None,
        }
    }
}

type Callback = dyn Fn(Progress) + Send + Sync;

/// Progress sink handed to the pipeline. A silent reporter drops everything.
#[derive(Clone, Default)]
pub struct Reporter {
    callback: Option<Arc<Callback>>,
}

impl Reporter {
    pub fn new(callback: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        Reporter {
            callback: Some(Arc::new(callback)),
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn message(&self, message: impl Into<String>) {
        if let Some(cb) = &self.callback {
            cb(Progress::Message {
                message: message.into(),
            });
        }
    }

    pub fn percent(&self, done: usize, total: usize) {
        if let Some(cb) = &self.callback {
            cb(Progress::Percent { done, total });
        }
    }
}

/// What every unit of work receives: the control to obey and the reporter to talk to.
#[derive(Clone, Default)]
pub struct RunContext {
    pub control: JobControl,
    pub reporter: Reporter,
}

impl RunContext {
    pub fn new(control: JobControl, reporter: Reporter) -> Self {
        RunContext { control, reporter }
    }

    pub fn checkpoint(&self) -> Result<()> {
        self.control.checkpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn checkpoint_passes_until_cancelled() {
        let control = JobControl::new();
        assert!(control.checkpoint().is_ok());
        control.cancel();
        assert!(control.checkpoint().unwrap_err().is_cancelled());
    }

    #[test]
    fn pause_blocks_until_resume() {
        let control = JobControl::new();
        control.pause();

        let worker = {
            let control = control.clone();
            thread::spawn(move || control.checkpoint().is_ok())
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!worker.is_finished());

        control.resume();
        assert!(worker.join().unwrap());
    }

    #[test]
    fn cancel_releases_paused_workers() {
        let control = JobControl::new();
        control.pause();
        let worker = {
            let control = control.clone();
            thread::spawn(move || control.checkpoint())
        };
        thread::sleep(Duration::from_millis(20));
        control.cancel();
        assert!(worker.join().unwrap().is_err());
    }

    #[test]
    fn reporter_forwards_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reporter = {
            let seen = seen.clone();
            Reporter::new(move |p| seen.lock().unwrap().push(p))
        };
        reporter.message("file done");
        reporter.percent(1, 4);
        Reporter::silent().message("dropped");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].percent(), Some(25.0));
    }
}
