use tracing::info;

use crate::error::{Error, Result};

use super::timestamp::Instant;

/// The timer that is currently running, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningSession {
    pub project: String,
    pub start: Instant,
}

/// A session that has been stopped and is about to become a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedSession {
    pub project: String,
    pub start: Instant,
    pub stop: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Idle,
    Running(RunningSession),
}

impl Session {
    pub fn current(&self) -> Option<&RunningSession> {
        match self {
            Session::Idle => None,
            Session::Running(running) => Some(running),
        }
    }

    pub fn is_started(&self) -> bool {
        matches!(self, Session::Running(_))
    }

    pub fn start(&mut self, project: &str, now: Instant) -> Result<RunningSession> {
        if let Session::Running(running) = self {
            return Err(Error::AlreadyRunning {
                project: running.project.clone(),
            });
        }
        if project.trim().is_empty() {
            return Err(Error::EmptyProject);
        }

        let running = RunningSession {
            project: project.to_owned(),
            start: now,
        };
        info!("Started {} at {}", running.project, running.start);
        *self = Session::Running(running.clone());
        Ok(running)
    }

    /// Closes the running session. The stop instant never precedes the start, even if the clock
    /// went backwards in the meantime.
    pub fn stop(&mut self, now: Instant) -> Result<ClosedSession> {
        let RunningSession { project, start } = self.take()?;
        let closed = ClosedSession {
            project,
            start,
            stop: now.max(start),
        };
        info!("Stopped {} at {}", closed.project, closed.stop);
        Ok(closed)
    }

    pub fn cancel(&mut self) -> Result<RunningSession> {
        let running = self.take()?;
        info!("Cancelled {} started at {}", running.project, running.start);
        Ok(running)
    }

    fn take(&mut self) -> Result<RunningSession> {
        match std::mem::take(self) {
            Session::Idle => Err(Error::NotRunning),
            Session::Running(running) => Ok(running),
        }
    }
}
