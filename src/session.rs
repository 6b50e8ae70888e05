//! Session loop
//!
//! Drives capture, gate, match, dispatch and speech one cycle at a time,
//! and wraps the whole session in the restart-on-fault recovery policy.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use crate::config::SessionConfig;
use crate::intent::{Control, IntentHandlers, IntentMatcher};
use crate::narrator::Narrator;
use crate::shutdown::Shutdown;
use crate::transcript::{CaptureFailure, TranscriptSource};
use crate::wake_word::{GateResult, WakeWordGate};
use crate::{Error, Result};

const FAREWELL: &str = "Goodbye!";
const APOLOGY: &str = "Sorry, I encountered an error. Restarting...";

/// Lifecycle of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user asked the assistant to stop
    Shutdown,
    /// An interrupt preempted the session
    Interrupted,
}

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cycle {
    /// No command this cycle
    Idle,
    /// A command was handled and the session continues
    Dispatched,
    /// A command asked the session to stop
    Stop,
}

/// The top-level voice command loop
pub struct SessionLoop {
    source: Box<dyn TranscriptSource>,
    narrator: Box<dyn Narrator>,
    gate: WakeWordGate,
    matcher: IntentMatcher,
    handlers: IntentHandlers,
    config: SessionConfig,
    greeting: String,
    shutdown: Shutdown,
    state: SessionState,
}

impl SessionLoop {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn TranscriptSource>,
        narrator: Box<dyn Narrator>,
        gate: WakeWordGate,
        matcher: IntentMatcher,
        handlers: IntentHandlers,
        config: SessionConfig,
        greeting: impl Into<String>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            source,
            narrator,
            gate,
            matcher,
            handlers,
            config,
            greeting: greeting.into(),
            shutdown,
            state: SessionState::Starting,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Run until the user stops the session or an interrupt arrives
    ///
    /// Faults escaping a cycle (errors and panics) restart the session from
    /// the greeting after a spoken apology.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RestartsExhausted`] once `max_restarts` consecutive
    /// restarts have failed to complete a single cycle.
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self) -> Result<SessionEnd> {
        let mut restarts = 0_u32;

        loop {
            let outcome = AssertUnwindSafe(self.run_session(&mut restarts))
                .catch_unwind()
                .await;

            let fault = match outcome {
                Ok(Ok(end)) => {
                    self.state = SessionState::Stopped;
                    return Ok(end);
                }
                Ok(Err(e)) => e,
                Err(panic) => Error::Panic(panic_message(&*panic)),
            };

            if self.shutdown.is_triggered() {
                tracing::warn!(error = %fault, "fault during shutdown");
                return self.interrupted().await;
            }

            restarts += 1;
            let limit = self.config.max_restarts;
            if limit > 0 && restarts > limit {
                tracing::error!(error = %fault, restarts = limit, "restart budget exhausted");
                self.state = SessionState::Stopped;
                return Err(Error::RestartsExhausted(limit));
            }

            tracing::error!(error = %fault, restart = restarts, "session fault, restarting");

            let shutdown = self.shutdown.clone();
            match shutdown.guard(self.narrator.speak(APOLOGY)).await {
                Some(Ok(())) => {}
                Some(Err(e)) => tracing::error!(error = %e, "failed to speak apology"),
                None => return self.interrupted().await,
            }

            if !self.pause(self.config.restart_delay).await {
                return self.interrupted().await;
            }
        }
    }

    /// One session from greeting to stop
    #[allow(clippy::future_not_send)]
    async fn run_session(&mut self, restarts: &mut u32) -> Result<SessionEnd> {
        let shutdown = self.shutdown.clone();

        self.state = SessionState::Starting;
        tracing::info!(wake_word = self.gate.token(), "session starting");

        let greeting = self.greeting.clone();
        match shutdown.guard(self.narrator.speak(&greeting)).await {
            Some(spoken) => spoken?,
            None => return self.interrupted().await,
        }

        self.state = SessionState::Running;

        loop {
            let Some(cycle) = shutdown.guard(self.cycle()).await else {
                return self.interrupted().await;
            };

            let delay = match cycle? {
                Cycle::Stop => {
                    self.state = SessionState::Stopping;
                    tracing::info!("session stopping");
                    return Ok(SessionEnd::Shutdown);
                }
                Cycle::Dispatched => self.config.command_delay + self.config.cycle_delay,
                Cycle::Idle => self.config.cycle_delay,
            };

            *restarts = 0;

            if !self.pause(delay).await {
                return self.interrupted().await;
            }
        }
    }

    #[allow(clippy::future_not_send)]
    async fn cycle(&mut self) -> Result<Cycle> {
        let utterance = match self.source.capture().await {
            Ok(utterance) => utterance,
            Err(failure) => {
                log_capture_failure(&failure);
                return Ok(Cycle::Idle);
            }
        };

        tracing::info!(heard = utterance.normalized(), "utterance");

        let command = match self.gate.gate(&utterance) {
            GateResult::Accepted(command) => command,
            GateResult::Rejected => {
                tracing::debug!("wake word not heard");
                return Ok(Cycle::Idle);
            }
        };

        let matched = self.matcher.match_command(&command);
        tracing::info!(intent = ?matched.kind, argument = %matched.argument, "dispatching");

        let response = self.handlers.handle(&matched).await;
        self.narrator.speak(&response.spoken_text).await?;

        if let Some(follow_up) = &response.follow_up {
            self.handlers.run_follow_up(follow_up).await;
        }

        Ok(match response.control {
            Control::Continue => Cycle::Dispatched,
            Control::Stop => Cycle::Stop,
        })
    }

    /// Sleep unless interrupted; false when interrupted
    async fn pause(&self, delay: Duration) -> bool {
        if delay.is_zero() {
            return !self.shutdown.is_triggered();
        }
        self.shutdown.guard(tokio::time::sleep(delay)).await.is_some()
    }

    #[allow(clippy::future_not_send)]
    async fn interrupted(&mut self) -> Result<SessionEnd> {
        self.state = SessionState::Stopping;
        tracing::info!("interrupted, stopping");

        if let Err(e) = self.narrator.speak(FAREWELL).await {
            tracing::warn!(error = %e, "failed to speak farewell");
        }

        self.state = SessionState::Stopped;
        Ok(SessionEnd::Interrupted)
    }
}

fn log_capture_failure(failure: &CaptureFailure) {
    match failure {
        CaptureFailure::NoSpeechTimeout | CaptureFailure::UnintelligibleAudio => {
            tracing::debug!(%failure, "no utterance");
        }
        CaptureFailure::BackendUnavailable(_) | CaptureFailure::UnexpectedCaptureError(_) => {
            tracing::warn!(%failure, "capture failed");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
