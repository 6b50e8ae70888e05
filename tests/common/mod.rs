//! Shared test utilities

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use wake_assistant::config::{IntentConfig, SessionConfig};
use wake_assistant::services::{Clock, JokeSource, KnowledgeSource, MediaPlayer, WebSearch};
use wake_assistant::shutdown::{self, Shutdown, ShutdownTrigger};
use wake_assistant::{
    CaptureFailure, Error, IntentHandlers, IntentMatcher, LookupError, Narrator, Result,
    Services, SessionLoop, TranscriptSource, Utterance, WakeWordGate,
};

pub const GREETING: &str = "Hello! I'm Alexa. Say 'alexa' followed by your command.";

/// Ordered record of everything said and every external call made
#[derive(Debug, Default, Clone)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// Only the spoken lines, without the `say:` prefix
    pub fn spoken(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("say:").map(ToString::to_string))
            .collect()
    }

    /// Only the external service calls
    pub fn calls(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|e| !e.starts_with("say:"))
            .cloned()
            .collect()
    }
}

/// One scripted listen cycle
pub enum Step {
    Heard(&'static str),
    Failed(CaptureFailure),
    /// Fire the interrupt while the capture is in progress
    Interrupt,
}

/// Transcript source that replays a script
///
/// Once the script runs out it fires the shutdown trigger.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    trigger: ShutdownTrigger,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>, trigger: ShutdownTrigger) -> Self {
        Self {
            steps: steps.into(),
            trigger,
        }
    }
}

#[async_trait(?Send)]
impl TranscriptSource for ScriptedSource {
    async fn capture(&mut self) -> std::result::Result<Utterance, CaptureFailure> {
        match self.steps.pop_front() {
            Some(Step::Heard(text)) => Ok(Utterance::new(text)),
            Some(Step::Failed(failure)) => Err(failure),
            Some(Step::Interrupt) | None => {
                self.trigger.trigger();
                std::future::pending().await
            }
        }
    }
}

/// Narrator that records what it says
///
/// It can fail on one line, or fire the interrupt partway through one line
/// and never finish it. Lines are logged only once fully spoken.
pub struct RecordingNarrator {
    log: Log,
    fail_on: Option<&'static str>,
    interrupt_on: Option<(&'static str, ShutdownTrigger)>,
}

impl RecordingNarrator {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            fail_on: None,
            interrupt_on: None,
        }
    }

    pub fn failing_on(log: Log, text: &'static str) -> Self {
        Self {
            fail_on: Some(text),
            ..Self::new(log)
        }
    }

    pub fn interrupted_on(log: Log, text: &'static str, trigger: ShutdownTrigger) -> Self {
        Self {
            interrupt_on: Some((text, trigger)),
            ..Self::new(log)
        }
    }
}

#[async_trait(?Send)]
impl Narrator for RecordingNarrator {
    async fn speak(&mut self, text: &str) -> Result<()> {
        if self.fail_on == Some(text) {
            return Err(Error::Tts("speaker unplugged".to_string()));
        }
        if let Some((line, trigger)) = &self.interrupt_on
            && *line == text
        {
            trigger.trigger();
            std::future::pending::<()>().await;
        }
        self.log.push(format!("say:{text}"));
        Ok(())
    }
}

pub struct FakeMedia(pub Log);

#[async_trait(?Send)]
impl MediaPlayer for FakeMedia {
    async fn play(&self, query: &str) -> Result<()> {
        self.0.push(format!("play:{query}"));
        Ok(())
    }
}

pub struct FakeSearch(pub Log);

#[async_trait(?Send)]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<()> {
        self.0.push(format!("search:{query}"));
        Err(Error::Service("browser not found".to_string()))
    }
}

/// Knowledge source with canned answers per topic; unknown topics are not found
pub struct FakeKnowledge {
    pub log: Log,
    pub answers: HashMap<&'static str, std::result::Result<&'static str, LookupError>>,
}

#[async_trait(?Send)]
impl KnowledgeSource for FakeKnowledge {
    async fn summary(
        &self,
        topic: &str,
        sentences: usize,
    ) -> std::result::Result<String, LookupError> {
        self.log.push(format!("lookup:{topic}:{sentences}"));
        match self.answers.get(topic) {
            Some(Ok(summary)) => Ok((*summary).to_string()),
            Some(Err(e)) => Err(e.clone()),
            None => Err(LookupError::NotFound),
        }
    }
}

pub struct FakeJokes;

#[async_trait(?Send)]
impl JokeSource for FakeJokes {
    async fn joke(&self) -> Result<String> {
        Ok("I told a chemistry joke. There was no reaction.".to_string())
    }
}

/// Joke source with a bug in it
pub struct PanickingJokes;

#[async_trait(?Send)]
impl JokeSource for PanickingJokes {
    async fn joke(&self) -> Result<String> {
        panic!("joke source exploded")
    }
}

pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 5, 0))
            .expect("valid timestamp")
    }
}

/// Fake services sharing one log
pub fn fake_services(log: &Log, jokes: Box<dyn JokeSource>) -> Services {
    let answers = HashMap::from([
        ("rust", Ok("Rust is a programming language.")),
        ("mercury", Err(LookupError::Ambiguous)),
        ("the moon", Err(LookupError::Backend("timeout".to_string()))),
    ]);

    Services {
        media: Box::new(FakeMedia(log.clone())),
        knowledge: Box::new(FakeKnowledge {
            log: log.clone(),
            answers,
        }),
        jokes,
        search: Box::new(FakeSearch(log.clone())),
        clock: Box::new(FixedClock),
    }
}

/// Session config with no pauses
pub fn instant(max_restarts: u32) -> SessionConfig {
    SessionConfig {
        cycle_delay: Duration::ZERO,
        command_delay: Duration::ZERO,
        restart_delay: Duration::ZERO,
        max_restarts,
    }
}

/// Session with default intents, fake services and a scripted source
pub fn scripted_session(
    steps: Vec<Step>,
    narrator: Box<dyn Narrator>,
    services: Services,
    max_restarts: u32,
) -> (SessionLoop, Shutdown) {
    let (trigger, shutdown) = shutdown::channel();
    let session = session_on(
        steps,
        narrator,
        services,
        instant(max_restarts),
        (trigger, shutdown.clone()),
    );

    (session, shutdown)
}

/// Like [`scripted_session`], on a caller-owned shutdown channel and config
pub fn session_on(
    steps: Vec<Step>,
    narrator: Box<dyn Narrator>,
    services: Services,
    config: SessionConfig,
    (trigger, shutdown): (ShutdownTrigger, Shutdown),
) -> SessionLoop {
    SessionLoop::new(
        Box::new(ScriptedSource::new(steps, trigger)),
        narrator,
        WakeWordGate::new("alexa"),
        IntentMatcher::from_config(&IntentConfig::default()),
        IntentHandlers::new(services, 2),
        config,
        GREETING,
        shutdown,
    )
}
