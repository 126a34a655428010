//! Async session driver.
//!
//! Owns one [`EvaluationSession`] on a tokio task, feeds it one tick per
//! second while a timed phase is active, applies commands from the
//! presentation layer in arrival order, and hands the finished result to
//! a [`ResultReporter`] with retries.
//!
//! All transitions happen on the driver task, so they never interleave.
//! Timers only exist inside the task's `select!`: once the session leaves
//! a timed phase, or the task ends, no tick can reach it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{SessionError, SubmissionError};
use crate::model::Answer;
use crate::report::{EvaluationResult, SubmitReason};
use crate::session::{EvaluationSession, Phase, TickOutcome};
use crate::traits::ResultReporter;

/// Configuration for the session driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Length of one session tick.
    pub tick: Duration,
    /// Retries on transient submission errors.
    pub max_submit_retries: u32,
    /// Delay before the first retry; doubled on each further retry.
    pub retry_delay: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            max_submit_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Input from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Select {
        question_id: String,
        option_id: String,
    },
    /// Select an option on whichever question is displayed when the
    /// command is processed.
    SelectCurrent { option_id: String },
    Advance,
    Retreat,
    GoTo(usize),
    Hint,
    Submit,
    /// Try the reporter again after a failed submission.
    RetrySubmission,
    Abandon,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CountdownTick(u32),
    Started { remaining_secs: u32 },
    Tick { remaining_secs: u32 },
    AnswerRecorded { answer: Answer, progress: u32 },
    Navigated { index: usize, question_id: String },
    HintRevealed { question_id: String, hint: Option<String> },
    Submitting { reason: SubmitReason },
    SubmissionFailed {
        error: SubmissionError,
        attempts: u32,
        will_retry: bool,
    },
    Completed(EvaluationResult),
    Abandoned { discarded: usize },
    /// A command was not legal; the session is unchanged.
    Rejected(SessionError),
}

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(EvaluationResult),
    Abandoned { discarded: usize },
}

/// Spawns driver tasks that report through a shared reporter.
pub struct SessionDriver {
    reporter: Arc<dyn ResultReporter>,
    config: DriverConfig,
}

impl SessionDriver {
    pub fn new(reporter: Arc<dyn ResultReporter>, config: DriverConfig) -> Self {
        Self { reporter, config }
    }

    /// Start driving a session on a new task.
    pub fn spawn(&self, session: EvaluationSession) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let task = DriverTask {
            session,
            reporter: Arc::clone(&self.reporter),
            config: self.config.clone(),
            events: event_tx,
            awaiting_retry: false,
            discarded: 0,
        };

        SessionHandle {
            commands: command_tx,
            events: event_rx,
            task: tokio::spawn(task.run(command_rx)),
        }
    }
}

/// Presentation-side end of a driven session.
///
/// Dropping every command sender abandons a session that has not been
/// submitted yet.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    /// Queue a command. Returns `false` if the session already ended.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// A cloneable sender for feeding commands from another task.
    pub fn sender(&self) -> mpsc::UnboundedSender<SessionCommand> {
        self.commands.clone()
    }

    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Wait until the session ends on its own (submission or deadline).
    ///
    /// Remaining events are consumed. If delivery gives up, the session
    /// is abandoned since no retry can be sent anymore.
    pub async fn wait(self) -> Result<SessionOutcome> {
        let SessionHandle {
            commands,
            mut events,
            task,
        } = self;
        let mut commands = Some(commands);
        while let Some(event) = events.recv().await {
            if let SessionEvent::SubmissionFailed {
                will_retry: false, ..
            } = event
            {
                commands = None;
            }
        }
        drop(commands);
        task.await.context("session task failed")
    }

    /// Stop sending commands and wait for the outcome. An unsubmitted
    /// session is abandoned.
    pub async fn close(self) -> Result<SessionOutcome> {
        let SessionHandle { commands, task, .. } = self;
        drop(commands);
        task.await.context("session task failed")
    }

    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<SessionCommand>,
        mpsc::UnboundedReceiver<SessionEvent>,
        JoinHandle<SessionOutcome>,
    ) {
        (self.commands, self.events, self.task)
    }
}

struct DriverTask {
    session: EvaluationSession,
    reporter: Arc<dyn ResultReporter>,
    config: DriverConfig,
    events: mpsc::UnboundedSender<SessionEvent>,
    /// Delivery gave up; waiting for `RetrySubmission` or `Abandon`.
    awaiting_retry: bool,
    discarded: usize,
}

impl DriverTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> SessionOutcome {
        let mut ticker = time::interval_at(Instant::now() + self.config.tick, self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            match self.session.phase() {
                Phase::Completed => {
                    if let Some(result) = self.session.result() {
                        return SessionOutcome::Completed(result.clone());
                    }
                }
                Phase::Abandoned => {
                    return SessionOutcome::Abandoned {
                        discarded: self.discarded,
                    };
                }
                Phase::Submitting if !self.awaiting_retry => {
                    self.deliver().await;
                    continue;
                }
                _ => {}
            }

            let timed = matches!(
                self.session.phase(),
                Phase::Countdown { .. } | Phase::InProgress
            );

            tokio::select! {
                _ = ticker.tick(), if timed => self.on_tick(),
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        tracing::debug!(session = %self.session.id(), "command channel closed");
                        self.abandon();
                    }
                },
            }
        }
    }

    fn on_tick(&mut self) {
        match self.session.tick() {
            TickOutcome::Countdown(n) => self.emit(SessionEvent::CountdownTick(n)),
            TickOutcome::Started => self.emit(SessionEvent::Started {
                remaining_secs: self.session.remaining_secs(),
            }),
            TickOutcome::Running(remaining_secs) => {
                self.emit(SessionEvent::Tick { remaining_secs })
            }
            TickOutcome::TimedOut => {
                self.emit(SessionEvent::Tick { remaining_secs: 0 });
                self.emit(SessionEvent::Submitting {
                    reason: SubmitReason::Timeout,
                });
            }
            TickOutcome::Idle => {}
        }
    }

    fn on_command(&mut self, command: SessionCommand) {
        let event = match command {
            SessionCommand::Select {
                question_id,
                option_id,
            } => self.select(&question_id, &option_id),
            SessionCommand::SelectCurrent { option_id } => {
                let question_id = self.session.current_question().id.clone();
                self.select(&question_id, &option_id)
            }
            SessionCommand::Advance => {
                if !self.session.advance() {
                    return;
                }
                self.navigated()
            }
            SessionCommand::Retreat => {
                if !self.session.retreat() {
                    return;
                }
                self.navigated()
            }
            SessionCommand::GoTo(index) => {
                if !self.session.go_to(index) {
                    return;
                }
                self.navigated()
            }
            SessionCommand::Hint => {
                let question_id = self.session.current_question().id.clone();
                match self.session.reveal_hint() {
                    Ok(hint) => SessionEvent::HintRevealed {
                        question_id,
                        hint: hint.map(str::to_string),
                    },
                    Err(e) => SessionEvent::Rejected(e),
                }
            }
            SessionCommand::Submit => match self.session.submit() {
                Ok(reason) => SessionEvent::Submitting { reason },
                Err(e) => SessionEvent::Rejected(e),
            },
            SessionCommand::RetrySubmission => {
                if self.awaiting_retry {
                    self.awaiting_retry = false;
                    return;
                }
                SessionEvent::Rejected(SessionError::InvalidTransition {
                    action: "retry the submission",
                    phase: self.session.phase(),
                })
            }
            SessionCommand::Abandon => {
                if let Err(e) = self.session.abandon() {
                    SessionEvent::Rejected(e)
                } else {
                    self.after_abandon()
                }
            }
        };
        self.emit(event);
    }

    fn select(&mut self, question_id: &str, option_id: &str) -> SessionEvent {
        match self.session.select_option(question_id, option_id) {
            Ok(answer) => {
                let answer = answer.clone();
                SessionEvent::AnswerRecorded {
                    answer,
                    progress: self.session.progress_percent(),
                }
            }
            Err(e) => SessionEvent::Rejected(e),
        }
    }

    fn navigated(&self) -> SessionEvent {
        SessionEvent::Navigated {
            index: self.session.current_index(),
            question_id: self.session.current_question().id.clone(),
        }
    }

    fn abandon(&mut self) {
        if self.session.abandon().is_ok() {
            let event = self.after_abandon();
            self.emit(event);
        }
    }

    fn after_abandon(&mut self) -> SessionEvent {
        self.discarded = self.session.answers().len();
        self.awaiting_retry = false;
        SessionEvent::Abandoned {
            discarded: self.discarded,
        }
    }

    /// Hand the pending result to the reporter, retrying transient
    /// failures with exponential backoff.
    async fn deliver(&mut self) {
        let Some(result) = self.session.pending_result().cloned() else {
            return;
        };

        let mut retry_delay = self.config.retry_delay;
        for retry in 0..=self.config.max_submit_retries {
            if retry > 0 {
                time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
            }

            match self.reporter.submit(&result).await {
                Ok(()) => {
                    if let Ok(result) = self.session.acknowledge() {
                        let event = SessionEvent::Completed(result.clone());
                        self.emit(event);
                    }
                    return;
                }
                Err(error) => {
                    if let Some(ms) = error.retry_after_ms() {
                        retry_delay = Duration::from_millis(ms);
                    }
                    let permanent = error.is_permanent();
                    let will_retry = !permanent && retry < self.config.max_submit_retries;
                    let attempts = self
                        .session
                        .record_failure(error.clone())
                        .unwrap_or_else(|_| self.session.failed_submissions());

                    self.emit(SessionEvent::SubmissionFailed {
                        error: error.clone(),
                        attempts,
                        will_retry,
                    });

                    if !will_retry {
                        tracing::error!(
                            session = %self.session.id(),
                            reporter = self.reporter.name(),
                            "giving up on submission: {error}"
                        );
                        break;
                    }
                }
            }
        }

        self.awaiting_retry = true;
    }

    fn emit(&self, event: SessionEvent) {
        // The presentation layer may have stopped listening.
        let _ = self.events.send(event);
    }
}
