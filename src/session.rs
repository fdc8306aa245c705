use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::question::{Question, QuestionBatch, QuestionFormat, RoundConfiguration};
use crate::source::QuestionSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Configuring,
    Answering,
    Feedback,
    Completed,
    LoadError,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("`{operation}` is not allowed in the {phase} phase")]
    InvalidTransition {
        operation: &'static str,
        phase: Phase,
    },
}

/// The player's answer to the question on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub selected: String,
    pub correct: String,
    /// Options in the order they were displayed
    pub options: Vec<String>,
    pub points: u32,
}

impl AnswerRecord {
    pub fn is_correct(&self) -> bool {
        self.selected == self.correct
    }
}

/// Snapshot of a quiz session, read by the front-end after every operation
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    pub configuration: RoundConfiguration,
    pub questions: QuestionBatch,
    pub current_index: usize,
    pub score: u32,
    pub streak: u32,
    pub correct_count: u32,
    /// Present only during `Feedback`
    pub answer: Option<AnswerRecord>,
    /// Display order of the current question's options
    pub options: Vec<String>,
    /// Diagnostic shown on the load error screen
    pub load_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: Phase::Configuring,
            configuration: RoundConfiguration::default(),
            questions: Vec::new(),
            current_index: 0,
            score: 0,
            streak: 0,
            correct_count: 0,
            answer: None,
            options: Vec::new(),
            load_error: None,
        }
    }
}

impl SessionState {
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// One-based question number for display, clamped to the batch length
    pub fn question_number(&self) -> usize {
        (self.current_index + 1).min(self.questions.len())
    }

    /// Fraction of the round already answered and advanced past
    pub fn progress(&self) -> f64 {
        if self.questions.is_empty() {
            0.0
        } else {
            self.current_index as f64 / self.questions.len() as f64
        }
    }

    fn clear_round(&mut self) {
        self.questions.clear();
        self.current_index = 0;
        self.score = 0;
        self.streak = 0;
        self.correct_count = 0;
        self.answer = None;
        self.options.clear();
        self.load_error = None;
    }
}

/// Drives one player's quiz: configuration, answering, feedback and results
#[derive(Debug)]
pub struct Session<S: QuestionSource> {
    source: S,
    state: SessionState,
    rng: StdRng,
}

impl<S: QuestionSource> Session<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: SessionState::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic option shuffling
    pub fn with_seed(source: S, seed: u64) -> Self {
        Self {
            source,
            state: SessionState::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn ensure_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), SessionError> {
        if allowed.contains(&self.state.phase) {
            return Ok(());
        }
        let phase = self.state.phase;
        error!(operation, %phase, "invalid session transition");
        Err(SessionError::InvalidTransition { operation, phase })
    }

    pub fn set_configuration(
        &mut self,
        configuration: RoundConfiguration,
    ) -> Result<&SessionState, SessionError> {
        self.ensure_phase("set_configuration", &[Phase::Configuring])?;
        self.state.configuration = configuration;
        Ok(&self.state)
    }

    /// Fetches a fresh batch for the stored configuration and begins a round.
    /// A failed fetch is reported through `Phase::LoadError`, not as an `Err`.
    pub fn start_round(&mut self) -> Result<&SessionState, SessionError> {
        self.ensure_phase("start_round", &[Phase::Configuring, Phase::Completed])?;
        self.begin_round();
        Ok(&self.state)
    }

    /// Plays again with the same configuration
    pub fn restart_round(&mut self) -> Result<&SessionState, SessionError> {
        self.ensure_phase("restart_round", &[Phase::Completed])?;
        self.begin_round();
        Ok(&self.state)
    }

    fn begin_round(&mut self) {
        let config = self.state.configuration;
        info!(
            category = config.category_id,
            difficulty = %config.difficulty,
            format = config.format.as_param(),
            "starting round"
        );

        self.state.clear_round();
        match self.source.fetch_batch(&config) {
            Ok(batch) if !batch.is_empty() => {
                self.state.questions = batch;
                self.state.phase = Phase::Answering;
                self.present_question();
            }
            Ok(_) => {
                warn!("question source returned an empty batch");
                self.state.load_error = Some("No questions were returned.".to_string());
                self.state.phase = Phase::LoadError;
            }
            Err(e) => {
                warn!(error = %e, "failed to load questions");
                self.state.load_error = Some(e.to_string());
                self.state.phase = Phase::LoadError;
            }
        }
    }

    /// Fixes the option order for the question at `current_index`
    fn present_question(&mut self) {
        let Some(question) = self.state.current_question() else {
            self.state.options.clear();
            return;
        };

        let mut options = question.options();
        if question.format == QuestionFormat::Multiple {
            options.shuffle(&mut self.rng);
        }
        self.state.options = options;
    }

    /// Scores `selected` against the current question. Only one answer is
    /// accepted per question.
    pub fn submit_answer(&mut self, selected: &str) -> Result<&SessionState, SessionError> {
        self.ensure_phase("submit_answer", &[Phase::Answering])?;

        let state = &mut self.state;
        let Some(question) = state.questions.get(state.current_index) else {
            // Answering always has a question on screen
            let phase = state.phase;
            error!(index = state.current_index, "no question at current index");
            return Err(SessionError::InvalidTransition {
                operation: "submit_answer",
                phase,
            });
        };

        let correct = question.correct_answer.clone();
        let points = if question.is_correct(selected) {
            let points = question.points();
            state.correct_count += 1;
            state.streak += 1;
            state.score += points;
            points
        } else {
            state.streak = 0;
            0
        };

        state.answer = Some(AnswerRecord {
            selected: selected.to_string(),
            correct,
            options: state.options.clone(),
            points,
        });
        state.phase = Phase::Feedback;
        Ok(&self.state)
    }

    /// Moves past the feedback screen to the next question or the results
    pub fn advance(&mut self) -> Result<&SessionState, SessionError> {
        self.ensure_phase("advance", &[Phase::Feedback])?;

        self.state.current_index += 1;
        self.state.answer = None;

        if self.state.current_index >= self.state.questions.len() {
            self.state.current_index = self.state.questions.len();
            self.state.options.clear();
            self.state.phase = Phase::Completed;
            info!(
                score = self.state.score,
                correct = self.state.correct_count,
                total = self.state.questions.len(),
                "round completed"
            );
        } else {
            self.state.phase = Phase::Answering;
            self.present_question();
        }
        Ok(&self.state)
    }

    /// Returns to the settings screen from any phase. The stored configuration
    /// is kept so the selectors stay populated.
    pub fn reset_to_configuring(&mut self) -> &SessionState {
        self.state.clear_round();
        self.state.phase = Phase::Configuring;
        &self.state
    }
}
