use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::category::{self, CATEGORIES};
use crate::question::{Difficulty, QuestionFormat, RoundConfiguration};
use crate::session::{Phase, Session, SessionError, SessionState};
use crate::source::QuestionSource;

/// Selector on the settings screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Difficulty,
    Format,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Category => Field::Difficulty,
            Field::Difficulty => Field::Format,
            Field::Format => Field::Category,
        }
    }

    fn prev(self) -> Self {
        match self {
            Field::Category => Field::Format,
            Field::Difficulty => Field::Category,
            Field::Format => Field::Difficulty,
        }
    }
}

/// Indices into the selectable values of each field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsForm {
    pub field: Field,
    pub category: usize,
    pub difficulty: usize,
    pub format: usize,
}

impl SettingsForm {
    pub fn from_config(config: &RoundConfiguration) -> Self {
        Self {
            field: Field::Category,
            category: category::index_of(config.category_id).unwrap_or(0),
            difficulty: Difficulty::ALL
                .iter()
                .position(|d| *d == config.difficulty)
                .unwrap_or(0),
            format: QuestionFormat::ALL
                .iter()
                .position(|f| *f == config.format)
                .unwrap_or(0),
        }
    }

    pub fn to_config(&self) -> RoundConfiguration {
        RoundConfiguration::new(
            CATEGORIES[self.category].1,
            Difficulty::ALL[self.difficulty],
            QuestionFormat::ALL[self.format],
        )
    }

    fn cycle(&mut self, forward: bool) {
        let (value, len) = match self.field {
            Field::Category => (&mut self.category, CATEGORIES.len()),
            Field::Difficulty => (&mut self.difficulty, Difficulty::ALL.len()),
            Field::Format => (&mut self.format, QuestionFormat::ALL.len()),
        };
        *value = if forward {
            (*value + 1) % len
        } else {
            (*value + len - 1) % len
        };
    }
}

/// What the event loop should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    /// Draw the loading screen, then call [`App::fetch`]
    Fetch,
    Quit,
}

/// Front-end state layered over a quiz session
#[derive(Debug)]
pub struct App<S: QuestionSource> {
    pub session: Session<S>,
    pub settings: SettingsForm,
    /// Highlighted option while answering
    pub cursor: usize,
    pub loading: bool,
}

impl<S: QuestionSource> App<S> {
    pub fn new(session: Session<S>) -> Self {
        let settings = SettingsForm::from_config(&session.state().configuration);
        Self {
            session,
            settings,
            cursor: 0,
            loading: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    /// Key bindings only call operations valid for the current phase, so a
    /// rejected transition is a bug: it panics in debug builds and is logged
    /// and ignored in release builds.
    fn apply(
        &mut self,
        op: impl FnOnce(&mut Session<S>) -> Result<&SessionState, SessionError>,
    ) {
        let result = op(&mut self.session).map(|_| ());
        debug_assert!(result.is_ok(), "key binding hit {result:?}");
        if let Err(e) = result {
            warn!(error = %e, "ignoring key");
        }
        self.cursor = 0;
    }

    fn reset(&mut self) {
        self.session.reset_to_configuring();
        self.settings = SettingsForm::from_config(&self.state().configuration);
        self.cursor = 0;
    }

    /// Starts or restarts a round; blocks on the question source
    pub fn fetch(&mut self) {
        match self.state().phase {
            Phase::Configuring => {
                let config = self.settings.to_config();
                self.apply(|s| s.set_configuration(config));
                self.apply(|s| s.start_round());
            }
            _ => self.apply(|s| s.restart_round()),
        }
        self.loading = false;
    }

    fn answer(&mut self, index: usize) {
        let Some(option) = self.state().options.get(index).cloned() else {
            return;
        };
        self.apply(|s| s.submit_answer(&option));
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Action {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Action::Quit;
        }

        match self.state().phase {
            Phase::Configuring => match key.code {
                KeyCode::Up | KeyCode::BackTab => self.settings.field = self.settings.field.prev(),
                KeyCode::Down | KeyCode::Tab => self.settings.field = self.settings.field.next(),
                KeyCode::Left => self.settings.cycle(false),
                KeyCode::Right => self.settings.cycle(true),
                KeyCode::Enter => {
                    self.loading = true;
                    return Action::Fetch;
                }
                _ => {}
            },
            Phase::Answering => {
                let count = self.state().options.len();
                match key.code {
                    KeyCode::Up if self.cursor > 0 => self.cursor -= 1,
                    KeyCode::Down if self.cursor + 1 < count => self.cursor += 1,
                    KeyCode::Enter => self.answer(self.cursor),
                    KeyCode::Char(c @ '1'..='9') => {
                        let index = c as usize - '1' as usize;
                        if index < count {
                            self.answer(index);
                        }
                    }
                    KeyCode::Char('t') if count == 2 => self.answer_text("True"),
                    KeyCode::Char('f') if count == 2 => self.answer_text("False"),
                    KeyCode::Char('c') => self.reset(),
                    _ => {}
                }
            }
            Phase::Feedback => match key.code {
                KeyCode::Enter | KeyCode::Right | KeyCode::Char('n') => {
                    self.apply(|s| s.advance())
                }
                KeyCode::Char('c') => self.reset(),
                _ => {}
            },
            Phase::Completed => match key.code {
                KeyCode::Char('r') => {
                    self.loading = true;
                    return Action::Fetch;
                }
                KeyCode::Char('c') => self.reset(),
                _ => {}
            },
            Phase::LoadError => match key.code {
                KeyCode::Enter | KeyCode::Char('c') | KeyCode::Char('b') => self.reset(),
                _ => {}
            },
        }

        Action::Continue
    }

    fn answer_text(&mut self, text: &str) {
        if let Some(index) = self.state().options.iter().position(|o| o == text) {
            self.answer(index);
        }
    }
}
