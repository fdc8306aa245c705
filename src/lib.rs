// Library surface for the binary and for headless/integration tests.
pub mod api;
pub mod app;
pub mod app_dirs;
pub mod category;
pub mod config;
pub mod logging;
pub mod question;
pub mod runtime;
pub mod session;
pub mod source;
pub mod ui;

pub use question::{Difficulty, Question, QuestionBatch, QuestionFormat, RoundConfiguration};
pub use session::{AnswerRecord, Phase, Session, SessionError, SessionState};
pub use source::{FetchError, QuestionClient, QuestionSource};
