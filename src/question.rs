use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::category::{self, GENERAL_KNOWLEDGE};

/// Points awarded for a correct answer when the difficulty label is not recognized
pub const DEFAULT_POINTS: u32 = 10;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Value used for the upstream `difficulty` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses an upstream difficulty label, ignoring case
    pub fn from_label(label: &str) -> Option<Difficulty> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_param().eq_ignore_ascii_case(label.trim()))
    }

    pub fn points(&self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }
}

/// Score delta for a correct answer to a question with the given difficulty label
pub fn points_for(label: &str) -> u32 {
    Difficulty::from_label(label).map_or(DEFAULT_POINTS, |d| d.points())
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum QuestionFormat {
    #[default]
    #[strum(to_string = "Multiple Choice")]
    Multiple,
    #[strum(to_string = "True / False")]
    Boolean,
}

impl QuestionFormat {
    pub const ALL: [QuestionFormat; 2] = [QuestionFormat::Multiple, QuestionFormat::Boolean];

    /// Value used for the upstream `type` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            QuestionFormat::Multiple => "multiple",
            QuestionFormat::Boolean => "boolean",
        }
    }

    pub fn from_label(label: &str) -> Option<QuestionFormat> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_param().eq_ignore_ascii_case(label.trim()))
    }
}

/// Settings chosen on the configuration screen; fixed for the whole round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfiguration {
    pub category_id: u32,
    pub difficulty: Difficulty,
    pub format: QuestionFormat,
}

impl RoundConfiguration {
    pub fn new(category_id: u32, difficulty: Difficulty, format: QuestionFormat) -> Self {
        Self {
            category_id,
            difficulty,
            format,
        }
    }

    pub fn category_name(&self) -> &'static str {
        category::name_of(self.category_id).unwrap_or("Any Category")
    }
}

impl Default for RoundConfiguration {
    fn default() -> Self {
        Self {
            category_id: GENERAL_KNOWLEDGE,
            difficulty: Difficulty::default(),
            format: QuestionFormat::default(),
        }
    }
}

/// A single decoded trivia question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub category: String,
    /// Upstream label, kept verbatim so unknown labels still score
    pub difficulty: String,
    pub format: QuestionFormat,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

impl Question {
    pub fn points(&self) -> u32 {
        points_for(&self.difficulty)
    }

    pub fn is_correct(&self, option: &str) -> bool {
        option == self.correct_answer
    }

    /// Options in their canonical order: correct answer first, then the incorrect ones.
    /// Boolean questions always present `True` before `False`.
    pub fn options(&self) -> Vec<String> {
        match self.format {
            QuestionFormat::Boolean => vec!["True".to_string(), "False".to_string()],
            QuestionFormat::Multiple => std::iter::once(self.correct_answer.clone())
                .chain(self.incorrect_answers.iter().cloned())
                .collect(),
        }
    }
}

pub type QuestionBatch = Vec<Question>;

#[cfg(test)]
mod tests {
    use super::*;

    fn question(difficulty: &str, format: QuestionFormat) -> Question {
        Question {
            text: "Which planet is known as the Red Planet?".to_string(),
            category: "Science & Nature".to_string(),
            difficulty: difficulty.to_string(),
            format,
            correct_answer: "Mars".to_string(),
            incorrect_answers: vec![
                "Venus".to_string(),
                "Jupiter".to_string(),
                "Mercury".to_string(),
            ],
        }
    }

    #[test]
    fn test_points_per_difficulty() {
        assert_eq!(points_for("easy"), 10);
        assert_eq!(points_for("medium"), 20);
        assert_eq!(points_for("hard"), 30);
    }

    #[test]
    fn test_points_ignore_case_and_whitespace() {
        assert_eq!(points_for("Hard"), 30);
        assert_eq!(points_for(" MEDIUM "), 20);
    }

    #[test]
    fn test_points_for_unknown_label_defaults() {
        assert_eq!(points_for("legendary"), DEFAULT_POINTS);
        assert_eq!(points_for(""), DEFAULT_POINTS);
    }

    #[test]
    fn test_difficulty_display_and_param() {
        assert_eq!(Difficulty::Medium.to_string(), "Medium");
        assert_eq!(Difficulty::Medium.as_param(), "medium");
    }

    #[test]
    fn test_format_display_and_param() {
        assert_eq!(QuestionFormat::Boolean.to_string(), "True / False");
        assert_eq!(QuestionFormat::Boolean.as_param(), "boolean");
        assert_eq!(QuestionFormat::from_label("multiple"), Some(QuestionFormat::Multiple));
        assert_eq!(QuestionFormat::from_label("essay"), None);
    }

    #[test]
    fn test_default_configuration() {
        let config = RoundConfiguration::default();
        assert_eq!(config.category_id, 9);
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.format, QuestionFormat::Multiple);
        assert_eq!(config.category_name(), "General Knowledge");
    }

    #[test]
    fn test_multiple_choice_options_contain_every_answer() {
        let q = question("easy", QuestionFormat::Multiple);
        let options = q.options();
        assert_eq!(options.len(), 4);
        assert_eq!(options[0], "Mars");
        assert!(options.contains(&"Mercury".to_string()));
    }

    #[test]
    fn test_boolean_options_are_fixed() {
        let mut q = question("easy", QuestionFormat::Boolean);
        q.correct_answer = "False".to_string();
        q.incorrect_answers = vec!["True".to_string()];
        assert_eq!(q.options(), vec!["True", "False"]);
        assert!(q.is_correct("False"));
        assert!(!q.is_correct("True"));
    }

    #[test]
    fn test_question_points_use_own_label() {
        assert_eq!(question("hard", QuestionFormat::Multiple).points(), 30);
        assert_eq!(question("bogus", QuestionFormat::Multiple).points(), 10);
    }
}
