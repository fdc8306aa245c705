use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};

use crate::app::{App, Field};
use crate::category::CATEGORIES;
use crate::question::{Difficulty, QuestionFormat};
use crate::session::{Phase, SessionState};
use crate::source::QuestionSource;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

const HOW_TO_PLAY: [&str; 5] = [
    "Choose a category, difficulty and question type, then press enter.",
    "Answer each of the 10 questions with the number keys or arrows.",
    "Correct answers earn 10 / 20 / 30 points by difficulty and build your streak.",
    "Check the feedback, then press enter for the next question.",
    "See your final score after question 10, and press r to play again.",
];

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl<S: QuestionSource> Widget for &App<S> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.loading {
            Paragraph::new(Span::styled(
                "Fetching questions...",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .render(centered_line(area), buf);
            return;
        }

        let state = self.state();
        match state.phase {
            Phase::Configuring => render_settings(self, area, buf),
            Phase::Answering | Phase::Feedback => render_round(self, area, buf),
            Phase::Completed => render_results(state, area, buf),
            Phase::LoadError => render_load_error(state, area, buf),
        }
    }
}

fn centered_line(area: Rect) -> Rect {
    Rect::new(area.x, area.y + area.height / 2, area.width, 1.min(area.height))
}

fn render_settings<S: QuestionSource>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2), // title
            Constraint::Length(2), // tagline
            Constraint::Length(4), // selectors
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled("Trivia Game", bold().fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        "Test your knowledge with fun trivia questions!",
        italic(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let form = &app.settings;
    let rows = [
        (Field::Category, "Category", CATEGORIES[form.category].0.to_string()),
        (Field::Difficulty, "Difficulty", Difficulty::ALL[form.difficulty].to_string()),
        (Field::Format, "Type", QuestionFormat::ALL[form.format].to_string()),
    ];

    let lines: Vec<Line> = rows
        .into_iter()
        .map(|(field, label, value)| {
            let selected = field == form.field;
            let value_style = if selected {
                bold().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{label:>12}  "), Style::default().add_modifier(Modifier::DIM)),
                Span::styled(
                    if selected {
                        format!("< {value} >")
                    } else {
                        format!("  {value}  ")
                    },
                    value_style,
                ),
            ])
        })
        .collect();

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let mut help = vec![Line::from(Span::styled("How to Play", bold().fg(Color::Cyan)))];
    help.extend(HOW_TO_PLAY.iter().enumerate().map(|(idx, step)| {
        Line::from(Span::styled(
            format!("{}. {step}", idx + 1),
            Style::default().add_modifier(Modifier::DIM),
        ))
    }));
    Paragraph::new(help)
        .wrap(Wrap { trim: true })
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(↑↓) field / (←→) change / (enter) start / (esc)ape",
        italic(),
    ))
    .render(chunks[4], buf);
}

fn render_header(state: &SessionState, score_area: Rect, gauge_area: Rect, buf: &mut Buffer) {
    let streak = if state.streak > 0 {
        format!("Streak: {} 🔥", state.streak)
    } else {
        "Streak: 0".to_string()
    };

    Paragraph::new(Span::styled(
        format!(
            "Score: {} | {} | Question: {}/{}",
            state.score,
            streak,
            state.question_number(),
            state.total_questions()
        ),
        bold().fg(Color::Cyan),
    ))
    .alignment(Alignment::Right)
    .render(score_area, buf);

    Gauge::default()
        .gauge_style(Style::default().fg(Color::Blue))
        .ratio(state.progress().clamp(0.0, 1.0))
        .label("")
        .render(gauge_area, buf);
}

fn render_round<S: QuestionSource>(app: &App<S>, area: Rect, buf: &mut Buffer) {
    let state = app.state();
    let Some(question) = state.current_question() else {
        return;
    };

    let options_height = state.options.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),              // score / streak
            Constraint::Length(1),              // progress
            Constraint::Length(1),              // padding
            Constraint::Min(2),                 // question
            Constraint::Length(2),              // difficulty and category
            Constraint::Length(options_height), // options
            Constraint::Length(1),              // padding
            Constraint::Length(2),              // feedback
            Constraint::Length(1),              // legend
        ])
        .split(area);

    render_header(state, chunks[0], chunks[1], buf);

    Paragraph::new(Span::styled(
        format!("Question {}: {}", state.current_index + 1, question.text),
        bold(),
    ))
    .wrap(Wrap { trim: true })
    .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        format!(
            "(Difficulty: {}, Category: {})",
            capitalize(&question.difficulty),
            question.category
        ),
        italic().add_modifier(Modifier::DIM),
    ))
    .render(chunks[4], buf);

    let lines: Vec<Line> = state
        .options
        .iter()
        .enumerate()
        .map(|(idx, option)| {
            let style = match &state.answer {
                Some(answer) if *option == answer.correct => bold().fg(Color::Green),
                Some(answer) if *option == answer.selected => bold().fg(Color::Red),
                Some(_) => Style::default().add_modifier(Modifier::DIM),
                None if idx == app.cursor => bold().add_modifier(Modifier::REVERSED),
                None => Style::default(),
            };
            Line::from(Span::styled(format!("{}. {}", idx + 1, option), style))
        })
        .collect();

    Paragraph::new(lines).render(chunks[5], buf);

    if let Some(answer) = &state.answer {
        let mut lines = Vec::new();
        if answer.is_correct() {
            lines.push(Line::from(Span::styled(
                format!("Correct! +{} points", answer.points),
                bold().fg(Color::Green),
            )));
            if state.streak > 1 {
                lines.push(Line::from(Span::styled(
                    format!("Streak: {} 🔥", state.streak),
                    Style::default().fg(Color::Yellow),
                )));
            }
        } else {
            lines.push(Line::from(Span::styled(
                format!("Incorrect! The answer was: {}", answer.correct),
                bold().fg(Color::Red),
            )));
        }
        Paragraph::new(lines).render(chunks[7], buf);
    }

    let legend = match (state.phase, question.format) {
        (Phase::Feedback, _) => "(enter) next question / (c)hange settings / (esc)ape",
        (_, QuestionFormat::Boolean) => "(t)rue / (f)alse / (1-2) pick / (c)hange settings / (esc)ape",
        _ => "(↑↓) move / (enter) answer / (1-4) pick / (c)hange settings / (esc)ape",
    };
    Paragraph::new(Span::styled(legend, italic())).render(chunks[8], buf);
}

fn render_results(state: &SessionState, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // score / streak
            Constraint::Length(1), // progress
            Constraint::Min(0),
            Constraint::Length(5), // summary
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_header(state, chunks[0], chunks[1], buf);

    let summary = vec![
        Line::from(Span::styled("Game Completed!", bold().fg(Color::Magenta))),
        Line::from(""),
        Line::from(Span::styled(format!("Final Score: {} points", state.score), bold())),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "({} / {} correct answers)",
                state.correct_count,
                state.total_questions()
            ),
            italic(),
        )),
    ];
    Paragraph::new(summary)
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "(r) play again / (c)hange settings / (esc)ape",
        italic(),
    ))
    .render(chunks[5], buf);
}

fn render_load_error(state: &SessionState, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let mut lines = vec![
        Line::from(Span::styled(
            "Failed to load questions. Please check your settings or try again later.",
            bold().fg(Color::Red),
        )),
        Line::from(""),
    ];
    if let Some(reason) = &state.load_error {
        lines.push(Line::from(Span::styled(reason.clone(), italic())));
    }

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);

    Paragraph::new(Span::styled("(enter) back to settings / (esc)ape", italic()))
        .render(chunks[3], buf);
}
