use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    time::Duration,
};
use tracing::info;

use trivia_tui::{
    api::HttpTriviaApi,
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    runtime::{CrosstermEventSource, FixedTicker, QuizEventSource, Runner, Ticker},
    source::{FixedBackoff, QuestionClient, QuestionSource},
    Difficulty, QuestionFormat, RoundConfiguration, Session,
};

const TICK_RATE_MS: u64 = 250;

/// ten-question trivia rounds in the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Pick a category, difficulty and question type, then answer ten questions from the Open Trivia Database. Correct answers score 10/20/30 points by difficulty and build your streak."
)]
pub struct Cli {
    /// category to preselect, by name or numeric id
    #[clap(short, long, value_parser = trivia_tui::category::parse)]
    category: Option<u32>,

    /// difficulty to preselect
    #[clap(short, long, value_enum)]
    difficulty: Option<Difficulty>,

    /// question type to preselect
    #[clap(short, long, value_enum)]
    format: Option<QuestionFormat>,

    /// base url of the trivia service (overrides config)
    #[clap(long)]
    api_url: Option<String>,

    /// per-request timeout in seconds (overrides config)
    #[clap(long)]
    timeout_secs: Option<u64>,

    /// raise log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn round_configuration(&self) -> RoundConfiguration {
        let defaults = RoundConfiguration::default();
        RoundConfiguration::new(
            self.category.unwrap_or(defaults.category_id),
            self.difficulty.unwrap_or(defaults.difficulty),
            self.format.unwrap_or(defaults.format),
        )
    }

    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = secs;
        }
        config
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let _log_guard = match AppDirs::log_dir() {
        Some(dir) => Some(logging::init(&dir, cli.verbose)?),
        None => None,
    };

    let store = FileConfigStore::new();
    let config = cli.apply_overrides(store.load()).sanitized();
    info!(config = %store.path().display(), api_url = %config.api_url, "starting trivia");

    let api = HttpTriviaApi::new(config.api_url.clone(), config.timeout())?;
    let client = QuestionClient::with_backoff(api, FixedBackoff::new(config.backoff()))
        .with_policy(config.retry_policy());

    let mut session = Session::new(client);
    session.set_configuration(cli.round_configuration())?;
    let mut app = App::new(session);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, S: QuestionSource, E: QuizEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    let exit = runner.run(app, |app| {
        terminal.draw(|f| f.render_widget(app, f.area()))?;
        Ok(())
    })?;
    info!(?exit, "leaving trivia");
    Ok(())
}
