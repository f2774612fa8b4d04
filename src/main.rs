use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin, Write},
    path::{Path, PathBuf},
};
use time_humanize::{Accuracy, HumanTime, Tense};

use tadak::{
    app_dirs::AppDirs,
    clock::SessionPhase,
    config::{Config, ConfigStore, FileConfigStore},
    diff::Outcome,
    engine::{EngineEvent, FeedbackSink, PracticeEngine, SessionSpec, Snapshot},
    item::{Language, PracticeItem, PracticeType},
    pool,
    runtime::{CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker, TutorEvent},
    speech::UnavailableSynthesizer,
    stats::StatsDb,
    ui::SessionView,
};

/// terminal typing tutor for english and korean drills, dictation and read-aloud practice
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// kind of practice
    #[clap(short = 't', long, value_enum)]
    practice_type: Option<PracticeType>,

    /// language of the bundled practice pool
    #[clap(short = 'l', long, value_enum)]
    language: Option<Language>,

    /// session length in seconds
    #[clap(short = 's', long)]
    secs: Option<u64>,

    /// finish after this many completed items (used when no time limit is given)
    #[clap(short = 'n', long)]
    items: Option<usize>,

    /// custom prompt to practice instead of the bundled pool
    #[clap(short = 'p', long, conflicts_with = "file")]
    prompt: Option<String>,

    /// practice every non-blank line of a text file
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,

    /// speech rate for dictation playback
    #[clap(long)]
    speech_rate: Option<f32>,

    /// ring the terminal bell on mistyped characters
    #[clap(long)]
    bell: bool,

    /// print the last N sessions and exit
    #[clap(long, value_name = "N")]
    history: Option<usize>,

    /// write every recorded session to a CSV file and exit
    #[clap(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// delete every recorded session and exit
    #[clap(long, conflicts_with_all = ["history", "export_csv"])]
    clear_history: bool,
}

impl Cli {
    /// Flags win over the stored config
    fn apply(&self, cfg: &mut Config) {
        if let Some(practice_type) = self.practice_type {
            cfg.practice_type = practice_type;
        }
        if let Some(language) = self.language {
            cfg.language = language;
        }
        match (self.secs, self.items) {
            (Some(secs), items) => {
                cfg.duration_secs = Some(secs);
                if items.is_some() {
                    cfg.item_limit = items;
                }
            }
            (None, Some(items)) => {
                cfg.duration_secs = None;
                cfg.item_limit = Some(items);
            }
            (None, None) => {}
        }
        if let Some(rate) = self.speech_rate {
            cfg.speech_rate = rate;
        }
        if self.bell {
            cfg.keystroke_bell = true;
        }
    }

    fn practice_items(&self, cfg: &Config) -> tadak::Result<Vec<PracticeItem>> {
        let items = if let Some(prompt) = &self.prompt {
            pool::from_prompt(prompt, cfg.language)
        } else if let Some(path) = &self.file {
            pool::from_text_file(path, cfg.language)?
        } else {
            pool::load(cfg.practice_type, cfg.language)?
        };
        pool::validate(&items)?;
        Ok(items)
    }
}

/// Rings the terminal bell on mistakes
struct TerminalBell;

impl FeedbackSink for TerminalBell {
    fn keystroke(&mut self, outcome: Outcome) {
        if outcome == Outcome::Incorrect {
            let mut stdout = io::stdout();
            if let Err(err) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
                warn!("bell failed: {err}");
            }
        }
    }
}

pub struct App {
    engine: PracticeEngine,
    snapshot: Snapshot,
    best_wpm: Option<u32>,
}

impl App {
    pub fn new(engine: PracticeEngine, best_wpm: Option<u32>) -> Self {
        let snapshot = engine.snapshot();
        Self {
            engine,
            snapshot,
            best_wpm,
        }
    }

    fn apply(&mut self, event: EngineEvent) {
        self.snapshot = self.engine.handle_event(event);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Engine(EngineEvent),
    Quit,
}

fn map_key(key: KeyEvent, snapshot: &Snapshot) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if snapshot.phase == SessionPhase::Complete {
        return match key.code {
            KeyCode::Char('r') if !ctrl => Some(Action::Engine(EngineEvent::Restart)),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('c') if ctrl => Some(Action::Quit),
            _ => None,
        };
    }

    let event = match key.code {
        KeyCode::Char('c') if ctrl => return Some(Action::Quit),
        KeyCode::Char('p') if ctrl => EngineEvent::TogglePause,
        KeyCode::Char('l') if ctrl => EngineEvent::Listen,
        KeyCode::Char(_) if ctrl => return None,
        KeyCode::Char(c) => {
            let mut value = snapshot.input.clone();
            value.push(c);
            EngineEvent::RawChange(value)
        }
        KeyCode::Backspace => EngineEvent::Backspace,
        KeyCode::Tab => EngineEvent::Advance,
        KeyCode::Left => EngineEvent::Prev,
        KeyCode::Right => EngineEvent::Next,
        KeyCode::Enter if snapshot.practice_type == PracticeType::ReadAloud => {
            EngineEvent::Recognition(snapshot.input.clone())
        }
        KeyCode::Esc => EngineEvent::Stop,
        _ => return None,
    };
    Some(Action::Engine(event))
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    let file = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));
    let Ok(file) = file else {
        return;
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn print_history(limit: usize) -> Result<(), Box<dyn Error>> {
    let db = StatsDb::new()?;
    let sessions = db.recent(limit)?;
    if sessions.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    let now = Local::now();
    for s in &sessions {
        let age = now
            .signed_duration_since(s.finished_at)
            .to_std()
            .unwrap_or_default();
        println!(
            "{:<11} {:>4} wpm {:>4}% acc {:>4} items   {}",
            s.practice_type.to_string(),
            s.wpm,
            s.accuracy,
            s.items_completed,
            HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past)
        );
    }

    let totals = db.totals()?;
    println!(
        "{} sessions, {}/{} characters correct",
        totals.sessions, totals.correct_characters, totals.total_characters
    );
    Ok(())
}

fn export_csv(path: &Path) -> Result<(), Box<dyn Error>> {
    let db = StatsDb::new()?;
    let rows = db.export_csv(File::create(path)?)?;
    println!("exported {rows} sessions to {}", path.display());
    Ok(())
}

fn clear_history(db: &StatsDb) -> Result<(), Box<dyn Error>> {
    let sessions = db.totals()?.sessions;
    db.clear_all()?;
    info!("cleared {sessions} recorded sessions");
    println!("cleared {sessions} sessions");
    Ok(())
}

fn build_app(cli: &Cli, config: &Config) -> Result<App, Box<dyn Error>> {
    let items = cli.practice_items(config)?;
    let spec = SessionSpec {
        practice_type: config.practice_type,
        limit: config.session_limit(items.len()),
        speech_rate: config.speech_rate,
    };
    info!("starting {} practice with {:?}", spec.practice_type, spec.limit);

    let mut engine = PracticeEngine::new(items, spec)?;
    let mut best_wpm = None;
    match StatsDb::new() {
        Ok(db) => {
            best_wpm = db.best_wpm(spec.practice_type).unwrap_or_else(|err| {
                warn!("could not read best wpm: {err}");
                None
            });
            engine = engine.with_summary_sink(Box::new(db));
        }
        Err(err) => warn!("session history disabled: {err}"),
    }
    if config.keystroke_bell {
        engine = engine.with_feedback_sink(Box::new(TerminalBell));
    }
    let engine = engine.with_synthesizer(Box::new(UnavailableSynthesizer));

    Ok(App::new(engine, best_wpm))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if let Some(limit) = cli.history {
        return print_history(limit);
    }
    if let Some(path) = &cli.export_csv {
        return export_csv(path);
    }
    if cli.clear_history {
        return clear_history(&StatsDb::new()?);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    if let Err(err) = store.save(&config) {
        warn!("could not save config to {:?}: {err}", store.path());
    }

    let mut app = build_app(&cli, &config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            TutorEvent::Tick => app.apply(EngineEvent::Tick),
            TutorEvent::Resize => {}
            TutorEvent::Key(key) => match map_key(key, &app.snapshot) {
                Some(Action::Quit) => break,
                Some(Action::Engine(event)) => app.apply(event),
                None => continue,
            },
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    let view = SessionView::new(&app.snapshot).with_best_wpm(app.best_wpm);
    f.render_widget(&view, f.area());
}
