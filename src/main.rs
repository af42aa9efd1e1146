use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use clap::Parser;
use fragments::app::{App, Session};
use fragments::config::EnvConfig;
use fragments::persist::PersistedState;
use fragments::providers;
use fragments::runtime::GenerationRuntime;
use fragments::selection::{IngestOutcome, InteractionMode, SelectionCapture, ViewerEvent};
use fragments::viewer::StaticViewer;
use fragments::{logging, TextContainer};
use prefs_store::{prefs_path, PrefsStore};

const EVENT_WAIT: Duration = Duration::from_millis(100);
const LOCAL_USER_ID: &str = "local-user";

/// Attach a line range of a source file and ask for a fragment about it.
#[derive(Parser, Debug, Clone)]
#[command(version)]
struct Cli {
    /// Source file to load into the viewer.
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// 1-based inclusive line range, `START-END` or a single line.
    #[arg(value_name = "START-END", value_parser = parse_line_range)]
    lines: LineRange,

    /// Prompt sent along with the attached lines.
    #[arg(value_name = "PROMPT", required = true, num_args = 1.., trailing_var_arg = true)]
    prompt: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineRange {
    first: usize,
    last: usize,
}

fn parse_line_range(value: &str) -> Result<LineRange, String> {
    let (first, last) = value.split_once('-').unwrap_or((value, value));
    let parse = |part: &str| {
        part.trim()
            .parse::<usize>()
            .map_err(|_| format!("invalid line range '{value}'"))
    };
    let range = LineRange {
        first: parse(first)?,
        last: parse(last)?,
    };
    if range.first == 0 || range.first > range.last {
        return Err(format!("invalid line range '{value}'"));
    }
    Ok(range)
}

fn main() -> io::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let config = EnvConfig::from_env();

    let cwd = std::env::current_dir()?;
    let prefs_file = config.prefs_path.clone().unwrap_or_else(|| prefs_path(&cwd));
    let mut prefs = PrefsStore::open(&prefs_file).map_err(io::Error::other)?;

    let mut app = App::from_config(&config);
    let persisted =
        PersistedState::load(&prefs, app.persisted_state()).map_err(io::Error::other)?;
    app.apply_persisted_state(persisted);
    app.set_session(Some(Session {
        user_id: LOCAL_USER_ID.to_string(),
        access_token: String::new(),
        team_id: None,
    }));

    let source = std::fs::read_to_string(&cli.file)?;
    let mut viewer = StaticViewer::new(source);
    let range = viewer
        .select_lines(cli.lines.first, cli.lines.last)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "lines {}-{} are outside {}",
                    cli.lines.first,
                    cli.lines.last,
                    cli.file.display()
                ),
            )
        })?;

    let mode = app.interaction_mode();
    let event = match mode {
        InteractionMode::Auto => ViewerEvent::PointerUp,
        InteractionMode::Menu => {
            let rect = viewer.bounding_box(&range);
            ViewerEvent::ContextMenu {
                x: rect.map_or(0.0, |rect| rect.left),
                y: rect.map_or(0.0, |rect| rect.bottom),
            }
        }
    };
    let outcome = SelectionCapture::new(mode).handle_event(event, &viewer, &viewer);
    if let Some(selection) = outcome.selection {
        if app.on_code_selection(selection) == IngestOutcome::Pending {
            app.on_attach_pending();
        }
    }
    if let Some(error) = app.attachment.error() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, error.to_string()));
    }

    let selected = providers::providers_from_env(&config).map_err(io::Error::other)?;
    let app = Arc::new(Mutex::new(app));
    let runtime = GenerationRuntime::new(Arc::clone(&app), selected.generation, selected.sandbox);

    {
        let mut host = Arc::clone(&runtime);
        let mut app = lock_unpoisoned(&app);
        app.on_input_replace(cli.prompt.join(" "));
        app.on_submit(&mut host);
    }

    while runtime.has_work_in_flight() {
        runtime.wait_for_events(EVENT_WAIT);
        runtime.flush_pending_events();
    }

    let app = lock_unpoisoned(&app);
    if let Some(message) = app.history.last() {
        let rendered = serde_json::to_string_pretty(message).map_err(io::Error::other)?;
        println!("{rendered}");
    }
    if let Some(url) = app.result.as_ref().and_then(|result| result.url.as_deref()) {
        println!("sandbox: {url}");
    }

    app.persisted_state()
        .save(&mut prefs)
        .map_err(io::Error::other)?;

    match app.error_message.as_deref() {
        Some(error) => Err(io::Error::other(error.to_string())),
        None => Ok(()),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn parses_range_and_joins_prompt() {
        let cli = Cli::try_parse_from(["fragments", "src/app.py", "3-7", "make", "it", "async"])
            .expect("valid args");

        assert_eq!(cli.file, PathBuf::from("src/app.py"));
        assert_eq!(cli.lines, LineRange { first: 3, last: 7 });
        assert_eq!(cli.prompt.join(" "), "make it async");
    }

    #[test]
    fn single_line_range_is_accepted() {
        let cli = Cli::try_parse_from(["fragments", "a.rs", "4", "explain"]).expect("valid args");
        assert_eq!(cli.lines, LineRange { first: 4, last: 4 });
    }

    #[test]
    fn missing_prompt_or_bad_range_is_rejected() {
        let missing = Cli::try_parse_from(["fragments", "a.rs", "1-2"]).expect_err("no prompt");
        assert_eq!(missing.kind(), ErrorKind::MissingRequiredArgument);

        for range in ["x-2", "0-3", "5-2"] {
            let invalid =
                Cli::try_parse_from(["fragments", "a.rs", range, "go"]).expect_err("bad range");
            assert_eq!(invalid.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn help_is_a_flag_not_a_prompt() {
        let help = Cli::try_parse_from(["fragments", "--help"]).expect_err("help exits");
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);

        let trailing =
            Cli::try_parse_from(["fragments", "a.rs", "1-2", "--help"]).expect_err("help exits");
        assert_eq!(trailing.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn version_flag_is_supported() {
        let version = Cli::try_parse_from(["fragments", "--version"]).expect_err("version exits");
        assert_eq!(version.kind(), ErrorKind::DisplayVersion);
    }
}
