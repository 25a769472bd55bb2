//! Command-line reader.
//!
//! Loads `conf/config.toml` (or `--config PATH`), ingests every input into the
//! library and reads it aloud through a console backend that prints each chunk
//! and paces it by length and rate.

use anyhow::{Context, Result, anyhow, bail};
use readaloud::chunker::chunk;
use readaloud::config::load_config;
use readaloud::ingest::SourceFile;
use readaloud::playback::{SpeechEvent, SpeechEventKind, SpeechSynthesizer, Utterance, UtteranceId};
use readaloud::session::ReaderSession;
use readaloud::view::{PlaylistEntry, PresentationAdapter, TranscriptWindow};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::env;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: readaloud [--config PATH] [--dry-run] <file|url|->...";
const DEFAULT_CONFIG: &str = "conf/config.toml";
const CHARS_PER_SECOND: f32 = 15.0;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config = load_config(&args.config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        config = %args.config_path.display(),
        level = %config.log_level,
        inputs = args.inputs.len(),
        dry_run = args.dry_run,
        "Starting reader"
    );

    let queue: EventQueue = Rc::new(RefCell::new(VecDeque::new()));
    let mut session = ReaderSession::from_config(
        &config,
        Box::new(ConsoleSpeech::new(queue.clone())),
        Box::new(ConsoleView),
        None,
    )
    .context("Failed to set up the reader")?;

    open_inputs(&mut session, &args.inputs)?;
    if session.engine().library().is_empty() {
        bail!("Nothing to read: every input failed to load");
    }

    if args.dry_run {
        print_library(&session, config.chunk_max_chars);
        return Ok(());
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("Failed to install the Ctrl-C handler")?;
    }

    let engine = session.engine_mut();
    engine.set_sequential_mode(true);
    if !engine.state().is_speaking() {
        engine.play();
    }
    drive(&mut session, &queue, &stop);

    session.shutdown();
    if stop.load(Ordering::SeqCst) {
        session.engine_mut().stop();
        info!("Interrupted; bookmark saved");
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
struct CliArgs {
    config_path: PathBuf,
    dry_run: bool,
    inputs: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs {
        config_path: PathBuf::from(DEFAULT_CONFIG),
        dry_run: false,
        inputs: Vec::new(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                parsed.config_path = PathBuf::from(path);
            }
            "--dry-run" => parsed.dry_run = true,
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("Unknown option {flag}\n{USAGE}"),
            _ => parsed.inputs.push(arg),
        }
    }
    if parsed.inputs.is_empty() {
        bail!(USAGE);
    }
    Ok(parsed)
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Files form one batch appended in order; pages and stdin go to the front.
fn open_inputs(session: &mut ReaderSession, inputs: &[String]) -> Result<()> {
    let mut files = Vec::new();
    for input in inputs.iter().filter(|input| !is_url(input) && *input != "-") {
        match SourceFile::read(Path::new(input)) {
            Ok(file) => files.push(file),
            Err(err) => {
                warn!(path = %input, "Skipping unreadable input: {err}");
                session.engine_mut().notify_error(&err.to_string());
            }
        }
    }
    if !files.is_empty() {
        session.open_files(files);
    }

    for input in inputs {
        if is_url(input) {
            // Failures are already reported through the view.
            let _ = session.open_url(input);
        } else if input == "-" {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            let _ = session.open_paste(&text);
        }
    }
    Ok(())
}

fn print_library(session: &ReaderSession, chunk_limit: usize) {
    for (index, doc) in session.engine().library().iter().enumerate() {
        println!(
            "{:>3}. {} ({} chars, {} chunks)",
            index + 1,
            doc.name(),
            doc.full_text().chars().count(),
            chunk(doc.full_text(), chunk_limit).len()
        );
    }
}

/// Feed queued synthesizer events back into the engine until playback ends
/// or Ctrl-C is pressed.
fn drive(session: &mut ReaderSession, queue: &EventQueue, stop: &AtomicBool) {
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let next = queue.borrow_mut().pop_front();
        let Some(scheduled) = next else {
            return;
        };
        if !wait(scheduled.delay, stop) {
            return;
        }
        session.engine_mut().handle_speech_event(scheduled.event);
    }
}

/// Sleep in short steps; false when interrupted.
fn wait(delay: Duration, stop: &AtomicBool) -> bool {
    let mut remaining = delay;
    while !remaining.is_zero() {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(POLL_INTERVAL);
        thread::sleep(step);
        remaining -= step;
    }
    !stop.load(Ordering::SeqCst)
}

struct Scheduled {
    event: SpeechEvent,
    delay: Duration,
}

type EventQueue = Rc<RefCell<VecDeque<Scheduled>>>;

/// Prints each utterance and schedules its end after an estimated duration.
struct ConsoleSpeech {
    queue: EventQueue,
    current: Option<UtteranceId>,
}

impl ConsoleSpeech {
    fn new(queue: EventQueue) -> Self {
        Self {
            queue,
            current: None,
        }
    }
}

impl SpeechSynthesizer for ConsoleSpeech {
    fn speak(&mut self, utterance: &Utterance) -> readaloud::Result<()> {
        println!("{}\n", utterance.text);
        let chars = utterance.text.chars().count() as f32;
        let seconds = chars / (CHARS_PER_SECOND * utterance.rate.max(0.1));
        let mut queue = self.queue.borrow_mut();
        queue.push_back(Scheduled {
            event: SpeechEvent::new(utterance.id, SpeechEventKind::Started),
            delay: Duration::ZERO,
        });
        queue.push_back(Scheduled {
            event: SpeechEvent::new(utterance.id, SpeechEventKind::Ended),
            delay: Duration::from_secs_f32(seconds),
        });
        self.current = Some(utterance.id);
        Ok(())
    }

    fn cancel(&mut self) {
        self.current = None;
        self.queue.borrow_mut().clear();
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn is_speaking(&self) -> bool {
        self.current.is_some()
    }
}

struct ConsoleView;

impl PresentationAdapter for ConsoleView {
    fn render_transcript_window(&mut self, window: TranscriptWindow<'_>) {
        if let Some(active) = window.active_index {
            info!(
                document = window.document_name,
                chunk = active + 1,
                of = window.chunk_count,
                "Reading"
            );
        }
    }

    fn render_playlist(&mut self, entries: &[PlaylistEntry]) {
        info!(documents = entries.len(), "Library updated");
    }

    fn notify_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn confirm_resume(&mut self, document_name: &str, chunk_index: usize) -> bool {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return false;
        }
        eprint!(
            "Resume \"{document_name}\" at chunk {}? [y/N] ",
            chunk_index + 1
        );
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if stdin.lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    if env::var_os("RUST_LOG").is_some() {
        info!("RUST_LOG is set; keeping it over the configured level");
        return;
    }
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<CliArgs> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_flags_and_inputs() {
        let parsed = args(&["--dry-run", "--config", "my.toml", "a.txt", "https://x.test"]).unwrap();
        assert!(parsed.dry_run);
        assert_eq!(parsed.config_path, PathBuf::from("my.toml"));
        assert_eq!(parsed.inputs, vec!["a.txt", "https://x.test"]);
    }

    #[test]
    fn rejects_missing_inputs_and_unknown_flags() {
        assert!(args(&[]).is_err());
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--loud", "a.txt"]).is_err());
        assert_eq!(args(&["-"]).unwrap().config_path, PathBuf::from(DEFAULT_CONFIG));
    }
}
