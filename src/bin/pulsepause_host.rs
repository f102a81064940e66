//! Headless PulsePause host.
//!
//! Reads tray actions (`check-in`, `settings`, `exit`) as lines from stdin and
//! prints notices to stdout. A single reader owns stdin: while a consent
//! prompt or the settings editor is waiting, lines go to it; otherwise they
//! are tray actions.
//!
//! There is no camera backend in this binary. Set `PULSEPAUSE_SIMULATED_BPM`
//! to measure a synthetic heart rate; otherwise every check-in reports the
//! camera as unavailable.
//!
//! All tracing output goes to stderr.

use anyhow::Context;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use pulsepause::capture::synthetic::{ConstantEstimator, SyntheticCamera};
use pulsepause::capture::{Camera, HeartRateEstimator, Preview};
use pulsepause::presenter::{PreviewControl, Presenter};
use pulsepause::{Flow, PulsePause, Settings, SettingsStore, TrayAction};
use std::io::{BufRead, Write};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

const SIMULATED_BPM_ENV: &str = "PULSEPAUSE_SIMULATED_BPM";
const SIMULATED_FRAME_INTERVAL: Duration = Duration::from_millis(33);
const SIMULATED_WARMUP_FRAMES: usize = 30;
const ANSWER_TIMEOUT: Duration = Duration::from_secs(120);

/// Hands each stdin line to the open prompt, or to the command loop when no
/// prompt is waiting.
struct StdinRouter {
    prompts_open: AtomicUsize,
    /// One prompt at a time; a scheduled consent waits for the settings editor.
    turn: Mutex<()>,
    eof: AtomicBool,
    answers_tx: Sender<String>,
    answers_rx: Receiver<String>,
    commands_tx: Sender<Option<String>>,
    commands_rx: Receiver<Option<String>>,
}

impl StdinRouter {
    fn new() -> Self {
        let (answers_tx, answers_rx) = crossbeam_channel::unbounded();
        let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
        Self {
            prompts_open: AtomicUsize::new(0),
            turn: Mutex::new(()),
            eof: AtomicBool::new(false),
            answers_tx,
            answers_rx,
            commands_tx,
            commands_rx,
        }
    }

    fn route(&self, line: String) {
        if self.prompts_open.load(Ordering::SeqCst) > 0 {
            let _ = self.answers_tx.send(line);
        } else {
            let _ = self.commands_tx.send(Some(line));
        }
    }

    /// Stdin is closed: end the command loop and fail pending prompts.
    fn close(&self) {
        self.eof.store(true, Ordering::SeqCst);
        let _ = self.commands_tx.send(None);
    }

    /// Next tray action line, `None` at EOF.
    fn next_command(&self) -> Option<String> {
        self.commands_rx.recv().ok().flatten()
    }

    /// Take the prompt turn. Lines go to the returned handle until it drops.
    fn open_prompt(&self) -> PromptTurn<'_> {
        let lock = self.turn.lock().unwrap_or_else(|e| e.into_inner());
        // Answers left by an earlier prompt that timed out.
        while self.answers_rx.try_recv().is_ok() {}
        self.prompts_open.fetch_add(1, Ordering::SeqCst);
        PromptTurn {
            router: self,
            _lock: lock,
        }
    }
}

struct PromptTurn<'a> {
    router: &'a StdinRouter,
    _lock: MutexGuard<'a, ()>,
}

impl PromptTurn<'_> {
    fn answer(&self, timeout: Duration) -> Option<String> {
        if self.router.eof.load(Ordering::SeqCst) {
            return None;
        }
        match self.router.answers_rx.recv_timeout(timeout) {
            Ok(line) => Some(line.trim().to_owned()),
            Err(RecvTimeoutError::Timeout) => {
                println!();
                tracing::info!("no answer within {}s", timeout.as_secs());
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Drop for PromptTurn<'_> {
    fn drop(&mut self) {
        self.router.prompts_open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Presenter talking to the terminal.
struct ConsolePresenter {
    stdin: Arc<StdinRouter>,
}

fn ask(turn: &PromptTurn<'_>, prompt: &str) -> Option<String> {
    print!("{prompt} ");
    let _ = std::io::stdout().flush();
    turn.answer(ANSWER_TIMEOUT)
}

fn ask_bool(turn: &PromptTurn<'_>, prompt: &str, current: bool) -> Option<bool> {
    let hint = if current { "Y/n" } else { "y/N" };
    let answer = ask(turn, &format!("{prompt} [{hint}]"))?;
    Some(parse_yes_no(&answer).unwrap_or(current))
}

fn ask_positive(turn: &PromptTurn<'_>, prompt: &str, current: NonZeroU32) -> Option<NonZeroU32> {
    let answer = ask(turn, &format!("{prompt} [{current}]"))?;
    if answer.is_empty() {
        return Some(current);
    }
    match answer.parse::<NonZeroU32>() {
        Ok(value) => Some(value),
        Err(_) => {
            println!("Please enter a whole number greater than zero; keeping {current}.");
            Some(current)
        }
    }
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

impl Presenter for ConsolePresenter {
    fn confirm(&self, title: &str, message: &str) -> bool {
        let turn = self.stdin.open_prompt();
        ask(&turn, &format!("[{title}] {message} [y/N]"))
            .and_then(|answer| parse_yes_no(&answer))
            .unwrap_or(false)
    }

    fn inform(&self, title: &str, message: &str) {
        println!("[{title}] {message}");
    }

    fn warn(&self, title: &str, message: &str) {
        println!("[{title}] !!! {message}");
    }

    fn show_preview(&self, preview: &Preview) -> PreviewControl {
        tracing::trace!(label = %preview.label, "preview frame");
        PreviewControl::Continue
    }

    fn edit_settings(&self, current: &Settings) -> Option<Settings> {
        let turn = self.stdin.open_prompt();
        println!("Edit settings (empty answer keeps the current value)");
        let disable_app = ask_bool(&turn, "Disable PulsePause?", !current.enabled)?;
        let interval_minutes =
            ask_positive(&turn, "Check-in interval (minutes)", current.interval_minutes)?;
        let is_athlete = ask_bool(&turn, "Are you an athlete?", current.is_athlete)?;
        let prompt_on_scheduled_checkin = ask_bool(
            &turn,
            "Ask before scheduled check-ins?",
            current.prompt_on_scheduled_checkin,
        )?;
        Some(Settings {
            enabled: !disable_app,
            interval_minutes,
            is_athlete,
            prompt_on_scheduled_checkin,
            ..*current
        })
    }
}

/// Camera and estimator selected by the environment.
fn capture_devices() -> (Box<dyn Camera>, Box<dyn HeartRateEstimator>) {
    let simulated = std::env::var(SIMULATED_BPM_ENV)
        .ok()
        .and_then(|raw| match raw.trim().parse::<f64>() {
            Ok(bpm) if bpm.is_finite() && bpm > 0.0 => Some(bpm),
            _ => {
                tracing::warn!("ignoring invalid {SIMULATED_BPM_ENV}={raw}");
                None
            }
        });

    match simulated {
        Some(bpm) => {
            tracing::info!(bpm, "using simulated camera");
            (
                Box::new(SyntheticCamera::new().with_frame_interval(SIMULATED_FRAME_INTERVAL)),
                Box::new(ConstantEstimator::new(bpm).with_warmup(SIMULATED_WARMUP_FRAMES)),
            )
        }
        None => (
            Box::new(SyntheticCamera::unavailable(format!(
                "no camera backend; set {SIMULATED_BPM_ENV} to simulate one"
            ))),
            Box::new(ConstantEstimator::new(0.0)),
        ),
    }
}

/// Read stdin on its own thread and route every line through one router.
fn spawn_stdin_reader() -> Arc<StdinRouter> {
    let router = Arc::new(StdinRouter::new());
    {
        let router = Arc::clone(&router);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                router.route(line);
            }
            router.close();
        });
    }
    router
}

/// Dispatch tray actions from stdin until `exit` or EOF.
fn command_loop(app: &PulsePause, stdin: &StdinRouter) -> anyhow::Result<()> {
    println!("Commands: check-in, settings, exit");
    while let Some(line) = stdin.next_command() {
        if line.trim().is_empty() {
            continue;
        }
        let action = match line.parse::<TrayAction>() {
            Ok(action) => action,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if app.handle(action)? == Flow::Exit {
            return Ok(());
        }
    }
    tracing::info!("stdin closed");
    app.exit()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pulsepause=info")),
        )
        .init();

    tracing::info!("pulsepause-host starting");

    let stdin = spawn_stdin_reader();
    let presenter = Arc::new(ConsolePresenter {
        stdin: Arc::clone(&stdin),
    });
    let (camera, estimator) = capture_devices();
    let (result_tx, mut result_rx) = mpsc::unbounded_channel();

    let app = Arc::new(
        PulsePause::new(
            SettingsStore::at_default_path(),
            camera,
            estimator,
            presenter,
            result_tx,
        )
        .context("failed to build app")?,
    );
    app.start().context("failed to start")?;

    tokio::spawn(async move {
        while let Some(outcome) = result_rx.recv().await {
            tracing::debug!(outcome = %serde_json::to_string(&outcome).unwrap_or_default(), "scheduled outcome");
        }
    });

    // A plain thread, so a loop parked on stdin never delays process exit.
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    {
        let app = Arc::clone(&app);
        std::thread::spawn(move || {
            let _ = done_tx.send(command_loop(&app, &stdin));
        });
    }

    tokio::select! {
        finished = done_rx => {
            finished.context("command loop stopped unexpectedly")??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            app.exit().context("failed to save settings on exit")?;
        }
    }

    tracing::info!("pulsepause-host shut down cleanly");
    Ok(())
}
