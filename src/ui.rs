//! Terminal side of the wizard: the console user and a work spinner.
//!
//! Uses `console` for colors and `indicatif` for the spinner shown while
//! the background work runs. Messages are printed with the spinner
//! suspended so they never tear through it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::state_machine::{MachineResult, SessionFinished, WizardUser};

/// Shared terminal state: one spinner, a few styles.
pub struct Terminal {
    pb: ProgressBar,
    cyan: Style,
    green: Style,
    red: Style,
    dim: Style,
    connections: AtomicU32,
}

impl Terminal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pb: ProgressBar::hidden(),
            cyan: Style::new().cyan(),
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
            connections: AtomicU32::new(0),
        })
    }

    /// Open a new user handle on this terminal.
    pub fn connect(self: &Arc<Self>) -> Arc<ConsoleUser> {
        let n = self.connections.fetch_add(1, Ordering::SeqCst) + 1;
        Arc::new(ConsoleUser {
            name: format!("console#{n}"),
            online: AtomicBool::new(true),
            terminal: Arc::clone(self),
        })
    }

    /// Start the spinner for the work phase.
    pub fn begin_work(&self) {
        self.pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        self.pb.set_message("Installing selected features...");
        self.pb.enable_steady_tick(Duration::from_millis(100));
    }

    /// Print a line without disturbing the spinner.
    pub fn println(&self, line: impl AsRef<str>) {
        self.pb.suspend(|| println!("{}", line.as_ref()));
    }

    pub fn note(&self, text: &str) {
        self.println(self.dim.apply_to(text).to_string());
    }

    /// Stop the spinner and print the outcome with its record.
    pub fn finish(&self, event: &SessionFinished) {
        self.pb.finish_and_clear();
        match event.outcome {
            MachineResult::Done => {
                println!("  {} Wizard completed", self.green.apply_to("✓"));
            }
            outcome => {
                println!("  {} Wizard ended: {outcome}", self.red.apply_to("✗"));
            }
        }
        println!(
            "{}",
            serde_json::to_string_pretty(event).unwrap_or_default()
        );
    }
}

/// A user sitting at this terminal.
pub struct ConsoleUser {
    name: String,
    online: AtomicBool,
    terminal: Arc<Terminal>,
}

impl ConsoleUser {
    pub fn disconnect(&self) {
        self.online.store(false, Ordering::SeqCst);
    }
}

impl WizardUser for ConsoleUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn send_message(&self, text: &str) {
        let terminal = &self.terminal;
        terminal.println(format!("{} {text}", terminal.cyan.apply_to("»")));
    }
}
