use std::collections::BTreeSet;

use anyhow::{Error, Result};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;

use crate::dashboard::{AuditOutcome, Dashboard, RefreshOutcome, View};
use crate::gemini::{SearchGrounded, StructuredOutput};
use crate::types::{ComplianceVerdict, Regulator, RegulatoryUpdate};

mod input;
mod render;

pub use input::{parse_command, Command};

pub fn display_updates(updates: &[RegulatoryUpdate]) {
    render::display_updates(updates);
}

pub fn display_verdict(verdict: Option<&ComplianceVerdict>) {
    match verdict {
        Some(v) => render::display_verdict(v),
        None => render::display_no_verdict(),
    }
}

pub fn display_regulators(selected: &BTreeSet<Regulator>) {
    render::display_regulators(selected);
}

pub fn display_error(error: &Error) {
    render::display_error(error);
}

/// Interactive terminal front end over a [`Dashboard`].
pub struct Console<S, A> {
    dashboard: Dashboard<S, A>,
}

impl<S: SearchGrounded, A: StructuredOutput> Console<S, A> {
    pub fn new(dashboard: Dashboard<S, A>) -> Self {
        Self { dashboard }
    }

    /// Run the main console loop (interactive mode)
    pub async fn run(&self) -> Result<()> {
        render::display_welcome();
        render::display_state(&self.dashboard.snapshot().await);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            input::print_prompt();
            select! {
                // Handle Ctrl+C gracefully
                _ = tokio::signal::ctrl_c() => {
                    render::display_goodbye();
                    break;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        render::display_goodbye();
                        break;
                    };
                    if !self.handle(input::parse_command(&line)).await {
                        render::display_goodbye();
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Apply one command; returns false when the loop should stop.
    async fn handle(&self, command: Command) -> bool {
        match command {
            Command::Quit => return false,
            Command::Empty => {}
            Command::Help => render::display_help(),
            Command::Invalid(msg) => println!("{} {}", "⚠️".bright_yellow(), msg.yellow()),
            Command::Show => render::display_state(&self.dashboard.snapshot().await),
            Command::Regulators => {
                render::display_regulators(&self.dashboard.snapshot().await.selected)
            }
            Command::View(view) => {
                self.dashboard.set_view(view).await;
                render::display_state(&self.dashboard.snapshot().await);
            }
            Command::Toggle(reg) => {
                let on = self.dashboard.toggle_regulator(reg).await;
                let verb = if on { "selected" } else { "deselected" };
                println!("{} {} {}", "🏛️".bright_white(), reg.code().bright_white().bold(), verb);
            }
            Command::Template(path) => match tokio::fs::read_to_string(&path).await {
                Ok(text) => {
                    let chars = text.chars().count();
                    self.dashboard.set_template_text(text).await;
                    self.dashboard.set_view(View::Templates).await;
                    println!(
                        "{} loaded {} chars from {}",
                        "📄".bright_white(),
                        chars,
                        path.display()
                    );
                }
                Err(e) => {
                    let err = Error::new(e).context(format!("reading {}", path.display()));
                    render::display_error(&err);
                }
            },
            Command::Fetch => {
                render::display_loading("Searching regulator websites...");
                match self.dashboard.refresh().await {
                    RefreshOutcome::Replaced(n) => {
                        println!("{} {} fresh update(s)", "✅".bright_green(), n);
                    }
                    RefreshOutcome::Unchanged(cause) => {
                        if let Some(e) = cause {
                            render::display_gemini_error(&e);
                        }
                        println!(
                            "{}",
                            "⚠️ No updates found in search response; keeping the current feed."
                                .bright_yellow()
                        )
                    }
                    RefreshOutcome::Suppressed => {
                        println!("{}", "⏳ A fetch is already running.".yellow())
                    }
                }
                render::display_updates(&self.dashboard.snapshot().await.updates);
            }
            Command::Audit => {
                render::display_loading("Running compliance audit...");
                match self.dashboard.analyze().await {
                    AuditOutcome::Verdict(v) => render::display_verdict(&v),
                    AuditOutcome::NoVerdict(cause) => {
                        if let Some(e) = cause {
                            render::display_gemini_error(&e);
                        }
                        render::display_no_verdict()
                    }
                    AuditOutcome::Skipped => println!(
                        "{}",
                        "⚠️ No template text loaded. Use /template <file> first.".bright_yellow()
                    ),
                    AuditOutcome::Suppressed => {
                        println!("{}", "⏳ An audit is already running.".yellow())
                    }
                }
            }
        }
        true
    }
}
