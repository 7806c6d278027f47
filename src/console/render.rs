use std::collections::BTreeSet;

use anyhow::Error;
use colored::*;

use crate::dashboard::DashboardState;
use crate::gemini::GeminiError;
use crate::types::{ComplianceStatus, ComplianceVerdict, ImpactLevel, Regulator, RegulatoryUpdate};

const RULE_TOP: &str = "┌─────────────────────────────────────────────────────────────";
const RULE_BOTTOM: &str = "└─────────────────────────────────────────────────────────────\n";

pub fn display_welcome() {
    println!("{}", "🛡️  ReguWatch Canada".bright_blue().bold());
    println!(
        "{}",
        "Regulatory updates from Canadian financial regulators, and compliance checks for your templates."
            .blue()
    );
    println!(
        "{}",
        "Make sure to set GEMINI_API_KEY environment variable.".blue()
    );
    display_help();
}

pub fn display_help() {
    println!("{}", "Commands:".bright_white().bold());
    println!("  {}              fetch the latest updates for the selected regulators", "/fetch".cyan());
    println!("  {}    add or remove a regulator from the selection", "/toggle <CODE>".cyan());
    println!("  {}  switch between the feed and the template auditor", "/view feed|templates".cyan());
    println!("  {}    load template text from a file", "/template <file>".cyan());
    println!("  {}              audit the loaded template", "/audit".cyan());
    println!("  {}               show the current view", "/show".cyan());
    println!("  {}        list known regulators", "/regulators".cyan());
    println!("  {}               exit\n", "/quit".cyan());
}

pub fn display_loading(what: &str) {
    println!("{} {}", "🔄".blue(), what.blue().italic());
}

pub fn display_regulators(selected: &BTreeSet<Regulator>) {
    println!("\n{}", "🏛️  Regulators".bright_yellow().bold());
    println!("{}", RULE_TOP.yellow());
    for reg in Regulator::ALL {
        let mark = if selected.contains(&reg) { "[x]".bright_green() } else { "[ ]".white() };
        println!(
            "{} {} {:<8} {}",
            "│".yellow(),
            mark,
            reg.code().bright_white().bold(),
            reg.name().white()
        );
        println!("{}              {}", "│".yellow(), reg.url().dimmed());
    }
    println!("{}", RULE_BOTTOM.yellow());
}

fn impact_badge(level: Option<ImpactLevel>) -> ColoredString {
    let Some(level) = level else {
        return "unrated".dimmed();
    };
    let label = format!("{} impact", level);
    match level {
        ImpactLevel::High => label.bright_red().bold(),
        ImpactLevel::Medium => label.bright_yellow().bold(),
        ImpactLevel::Low => label.bright_green().bold(),
    }
}

pub fn display_updates(updates: &[RegulatoryUpdate]) {
    println!("\n{}", "📰 Regulatory Feed".bright_cyan().bold());
    println!("{}", RULE_TOP.cyan());
    if updates.is_empty() {
        println!("{} {}", "│".cyan(), "No updates to show.".white());
    }
    for (idx, update) in updates.iter().enumerate() {
        if idx > 0 {
            println!("{}", "│".cyan());
        }
        let regulator = if update.regulator.is_empty() { "Unknown regulator" } else { update.regulator.as_str() };
        let date = if update.date.is_empty() { "undated" } else { update.date.as_str() };
        println!(
            "{} {} · {} · {}",
            "│".cyan(),
            regulator.bright_white().bold(),
            date.white(),
            impact_badge(update.impact_level)
        );
        println!("{} {}", "│".cyan(), update.title.bright_white());
        println!("{}   {}", "│".cyan(), update.summary.white());
        if !update.url.is_empty() {
            println!("{}   {}", "│".cyan(), update.url.underline().blue());
        }
    }
    println!("{}", RULE_BOTTOM.cyan());
}

pub fn display_verdict(verdict: &ComplianceVerdict) {
    println!("\n{}", "⚖️  Compliance Verdict".bright_magenta().bold());
    println!("{}", RULE_TOP.magenta());
    let status = verdict.status.to_string().to_uppercase();
    let status = match verdict.status {
        ComplianceStatus::Compliant => status.bright_green().bold(),
        ComplianceStatus::AtRisk => status.bright_red().bold(),
        ComplianceStatus::NeedsReview => status.bright_yellow().bold(),
    };
    println!("{} {}", "│ Status:".magenta(), status);
    println!("{}", "│ Summary:".magenta());
    for line in verdict.summary.lines() {
        println!("│   {}", line.white());
    }
    if !verdict.suggested_changes.is_empty() {
        println!("{}", "│ Required Actions:".magenta());
        for (idx, change) in verdict.suggested_changes.iter().enumerate() {
            println!("│   {}. {}", idx + 1, change.white());
        }
    }
    println!("{}", RULE_BOTTOM.magenta());
}

pub fn display_no_verdict() {
    println!(
        "{}",
        "⚠️ No verdict available. The analysis could not be completed; see the log for details.\n"
            .bright_yellow()
    );
}

pub fn display_state(state: &DashboardState) {
    println!(
        "{} {}",
        "📍 View:".bright_white().bold(),
        state.view.to_string().white()
    );
    let selected = state.selected.iter().map(Regulator::code).collect::<Vec<_>>().join(", ");
    println!("{} {}", "🏛️  Selected:".bright_white().bold(), selected.white());
    match state.view {
        crate::dashboard::View::Feed => display_updates(&state.updates),
        crate::dashboard::View::Templates => {
            if state.template_text.is_empty() {
                println!("{}", "No template loaded. Use /template <file>.\n".white());
            } else {
                println!(
                    "{} {} chars loaded",
                    "📄 Template:".bright_white().bold(),
                    state.template_text.chars().count()
                );
            }
            if let Some(verdict) = &state.verdict {
                display_verdict(verdict);
            }
        }
    }
}

pub fn display_error(error: &Error) {
    if let Some(gemini_error) = error.downcast_ref::<GeminiError>() {
        display_gemini_error(gemini_error);
    } else {
        println!(
            "{} {}",
            "❌ Error:".bright_red().bold(),
            error.to_string().red()
        );
        println!(
            "{}",
            "Please check your configuration and try again.\n".red()
        );
    }
}

pub fn display_gemini_error(error: &GeminiError) {
    let user_message = error.user_message();
    if error.is_server_busy() {
        println!("{}", user_message.bright_yellow().bold());
        println!(
            "{}",
            "💡 Tip: Try again in a few minutes when server load is lower.".yellow()
        );
    } else if error.is_network_error() {
        println!("{}", user_message.bright_red().bold());
        println!(
            "{}",
            "💡 Tip: Check your internet connection and firewall settings.".red()
        );
    } else {
        println!("{}", user_message.bright_red().bold());
    }
    println!();
}

pub fn display_goodbye() {
    println!("{}", "👋 Goodbye!".bright_yellow().bold());
}
