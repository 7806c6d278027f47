use std::io::Write;
use std::path::PathBuf;

use crate::dashboard::View;
use crate::types::Regulator;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fetch,
    Toggle(Regulator),
    View(View),
    Template(PathBuf),
    Audit,
    Show,
    Regulators,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

pub fn is_quit_command(input_text: &str) -> bool {
    matches!(input_text.trim(), "/quit" | "/exit" | "quit" | "exit")
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if is_quit_command(line) {
        return Command::Quit;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "/fetch" | "/refresh" => Command::Fetch,
        "/audit" | "/analyze" => Command::Audit,
        "/show" => Command::Show,
        "/regulators" => Command::Regulators,
        "/help" | "/?" => Command::Help,
        "/toggle" if rest.is_empty() => Command::Invalid("usage: /toggle <CODE>".into()),
        "/toggle" => match rest.parse() {
            Ok(reg) => Command::Toggle(reg),
            Err(e) => Command::Invalid(e),
        },
        "/view" => match rest.parse() {
            Ok(view) => Command::View(view),
            Err(e) => Command::Invalid(e),
        },
        "/template" if rest.is_empty() => Command::Invalid("usage: /template <file>".into()),
        "/template" => Command::Template(PathBuf::from(rest)),
        other => Command::Invalid(format!("unknown command '{}', try /help", other)),
    }
}

pub fn print_prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
