//! Terminal explain-and-request prompt.

use std::io::{self, BufRead, Write};

use monitor::{PermissionPrompt, Presenter};

/// Asks on stdout and reads a yes/no answer from stdin.
pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn confirm(&self, prompt: &PermissionPrompt) -> bool {
        println!("{}\n", prompt.title);
        println!("{}\n", prompt.body);
        print!("{}", question(prompt));
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => is_yes(&line),
            Err(_) => false,
        }
    }
}

/// The yes/no line, naming what each answer does.
fn question(prompt: &PermissionPrompt) -> String {
    format!("[y] {}  [N] {}: ", prompt.confirm_label, prompt.cancel_label)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
