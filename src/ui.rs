use std::io::{self, BufRead, IsTerminal, Write};

pub(crate) fn progress(message: &str) {
    eprintln!("==> {message}");
}

/// Prints `prompt` and reads a yes/no answer from stdin. Anything other than
/// `y`/`yes` is a no, and so is a non-interactive stdin.
pub(crate) fn confirm(prompt: &str) -> bool {
    if !io::stdin().is_terminal() {
        tracing::debug!(prompt, "stdin is not a terminal, declining");
        return false;
    }
    print!("{prompt}");
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

pub(crate) fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
