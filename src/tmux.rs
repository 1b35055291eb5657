use crate::config::Window;
use crate::git::GitWorktreeEntry;
use crate::process::{path_to_str, run_capture, run_checked};
use anyhow::Result;
use std::env;
use std::path::Path;

const TMUX_BIN: &str = "tmux";

pub(crate) fn is_running() -> bool {
    env::var_os("TMUX").is_some_and(|value| !value.is_empty())
}

/// Session name for a project worktree. tmux rejects `.` and `:` in target
/// names, and `/` would read as a path.
pub(crate) fn session_name(project: &str, branch: &str) -> String {
    format!("{project}-{branch}")
        .chars()
        .map(|ch| match ch {
            '/' | ':' => '-',
            '.' => '_',
            other => other,
        })
        .collect()
}

/// `(session, branch)` pairs for the attached, non-bare worktrees of a
/// project, whether or not the sessions are running.
pub(crate) fn worktree_sessions(
    project: &str,
    trees: &[GitWorktreeEntry],
) -> Vec<(String, String)> {
    trees
        .iter()
        .filter(|tree| !tree.bare)
        .filter_map(|tree| tree.branch.as_deref())
        .map(|branch| (session_name(project, branch), branch.to_string()))
        .collect()
}

pub(crate) fn session_exists(name: &str) -> bool {
    run_capture(TMUX_BIN, &["has-session", "-t", name], None)
        .map(|output| output.success())
        .unwrap_or(false)
}

pub(crate) fn new_session(name: &str, workdir: &Path) -> Result<()> {
    let workdir = path_to_str(workdir)?;
    run_checked(
        TMUX_BIN,
        &["new-session", "-d", "-s", name, "-c", workdir],
        None,
        "tmux new-session",
    )?;
    Ok(())
}

pub(crate) fn switch_to(name: &str) -> Result<()> {
    run_checked(
        TMUX_BIN,
        &["switch-client", "-t", name],
        None,
        "tmux switch-client",
    )?;
    Ok(())
}

fn current_session() -> Option<String> {
    let output = run_capture(TMUX_BIN, &["display-message", "-p", "#S"], None).ok()?;
    output
        .success()
        .then(|| output.stdout.trim().to_string())
}

/// Kills `name`, first moving the client away if it is attached to it. A
/// missing session is not an error.
pub(crate) fn kill_session(name: &str) -> Result<()> {
    if !session_exists(name) {
        return Ok(());
    }
    if current_session().as_deref() == Some(name) {
        let _ = run_capture(TMUX_BIN, &["switch-client", "-l"], None);
    }
    run_checked(
        TMUX_BIN,
        &["kill-session", "-t", name],
        None,
        "tmux kill-session",
    )?;
    Ok(())
}

fn send_keys(session: &str, command: &str) -> Result<()> {
    run_checked(
        TMUX_BIN,
        &["send-keys", "-t", session, command, "Enter"],
        None,
        "tmux send-keys",
    )?;
    Ok(())
}

/// Sends the first window's command to the session's initial window and opens
/// one new window per remaining entry. An empty command leaves a plain shell.
pub(crate) fn apply_layout(session: &str, workdir: &Path, windows: &[Window]) -> Result<()> {
    let workdir = path_to_str(workdir)?;
    for (index, window) in windows.iter().enumerate() {
        if index > 0 {
            let mut args = vec!["new-window", "-t", session, "-c", workdir];
            if let Some(name) = window.name.as_deref() {
                args.extend(["-n", name]);
            }
            run_checked(TMUX_BIN, &args, None, "tmux new-window")?;
        } else if let Some(name) = window.name.as_deref() {
            run_checked(
                TMUX_BIN,
                &["rename-window", "-t", session, name],
                None,
                "tmux rename-window",
            )?;
        }
        if !window.command.is_empty() {
            send_keys(session, &window.command)?;
        }
    }

    if windows.len() > 1 {
        let first = format!("{session}:^");
        let _ = run_capture(TMUX_BIN, &["select-window", "-t", &first], None);
    }
    Ok(())
}

/// Creates the session for a worktree, with its layout, unless it already
/// exists. Does not switch to it.
pub(crate) fn open_session(name: &str, workdir: &Path, layout: &[Window]) -> Result<()> {
    if session_exists(name) {
        return Ok(());
    }
    new_session(name, workdir)?;
    apply_layout(name, workdir, layout)
}
