// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Side-channel command recognition and reply formatting.
//!
//! These commands short-circuit the conversation flow without mutating
//! it, so they are parsed before any state lookup happens.

use cadence_core::ProjectCacheRecord;

/// A recognized side-channel command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideCommand {
    Help,
    /// Delete the user's profile outright.
    Reset,
    /// List the cached projects owned by the sender.
    MyProjects,
    /// Look a project up by its business ID, e.g. "PMO-911".
    Lookup(String),
    /// Substring search across cached project names.
    Search(String),
}

/// Parses a free-text message into a side command, if it is one.
pub fn parse(text: &str) -> Option<SideCommand> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();

    match lower.as_str() {
        "help" | "?" => return Some(SideCommand::Help),
        "reset" => return Some(SideCommand::Reset),
        "my projects" | "projects" => return Some(SideCommand::MyProjects),
        _ => {}
    }

    if let Some(needle) = lower.strip_prefix("find ").or_else(|| lower.strip_prefix("search ")) {
        let needle = needle.trim();
        if !needle.is_empty() {
            return Some(SideCommand::Search(needle.to_string()));
        }
    }

    if looks_like_business_id(trimmed) {
        return Some(SideCommand::Lookup(trimmed.to_string()));
    }

    None
}

/// A single token of letters, a dash, and trailing digits ("PMO-911").
fn looks_like_business_id(text: &str) -> bool {
    let Some((prefix, digits)) = text.split_once('-') else {
        return false;
    };
    !prefix.is_empty()
        && prefix.chars().all(|c| c.is_ascii_alphabetic())
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// The help text sent for `help` and for unrecognized idle messages.
pub fn help_text() -> String {
    [
        "Here is what I can do:",
        "- `my projects` lists the projects you own",
        "- `PMO-123` shows one project by its business ID",
        "- `find <text>` searches project names",
        "- `later` snoozes reminders for a while",
        "- `reset` forgets your profile (update history is kept)",
    ]
    .join("\n")
}

/// One-line summary of a cached project for lookup/search replies.
pub fn project_line(record: &ProjectCacheRecord) -> String {
    let mut line = match &record.business_id {
        Some(id) => format!("*{}* ({id})", record.name),
        None => format!("*{}*", record.name),
    };
    if let Some(status) = &record.status_label {
        line.push_str(&format!(" — {status}"));
    }
    if let Some(due) = &record.due_date {
        line.push_str(&format!(", due {due}"));
    }
    if let (Some(pending), Some(total)) = (record.pending_tasks, record.total_tasks) {
        line.push_str(&format!(", {pending}/{total} tasks open"));
    }
    line
}
