// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan file parsing.
//!
//! A plan file is a markdown document with a leading `# <Title>` heading, a
//! `**Goal:** ...` line, and — for implementable plans — one or more
//! `## Wave <n>` sections, each containing one or more
//! `### Task <n>: <title>` subsections whose body is the task's
//! instructions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One task within a wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub number: u32,
    pub title: String,
    pub body: String,
}

/// One `## Wave <n>` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    pub number: u32,
    pub tasks: Vec<Task>,
}

/// A parsed plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFile {
    pub title: String,
    pub goal: String,
    pub waves: Vec<Wave>,
}

impl PlanFile {
    /// Plans without `## Wave` headers cannot be implemented; the caller is
    /// expected to re-spawn a planner with an annotate-waves prompt per §7.
    pub fn has_waves(&self) -> bool {
        !self.waves.is_empty()
    }

    pub fn total_tasks(&self) -> usize {
        self.waves.iter().map(|w| w.tasks.len()).sum()
    }

    pub fn wave(&self, number: u32) -> Option<&Wave> {
        self.waves.iter().find(|w| w.number == number)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("plan file is missing a leading '# <Title>' heading")]
    MissingTitle,
    #[error("wave header has no parseable number: {0:?}")]
    InvalidWaveNumber(String),
    #[error("task header has no parseable number: {0:?}")]
    InvalidTaskNumber(String),
    #[error("task header is missing a ': <title>' suffix: {0:?}")]
    MissingTaskTitle(String),
}

/// Parse a plan file's markdown body.
pub fn parse(markdown: &str) -> Result<PlanFile, ParseError> {
    let mut lines = markdown.lines().peekable();

    let title = loop {
        match lines.next() {
            Some(line) if line.starts_with("# ") => break line[2..].trim().to_string(),
            Some(_) => continue,
            None => return Err(ParseError::MissingTitle),
        }
    };

    let mut goal = String::new();
    let mut waves = Vec::new();
    let mut current_wave: Option<Wave> = None;
    let mut current_task: Option<Task> = None;

    macro_rules! flush_task {
        () => {
            if let Some(task) = current_task.take() {
                let task = Task {
                    body: task.body.trim().to_string(),
                    ..task
                };
                current_wave
                    .as_mut()
                    .expect("task parsed without an open wave")
                    .tasks
                    .push(task);
            }
        };
    }
    macro_rules! flush_wave {
        () => {
            flush_task!();
            if let Some(wave) = current_wave.take() {
                waves.push(wave);
            }
        };
    }

    for line in lines {
        if let Some(rest) = line.strip_prefix("## Wave ") {
            flush_wave!();
            let number = parse_leading_number(rest)
                .ok_or_else(|| ParseError::InvalidWaveNumber(rest.to_string()))?;
            current_wave = Some(Wave {
                number,
                tasks: Vec::new(),
            });
        } else if let Some(rest) = line.strip_prefix("### Task ") {
            if current_wave.is_none() {
                // A task header outside any wave section; ignore rather than
                // error, since some plans include example task blocks in
                // prose before the first real wave.
                continue;
            }
            flush_task!();
            let (number_str, title_str) = rest
                .split_once(':')
                .ok_or_else(|| ParseError::MissingTaskTitle(rest.to_string()))?;
            let number = parse_leading_number(number_str)
                .ok_or_else(|| ParseError::InvalidTaskNumber(number_str.to_string()))?;
            current_task = Some(Task {
                number,
                title: title_str.trim().to_string(),
                body: String::new(),
            });
        } else if current_task.is_some() {
            let task = current_task.as_mut().expect("checked above");
            task.body.push_str(line);
            task.body.push('\n');
        } else if current_wave.is_none() {
            if let Some(rest) = line.strip_prefix("**Goal:**") {
                goal = rest.trim().to_string();
            }
        }
    }
    flush_wave!();

    Ok(PlanFile {
        title,
        goal,
        waves,
    })
}

fn parse_leading_number(s: &str) -> Option<u32> {
    let digits: String = s.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
#[path = "planfile_tests.rs"]
mod tests;
