//! Action plans: the only form an exploit routine takes.
//!
//! A plan is a JSON document holding named routines. The routine called `main`
//! is the entry point and must be declared asynchronous. Plans are plain data;
//! nothing in them is evaluated except by the interpreter's fixed set of ops.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::ReproError;

pub const ENTRY_ROUTINE: &str = "main";
pub const MAX_DEPTH: usize = 8;
pub const MAX_LOOP_VALUES: usize = 50;
pub const MAX_ACTIONS: usize = 200;
pub const MAX_WAIT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptDocument {
    pub routines: Vec<Routine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Routine {
    pub name: String,
    #[serde(rename = "async", default)]
    pub is_async: bool,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Result collections a plan may append to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    StepsToReproduce,
    Evidence,
    ConsoleLogs,
    Screenshots,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    /// `path` is resolved against the target; `url` must stay on the target's origin.
    Navigate {
        #[serde(default)]
        path: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
    Fill { selector: String, value: String },
    Click { selector: String },
    Press { key: String },
    Wait { ms: u64 },
    WaitForLoad,
    Screenshot {
        label: String,
        #[serde(default)]
        into: Option<Collection>,
    },
    Append { into: Collection, text: String },
    SetSuccess,
    Check {
        condition: Condition,
        #[serde(default)]
        then: Vec<Action>,
        #[serde(rename = "else", default)]
        otherwise: Vec<Action>,
    },
    ForEach {
        values: Vec<String>,
        #[serde(rename = "as")]
        var: String,
        #[serde(rename = "do")]
        body: Vec<Action>,
        #[serde(default)]
        stop_on_success: bool,
    },
    Call { routine: String },
    Return,
}

/// Observations a `check` can branch on. Header and status conditions look at
/// the most recent navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    UrlContains(String),
    ContentContains(String),
    ElementExists(String),
    /// Substring of any dialog message seen so far; empty matches any dialog.
    DialogSeen(String),
    ConsoleContains(String),
    HeaderMissing(String),
    StatusIs(u16),
}

impl ScriptDocument {
    /// Parse plan text, tolerating a surrounding markdown fence.
    pub fn parse(text: &str) -> Result<Self, ReproError> {
        let body = strip_code_fence(text);
        let doc: ScriptDocument = serde_json::from_str(body)
            .map_err(|e| ReproError::Parse(e.to_string()))?;
        doc.check_structure()?;
        Ok(doc)
    }

    pub fn routine(&self, name: &str) -> Option<&Routine> {
        self.routines.iter().find(|r| r.name == name)
    }

    /// The entry routine, which must exist and be asynchronous.
    pub fn entry(&self) -> Result<&Routine, ReproError> {
        let routine = self.routine(ENTRY_ROUTINE).ok_or(ReproError::MissingEntryRoutine)?;
        if !routine.is_async {
            return Err(ReproError::EntryNotAsync);
        }
        Ok(routine)
    }

    fn check_structure(&self) -> Result<(), ReproError> {
        let mut seen = HashSet::new();
        for routine in &self.routines {
            if !seen.insert(routine.name.as_str()) {
                return Err(ReproError::Parse(format!("duplicate routine '{}'", routine.name)));
            }
        }
        for routine in &self.routines {
            check_block(&routine.actions, &seen, 1)?;
        }
        Ok(())
    }
}

fn check_block(actions: &[Action], routines: &HashSet<&str>, depth: usize) -> Result<(), ReproError> {
    if depth > MAX_DEPTH {
        return Err(ReproError::Parse(format!("actions nested deeper than {}", MAX_DEPTH)));
    }
    for action in actions {
        match action {
            Action::Navigate { path, url } => {
                if path.is_none() && url.is_none() {
                    return Err(ReproError::Parse("navigate needs a path or url".into()));
                }
            }
            Action::Screenshot { into, .. } => {
                if into.is_some_and(|c| c != Collection::Screenshots) {
                    return Err(ReproError::Parse("screenshot paths go into \"screenshots\"".into()));
                }
            }
            Action::Append { into: Collection::Screenshots, .. } => {
                return Err(ReproError::Parse("only screenshot may add to \"screenshots\"".into()));
            }
            Action::Check { then, otherwise, .. } => {
                check_block(then, routines, depth + 1)?;
                check_block(otherwise, routines, depth + 1)?;
            }
            Action::ForEach { values, body, .. } => {
                if values.len() > MAX_LOOP_VALUES {
                    return Err(ReproError::Parse(format!(
                        "for_each over {} values (limit {})",
                        values.len(),
                        MAX_LOOP_VALUES
                    )));
                }
                check_block(body, routines, depth + 1)?;
            }
            Action::Call { routine } => {
                if !routines.contains(routine.as_str()) {
                    return Err(ReproError::Parse(format!("call to unknown routine '{}'", routine)));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Most actions `actions` can count against `MAX_ACTIONS` when run, taking the
/// longer branch of every check and every loop value. Calls count as one action.
pub fn worst_case_steps(actions: &[Action]) -> usize {
    actions
        .iter()
        .map(|action| {
            1 + match action {
                Action::Check { then, otherwise, .. } => worst_case_steps(then).max(worst_case_steps(otherwise)),
                Action::ForEach { values, body, .. } => values.len() * worst_case_steps(body),
                _ => 0,
            }
        })
        .sum()
}

/// Return the contents of the first fenced block, or the trimmed text if unfenced.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    // Skip the info string (e.g. "json")
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(after.len());
    let body = &after[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}
