use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The routine completed and demonstrated the vulnerability.
    Success,
    /// The routine completed without demonstrating the vulnerability.
    Failed,
    /// The routine could not be produced, parsed, or run to completion.
    Error,
    /// No automated path exists for this vulnerability.
    ManualTestingRequired,
}

/// The record an exploit routine returns, whether generated or hand-authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub success: bool,
    pub evidence: Vec<String>,
    pub screenshots: Vec<String>,
    pub steps_to_reproduce: Vec<String>,
    pub console_logs: Vec<String>,
    pub error: Option<String>,
    pub status: AttemptStatus,
}

impl ExecutionRecord {
    /// Empty record as seen by a routine before its first action.
    pub fn pending() -> Self {
        Self {
            success: false,
            evidence: Vec::new(),
            screenshots: Vec::new(),
            steps_to_reproduce: Vec::new(),
            console_logs: Vec::new(),
            error: None,
            status: AttemptStatus::Failed,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            status: AttemptStatus::Error,
            ..Self::pending()
        }
    }

    pub fn manual_testing_required() -> Self {
        Self {
            status: AttemptStatus::ManualTestingRequired,
            ..Self::pending()
        }
    }

    /// Derive the status from `success` once the routine has run to completion.
    pub fn completed(mut self) -> Self {
        self.status = if self.success { AttemptStatus::Success } else { AttemptStatus::Failed };
        self
    }

    /// Mark a partially filled record as failed with an error, keeping what was gathered.
    pub fn failed_with(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(message.into());
        self.status = AttemptStatus::Error;
        self
    }
}

/// One bounded try at proving a vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt_number: u32,
    #[serde(flatten)]
    pub record: ExecutionRecord,
}

impl AttemptResult {
    pub fn new(attempt_number: u32, record: ExecutionRecord) -> Self {
        Self { attempt_number, record }
    }

    pub fn success(&self) -> bool {
        self.record.success
    }

    pub fn status(&self) -> AttemptStatus {
        self.record.status
    }
}
