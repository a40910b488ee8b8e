use crate::domain::{PhoneField, UserId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChangeDto {
    pub field: PhoneField,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Planned,
    Updated,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserOutcomeDto {
    pub user_id: UserId,
    pub user_name: String,
    pub status: OutcomeStatus,
    pub changes: Vec<FieldChangeDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReportDto {
    pub site_id: u64,
    pub dry_run: bool,
    pub started_at: i64,
    pub finished_at: i64,
    pub fetched: usize,
    pub unchanged: usize,
    pub planned: usize,
    pub updated: usize,
    pub failed: usize,
    pub outcomes: Vec<UserOutcomeDto>,
}

impl RunReportDto {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &UserOutcomeDto> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == OutcomeStatus::Failed)
    }
}
