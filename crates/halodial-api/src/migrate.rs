use crate::client::UserApi;
use crate::Result;
use chrono::Utc;
use halodial_core::{
    plan_update, FieldChangeDto, OutcomeStatus, RunReportDto, UpdatePayload, UserOutcomeDto,
    UserRecord,
};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationOptions {
    pub dry_run: bool,
}

/// Fetches the site's users, plans every `07...` -> `+44...` rewrite, then
/// applies the plan one user at a time.
///
/// A failed fetch aborts the run. A failed update is recorded against that
/// user and the remaining users are still processed.
pub fn run_migration(
    api: &dyn UserApi,
    site_id: u64,
    options: MigrationOptions,
) -> Result<RunReportDto> {
    let started_at = Utc::now().timestamp();

    info!(site_id, "fetching users");
    let users = api.fetch_users(site_id).map_err(|err| {
        error!(site_id, error = %err, "failed to fetch users");
        err
    })?;
    info!(site_id, count = users.len(), "received users");

    let plan: Vec<(&UserRecord, UpdatePayload)> = users
        .iter()
        .filter_map(|user| plan_update(user).map(|payload| (user, payload)))
        .collect();
    let unchanged = users.len() - plan.len();
    info!(
        site_id,
        planned = plan.len(),
        unchanged,
        dry_run = options.dry_run,
        "planned phone number updates"
    );

    let mut outcomes = Vec::with_capacity(plan.len());
    for (user, payload) in plan {
        let changes = field_changes(user, &payload);
        if options.dry_run {
            info!(
                user_id = %user.id,
                user_name = %user.name,
                fields = ?payload.field_names(),
                "would update phone numbers"
            );
            outcomes.push(outcome(user, OutcomeStatus::Planned, changes, None));
            continue;
        }

        info!(user_id = %user.id, user_name = %user.name, "updating phone numbers");
        match api.update_user(&payload) {
            Ok(()) => {
                info!(
                    user_id = %user.id,
                    user_name = %user.name,
                    fields = ?payload.field_names(),
                    "updated phone numbers"
                );
                outcomes.push(outcome(user, OutcomeStatus::Updated, changes, None));
            }
            Err(err) => {
                error!(
                    user_id = %user.id,
                    user_name = %user.name,
                    fields = ?payload.field_names(),
                    error = %err,
                    "failed to update phone numbers"
                );
                outcomes.push(outcome(
                    user,
                    OutcomeStatus::Failed,
                    changes,
                    Some(err.to_string()),
                ));
            }
        }
    }

    let count = |status: OutcomeStatus| outcomes.iter().filter(|o| o.status == status).count();
    let report = RunReportDto {
        site_id,
        dry_run: options.dry_run,
        started_at,
        finished_at: Utc::now().timestamp(),
        fetched: users.len(),
        unchanged,
        planned: count(OutcomeStatus::Planned),
        updated: count(OutcomeStatus::Updated),
        failed: count(OutcomeStatus::Failed),
        outcomes,
    };
    info!(
        site_id,
        updated = report.updated,
        failed = report.failed,
        "phone number migration finished"
    );
    Ok(report)
}

fn field_changes(user: &UserRecord, payload: &UpdatePayload) -> Vec<FieldChangeDto> {
    payload
        .updates
        .iter()
        .map(|(field, to)| FieldChangeDto {
            field: *field,
            from: user.phone(*field).unwrap_or_default().to_string(),
            to: to.clone(),
        })
        .collect()
}

fn outcome(
    user: &UserRecord,
    status: OutcomeStatus,
    changes: Vec<FieldChangeDto>,
    error: Option<String>,
) -> UserOutcomeDto {
    UserOutcomeDto {
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        status,
        changes,
        error,
    }
}
