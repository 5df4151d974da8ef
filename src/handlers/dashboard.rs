use std::collections::BTreeMap;

use axum::{Json, extract::State};
use chrono::{NaiveDate, Utc};

use crate::{
    auth::AuthUser,
    error::{ApiError, ErrorBody},
    models::{
        AdminStats, CitizenStats, GrievanceStatus, GrievanceSummary, ProviderStats,
        ServiceCount, StatusCount,
    },
    repository::{GrievanceScope, RepositoryState},
};

const RECENT_LIMIT: usize = 5;

fn count_status(grievances: &[GrievanceSummary], status: GrievanceStatus) -> usize {
    grievances.iter().filter(|g| g.status == status).count()
}

fn resolved_on(grievances: &[GrievanceSummary], day: NaiveDate) -> usize {
    grievances
        .iter()
        .filter(|g| g.status == GrievanceStatus::Resolved && g.updated_at.date_naive() == day)
        .count()
}

/// Aggregates a citizen's own grievances. Expects them newest first.
pub fn citizen_stats(grievances: &[GrievanceSummary]) -> CitizenStats {
    CitizenStats {
        total_submitted: grievances.len(),
        pending: count_status(grievances, GrievanceStatus::Submitted),
        in_progress: count_status(grievances, GrievanceStatus::InProgress),
        resolved: count_status(grievances, GrievanceStatus::Resolved),
        closed: count_status(grievances, GrievanceStatus::Closed),
        recent_grievances: grievances.iter().take(RECENT_LIMIT).cloned().collect(),
    }
}

/// Aggregates the grievances assigned to a provider. "New" means still `Submitted`.
pub fn provider_stats(grievances: Vec<GrievanceSummary>, today: NaiveDate) -> ProviderStats {
    ProviderStats {
        total_assigned: grievances.len(),
        new_assigned: count_status(&grievances, GrievanceStatus::Submitted),
        in_progress: count_status(&grievances, GrievanceStatus::InProgress),
        resolved: count_status(&grievances, GrievanceStatus::Resolved),
        resolved_today: resolved_on(&grievances, today),
        assigned_grievances: grievances,
    }
}

/// admin_stats
///
/// System-wide totals. Every status appears in `grievances_by_status`, zero or not.
/// `grievances_by_service` lists only services with at least one grievance, busiest first;
/// grievances filed without a service are grouped under "Unspecified".
pub fn admin_stats(
    grievances: &[GrievanceSummary],
    service_names: &BTreeMap<i32, String>,
    total_citizens: i64,
    today: NaiveDate,
) -> AdminStats {
    let grievances_by_status = GrievanceStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: count_status(grievances, status),
        })
        .collect();

    let mut per_service: BTreeMap<Option<i32>, usize> = BTreeMap::new();
    for g in grievances {
        *per_service.entry(g.service_id).or_default() += 1;
    }
    let mut grievances_by_service: Vec<ServiceCount> = per_service
        .into_iter()
        .map(|(service_id, count)| ServiceCount {
            service_id,
            service_name: service_id
                .and_then(|id| service_names.get(&id).cloned())
                .unwrap_or_else(|| "Unspecified".to_string()),
            count,
        })
        .collect();
    grievances_by_service.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.service_name.cmp(&b.service_name))
    });

    AdminStats {
        total_grievances: grievances.len(),
        pending_grievances: count_status(grievances, GrievanceStatus::Submitted),
        resolved_today: resolved_on(grievances, today),
        total_citizens,
        grievances_by_status,
        grievances_by_service,
        recent_grievances: grievances.iter().take(RECENT_LIMIT).cloned().collect(),
    }
}

/// get_citizen_stats
///
/// [Authenticated Route] Counts of the caller's grievances by status plus the five most
/// recent. Open to every role; staff simply have no grievances of their own.
#[utoipa::path(
    get,
    path = "/api/dashboard/citizen-stats",
    responses((status = 200, description = "Citizen dashboard", body = CitizenStats)),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn get_citizen_stats(
    user: AuthUser,
    State(repo): State<RepositoryState>,
) -> Result<Json<CitizenStats>, ApiError> {
    let grievances = repo
        .grievance_summaries(GrievanceScope::OwnedBy(user.id))
        .await?;
    Ok(Json(citizen_stats(&grievances)))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/provider-stats",
    responses(
        (status = 200, description = "Provider dashboard", body = ProviderStats),
        (status = 403, description = "Not a provider", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn get_provider_stats(
    user: AuthUser,
    State(repo): State<RepositoryState>,
) -> Result<Json<ProviderStats>, ApiError> {
    let grievances = repo
        .grievance_summaries(GrievanceScope::AssignedTo(user.id))
        .await?;
    Ok(Json(provider_stats(grievances, Utc::now().date_naive())))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    responses(
        (status = 200, description = "Administrative dashboard", body = AdminStats),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn get_admin_stats(
    State(repo): State<RepositoryState>,
) -> Result<Json<AdminStats>, ApiError> {
    let grievances = repo.grievance_summaries(GrievanceScope::All).await?;
    let service_names: BTreeMap<i32, String> = repo
        .list_services()
        .await?
        .into_iter()
        .map(|s| (s.service_id, s.service_name))
        .collect();
    let total_citizens = repo.count_citizens().await?;

    Ok(Json(admin_stats(
        &grievances,
        &service_names,
        total_citizens,
        Utc::now().date_naive(),
    )))
}
