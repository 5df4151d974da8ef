use crate::models::{
    Announcement, Audience, Citizen, CitizenCredentials, CreateAnnouncementRequest,
    CreateGrievanceRequest, Grievance, GrievanceListQuery, GrievanceStatus, GrievanceSummary,
    House, NewCitizen, Priority, Residence, Service, SortField, SortOrder,
    UpdateAnnouncementRequest, UpdateGrievanceRequest, Vehicle, Zone,
};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use thiserror::Error;

const CITIZEN_COLUMNS: &str =
    "citizen_id, first_name, last_name, email, role, phone, address_city, created_at";

const GRIEVANCE_COLUMNS: &str = "grievance_id, citizen_id, service_id, assigned_provider_id, \
     title, description, location_text, status, priority, created_at, updated_at";

const SUMMARY_COLUMNS: &str = "grievance_id, title, status, priority, service_id, \
     assigned_provider_id, created_at, updated_at";

const ANNOUNCEMENT_COLUMNS: &str = "announcement_id, title, content, target_audience, \
     is_active, expires_at, created_by, created_at, updated_at";

/// RepositoryError
///
/// Failures surfaced by the persistence layer. Nothing here is retried; handlers turn a
/// `UniqueViolation` into 409 and everything else into 500.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("a record with this {0} already exists")]
    UniqueViolation(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// GrievanceFilter
///
/// Fully resolved grievance index query: the client's filters plus the owner restriction
/// the handler derives from the caller's role, and the page turned into LIMIT/OFFSET.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrievanceFilter {
    pub owner: Option<i32>,
    pub status: Option<GrievanceStatus>,
    pub priority: Option<Priority>,
    pub service_id: Option<i32>,
    pub assigned_to: Option<i32>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl GrievanceFilter {
    pub fn new(query: &GrievanceListQuery, owner: Option<i32>) -> Self {
        Self {
            owner,
            status: query.status,
            priority: query.priority,
            service_id: query.service_id,
            assigned_to: query.assigned_to,
            sort_by: query.sort_by,
            sort_order: query.sort_order,
            limit: query.limit,
            offset: (query.page - 1).max(0).saturating_mul(query.limit.max(0)),
        }
    }

    /// Whether `g` passes every filter (paging aside).
    pub fn matches(&self, g: &Grievance) -> bool {
        self.owner.is_none_or(|id| g.citizen_id == id)
            && self.status.is_none_or(|s| g.status == s)
            && self.priority.is_none_or(|p| g.priority == p)
            && self.service_id.is_none_or(|id| g.service_id == Some(id))
            && self
                .assigned_to
                .is_none_or(|id| g.assigned_provider_id == Some(id))
    }
}

/// GrievanceScope
///
/// Which grievances a dashboard aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrievanceScope {
    All,
    OwnedBy(i32),
    AssignedTo(i32),
}

impl GrievanceScope {
    pub fn contains(&self, g: &Grievance) -> bool {
        match *self {
            GrievanceScope::All => true,
            GrievanceScope::OwnedBy(id) => g.citizen_id == id,
            GrievanceScope::AssignedTo(id) => g.assigned_provider_id == Some(id),
        }
    }
}

/// Repository Trait
///
/// The contract for every persistence operation the handlers need. Handlers only ever see
/// `Arc<dyn Repository>`, so the tests swap in an in-memory implementation.
///
/// **Send + Sync + async_trait** make the trait object shareable across Axum's tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Citizens / Auth ---
    // Login lookup. The only query that ever reads the password digest.
    async fn find_citizen_by_email(&self, email: &str) -> RepoResult<Option<CitizenCredentials>>;
    async fn get_citizen(&self, id: i32) -> RepoResult<Option<Citizen>>;
    // Fails with `UniqueViolation("email")` on a duplicate address.
    async fn create_citizen(&self, citizen: NewCitizen) -> RepoResult<Citizen>;
    async fn count_citizens(&self) -> RepoResult<i64>;
    async fn get_vehicles(&self, owner_id: i32) -> RepoResult<Vec<Vehicle>>;
    async fn get_residences(&self, citizen_id: i32) -> RepoResult<Vec<Residence>>;

    // --- Grievances ---
    // One page of summaries plus the total number of matching rows.
    async fn list_grievances(
        &self,
        filter: &GrievanceFilter,
    ) -> RepoResult<(Vec<GrievanceSummary>, i64)>;
    // Every summary in scope, newest first. Feeds the dashboards.
    async fn grievance_summaries(&self, scope: GrievanceScope) -> RepoResult<Vec<GrievanceSummary>>;
    async fn get_grievance(&self, id: i32) -> RepoResult<Option<Grievance>>;
    async fn create_grievance(
        &self,
        citizen_id: i32,
        req: CreateGrievanceRequest,
    ) -> RepoResult<Grievance>;
    // Partial update; `None` when the grievance does not exist.
    async fn update_grievance(
        &self,
        id: i32,
        req: UpdateGrievanceRequest,
    ) -> RepoResult<Option<Grievance>>;

    // --- Announcements ---
    // Active, unexpired announcements for the given audiences, newest first.
    async fn list_announcements(&self, audiences: &[Audience]) -> RepoResult<Vec<Announcement>>;
    async fn get_announcement(&self, id: i32) -> RepoResult<Option<Announcement>>;
    async fn create_announcement(
        &self,
        created_by: i32,
        req: CreateAnnouncementRequest,
    ) -> RepoResult<Announcement>;
    async fn update_announcement(
        &self,
        id: i32,
        req: UpdateAnnouncementRequest,
    ) -> RepoResult<Option<Announcement>>;
    // True when a row was removed.
    async fn delete_announcement(&self, id: i32) -> RepoResult<bool>;

    // --- Catalog ---
    async fn list_services(&self) -> RepoResult<Vec<Service>>;
    async fn get_service(&self, id: i32) -> RepoResult<Option<Service>>;
    async fn list_zones(&self) -> RepoResult<Vec<Zone>>;
    async fn get_zone(&self, id: i32) -> RepoResult<Option<Zone>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. Every statement is a runtime-checked query with
/// bound parameters; only whitelisted column names are ever pushed into SQL text.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Turns a unique-constraint failure into `UniqueViolation(field)`.
fn map_unique(err: sqlx::Error, field: &'static str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::UniqueViolation(field)
        }
        _ => RepositoryError::Database(err),
    }
}

/// Appends the `AND ...` clauses for every filter that is set.
fn push_grievance_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &GrievanceFilter) {
    if let Some(owner) = filter.owner {
        builder.push(" AND citizen_id = ").push_bind(owner);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority.as_str());
    }
    if let Some(service_id) = filter.service_id {
        builder.push(" AND service_id = ").push_bind(service_id);
    }
    if let Some(provider) = filter.assigned_to {
        builder.push(" AND assigned_provider_id = ").push_bind(provider);
    }
}

/// Priority is ordered by urgency, not alphabetically.
fn order_expression(field: SortField) -> &'static str {
    match field {
        SortField::Priority => {
            "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 ELSE 3 END"
        }
        other => other.as_str(),
    }
}

#[derive(FromRow)]
struct ResidenceRow {
    house_id: i32,
    address: Option<String>,
    zone_id: Option<i32>,
    zone_name: Option<String>,
    zone_type: Option<String>,
}

impl From<ResidenceRow> for Residence {
    fn from(row: ResidenceRow) -> Self {
        let zone = match (row.zone_id, row.zone_name) {
            (Some(zone_id), Some(zone_name)) => Some(Zone {
                zone_id,
                zone_name,
                zone_type: row.zone_type,
            }),
            _ => None,
        };
        Residence {
            house: House {
                house_id: row.house_id,
                address: row.address,
                zone_id: row.zone_id,
                zone,
            },
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_citizen_by_email(&self, email: &str) -> RepoResult<Option<CitizenCredentials>> {
        let sql = format!("SELECT {CITIZEN_COLUMNS}, password_hash FROM citizen WHERE email = $1");
        let row = sqlx::query_as::<_, CitizenCredentials>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_citizen(&self, id: i32) -> RepoResult<Option<Citizen>> {
        let sql = format!("SELECT {CITIZEN_COLUMNS} FROM citizen WHERE citizen_id = $1");
        let row = sqlx::query_as::<_, Citizen>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// create_citizen
    ///
    /// Inserts the principal and returns the public record. The unique index on `email`
    /// is the authority on duplicates, so concurrent registrations cannot both succeed.
    async fn create_citizen(&self, citizen: NewCitizen) -> RepoResult<Citizen> {
        let sql = format!(
            "INSERT INTO citizen (email, password_hash, first_name, last_name, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {CITIZEN_COLUMNS}"
        );
        sqlx::query_as::<_, Citizen>(&sql)
            .bind(&citizen.email)
            .bind(&citizen.password_hash)
            .bind(&citizen.first_name)
            .bind(&citizen.last_name)
            .bind(citizen.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, "email"))
    }

    async fn count_citizens(&self) -> RepoResult<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM citizen")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn get_vehicles(&self, owner_id: i32) -> RepoResult<Vec<Vehicle>> {
        let rows = sqlx::query_as::<_, Vehicle>(
            "SELECT vehicle_id, owner_id, registration_number, vehicle_type \
             FROM vehicle WHERE owner_id = $1 ORDER BY vehicle_id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// get_residences
    ///
    /// Resolves `citizen_residency -> house -> zone` in one query and reshapes each row
    /// into the nested `{ house: { ..., zone } }` form.
    async fn get_residences(&self, citizen_id: i32) -> RepoResult<Vec<Residence>> {
        let rows = sqlx::query_as::<_, ResidenceRow>(
            r#"
            SELECT h.house_id, h.address, h.zone_id, z.zone_name, z.type AS zone_type
            FROM citizen_residency r
            JOIN house h ON h.house_id = r.house_id
            LEFT JOIN zone z ON z.zone_id = h.zone_id
            WHERE r.citizen_id = $1
            ORDER BY h.house_id
            "#,
        )
        .bind(citizen_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Residence::from).collect())
    }

    /// list_grievances
    ///
    /// Builds the page query and the count query from the same filter clauses with
    /// QueryBuilder, so the total always agrees with the rows.
    async fn list_grievances(
        &self,
        filter: &GrievanceFilter,
    ) -> RepoResult<(Vec<GrievanceSummary>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM grievance WHERE 1 = 1");
        push_grievance_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SUMMARY_COLUMNS} FROM grievance WHERE 1 = 1"));
        push_grievance_filters(&mut page, filter);
        page.push(" ORDER BY ")
            .push(order_expression(filter.sort_by))
            .push(match filter.sort_order {
                SortOrder::Asc => " ASC",
                SortOrder::Desc => " DESC",
            })
            .push(", grievance_id DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows = page
            .build_query_as::<GrievanceSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    async fn grievance_summaries(&self, scope: GrievanceScope) -> RepoResult<Vec<GrievanceSummary>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {SUMMARY_COLUMNS} FROM grievance"));
        match scope {
            GrievanceScope::All => {}
            GrievanceScope::OwnedBy(id) => {
                builder.push(" WHERE citizen_id = ").push_bind(id);
            }
            GrievanceScope::AssignedTo(id) => {
                builder.push(" WHERE assigned_provider_id = ").push_bind(id);
            }
        }
        builder.push(" ORDER BY created_at DESC, grievance_id DESC");

        let rows = builder
            .build_query_as::<GrievanceSummary>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_grievance(&self, id: i32) -> RepoResult<Option<Grievance>> {
        let sql = format!("SELECT {GRIEVANCE_COLUMNS} FROM grievance WHERE grievance_id = $1");
        let row = sqlx::query_as::<_, Grievance>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// create_grievance
    ///
    /// New grievances always start as `Submitted`; priority defaults to medium.
    async fn create_grievance(
        &self,
        citizen_id: i32,
        req: CreateGrievanceRequest,
    ) -> RepoResult<Grievance> {
        let sql = format!(
            "INSERT INTO grievance \
                 (citizen_id, service_id, title, description, location_text, status, priority, \
                  created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
             RETURNING {GRIEVANCE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Grievance>(&sql)
            .bind(citizen_id)
            .bind(req.service_id)
            .bind(&req.title)
            .bind(&req.description)
            .bind(&req.location_text)
            .bind(GrievanceStatus::Submitted.as_str())
            .bind(req.priority.unwrap_or_default().as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    /// update_grievance
    ///
    /// `COALESCE` keeps every column whose field is absent from the request.
    async fn update_grievance(
        &self,
        id: i32,
        req: UpdateGrievanceRequest,
    ) -> RepoResult<Option<Grievance>> {
        let sql = format!(
            "UPDATE grievance \
             SET status = COALESCE($2, status), \
                 assigned_provider_id = COALESCE($3, assigned_provider_id), \
                 priority = COALESCE($4, priority), \
                 updated_at = NOW() \
             WHERE grievance_id = $1 \
             RETURNING {GRIEVANCE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Grievance>(&sql)
            .bind(id)
            .bind(req.status.map(|s| s.as_str()))
            .bind(req.assigned_provider_id)
            .bind(req.priority.map(|p| p.as_str()))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_announcements(&self, audiences: &[Audience]) -> RepoResult<Vec<Announcement>> {
        let audiences: Vec<String> = audiences.iter().map(|a| a.as_str().to_string()).collect();
        let sql = format!(
            "SELECT {ANNOUNCEMENT_COLUMNS} FROM announcement \
             WHERE is_active = true \
               AND (expires_at IS NULL OR expires_at > NOW()) \
               AND target_audience = ANY($1) \
             ORDER BY created_at DESC, announcement_id DESC"
        );
        let rows = sqlx::query_as::<_, Announcement>(&sql)
            .bind(audiences)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_announcement(&self, id: i32) -> RepoResult<Option<Announcement>> {
        let sql =
            format!("SELECT {ANNOUNCEMENT_COLUMNS} FROM announcement WHERE announcement_id = $1");
        let row = sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_announcement(
        &self,
        created_by: i32,
        req: CreateAnnouncementRequest,
    ) -> RepoResult<Announcement> {
        let sql = format!(
            "INSERT INTO announcement \
                 (title, content, target_audience, is_active, expires_at, created_by, \
                  created_at, updated_at) \
             VALUES ($1, $2, $3, true, $4, $5, NOW(), NOW()) \
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Announcement>(&sql)
            .bind(&req.title)
            .bind(&req.content)
            .bind(req.target_audience.as_str())
            .bind(req.expires_at)
            .bind(created_by)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_announcement(
        &self,
        id: i32,
        req: UpdateAnnouncementRequest,
    ) -> RepoResult<Option<Announcement>> {
        let sql = format!(
            "UPDATE announcement \
             SET title = COALESCE($2, title), \
                 content = COALESCE($3, content), \
                 target_audience = COALESCE($4, target_audience), \
                 is_active = COALESCE($5, is_active), \
                 expires_at = COALESCE($6, expires_at), \
                 updated_at = NOW() \
             WHERE announcement_id = $1 \
             RETURNING {ANNOUNCEMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Announcement>(&sql)
            .bind(id)
            .bind(&req.title)
            .bind(&req.content)
            .bind(req.target_audience.map(|a| a.as_str()))
            .bind(req.is_active)
            .bind(req.expires_at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_announcement(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM announcement WHERE announcement_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_services(&self) -> RepoResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, Service>(
            "SELECT service_id, service_name, description FROM service ORDER BY service_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_service(&self, id: i32) -> RepoResult<Option<Service>> {
        let row = sqlx::query_as::<_, Service>(
            "SELECT service_id, service_name, description FROM service WHERE service_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_zones(&self) -> RepoResult<Vec<Zone>> {
        let rows =
            sqlx::query_as::<_, Zone>("SELECT zone_id, zone_name, type FROM zone ORDER BY zone_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn get_zone(&self, id: i32) -> RepoResult<Option<Zone>> {
        let row =
            sqlx::query_as::<_, Zone>("SELECT zone_id, zone_name, type FROM zone WHERE zone_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }
}
