use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// --- Closed Vocabularies ---

/// UnknownVariant
///
/// Raised when a stored or client-supplied string does not name a member of one of the
/// closed vocabularies below (roles, statuses, priorities, audiences).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a text-backed enum: the serde name, the database text and `as_str` are the
/// same literal, and `FromStr`/`TryFrom<String>` reject anything outside the set.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:tt {
            $($(#[$vmeta:meta])* $variant:ident => $text:tt),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum! {
    /// Role
    ///
    /// The RBAC vocabulary. These lowercase names are the only role strings the service
    /// reads or writes, whether in tokens, in the `citizen.role` column, or in JSON.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
    #[ts(export)]
    pub enum Role as "role" {
        Admin => "admin",
        #[default]
        Citizen => "citizen",
        Provider => "provider",
    }
}

text_enum! {
    /// GrievanceStatus
    ///
    /// Lifecycle of a grievance. New grievances always start as `Submitted`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
    #[ts(export)]
    pub enum GrievanceStatus as "status" {
        #[default]
        Submitted => "Submitted",
        InProgress => "In Progress",
        Resolved => "Resolved",
        Closed => "Closed",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
    #[ts(export)]
    pub enum Priority as "priority" {
        Low => "low",
        #[default]
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

text_enum! {
    /// Audience
    ///
    /// Who an announcement is addressed to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema)]
    #[ts(export)]
    pub enum Audience as "target audience" {
        #[default]
        All => "all",
        Citizens => "citizens",
        ServiceProviders => "service_providers",
    }
}

impl Audience {
    /// The audiences whose announcements a principal with `role` may read.
    /// Administrators see everything so they can manage it.
    pub fn visible_to(role: Role) -> &'static [Audience] {
        match role {
            Role::Admin => Audience::ALL,
            Role::Citizen => &[Audience::All, Audience::Citizens],
            Role::Provider => &[Audience::All, Audience::ServiceProviders],
        }
    }
}

text_enum! {
    /// SortField
    ///
    /// Whitelisted grievance columns for `ORDER BY`. Nothing else from the query string
    /// ever reaches the SQL text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
    pub enum SortField as "sort field" {
        #[default]
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
        Priority => "priority",
        Status => "status",
    }
}

text_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
    pub enum SortOrder as "sort order" {
        Asc => "asc",
        #[default]
        Desc => "desc",
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Citizen
///
/// A principal from the `citizen` table. Despite the table name this covers every role.
/// The password digest lives in `CitizenCredentials` and never reaches a response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Citizen {
    pub citizen_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub phone: Option<String>,
    pub address_city: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// CitizenCredentials
///
/// Internal login view of a citizen row: the public record plus the bcrypt digest.
#[derive(Debug, Clone, FromRow)]
pub struct CitizenCredentials {
    #[sqlx(flatten)]
    pub citizen: Citizen,
    pub password_hash: String,
}

/// NewCitizen
///
/// Insert payload assembled by the registration handler after hashing.
#[derive(Debug, Clone)]
pub struct NewCitizen {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

/// Grievance
///
/// A complaint filed by a citizen, optionally routed to a municipal service and assigned
/// to a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Grievance {
    pub grievance_id: i32,
    // Owner. Always a principal with the citizen role.
    pub citizen_id: i32,
    pub service_id: Option<i32>,
    pub assigned_provider_id: Option<i32>,
    pub title: String,
    pub description: String,
    pub location_text: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: GrievanceStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// GrievanceSummary
///
/// List projection used by the grievance index and the dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct GrievanceSummary {
    pub grievance_id: i32,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: GrievanceStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub service_id: Option<i32>,
    pub assigned_provider_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Grievance> for GrievanceSummary {
    fn from(g: &Grievance) -> Self {
        Self {
            grievance_id: g.grievance_id,
            title: g.title.clone(),
            status: g.status,
            priority: g.priority,
            service_id: g.service_id,
            assigned_provider_id: g.assigned_provider_id,
            created_at: g.created_at,
            updated_at: g.updated_at,
        }
    }
}

/// Announcement
///
/// A notice published by an administrator to one audience.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Announcement {
    pub announcement_id: i32,
    pub title: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub target_audience: Audience,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    // The admin who published it.
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    /// Whether a reader should still see this announcement at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Service {
    pub service_id: i32,
    pub service_name: String,
    pub description: Option<String>,
}

/// Zone
///
/// A municipal zone. `type` is a reserved keyword in Rust, so the column is read into
/// `zone_type` and written back out as `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Zone {
    pub zone_id: i32,
    pub zone_name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub zone_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Vehicle {
    pub vehicle_id: i32,
    pub owner_id: i32,
    pub registration_number: String,
    pub vehicle_type: Option<String>,
}

/// House
///
/// A dwelling with its zone resolved (the single nested relationship the profile needs).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct House {
    pub house_id: i32,
    pub address: Option<String>,
    pub zone_id: Option<i32>,
    pub zone: Option<Zone>,
}

/// Residence
///
/// One `citizen_residency` link, shaped the way the client expects: `{ "house": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Residence {
    pub house: House,
}

// --- Request Payloads (Input Schemas) ---
//
// String fields default to empty when absent so that a missing field is reported by the
// same length/format rule as a too-short one, and every violation comes back at once.

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "email must be a valid email address"))]
    #[schema(example = "a@b.com")]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 6, message = "password must be at least 6 characters long"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "first_name must be between 1 and 100 characters long"
    ))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "last_name must be between 1 and 100 characters long"
    ))]
    pub last_name: String,
    // Defaults to citizen.
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// CreateGrievanceRequest
///
/// Input payload for filing a grievance (POST /api/grievances). The owner is never part of
/// the payload; it is taken from the verified token.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateGrievanceRequest {
    #[serde(default)]
    #[validate(length(
        min = 5,
        max = 255,
        message = "title must be between 5 and 255 characters long"
    ))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 10, message = "description must be at least 10 characters long"))]
    pub description: String,
    #[validate(range(min = 1, message = "service_id must be a positive integer"))]
    pub service_id: Option<i32>,
    pub location_text: Option<String>,
    pub priority: Option<Priority>,
}

/// UpdateGrievanceRequest
///
/// Partial update for triage (PUT /api/grievances/{id}). Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateGrievanceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<GrievanceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "assigned_provider_id must be a positive integer"))]
    pub assigned_provider_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAnnouncementRequest {
    #[serde(default)]
    #[validate(length(
        min = 5,
        max = 255,
        message = "title must be between 5 and 255 characters long"
    ))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 10, message = "content must be at least 10 characters long"))]
    pub content: String,
    #[serde(default)]
    pub target_audience: Audience,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAnnouncementRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 5,
        max = 255,
        message = "title must be between 5 and 255 characters long"
    ))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, message = "content must be at least 10 characters long"))]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<Audience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// GrievanceListQuery
///
/// Query string accepted by GET /api/grievances. Numbers arrive as strings and are coerced
/// by the deserializer; anything omitted takes its default.
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GrievanceListQuery {
    pub status: Option<GrievanceStatus>,
    pub priority: Option<Priority>,
    #[validate(range(min = 1, message = "service_id must be a positive integer"))]
    pub service_id: Option<i32>,
    #[validate(range(min = 1, message = "assigned_to must be a positive integer"))]
    pub assigned_to: Option<i32>,
    #[serde(default = "default_page")]
    #[validate(range(
        min = 1,
        max = 1_000_000,
        message = "page must be between 1 and 1000000"
    ))]
    pub page: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortOrder,
}

impl Default for GrievanceListQuery {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            service_id: None,
            assigned_to: None,
            page: default_page(),
            limit: default_limit(),
            sort_by: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: Citizen,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: Citizen,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub user: Citizen,
}

/// TokenIdentity
///
/// The identity carried by a verified token, echoed back by GET /api/auth/verify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenIdentity {
    pub id: i32,
    pub role: Role,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: TokenIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Pagination {
    #[ts(type = "number")]
    pub page: i64,
    #[ts(type = "number")]
    pub limit: i64,
    #[ts(type = "number")]
    pub total: i64,
    #[ts(type = "number")]
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GrievanceList {
    pub grievances: Vec<GrievanceSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnnouncementEnvelope {
    pub announcement: Announcement,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceList {
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceEnvelope {
    pub service: Service,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ZoneList {
    pub zones: Vec<Zone>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ZoneEnvelope {
    pub zone: Zone,
}

/// CitizenProfile
///
/// Output schema for GET /api/citizens/me/profile: the citizen row flattened at the top
/// level with vehicles and residences alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CitizenProfile {
    #[serde(flatten)]
    pub citizen: Citizen,
    pub vehicles: Vec<Vehicle>,
    pub residences: Vec<Residence>,
}

// --- Dashboard Schemas (Output) ---
//
// Dashboard keys are camelCase because the client's dashboard widgets read them that way.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CitizenStats {
    pub total_submitted: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub closed: usize,
    pub recent_grievances: Vec<GrievanceSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProviderStats {
    pub total_assigned: usize,
    pub new_assigned: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub resolved_today: usize,
    pub assigned_grievances: Vec<GrievanceSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusCount {
    pub status: GrievanceStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ServiceCount {
    pub service_id: Option<i32>,
    pub service_name: String,
    pub count: usize,
}

/// AdminStats
///
/// Output schema for the administrative dashboard (GET /api/dashboard/stats).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminStats {
    pub total_grievances: usize,
    pub pending_grievances: usize,
    pub resolved_today: usize,
    #[ts(type = "number")]
    pub total_citizens: i64,
    pub grievances_by_status: Vec<StatusCount>,
    pub grievances_by_service: Vec<ServiceCount>,
    pub recent_grievances: Vec<GrievanceSummary>,
}
