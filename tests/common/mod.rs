#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{DateTime, Utc};
use grievance_portal::{
    AppConfig, AppState, create_router,
    models::{
        Announcement, Audience, Citizen, CitizenCredentials, CreateAnnouncementRequest,
        CreateGrievanceRequest, Grievance, GrievanceStatus, GrievanceSummary, NewCitizen,
        Priority, Residence, Role, Service, SortField, SortOrder, UpdateAnnouncementRequest,
        UpdateGrievanceRequest, Vehicle, Zone,
    },
    repository::{
        GrievanceFilter, GrievanceScope, RepoResult, Repository, RepositoryError, RepositoryState,
    },
};
use serde_json::Value;
use std::{
    cmp::Ordering,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
};
use tower::ServiceExt;

// --- In-memory Repository ---

#[derive(Default)]
struct Store {
    next_id: i32,
    citizens: Vec<CitizenCredentials>,
    grievances: Vec<Grievance>,
    announcements: Vec<Announcement>,
    services: Vec<Service>,
    zones: Vec<Zone>,
    vehicles: Vec<Vehicle>,
    residences: Vec<(i32, Residence)>,
}

impl Store {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Repository double backed by vectors. Counts every trait call so tests can assert that
/// a rejected request never reached the database.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
    calls: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn touch(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    pub fn grievance_count(&self) -> usize {
        self.store.lock().unwrap().grievances.len()
    }

    pub fn citizen_count(&self) -> usize {
        self.store.lock().unwrap().citizens.len()
    }

    pub fn stored_digest(&self, email: &str) -> Option<String> {
        self.store
            .lock()
            .unwrap()
            .citizens
            .iter()
            .find(|c| c.citizen.email == email)
            .map(|c| c.password_hash.clone())
    }

    /// Seeds a principal whose password is `secret1`.
    pub fn seed_citizen(&self, email: &str, role: Role) -> Citizen {
        let digest = bcrypt::hash("secret1", 4).unwrap();
        let mut store = self.store.lock().unwrap();
        let citizen = Citizen {
            citizen_id: store.next_id(),
            first_name: "Test".to_string(),
            last_name: role.as_str().to_string(),
            email: email.to_string(),
            role,
            phone: None,
            address_city: None,
            created_at: Utc::now(),
        };
        store.citizens.push(CitizenCredentials {
            citizen: citizen.clone(),
            password_hash: digest,
        });
        citizen
    }

    pub fn seed_grievance(
        &self,
        owner: i32,
        title: &str,
        status: GrievanceStatus,
        created_at: DateTime<Utc>,
    ) -> Grievance {
        let mut store = self.store.lock().unwrap();
        let grievance = Grievance {
            grievance_id: store.next_id(),
            citizen_id: owner,
            title: title.to_string(),
            description: "Seeded grievance description".to_string(),
            status,
            created_at,
            updated_at: created_at,
            ..Grievance::default()
        };
        store.grievances.push(grievance.clone());
        grievance
    }

    /// Applies `edit` to a stored grievance (assignment, service, timestamps).
    pub fn edit_grievance(&self, id: i32, edit: impl FnOnce(&mut Grievance)) {
        let mut store = self.store.lock().unwrap();
        if let Some(g) = store.grievances.iter_mut().find(|g| g.grievance_id == id) {
            edit(g);
        }
    }

    pub fn seed_service(&self, name: &str) -> Service {
        let mut store = self.store.lock().unwrap();
        let service = Service {
            service_id: store.next_id(),
            service_name: name.to_string(),
            description: None,
        };
        store.services.push(service.clone());
        service
    }

    pub fn seed_zone(&self, name: &str) -> Zone {
        let mut store = self.store.lock().unwrap();
        let zone = Zone {
            zone_id: store.next_id(),
            zone_name: name.to_string(),
            zone_type: Some("residential".to_string()),
        };
        store.zones.push(zone.clone());
        zone
    }

    pub fn seed_vehicle(&self, owner_id: i32, registration: &str) -> Vehicle {
        let mut store = self.store.lock().unwrap();
        let vehicle = Vehicle {
            vehicle_id: store.next_id(),
            owner_id,
            registration_number: registration.to_string(),
            vehicle_type: Some("car".to_string()),
        };
        store.vehicles.push(vehicle.clone());
        vehicle
    }

    pub fn seed_residence(&self, citizen_id: i32, residence: Residence) {
        self.store
            .lock()
            .unwrap()
            .residences
            .push((citizen_id, residence));
    }

    pub fn seed_announcement(
        &self,
        title: &str,
        audience: Audience,
        is_active: bool,
        expires_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Announcement {
        let mut store = self.store.lock().unwrap();
        let announcement = Announcement {
            announcement_id: store.next_id(),
            title: title.to_string(),
            content: "Seeded announcement content".to_string(),
            target_audience: audience,
            is_active,
            expires_at,
            created_by: None,
            created_at,
            updated_at: created_at,
        };
        store.announcements.push(announcement.clone());
        announcement
    }
}

fn rank<T: PartialEq>(all: &[T], value: &T) -> usize {
    all.iter().position(|v| v == value).unwrap_or(0)
}

fn compare(a: &Grievance, b: &Grievance, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Priority => {
            rank(Priority::ALL, &a.priority).cmp(&rank(Priority::ALL, &b.priority))
        }
        SortField::Status => a.status.as_str().cmp(b.status.as_str()),
    }
}

fn newest_first(a: &Grievance, b: &Grievance) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then(b.grievance_id.cmp(&a.grievance_id))
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_citizen_by_email(&self, email: &str) -> RepoResult<Option<CitizenCredentials>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store
            .citizens
            .iter()
            .find(|c| c.citizen.email == email)
            .cloned())
    }

    async fn get_citizen(&self, id: i32) -> RepoResult<Option<Citizen>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store
            .citizens
            .iter()
            .find(|c| c.citizen.citizen_id == id)
            .map(|c| c.citizen.clone()))
    }

    async fn create_citizen(&self, new: NewCitizen) -> RepoResult<Citizen> {
        self.touch();
        let mut store = self.store.lock().unwrap();
        if store.citizens.iter().any(|c| c.citizen.email == new.email) {
            return Err(RepositoryError::UniqueViolation("email"));
        }
        let citizen = Citizen {
            citizen_id: store.next_id(),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            role: new.role,
            phone: None,
            address_city: None,
            created_at: Utc::now(),
        };
        store.citizens.push(CitizenCredentials {
            citizen: citizen.clone(),
            password_hash: new.password_hash,
        });
        Ok(citizen)
    }

    async fn count_citizens(&self) -> RepoResult<i64> {
        self.touch();
        Ok(self.store.lock().unwrap().citizens.len() as i64)
    }

    async fn get_vehicles(&self, owner_id: i32) -> RepoResult<Vec<Vehicle>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store
            .vehicles
            .iter()
            .filter(|v| v.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get_residences(&self, citizen_id: i32) -> RepoResult<Vec<Residence>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store
            .residences
            .iter()
            .filter(|(id, _)| *id == citizen_id)
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn list_grievances(
        &self,
        filter: &GrievanceFilter,
    ) -> RepoResult<(Vec<GrievanceSummary>, i64)> {
        self.touch();
        let store = self.store.lock().unwrap();
        let mut matching: Vec<&Grievance> =
            store.grievances.iter().filter(|g| filter.matches(g)).collect();
        matching.sort_by(|a, b| {
            let ord = compare(a, b, filter.sort_by);
            let ord = match filter.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then(b.grievance_id.cmp(&a.grievance_id))
        });
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .map(GrievanceSummary::from)
            .collect();
        Ok((page, total))
    }

    async fn grievance_summaries(&self, scope: GrievanceScope) -> RepoResult<Vec<GrievanceSummary>> {
        self.touch();
        let store = self.store.lock().unwrap();
        let mut matching: Vec<&Grievance> =
            store.grievances.iter().filter(|g| scope.contains(g)).collect();
        matching.sort_by(|a, b| newest_first(a, b));
        Ok(matching.into_iter().map(GrievanceSummary::from).collect())
    }

    async fn get_grievance(&self, id: i32) -> RepoResult<Option<Grievance>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store
            .grievances
            .iter()
            .find(|g| g.grievance_id == id)
            .cloned())
    }

    async fn create_grievance(
        &self,
        citizen_id: i32,
        req: CreateGrievanceRequest,
    ) -> RepoResult<Grievance> {
        self.touch();
        let mut store = self.store.lock().unwrap();
        let now = Utc::now();
        let grievance = Grievance {
            grievance_id: store.next_id(),
            citizen_id,
            service_id: req.service_id,
            assigned_provider_id: None,
            title: req.title,
            description: req.description,
            location_text: req.location_text,
            status: GrievanceStatus::Submitted,
            priority: req.priority.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        store.grievances.push(grievance.clone());
        Ok(grievance)
    }

    async fn update_grievance(
        &self,
        id: i32,
        req: UpdateGrievanceRequest,
    ) -> RepoResult<Option<Grievance>> {
        self.touch();
        let mut store = self.store.lock().unwrap();
        let Some(g) = store.grievances.iter_mut().find(|g| g.grievance_id == id) else {
            return Ok(None);
        };
        if let Some(status) = req.status {
            g.status = status;
        }
        if let Some(provider) = req.assigned_provider_id {
            g.assigned_provider_id = Some(provider);
        }
        if let Some(priority) = req.priority {
            g.priority = priority;
        }
        g.updated_at = Utc::now();
        Ok(Some(g.clone()))
    }

    async fn list_announcements(&self, audiences: &[Audience]) -> RepoResult<Vec<Announcement>> {
        self.touch();
        let store = self.store.lock().unwrap();
        let now = Utc::now();
        let mut live: Vec<Announcement> = store
            .announcements
            .iter()
            .filter(|a| a.is_live(now) && audiences.contains(&a.target_audience))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(live)
    }

    async fn get_announcement(&self, id: i32) -> RepoResult<Option<Announcement>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store
            .announcements
            .iter()
            .find(|a| a.announcement_id == id)
            .cloned())
    }

    async fn create_announcement(
        &self,
        created_by: i32,
        req: CreateAnnouncementRequest,
    ) -> RepoResult<Announcement> {
        self.touch();
        let mut store = self.store.lock().unwrap();
        let now = Utc::now();
        let announcement = Announcement {
            announcement_id: store.next_id(),
            title: req.title,
            content: req.content,
            target_audience: req.target_audience,
            is_active: true,
            expires_at: req.expires_at,
            created_by: Some(created_by),
            created_at: now,
            updated_at: now,
        };
        store.announcements.push(announcement.clone());
        Ok(announcement)
    }

    async fn update_announcement(
        &self,
        id: i32,
        req: UpdateAnnouncementRequest,
    ) -> RepoResult<Option<Announcement>> {
        self.touch();
        let mut store = self.store.lock().unwrap();
        let Some(a) = store
            .announcements
            .iter_mut()
            .find(|a| a.announcement_id == id)
        else {
            return Ok(None);
        };
        if let Some(title) = req.title {
            a.title = title;
        }
        if let Some(content) = req.content {
            a.content = content;
        }
        if let Some(audience) = req.target_audience {
            a.target_audience = audience;
        }
        if let Some(active) = req.is_active {
            a.is_active = active;
        }
        if req.expires_at.is_some() {
            a.expires_at = req.expires_at;
        }
        a.updated_at = Utc::now();
        Ok(Some(a.clone()))
    }

    async fn delete_announcement(&self, id: i32) -> RepoResult<bool> {
        self.touch();
        let mut store = self.store.lock().unwrap();
        let before = store.announcements.len();
        store.announcements.retain(|a| a.announcement_id != id);
        Ok(store.announcements.len() < before)
    }

    async fn list_services(&self) -> RepoResult<Vec<Service>> {
        self.touch();
        Ok(self.store.lock().unwrap().services.clone())
    }

    async fn get_service(&self, id: i32) -> RepoResult<Option<Service>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store.services.iter().find(|s| s.service_id == id).cloned())
    }

    async fn list_zones(&self) -> RepoResult<Vec<Zone>> {
        self.touch();
        Ok(self.store.lock().unwrap().zones.clone())
    }

    async fn get_zone(&self, id: i32) -> RepoResult<Option<Zone>> {
        self.touch();
        let store = self.store.lock().unwrap();
        Ok(store.zones.iter().find(|z| z.zone_id == id).cloned())
    }
}

/// Repository whose every call fails, for exercising the 500 path.
pub struct FailingRepository;

fn broken<T>() -> RepoResult<T> {
    Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Repository for FailingRepository {
    async fn find_citizen_by_email(&self, _email: &str) -> RepoResult<Option<CitizenCredentials>> {
        broken()
    }
    async fn get_citizen(&self, _id: i32) -> RepoResult<Option<Citizen>> {
        broken()
    }
    async fn create_citizen(&self, _citizen: NewCitizen) -> RepoResult<Citizen> {
        broken()
    }
    async fn count_citizens(&self) -> RepoResult<i64> {
        broken()
    }
    async fn get_vehicles(&self, _owner_id: i32) -> RepoResult<Vec<Vehicle>> {
        broken()
    }
    async fn get_residences(&self, _citizen_id: i32) -> RepoResult<Vec<Residence>> {
        broken()
    }
    async fn list_grievances(
        &self,
        _filter: &GrievanceFilter,
    ) -> RepoResult<(Vec<GrievanceSummary>, i64)> {
        broken()
    }
    async fn grievance_summaries(
        &self,
        _scope: GrievanceScope,
    ) -> RepoResult<Vec<GrievanceSummary>> {
        broken()
    }
    async fn get_grievance(&self, _id: i32) -> RepoResult<Option<Grievance>> {
        broken()
    }
    async fn create_grievance(
        &self,
        _citizen_id: i32,
        _req: CreateGrievanceRequest,
    ) -> RepoResult<Grievance> {
        broken()
    }
    async fn update_grievance(
        &self,
        _id: i32,
        _req: UpdateGrievanceRequest,
    ) -> RepoResult<Option<Grievance>> {
        broken()
    }
    async fn list_announcements(&self, _audiences: &[Audience]) -> RepoResult<Vec<Announcement>> {
        broken()
    }
    async fn get_announcement(&self, _id: i32) -> RepoResult<Option<Announcement>> {
        broken()
    }
    async fn create_announcement(
        &self,
        _created_by: i32,
        _req: CreateAnnouncementRequest,
    ) -> RepoResult<Announcement> {
        broken()
    }
    async fn update_announcement(
        &self,
        _id: i32,
        _req: UpdateAnnouncementRequest,
    ) -> RepoResult<Option<Announcement>> {
        broken()
    }
    async fn delete_announcement(&self, _id: i32) -> RepoResult<bool> {
        broken()
    }
    async fn list_services(&self) -> RepoResult<Vec<Service>> {
        broken()
    }
    async fn get_service(&self, _id: i32) -> RepoResult<Option<Service>> {
        broken()
    }
    async fn list_zones(&self) -> RepoResult<Vec<Zone>> {
        broken()
    }
    async fn get_zone(&self, _id: i32) -> RepoResult<Option<Zone>> {
        broken()
    }
}

// --- Test Utilities ---

pub fn create_app_state(repo: RepositoryState, config: AppConfig) -> AppState {
    AppState::new(repo, config)
}

/// Router over `repo` with the default (local) test configuration.
pub fn test_app(repo: Arc<MemoryRepository>) -> (Router, AppState) {
    let state = create_app_state(repo as RepositoryState, AppConfig::default());
    (create_router(state.clone()), state)
}

pub fn token_for(state: &AppState, principal: &Citizen) -> String {
    state.tokens.issue(principal).unwrap()
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Drives one request through the router; the body is parsed as JSON (`Null` when empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}
