/// Maintenance request workflow.
///
/// Reads go through the listing cache; every successful write evicts the
/// whole cache namespace afterwards. A write that fails (for instance on an
/// unknown id) leaves both the repository and the cache as they were.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{not_found, AppError};
use crate::maintenance::{Listing, ListingCache};
use crate::maintenance::repository::MaintenanceRepository;
use crate::maintenance::{Department, MaintenanceRequest, NewMaintenanceRequest, RequestFilter, Status};
use crate::users::CredentialStore;
use crate::validators::{is_valid_description, is_valid_unit_number};

pub struct MaintenanceService {
    requests: Arc<dyn MaintenanceRepository>,
    users: Arc<dyn CredentialStore>,
    cache: ListingCache,
}

impl MaintenanceService {
    pub fn new(
        requests: Arc<dyn MaintenanceRepository>,
        users: Arc<dyn CredentialStore>,
        cache: ListingCache,
    ) -> Self {
        Self {
            requests,
            users,
            cache,
        }
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    /// Create an OPEN, unapproved request on behalf of `username`.
    ///
    /// # Errors
    /// - NotFound when the tenant does not exist
    /// - Validation errors for the unit number or description
    pub async fn create_request(
        &self,
        request: NewMaintenanceRequest,
        username: &str,
    ) -> Result<MaintenanceRequest, AppError> {
        tracing::debug!(username = %username, "Creating maintenance request");

        let tenant = self.users.find_by_username(username).await?.ok_or_else(|| {
            tracing::error!(username = %username, "User not found");
            not_found("user", username)
        })?;

        let unit_number = is_valid_unit_number(&request.unit_number)?;
        let description = is_valid_description(&request.description)?;

        let now = Utc::now();
        let created = MaintenanceRequest {
            id: Uuid::new_v4(),
            tenant_name: tenant.username,
            unit_number,
            description,
            status: Status::Open,
            department: request.department,
            approved: false,
            created_at: now,
            updated_at: now,
        };

        tracing::info!(
            tenant = %created.tenant_name,
            unit = %created.unit_number,
            department = %created.department,
            "Saving maintenance request"
        );
        self.requests.insert(&created).await?;
        self.cache.evict_all();

        tracing::debug!(id = %created.id, "Maintenance request created");
        Ok(created)
    }

    /// Whether a request with the same unit, department and description exists
    pub async fn request_exists(&self, request: &NewMaintenanceRequest) -> Result<bool, AppError> {
        let duplicates = self
            .requests
            .find_duplicates(
                request.unit_number.trim(),
                request.department,
                request.description.trim(),
            )
            .await?;
        Ok(!duplicates.is_empty())
    }

    pub async fn list(&self, filter: RequestFilter) -> Result<Listing, AppError> {
        tracing::debug!(filter = %filter.cache_key(), "Fetching maintenance requests");
        let requests = self.requests.clone();
        self.cache
            .get_or_compute(&filter, move || async move { requests.find(filter).await })
            .await
    }

    pub async fn list_all(&self) -> Result<Listing, AppError> {
        self.list(RequestFilter::All).await
    }

    pub async fn list_by_status(&self, status: Status) -> Result<Listing, AppError> {
        self.list(RequestFilter::Status(status)).await
    }

    pub async fn list_by_department(&self, department: Department) -> Result<Listing, AppError> {
        self.list(RequestFilter::Department(department)).await
    }

    pub async fn list_by_status_and_department(
        &self,
        status: Status,
        department: Department,
    ) -> Result<Listing, AppError> {
        self.list(RequestFilter::StatusAndDepartment(status, department)).await
    }

    /// Mark approved and move to IN_PROGRESS
    pub async fn approve(&self, id: Uuid) -> Result<MaintenanceRequest, AppError> {
        tracing::info!(id = %id, "Approving maintenance request");
        self.modify(id, |request| {
            request.approved = true;
            request.status = Status::InProgress;
        })
        .await
    }

    /// Clear approval and move to REJECTED
    pub async fn reject(&self, id: Uuid) -> Result<MaintenanceRequest, AppError> {
        tracing::info!(id = %id, "Rejecting maintenance request");
        self.modify(id, |request| {
            request.approved = false;
            request.status = Status::Rejected;
        })
        .await
    }

    pub async fn update_status(&self, id: Uuid, status: Status) -> Result<MaintenanceRequest, AppError> {
        tracing::info!(id = %id, status = %status, "Updating maintenance request status");
        self.modify(id, |request| request.status = status).await
    }

    async fn modify(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut MaintenanceRequest),
    ) -> Result<MaintenanceRequest, AppError> {
        let mut request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found("maintenance request", id))?;

        change(&mut request);
        request.updated_at = Utc::now();

        self.requests.update(&request).await?;
        self.cache.evict_all();
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;
    use crate::maintenance::InMemoryMaintenanceRepository;
    use crate::users::{InMemoryUserStore, Role, User};

    async fn service() -> MaintenanceService {
        let users = Arc::new(InMemoryUserStore::new());
        users
            .insert_user(&User {
                username: "alice".to_string(),
                password_hash: "unused".to_string(),
                role: Role::Tenant,
            })
            .await
            .unwrap();
        MaintenanceService::new(
            Arc::new(InMemoryMaintenanceRepository::new()),
            users,
            ListingCache::new(100),
        )
    }

    fn leak() -> NewMaintenanceRequest {
        NewMaintenanceRequest {
            unit_number: "101".to_string(),
            description: "leak".to_string(),
            department: Department::Plumbing,
        }
    }

    #[tokio::test]
    async fn test_create_request_starts_open_and_unapproved() {
        let service = service().await;

        let created = service.create_request(leak(), "alice").await.unwrap();

        assert_eq!(created.tenant_name, "alice");
        assert_eq!(created.unit_number, "101");
        assert_eq!(created.department, Department::Plumbing);
        assert_eq!(created.status, Status::Open);
        assert!(!created.approved);
    }

    #[tokio::test]
    async fn test_create_request_for_unknown_user_is_not_found() {
        let service = service().await;

        let result = service.create_request(leak(), "mallory").await;

        assert!(matches!(result, Err(AppError::Database(DatabaseError::NotFound(_)))));
        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_moves_to_in_progress() {
        let service = service().await;
        let created = service.create_request(leak(), "alice").await.unwrap();

        let approved = service.approve(created.id).await.unwrap();

        assert!(approved.approved);
        assert_eq!(approved.status, Status::InProgress);
    }

    #[tokio::test]
    async fn test_reject_clears_approval() {
        let service = service().await;
        let created = service.create_request(leak(), "alice").await.unwrap();
        service.approve(created.id).await.unwrap();

        let rejected = service.reject(created.id).await.unwrap();

        assert!(!rejected.approved);
        assert_eq!(rejected.status, Status::Rejected);
    }

    #[tokio::test]
    async fn test_reject_unknown_id_changes_nothing() {
        let service = service().await;
        let created = service.create_request(leak(), "alice").await.unwrap();
        let before = service.list_all().await.unwrap();

        let missing = Uuid::new_v4();
        let err = service.reject(missing).await.unwrap_err();

        assert!(err.to_string().contains(&missing.to_string()));
        assert!(service.cache().contains(&RequestFilter::All).await);
        let after = service.list_all().await.unwrap();
        assert_eq!(before, after);
        assert_eq!(after[0].id, created.id);
        assert_eq!(after[0].status, Status::Open);
    }

    #[tokio::test]
    async fn test_update_status() {
        let service = service().await;
        let created = service.create_request(leak(), "alice").await.unwrap();

        let resolved = service.update_status(created.id, Status::Resolved).await.unwrap();

        assert_eq!(resolved.status, Status::Resolved);
        assert!(!resolved.approved);
    }

    #[tokio::test]
    async fn test_writes_refresh_every_cached_filter() {
        let service = service().await;
        let created = service.create_request(leak(), "alice").await.unwrap();

        assert_eq!(service.list_all().await.unwrap().len(), 1);
        assert_eq!(service.list_by_status(Status::Open).await.unwrap().len(), 1);
        assert!(service.list_by_status(Status::InProgress).await.unwrap().is_empty());
        assert_eq!(
            service.list_by_department(Department::Plumbing).await.unwrap().len(),
            1
        );
        assert_eq!(
            service
                .list_by_status_and_department(Status::Open, Department::Plumbing)
                .await
                .unwrap()
                .len(),
            1
        );

        service.approve(created.id).await.unwrap();

        assert_eq!(service.list_all().await.unwrap()[0].status, Status::InProgress);
        assert!(service.list_by_status(Status::Open).await.unwrap().is_empty());
        assert_eq!(service.list_by_status(Status::InProgress).await.unwrap().len(), 1);
        assert!(service.list_by_department(Department::Plumbing).await.unwrap()[0].approved);
        assert!(service
            .list_by_status_and_department(Status::Open, Department::Plumbing)
            .await
            .unwrap()
            .is_empty());

        service
            .create_request(
                NewMaintenanceRequest {
                    unit_number: "202".to_string(),
                    description: "sparks".to_string(),
                    department: Department::Electrical,
                },
                "alice",
            )
            .await
            .unwrap();

        assert_eq!(service.list_all().await.unwrap().len(), 2);
        assert_eq!(service.list_by_status(Status::Open).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_request_exists_detects_duplicates() {
        let service = service().await;
        assert!(!service.request_exists(&leak()).await.unwrap());

        service.create_request(leak(), "alice").await.unwrap();

        assert!(service.request_exists(&leak()).await.unwrap());
        let mut other = leak();
        other.department = Department::Hvac;
        assert!(!service.request_exists(&other).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_unit_number_is_rejected() {
        let service = service().await;
        let mut bad = leak();
        bad.unit_number = "   ".to_string();

        let result = service.create_request(bad, "alice").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
