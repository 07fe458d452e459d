/// Maintenance request persistence.
///
/// Plain mapping of [`MaintenanceRequest`] onto the `maintenance_request`
/// table. Enum fields are stored by name.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};
use crate::maintenance::{Department, MaintenanceRequest, RequestFilter, Status};

#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    async fn insert(&self, request: &MaintenanceRequest) -> Result<(), AppError>;

    /// Overwrites the stored row with the same id.
    async fn update(&self, request: &MaintenanceRequest) -> Result<(), AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MaintenanceRequest>, AppError>;

    async fn find(&self, filter: RequestFilter) -> Result<Vec<MaintenanceRequest>, AppError>;

    /// Requests with the same unit, department and description
    async fn find_duplicates(
        &self,
        unit_number: &str,
        department: Department,
        description: &str,
    ) -> Result<Vec<MaintenanceRequest>, AppError>;
}

#[derive(sqlx::FromRow)]
struct MaintenanceRequestRow {
    id: Uuid,
    tenant_name: String,
    unit_number: String,
    description: String,
    status: String,
    department: String,
    approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MaintenanceRequestRow> for MaintenanceRequest {
    type Error = AppError;

    fn try_from(row: MaintenanceRequestRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, value: &str| {
            AppError::Database(DatabaseError::QueryExecution(format!(
                "stored {} {:?} on request {} is not recognised",
                field, value, row.id
            )))
        };
        let status = row
            .status
            .parse::<Status>()
            .map_err(|_| corrupt("status", &row.status))?;
        let department = row
            .department
            .parse::<Department>()
            .map_err(|_| corrupt("department", &row.department))?;

        Ok(MaintenanceRequest {
            id: row.id,
            tenant_name: row.tenant_name,
            unit_number: row.unit_number,
            description: row.description,
            status,
            department,
            approved: row.approved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_requests(rows: Vec<MaintenanceRequestRow>) -> Result<Vec<MaintenanceRequest>, AppError> {
    rows.into_iter().map(MaintenanceRequest::try_from).collect()
}

const SELECT_COLUMNS: &str = "SELECT id, tenant_name, unit_number, description, status, department, \
     approved, created_at, updated_at FROM maintenance_request";

pub struct PgMaintenanceRepository {
    pool: PgPool,
}

impl PgMaintenanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MaintenanceRepository for PgMaintenanceRepository {
    async fn insert(&self, request: &MaintenanceRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO maintenance_request
                (id, tenant_name, unit_number, description, status, department, approved, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.id)
        .bind(&request.tenant_name)
        .bind(&request.unit_number)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(request.department.as_str())
        .bind(request.approved)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, request: &MaintenanceRequest) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE maintenance_request
            SET unit_number = $2, description = $3, status = $4, department = $5,
                approved = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(request.id)
        .bind(&request.unit_number)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(request.department.as_str())
        .bind(request.approved)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::not_found("maintenance request", request.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MaintenanceRequest>, AppError> {
        let row = sqlx::query_as::<_, MaintenanceRequestRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(MaintenanceRequest::try_from).transpose()
    }

    async fn find(&self, filter: RequestFilter) -> Result<Vec<MaintenanceRequest>, AppError> {
        let rows = match filter {
            RequestFilter::All => {
                sqlx::query_as::<_, MaintenanceRequestRow>(SELECT_COLUMNS)
                    .fetch_all(&self.pool)
                    .await?
            }
            RequestFilter::Status(status) => {
                sqlx::query_as::<_, MaintenanceRequestRow>(&format!("{} WHERE status = $1", SELECT_COLUMNS))
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            RequestFilter::Department(department) => {
                sqlx::query_as::<_, MaintenanceRequestRow>(&format!(
                    "{} WHERE department = $1",
                    SELECT_COLUMNS
                ))
                .bind(department.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            RequestFilter::StatusAndDepartment(status, department) => {
                sqlx::query_as::<_, MaintenanceRequestRow>(&format!(
                    "{} WHERE status = $1 AND department = $2",
                    SELECT_COLUMNS
                ))
                .bind(status.as_str())
                .bind(department.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        into_requests(rows)
    }

    async fn find_duplicates(
        &self,
        unit_number: &str,
        department: Department,
        description: &str,
    ) -> Result<Vec<MaintenanceRequest>, AppError> {
        let rows = sqlx::query_as::<_, MaintenanceRequestRow>(&format!(
            "{} WHERE unit_number = $1 AND department = $2 AND description = $3",
            SELECT_COLUMNS
        ))
        .bind(unit_number)
        .bind(department.as_str())
        .bind(description)
        .fetch_all(&self.pool)
        .await?;

        into_requests(rows)
    }
}

/// In-memory repository; listings come back in creation order.
#[derive(Default)]
pub struct InMemoryMaintenanceRepository {
    requests: RwLock<HashMap<Uuid, MaintenanceRequest>>,
}

impl InMemoryMaintenanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(&self, predicate: impl Fn(&MaintenanceRequest) -> bool) -> Vec<MaintenanceRequest> {
        let mut found: Vec<MaintenanceRequest> = self
            .requests
            .read()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        found
    }
}

#[async_trait]
impl MaintenanceRepository for InMemoryMaintenanceRepository {
    async fn insert(&self, request: &MaintenanceRequest) -> Result<(), AppError> {
        let mut requests = self.requests.write();
        if requests.contains_key(&request.id) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                format!("maintenance request {}", request.id),
            )));
        }
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn update(&self, request: &MaintenanceRequest) -> Result<(), AppError> {
        match self.requests.write().get_mut(&request.id) {
            Some(stored) => {
                *stored = request.clone();
                Ok(())
            }
            None => Err(crate::error::not_found("maintenance request", request.id)),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MaintenanceRequest>, AppError> {
        Ok(self.requests.read().get(&id).cloned())
    }

    async fn find(&self, filter: RequestFilter) -> Result<Vec<MaintenanceRequest>, AppError> {
        Ok(self.collect(|r| filter.matches(r)))
    }

    async fn find_duplicates(
        &self,
        unit_number: &str,
        department: Department,
        description: &str,
    ) -> Result<Vec<MaintenanceRequest>, AppError> {
        Ok(self.collect(|r| {
            r.unit_number == unit_number && r.department == department && r.description == description
        }))
    }
}
