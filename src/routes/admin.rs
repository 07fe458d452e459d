/// Administrator routes
///
/// Every handler here takes [`AdminPrincipal`]; the session gate lets all
/// requests through, so dropping the extractor would open the route.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminPrincipal;
use crate::error::AppError;
use crate::maintenance::{MaintenanceService, RequestFilter, Status};

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub department: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: Status,
}

/// GET /api/admin/maintenance?status=&department=
///
/// `ALL` (or an absent parameter) leaves that field unfiltered.
pub async fn list_requests(
    _admin: AdminPrincipal,
    query: web::Query<ListQuery>,
    maintenance: web::Data<MaintenanceService>,
) -> Result<HttpResponse, AppError> {
    let filter = RequestFilter::from_query(query.status.as_deref(), query.department.as_deref())?;
    let requests = maintenance.list(filter).await?;
    Ok(HttpResponse::Ok().json(requests.as_slice()))
}

/// PUT /api/admin/maintenance/{id}/approve
pub async fn approve_request(
    admin: AdminPrincipal,
    path: web::Path<Uuid>,
    maintenance: web::Data<MaintenanceService>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let updated = maintenance.approve(id).await?;
    tracing::info!(id = %id, admin = %admin.0.username, "Request approved");
    Ok(HttpResponse::Ok().json(updated))
}

/// PUT /api/admin/maintenance/{id}/reject
pub async fn reject_request(
    admin: AdminPrincipal,
    path: web::Path<Uuid>,
    maintenance: web::Data<MaintenanceService>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let updated = maintenance.reject(id).await?;
    tracing::info!(id = %id, admin = %admin.0.username, "Request rejected");
    Ok(HttpResponse::Ok().json(updated))
}

/// PUT /api/admin/maintenance/{id}/status
pub async fn update_request_status(
    admin: AdminPrincipal,
    path: web::Path<Uuid>,
    form: web::Json<StatusUpdate>,
    maintenance: web::Data<MaintenanceService>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let updated = maintenance.update_status(id, form.status).await?;
    tracing::info!(id = %id, status = %updated.status, admin = %admin.0.username, "Request status updated");
    Ok(HttpResponse::Ok().json(updated))
}
