/// Tenant-facing maintenance routes

use actix_web::{web, HttpResponse};

use crate::auth::Authenticated;
use crate::error::{AppError, DatabaseError, ErrorContext};
use crate::maintenance::{MaintenanceService, NewMaintenanceRequest};

/// POST /api/maintenance/create
///
/// The request is filed under the caller's username.
///
/// # Errors
/// - 400: Invalid unit number or description
/// - 401: Anonymous caller
/// - 409: Same unit, department and description already filed
pub async fn create_request(
    caller: Authenticated,
    form: web::Json<NewMaintenanceRequest>,
    maintenance: web::Data<MaintenanceService>,
) -> Result<HttpResponse, AppError> {
    let Authenticated(principal) = caller;
    let context = ErrorContext::new("create_maintenance_request").with_username(principal.username.as_str());
    let request = form.into_inner();

    if maintenance.request_exists(&request).await? {
        let e = AppError::Database(DatabaseError::UniqueConstraintViolation(format!(
            "maintenance request for unit {} ({})",
            request.unit_number.trim(),
            request.department
        )));
        context.log_error(&e);
        return Err(e);
    }

    let created = maintenance.create_request(request, &principal.username).await?;

    tracing::info!(
        request_id = %context.request_id,
        id = %created.id,
        username = %principal.username,
        "Maintenance request created"
    );
    Ok(HttpResponse::Created().json(created))
}
