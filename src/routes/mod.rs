mod admin;
mod auth;
mod health_check;
mod maintenance;

pub use admin::{approve_request, list_requests, reject_request, update_request_status};
pub use auth::{current_user, logout, signin};
pub use health_check::health_check;
pub use maintenance::create_request;
