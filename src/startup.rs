use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, AuthenticationGate, TokenService};
use crate::logger::LoggerMiddleware;
use crate::maintenance::{ListingCache, MaintenanceRepository, MaintenanceService};
use crate::middleware::SessionGate;
use crate::routes::{
    approve_request, create_request, current_user, health_check, list_requests, logout,
    reject_request, signin, update_request_status,
};
use crate::session::{KeyValueStore, SessionRegistry};
use crate::users::CredentialStore;

/// Everything the HTTP layer needs, wired once at startup
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub maintenance: Arc<MaintenanceService>,
    pub gate: AuthenticationGate,
}

impl AppServices {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        requests: Arc<dyn MaintenanceRepository>,
        store: Arc<dyn KeyValueStore>,
        tokens: TokenService,
        session_ttl: std::time::Duration,
        cache: ListingCache,
    ) -> Self {
        let sessions = SessionRegistry::new(store, session_ttl);
        Self {
            auth: Arc::new(AuthService::new(users.clone(), tokens.clone(), sessions.clone())),
            maintenance: Arc::new(MaintenanceService::new(requests, users, cache)),
            gate: AuthenticationGate::new(tokens, sessions),
        }
    }
}

pub fn run(listener: TcpListener, services: AppServices) -> Result<Server, std::io::Error> {
    let auth = web::Data::from(services.auth);
    let maintenance = web::Data::from(services.maintenance);
    let gate = services.gate;

    let server = HttpServer::new(move || {
        App::new()
            // Last wrap runs first; the access log must sit outside the gate
            .wrap(SessionGate::new(gate.clone()))
            .wrap(LoggerMiddleware)
            .wrap(Logger::default())

            .app_data(auth.clone())
            .app_data(maintenance.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth")
                            .route("/signin", web::post().to(signin))
                            .route("/logout", web::post().to(logout))
                            .route("/me", web::get().to(current_user)),
                    )
                    .route("/maintenance/create", web::post().to(create_request))
                    .service(
                        web::scope("/admin/maintenance")
                            .route("", web::get().to(list_requests))
                            .route("/{id}/approve", web::put().to(approve_request))
                            .route("/{id}/reject", web::put().to(reject_request))
                            .route("/{id}/status", web::put().to(update_request_status)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
