use super::TierRoutes;
use crate::{
    handlers::public as handlers,
    tier::{Capability, Tier},
};
use axum::routing::{get, post};

/// Public Router Module
///
/// Endpoints reachable without any credential. Nothing here may touch folder
/// contents; that starts at the visiting tier.
pub fn public_routes() -> TierRoutes {
    TierRoutes::new(Tier::Unauthenticated)
        // GET /health
        // Liveness check for monitoring and load balancers.
        .mount(
            "/health",
            "health",
            &[Capability::Catalog],
            get(handlers::health),
        )
        // GET /stats
        // Aggregate counters only.
        .mount(
            "/stats",
            "get_public_stats",
            &[Capability::Catalog],
            get(handlers::get_public_stats),
        )
        // POST /login
        // Exchanges provider credentials for a (userid, token) session.
        .mount(
            "/login",
            "login",
            &[Capability::SessionIssue],
            post(handlers::login),
        )
}
