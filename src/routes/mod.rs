/// Router Module Index
///
/// One module per trust tier. Each module builds a `TierRoutes`: every handler is
/// mounted together with its `HandlerDecl`, so the router that serves requests and
/// the registry that is checked for layering come from the same calls.
use axum::{Router, routing::MethodRouter};

use crate::{
    AppState,
    tier::{Capability, HandlerDecl, HandlerRegistry, Tier},
};

/// Routes open to anyone. No credential is read.
pub mod public;

/// Routes gated by a folder share hash (`hash`).
pub mod visiting;

/// Routes gated by a session credential (`userid` + `token`).
pub mod authenticated;

/// TierRoutes
///
/// A router for a single tier plus the declaration of every handler mounted on it.
/// A handler can only be mounted through `mount`, which records its declaration
/// with the router's own tier.
pub struct TierRoutes {
    tier: Tier,
    router: Router<AppState>,
    handlers: Vec<HandlerDecl>,
}

impl TierRoutes {
    pub fn new(tier: Tier) -> Self {
        Self {
            tier,
            router: Router::new(),
            handlers: Vec::new(),
        }
    }

    /// Mounts one handler at `path`. Several handlers may share a path as long as
    /// their methods differ.
    pub fn mount(
        mut self,
        path: &str,
        name: &'static str,
        imports: &'static [Capability],
        handler: MethodRouter<AppState>,
    ) -> Self {
        self.handlers.push(HandlerDecl::new(name, self.tier, imports));
        self.router = self.router.route(path, handler);
        self
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn handlers(&self) -> &[HandlerDecl] {
        &self.handlers
    }

    pub fn into_router(self) -> Router<AppState> {
        self.router
    }
}

/// The three tier routers, lowest tier first.
pub fn tier_routes() -> [TierRoutes; 3] {
    [
        public::public_routes(),
        visiting::visiting_routes(),
        authenticated::authenticated_routes(),
    ]
}

/// registry
///
/// Every handler the application mounts, across all tiers. Immutable once built.
pub fn registry() -> HandlerRegistry {
    HandlerRegistry::new(
        tier_routes()
            .iter()
            .flat_map(|routes| routes.handlers().iter().copied())
            .collect::<Vec<_>>(),
    )
}
