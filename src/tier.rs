use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Tier
///
/// The ordered trust level a handler is assigned to. The derived `Ord` follows the
/// declaration order: `Unauthenticated < Visiting < Authenticated`.
///
/// A handler may depend on capabilities from its own tier or any lower tier, never
/// from a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Unauthenticated = 0,
    Visiting = 1,
    Authenticated = 2,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Unauthenticated, Tier::Visiting, Tier::Authenticated];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Unauthenticated => "unauthenticated",
            Tier::Visiting => "visiting",
            Tier::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability
///
/// A unit of functionality a handler can import. Each capability is owned by
/// exactly one tier; see `Capability::tier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Health check and public counters.
    Catalog,
    /// Exchanging provider credentials for a session token.
    SessionIssue,
    /// Folder lookup scoped by a resolved share hash.
    FolderByHash,
    /// Media listing, comments, descriptions and activity of a single folder.
    GuestContent,
    /// Presigned download URLs.
    MediaDownload,
    /// Revoking the caller's own session.
    SessionAccess,
    /// Owner CRUD on folders, hash rotation and moderation.
    FolderOwnership,
    /// Presigned upload URLs and media registration.
    MediaUpload,
}

impl Capability {
    pub const fn tier(self) -> Tier {
        match self {
            Capability::Catalog | Capability::SessionIssue => Tier::Unauthenticated,
            Capability::FolderByHash | Capability::GuestContent | Capability::MediaDownload => {
                Tier::Visiting
            }
            Capability::SessionAccess | Capability::FolderOwnership | Capability::MediaUpload => {
                Tier::Authenticated
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// HandlerDecl
///
/// The registry entry for one request handler: its name, the tier it is mounted
/// on and the capabilities it imports.
#[derive(Debug, Clone, Copy)]
pub struct HandlerDecl {
    pub name: &'static str,
    pub tier: Tier,
    pub imports: &'static [Capability],
}

impl HandlerDecl {
    pub const fn new(name: &'static str, tier: Tier, imports: &'static [Capability]) -> Self {
        Self {
            name,
            tier,
            imports,
        }
    }
}

/// check_layering
///
/// The layering predicate. Returns `false` if any imported tier is strictly greater
/// than `handler_tier`.
pub fn check_layering(handler_tier: Tier, imported: &BTreeSet<Tier>) -> bool {
    imported.iter().all(|tier| *tier <= handler_tier)
}

/// One handler/capability pair that breaks the tier ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessViolation {
    pub handler: &'static str,
    pub handler_tier: Tier,
    pub capability: Capability,
    pub capability_tier: Tier,
}

impl fmt::Display for AccessViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) imports {} ({})",
            self.handler, self.handler_tier, self.capability, self.capability_tier
        )
    }
}

/// LayeringError
///
/// Raised by `HandlerRegistry::verify` when the scan finds at least one violation.
/// This never occurs while serving requests; it exists to fail a test run.
#[derive(Debug, Error)]
#[error("layering check failed: {}", render(.violations))]
pub struct LayeringError {
    pub violations: Vec<AccessViolation>,
}

fn render(violations: &[AccessViolation]) -> String {
    let listed = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} violation(s): {}", violations.len(), listed)
}

/// HandlerRegistry
///
/// Read-only table of every handler declaration in the application. Built once
/// and never mutated afterwards, so it can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<HandlerDecl>,
}

impl HandlerRegistry {
    pub fn new(handlers: impl IntoIterator<Item = HandlerDecl>) -> Self {
        Self {
            handlers: handlers.into_iter().collect(),
        }
    }

    pub fn handlers(&self) -> &[HandlerDecl] {
        &self.handlers
    }

    pub fn get(&self, name: &str) -> Option<&HandlerDecl> {
        self.handlers.iter().find(|decl| decl.name == name)
    }

    pub fn on_tier(&self, tier: Tier) -> impl Iterator<Item = &HandlerDecl> {
        self.handlers.iter().filter(move |decl| decl.tier == tier)
    }

    /// scan
    ///
    /// Enumerates every handler/capability pair where the capability's tier is above
    /// the handler's. Handlers that pass `check_layering` contribute nothing.
    pub fn scan(&self) -> Vec<AccessViolation> {
        let mut violations = Vec::new();
        for decl in &self.handlers {
            let imported: BTreeSet<Tier> = decl.imports.iter().map(|cap| cap.tier()).collect();
            if check_layering(decl.tier, &imported) {
                continue;
            }
            violations.extend(
                decl.imports
                    .iter()
                    .filter(|cap| cap.tier() > decl.tier)
                    .map(|cap| AccessViolation {
                        handler: decl.name,
                        handler_tier: decl.tier,
                        capability: *cap,
                        capability_tier: cap.tier(),
                    }),
            );
        }
        violations
    }

    pub fn verify(&self) -> Result<(), LayeringError> {
        let violations = self.scan();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(LayeringError { violations })
        }
    }
}
