use axum::{
    body::Body,
    extract::{FromRequestParts, Query, Request, State},
    http::{Uri, request::Parts},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::{
    AppState,
    error::{AccessError, ApiError, StoreError},
    models::HashKind,
    repository::{FolderId, FolderStore, IdentityStore},
    tier::Tier,
};

/// Longest token accepted on the authenticated tier.
pub const MAX_TOKEN_LEN: usize = 128;

/// RequestPayload
///
/// Field-name to value view of one request, merged from the query string and a JSON
/// object body. Body fields win over query fields of the same name. The access
/// controller only ever reads `hash`, `userid` and `token` from it.
#[derive(Debug, Clone, Default)]
pub struct RequestPayload {
    fields: Map<String, Value>,
}

impl RequestPayload {
    /// Builds the payload from the request URI and the buffered body bytes. A body
    /// that is not a JSON object contributes nothing.
    pub fn from_parts(uri: &Uri, body: &[u8]) -> Self {
        let mut fields = Map::new();
        if let Ok(Query(query)) = Query::<HashMap<String, String>>::try_from_uri(uri) {
            for (name, value) in query {
                fields.insert(name, Value::String(value));
            }
        }
        if let Ok(Value::Object(body_fields)) = serde_json::from_slice::<Value>(body) {
            fields.extend(body_fields);
        }
        Self { fields }
    }

    /// Wraps a JSON object; any other JSON value yields an empty payload.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// SessionContext
///
/// The identity resolved for a single request. Created by the tier middleware,
/// stored in the request extensions and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionContext {
    Anonymous,
    Visitor { folder_id: FolderId, access: HashKind },
    User { user_id: i64, token: String },
}

impl SessionContext {
    pub fn tier(&self) -> Tier {
        match self {
            SessionContext::Anonymous => Tier::Unauthenticated,
            SessionContext::Visitor { .. } => Tier::Visiting,
            SessionContext::User { .. } => Tier::Authenticated,
        }
    }

    pub fn folder_id(&self) -> Option<FolderId> {
        match self {
            SessionContext::Visitor { folder_id, .. } => Some(*folder_id),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            SessionContext::User { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

/// sanitize_token
///
/// Trims the raw token and accepts it only if it is non-empty, at most
/// `MAX_TOKEN_LEN` long and made of `[A-Za-z0-9._-]`.
pub fn sanitize_token(raw: &str) -> Result<&str, &'static str> {
    let token = raw.trim();
    if token.is_empty() {
        return Err("must not be empty");
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err("is too long");
    }
    if !token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err("contains forbidden characters");
    }
    Ok(token)
}

fn invalid(tier: Tier, field: &'static str, reason: &'static str) -> AccessError {
    AccessError::InvalidRequest {
        tier,
        field,
        reason,
    }
}

fn store_failure(tier: Tier) -> impl FnOnce(StoreError) -> AccessError {
    move |source| AccessError::Store { tier, source }
}

/// TierAccessController
///
/// Turns the credential carried by a request into a `SessionContext` for the tier
/// the handler is mounted on. Holds nothing but a borrow of the stores; every call
/// is independent and performs at most two sequential lookups.
pub struct TierAccessController<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> TierAccessController<'a, S>
where
    S: IdentityStore + FolderStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// resolve_credential
    ///
    /// - `Unauthenticated`: always `Anonymous`, the payload is not inspected.
    /// - `Visiting`: requires a non-empty `hash`. The view hash is tried first; the
    ///   edit hash is only looked up when that misses.
    /// - `Authenticated`: requires a positive `userid` and a sanitized `token`, then
    ///   asks the identity store.
    ///
    /// Nothing is retried and no partial context is ever returned.
    pub async fn resolve_credential(
        &self,
        tier: Tier,
        payload: &RequestPayload,
    ) -> Result<SessionContext, AccessError> {
        match tier {
            Tier::Unauthenticated => Ok(SessionContext::Anonymous),
            Tier::Visiting => self.resolve_visitor(payload).await,
            Tier::Authenticated => self.resolve_user(payload).await,
        }
    }

    async fn resolve_visitor(&self, payload: &RequestPayload) -> Result<SessionContext, AccessError> {
        let tier = Tier::Visiting;
        let hash = match payload.field("hash") {
            None | Some(Value::Null) => return Err(invalid(tier, "hash", "is missing")),
            Some(Value::String(hash)) if hash.is_empty() => {
                return Err(invalid(tier, "hash", "must not be empty"));
            }
            Some(Value::String(hash)) => hash.as_str(),
            Some(_) => return Err(invalid(tier, "hash", "must be a string")),
        };

        for access in [HashKind::View, HashKind::Edit] {
            let found = self
                .store
                .find_folder_by_hash(hash, access)
                .await
                .map_err(store_failure(tier))?;
            if let Some(folder_id) = found {
                return Ok(SessionContext::Visitor { folder_id, access });
            }
        }

        Err(AccessError::HashUnknown {
            hash: hash.to_string(),
        })
    }

    async fn resolve_user(&self, payload: &RequestPayload) -> Result<SessionContext, AccessError> {
        let tier = Tier::Authenticated;
        let user_id = match payload.field("userid") {
            None | Some(Value::Null) => return Err(invalid(tier, "userid", "is missing")),
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        }
        .filter(|id| *id > 0)
        .ok_or_else(|| invalid(tier, "userid", "must be a positive integer"))?;

        let token = match payload.field("token") {
            None | Some(Value::Null) => return Err(invalid(tier, "token", "is missing")),
            Some(Value::String(raw)) => {
                sanitize_token(raw).map_err(|reason| invalid(tier, "token", reason))?
            }
            Some(_) => return Err(invalid(tier, "token", "must be a string")),
        };

        let valid = self
            .store
            .verify_credential(user_id, token)
            .await
            .map_err(store_failure(tier))?;
        if !valid {
            return Err(AccessError::CredentialInvalid { user_id });
        }

        Ok(SessionContext::User {
            user_id,
            token: token.to_string(),
        })
    }
}

/// TierGate
///
/// State handed to `tier_middleware`: the tier of the router it guards plus the
/// shared application state.
#[derive(Clone)]
pub struct TierGate {
    pub tier: Tier,
    pub state: AppState,
}

/// tier_middleware
///
/// Resolves the request's credential before any handler runs. On success the
/// `SessionContext` is attached to the request extensions and the (re-assembled)
/// request continues; on failure the error response is returned and the handler is
/// never invoked.
pub async fn tier_middleware(
    State(gate): State<TierGate>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let controller = TierAccessController::new(gate.state.repo.as_ref());

    let (mut request, payload) = if gate.tier == Tier::Unauthenticated {
        (request, RequestPayload::default())
    } else {
        let (parts, body) = request.into_parts();
        let bytes = axum::body::to_bytes(body, gate.state.config.max_payload_bytes)
            .await
            .map_err(body_error)?;
        let payload = RequestPayload::from_parts(&parts.uri, &bytes);
        (Request::from_parts(parts, Body::from(bytes)), payload)
    };

    let context = match controller.resolve_credential(gate.tier, &payload).await {
        Ok(context) => context,
        Err(err) => {
            // The error text may echo the submitted hash, so only the code is logged.
            tracing::warn!(tier = %gate.tier, code = err.error_code(), "credential rejected");
            return Err(err.into());
        }
    };
    tracing::debug!(tier = %gate.tier, folder_id = ?context.folder_id(), user_id = ?context.user_id(), "credential resolved");

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Maps a failure to buffer the request body. Only exceeding the configured limit is
/// a 413; a body that breaks off or fails to decode is the client's bad request.
pub fn body_error(err: axum::Error) -> ApiError {
    let inner = err.into_inner();
    let root: &(dyn std::error::Error + 'static) = &*inner;
    let mut source = Some(root);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return ApiError::PayloadTooLarge;
        }
        source = err.source();
    }
    ApiError::BadRequest(format!("failed to read request body: {inner}"))
}

/// VisitorSession
///
/// Extractor for handlers on the visiting tier: the folder the share hash resolved
/// to and which hash matched.
#[derive(Debug, Clone, Copy)]
pub struct VisitorSession {
    pub folder_id: FolderId,
    pub access: HashKind,
}

impl VisitorSession {
    pub fn require_edit(&self) -> Result<(), ApiError> {
        match self.access {
            HashKind::Edit => Ok(()),
            HashKind::View => Err(ApiError::Forbidden("edit access requires the folder's edit hash")),
        }
    }
}

impl<S> FromRequestParts<S> for VisitorSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<SessionContext>() {
            Some(SessionContext::Visitor { folder_id, access }) => Ok(VisitorSession {
                folder_id: *folder_id,
                access: *access,
            }),
            _ => Err(ApiError::Internal("handler requires a visiting session")),
        }
    }
}

/// UserSession
///
/// Extractor for handlers on the authenticated tier.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: i64,
    pub token: String,
}

impl<S> FromRequestParts<S> for UserSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<SessionContext>() {
            Some(SessionContext::User { user_id, token }) => Ok(UserSession {
                user_id: *user_id,
                token: token.clone(),
            }),
            _ => Err(ApiError::Internal("handler requires an authenticated session")),
        }
    }
}
