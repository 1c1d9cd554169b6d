use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

use crate::http_handler::AppError;
use crate::server::ServerState;

/// Rejects requests for unknown or disabled apps before authentication runs.
pub async fn check_app_enabled(
    State(state): State<Arc<ServerState>>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let app_id = params.get("app_id").cloned().unwrap_or_default();

    let app = state.apps.by_app_id(&app_id).map_err(|_| {
        AppError::Forbidden(format!("Could not found an app with app_id: {app_id}"))
    })?;

    if !app.is_enabled() {
        return Err(AppError::Forbidden("Application disabled".into()));
    }

    Ok(next.run(request).await)
}

/// Control-plane authentication. The signature is a HMAC SHA256 hex digest of
///
///   METHOD "\n" path "\n" canonicalQuery
///
/// where canonicalQuery is every query parameter except `auth_signature`,
/// keys lowercased and sorted ascending, joined as `k=v` with `&` and without
/// URL-escaping.
pub async fn authenticate_request(
    State(state): State<Arc<ServerState>>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let app_id = params.get("app_id").cloned().unwrap_or_default();
    let app = state
        .apps
        .by_app_id(&app_id)
        .map_err(|_| AppError::Unauthorized("Not authorized".into()))?;

    let (canonical_query, signature) = signature_parts(request.uri().query())?;
    let Some(signature) = signature else {
        return Err(AppError::Unauthorized("Not authorized".into()));
    };

    let to_sign = format!(
        "{}\n{}\n{}",
        request.method().as_str().to_uppercase(),
        request.uri().path(),
        canonical_query
    );

    if app.token().verify(&to_sign, &signature) {
        Ok(next.run(request).await)
    } else {
        warn!(app_id = %app_id, path = %request.uri().path(), "bad API signature");
        Err(AppError::Unauthorized("Not authorized".into()))
    }
}

fn signature_parts(query: Option<&str>) -> Result<(String, Option<String>), AppError> {
    let mut params: BTreeMap<String, String> = BTreeMap::new();
    let mut signature = None;

    if let Some(query) = query {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
            .map_err(|e| AppError::BadRequest(format!("invalid query string: {e}")))?;
        for (key, value) in pairs {
            if key == "auth_signature" {
                signature = Some(value);
            } else {
                params.insert(key.to_lowercase(), value);
            }
        }
    }

    let canonical = params
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok((canonical, signature))
}
