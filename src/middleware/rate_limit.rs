use crate::{
    errors::AppError,
    handlers::caller::Caller,
    services::rate_limiter::RetryAfter,
    state::AppState,
};
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Per-caller limit on artwork submissions.
///
/// Requests without a usable caller id pass through untouched; the handler
/// rejects them with 401.
///
/// Adds `Retry-After` (whole seconds) to 429 responses.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let caller = Caller::from_parts(&parts).ok();
    let request = Request::from_parts(parts, body);

    let Some(Caller(caller)) = caller else {
        return next.run(request).await;
    };

    match state.rate_limiter.check(caller).await {
        Ok(()) => next.run(request).await,
        Err(RetryAfter(wait)) => {
            tracing::warn!(%caller, "artwork submission rate limit exceeded");
            let mut response =
                AppError::too_many_requests("too many artwork submissions, try again later")
                    .into_response();
            let seconds = wait.as_secs_f64().ceil().max(1.0) as u64;
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            response
        }
    }
}
