use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::http::middleware::auth;
use crate::http::routes::{admin, auth as auth_routes, comments, engagement, health, stats};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let cors = build_cors(&state);
    let mut router = Router::new()
        .route("/health", get(health::health))
        .route("/v2/auth/admin/login", post(auth_routes::admin_login))
        .route(
            "/v2/comments",
            post(comments::create_comment).get(comments::list_comments),
        )
        .route("/v2/comments/stats", get(stats::get_comment_stats))
        .route(
            "/v2/comments/tree/{content_kind}/{content_id}",
            get(comments::get_comment_tree),
        )
        .route(
            "/v2/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/v2/comments/{id}/like", post(engagement::toggle_like))
        .route("/v2/comments/{id}/dislike", post(engagement::toggle_dislike))
        .route("/v2/comments/{id}/helpful", post(engagement::mark_helpful))
        .route("/v2/comments/{id}/report", post(engagement::report_comment))
        .route(
            "/v2/admin/comments/moderation",
            get(admin::moderation::list_moderation_queue),
        )
        .route(
            "/v2/admin/comments/bulk-moderate",
            post(admin::moderation::bulk_moderate),
        )
        .route(
            "/v2/admin/comments/{id}",
            get(admin::moderation::get_comment_detail),
        )
        .route(
            "/v2/admin/comments/{id}/moderate",
            post(admin::moderation::moderate_comment),
        )
        .layer(middleware::from_fn(auth::require_moderator))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ))
        .with_state(state);
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn build_cors(state: &AppState) -> Option<CorsLayer> {
    let mut origins = Vec::new();
    let mut allow_any = false;
    for origin in state.config.cors_allow_origins.iter() {
        if is_wildcard_origin(origin) {
            allow_any = true;
            break;
        }
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => origins.push(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "invalid CORS origin ignored");
            }
        }
    }

    if !should_enable_cors(allow_any, &origins) {
        return None;
    }

    let cors = CorsLayer::new().allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ]);

    if allow_any {
        Some(cors.allow_origin(Any).allow_headers(Any))
    } else {
        Some(
            cors.allow_origin(AllowOrigin::list(origins))
                .allow_credentials(true)
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
    }
}

fn is_wildcard_origin(origin: &str) -> bool {
    origin.trim() == "*"
}

fn should_enable_cors(allow_any: bool, origins: &[HeaderValue]) -> bool {
    allow_any || !origins.is_empty()
}

#[cfg(test)]
mod tests {
    use super::{is_wildcard_origin, should_enable_cors};
    use axum::http::HeaderValue;

    #[test]
    fn wildcard_origin_matches_trimmed_star() {
        assert!(is_wildcard_origin("*"));
        assert!(is_wildcard_origin(" * "));
        assert!(!is_wildcard_origin("https://lms.example"));
    }

    #[test]
    fn cors_enablement_requires_origin_or_wildcard() {
        assert!(!should_enable_cors(false, &[]));
        assert!(should_enable_cors(true, &[]));
        assert!(should_enable_cors(
            false,
            &[HeaderValue::from_static("https://lms.example")]
        ));
    }
}
