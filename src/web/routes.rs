use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use log::error;
use serde::Deserialize;
use serde_json::{json, Value};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use crate::aggregator::{Aggregator, TimeView};
use crate::config::AuthConfig;
use crate::directory::{DirectoryKind, DirectoryStore};
use crate::error::Error;
use crate::kv::cache::{keys, ttl};
use crate::kv::{Cache, RateLimiter};
use crate::models::{DashboardStats, HypePrice, RevenueBucket, RevenueChart, TokenInfo};
use crate::web::auth::{check_admin, AdminAuth};

const BODY_LIMIT: u64 = 16 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub cache: Cache,
    pub rate_limiter: Arc<RateLimiter>,
    pub directory: DirectoryStore,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
struct RevenueQuery {
    #[serde(rename = "timeView")]
    time_view: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PerpsQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemEnvelope {
    project: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct DeleteBody {
    id: Option<String>,
}

/// The full route tree, minus CORS/logging/recovery which the server wraps
/// around it.
pub fn routes(state: AppState) -> BoxedFilter<(Response,)> {
    health()
        .or(dashboard(state.clone()))
        .unify()
        .or(hype_price(state.clone()))
        .unify()
        .or(revenue(state.clone()))
        .unify()
        .or(defillama_revenue(state.clone()))
        .unify()
        .or(revenue_kpis(state.clone()))
        .unify()
        .or(perps_volume(state.clone()))
        .unify()
        .or(token_panels(state.clone()))
        .unify()
        .or(directory_routes(state.clone(), DirectoryKind::Project, "project"))
        .unify()
        .or(directory_routes(state, DirectoryKind::Staking, "staking"))
        .unify()
        .boxed()
}

fn with_state(
    state: AppState,
) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn client_addr() -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::addr::remote()
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .map(|addr: Option<SocketAddr>, forwarded: Option<String>| {
            // Behind a proxy the first forwarded hop is the real client.
            forwarded
                .as_deref()
                .and_then(|raw| raw.split(',').next())
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
                .or_else(|| addr.map(|a| a.ip().to_string()))
                .unwrap_or_else(|| "unknown".to_string())
        })
}

fn json_response<T: serde::Serialize>(value: &T) -> Response {
    warp::reply::json(value).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    warp::reply::with_status(warp::reply::json(&json!({ "error": message })), status)
        .into_response()
}

fn unauthorized_response() -> Response {
    let mut response = error_response(StatusCode::UNAUTHORIZED, "Invalid credentials");
    if let Ok(challenge) = "Basic realm=\"Admin Panel\"".parse() {
        response
            .headers_mut()
            .insert("WWW-Authenticate", challenge);
    }
    response
}

fn store_error_response(err: &Error) -> Response {
    match err {
        Error::Validation(message) => error_response(StatusCode::BAD_REQUEST, message),
        Error::StorageNotConfigured => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Storage not configured")
        }
        other => {
            error!("directory operation failed: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn health() -> BoxedFilter<(Response,)> {
    warp::path!("health")
        .and(warp::get())
        .map(|| {
            json_response(&json!({
                "status": "ok",
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }))
        })
        .boxed()
}

fn dashboard(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "dashboard")
        .and(warp::get())
        .and(with_state(state))
        .and_then(|state: AppState| async move {
            if let Some(cached) =
                state.cache.get::<DashboardStats>(keys::DASHBOARD_STATS).await
            {
                return Ok::<_, Infallible>(json_response(&cached));
            }
            let stats = state.aggregator.dashboard_stats().await;
            state
                .cache
                .set(keys::DASHBOARD_STATS, &stats, ttl::DASHBOARD_STATS)
                .await;
            Ok(json_response(&stats))
        })
        .boxed()
}

fn hype_price(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "hype-price")
        .and(warp::get())
        .and(with_state(state))
        .and_then(|state: AppState| async move {
            if let Some(cached) = state.cache.get::<HypePrice>(keys::HYPE_PRICE).await {
                return Ok::<_, Infallible>(json_response(&cached));
            }
            let price = state.aggregator.hype_price().await;
            state.cache.set(keys::HYPE_PRICE, &price, ttl::HYPE_PRICE).await;
            Ok(json_response(&price))
        })
        .boxed()
}

fn revenue(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "revenue")
        .and(warp::get())
        .and(warp::query::<RevenueQuery>())
        .and(client_addr())
        .and(with_state(state))
        .and_then(
            |query: RevenueQuery, client: String, state: AppState| async move {
                if !state.rate_limiter.check(&client).await {
                    return Ok::<_, Infallible>(error_response(
                        StatusCode::TOO_MANY_REQUESTS,
                        "Rate limit exceeded",
                    ));
                }

                let raw_view = query.time_view.as_deref().unwrap_or("month");
                let view = match TimeView::parse(raw_view) {
                    Some(view) => view,
                    None => {
                        return Ok(error_response(
                            StatusCode::BAD_REQUEST,
                            "timeView must be 'month' or 'day'",
                        ))
                    }
                };

                let key = keys::revenue(view.as_str());
                if let Some(cached) = state.cache.get::<Vec<RevenueBucket>>(&key).await {
                    return Ok(json_response(&cached));
                }

                let buckets = state.aggregator.revenue_data(view).await;
                if !buckets.is_empty() {
                    state.cache.set(&key, &buckets, ttl::REVENUE_DATA).await;
                }
                Ok(json_response(&buckets))
            },
        )
        .boxed()
}

fn defillama_revenue(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "defillama-revenue")
        .and(warp::get())
        .and(client_addr())
        .and(with_state(state))
        .and_then(|client: String, state: AppState| async move {
            if !state.rate_limiter.check(&client).await {
                return Ok::<_, Infallible>(error_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Rate limit exceeded",
                ));
            }

            if let Some(cached) =
                state.cache.get::<RevenueChart>(keys::DEFILLAMA_REVENUE).await
            {
                return Ok(json_response(&cached));
            }

            let chart = state.aggregator.revenue_chart().await;
            // Synthetic series are regenerated per request, never cached.
            if chart.is_mock_data.is_none() {
                state
                    .cache
                    .set(keys::DEFILLAMA_REVENUE, &chart, ttl::DEFILLAMA_REVENUE)
                    .await;
            }
            Ok(json_response(&chart))
        })
        .boxed()
}

fn revenue_kpis(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "revenue-kpis")
        .and(warp::get())
        .and(with_state(state))
        .and_then(|state: AppState| async move {
            Ok::<_, Infallible>(json_response(&state.aggregator.revenue_kpis().await))
        })
        .boxed()
}

fn perps_volume(state: AppState) -> BoxedFilter<(Response,)> {
    warp::path!("api" / "perps-volume")
        .and(warp::get())
        .and(warp::query::<PerpsQuery>())
        .and(with_state(state))
        .and_then(|query: PerpsQuery, state: AppState| async move {
            if query.kind.as_deref() == Some("volume") {
                let volume = state.aggregator.try_perps_volume().await.ok();
                return Ok::<_, Infallible>(json_response(&json!({ "vol24hUsd": volume })));
            }

            match state.aggregator.perps_pairs().await {
                Ok(pairs) => Ok(json_response(&json!({ "data": pairs }))),
                Err(e) => Ok(json_response(&json!({
                    "data": [],
                    "error": e.to_string(),
                }))),
            }
        })
        .boxed()
}

fn token_panels(state: AppState) -> BoxedFilter<(Response,)> {
    let hot = warp::path!("api" / "tokens" / "hot")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: AppState| async move {
            let response =
                cached_panel(&state, keys::HOT_TOKENS, ttl::HOT_TOKENS, Panel::Hot).await;
            Ok::<_, Infallible>(response)
        });

    let gainers = warp::path!("api" / "tokens" / "gainers")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(|state: AppState| async move {
            let response =
                cached_panel(&state, keys::TOP_GAINERS, ttl::TOP_GAINERS, Panel::Gainers).await;
            Ok::<_, Infallible>(response)
        });

    let fresh = warp::path!("api" / "tokens" / "new")
        .and(warp::get())
        .and(with_state(state))
        .and_then(|state: AppState| async move {
            let response =
                cached_panel(&state, keys::NEW_TOKENS, ttl::NEW_TOKENS, Panel::New).await;
            Ok::<_, Infallible>(response)
        });

    hot.or(gainers).unify().or(fresh).unify().boxed()
}

#[derive(Clone, Copy)]
enum Panel {
    Hot,
    Gainers,
    New,
}

async fn fetch_panel(aggregator: &Aggregator, panel: Panel) -> Vec<TokenInfo> {
    match panel {
        Panel::Hot => aggregator.hot_tokens().await,
        Panel::Gainers => aggregator.top_gainers().await,
        Panel::New => aggregator.new_tokens().await,
    }
}

async fn cached_panel(state: &AppState, key: &str, ttl_secs: u64, panel: Panel) -> Response {
    if let Some(cached) = state.cache.get::<Vec<TokenInfo>>(key).await {
        return json_response(&cached);
    }
    let tokens = fetch_panel(&state.aggregator, panel).await;
    // Empty panels usually mean the upstream hiccuped; not worth pinning.
    if !tokens.is_empty() {
        state.cache.set(key, &tokens, ttl_secs).await;
    }
    json_response(&tokens)
}

/// Routes for one directory collection. The project and staking collections
/// share one handler set parameterized by kind; listing is public, mutations
/// go through the admin gate.
fn directory_routes(
    state: AppState,
    kind: DirectoryKind,
    segment: &'static str,
) -> BoxedFilter<(Response,)> {
    let base = warp::path("api").and(warp::path(segment)).and(warp::path::end());

    let list = base
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(move |state: AppState| async move {
            match state.directory.list(kind).await {
                Ok(items) => Ok::<_, Infallible>(json_response(&items)),
                Err(e) => Ok(store_error_response(&e)),
            }
        });

    let create = base
        .and(warp::post())
        .and(admin_header())
        .and(item_body())
        .and(with_state(state.clone()))
        .and_then(move |header: Option<String>, body: ItemEnvelope, state: AppState| async move {
            mutate(state, kind, header, body, Mutation::Create).await
        });

    let update = base
        .and(warp::put())
        .and(admin_header())
        .and(item_body())
        .and(with_state(state.clone()))
        .and_then(move |header: Option<String>, body: ItemEnvelope, state: AppState| async move {
            mutate(state, kind, header, body, Mutation::Update).await
        });

    let delete = base
        .and(warp::delete())
        .and(admin_header())
        .and(warp::body::content_length_limit(BODY_LIMIT))
        .and(warp::body::json::<DeleteBody>())
        .and(with_state(state))
        .and_then(move |header: Option<String>, body: DeleteBody, state: AppState| async move {
            if let Some(denied) = admin_denied(&state.auth, header.as_deref()) {
                return Ok::<_, Infallible>(denied);
            }
            let id = match body.id {
                Some(id) if !id.is_empty() => id,
                _ => return Ok(error_response(StatusCode::BAD_REQUEST, "Missing id")),
            };
            match state.directory.delete(kind, &id).await {
                Ok(items) => Ok(json_response(&items)),
                Err(e) => Ok(store_error_response(&e)),
            }
        });

    list.or(create).unify().or(update).unify().or(delete).unify().boxed()
}

#[derive(Clone, Copy)]
enum Mutation {
    Create,
    Update,
}

async fn mutate(
    state: AppState,
    kind: DirectoryKind,
    header: Option<String>,
    body: ItemEnvelope,
    mutation: Mutation,
) -> Result<Response, Infallible> {
    if let Some(denied) = admin_denied(&state.auth, header.as_deref()) {
        return Ok(denied);
    }

    let item = match body.project {
        Some(item) => item,
        None => return Ok(error_response(StatusCode::BAD_REQUEST, "Invalid project")),
    };
    let result = match mutation {
        Mutation::Create => state.directory.create(kind, item).await,
        Mutation::Update => state.directory.update(kind, item).await,
    };
    match result {
        Ok(items) => Ok(json_response(&items)),
        Err(e) => Ok(store_error_response(&e)),
    }
}

/// Returns the refusal response when the admin gate does not pass.
fn admin_denied(auth: &AuthConfig, header: Option<&str>) -> Option<Response> {
    match check_admin(auth, header) {
        AdminAuth::Authorized => None,
        AdminAuth::Unauthorized => Some(unauthorized_response()),
        AdminAuth::NotConfigured => Some(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Admin authentication not configured",
        )),
    }
}

fn admin_header() -> impl Filter<Extract = (Option<String>,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization")
}

fn item_body() -> impl Filter<Extract = (ItemEnvelope,), Error = warp::Rejection> + Clone {
    warp::body::content_length_limit(BODY_LIMIT).and(warp::body::json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::directory::DirectoryStore;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    fn test_state(auth: AuthConfig) -> AppState {
        // No KV backend and no live upstream calls in these tests.
        let config = Config::from_env().unwrap();
        AppState {
            aggregator: Arc::new(Aggregator::from_config(&config)),
            cache: Cache::disabled(),
            rate_limiter: Arc::new(RateLimiter::new(None, 1000)),
            directory: DirectoryStore::new(None),
            auth,
        }
    }

    fn no_auth() -> AuthConfig {
        AuthConfig {
            admin_user: None,
            admin_pass: None,
        }
    }

    fn with_auth() -> AuthConfig {
        AuthConfig {
            admin_user: Some("admin".to_string()),
            admin_pass: Some("hunter2".to_string()),
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let routes = routes(test_state(no_auth()));
        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn revenue_rejects_unknown_time_view() {
        let routes = routes(test_state(no_auth()));
        let response = warp::test::request()
            .method("GET")
            .path("/api/revenue?timeView=week")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn directory_reads_need_a_backend() {
        let routes = routes(test_state(no_auth()));
        let response = warp::test::request()
            .method("GET")
            .path("/api/project")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn directory_mutations_without_configured_auth_are_503() {
        let routes = routes(test_state(no_auth()));
        let response = warp::test::request()
            .method("POST")
            .path("/api/staking")
            .json(&json!({"project": {"id": "a", "name": "Alpha"}}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn directory_mutations_challenge_missing_credentials() {
        let routes = routes(test_state(with_auth()));
        let response = warp::test::request()
            .method("POST")
            .path("/api/project")
            .json(&json!({"project": {"id": "a", "name": "Alpha"}}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("www-authenticate"));
    }

    #[tokio::test]
    async fn directory_delete_requires_an_id() {
        let header = format!("Basic {}", STANDARD.encode("admin:hunter2"));
        let routes = routes(test_state(with_auth()));
        let response = warp::test::request()
            .method("DELETE")
            .path("/api/staking")
            .header("authorization", header)
            .json(&json!({}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rate_limited_revenue_returns_429() {
        let state = AppState {
            rate_limiter: Arc::new(RateLimiter::new(None, 0)),
            ..test_state(no_auth())
        };
        let routes = routes(state);
        // A zero limit denies even the first request in the window.
        let response = warp::test::request()
            .method("GET")
            .path("/api/revenue?timeView=week")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn unknown_routes_fall_through() {
        let routes = routes(test_state(no_auth()));
        let response = warp::test::request()
            .method("GET")
            .path("/api/nope")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
