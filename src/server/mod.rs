//! Authenticated HTTP front end. One route, `/generate`, behind Basic auth.

mod auth;
mod error;
mod handlers;

pub use auth::{require_basic_auth, Credentials};
pub use error::{ApiError, ErrorBody, ErrorDetail, AUTH_REALM};
pub use handlers::GenerateParams;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use axum::middleware;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::formats::DEFAULT_TITLE;
use crate::generator::Limits;

pub const GENERATE_PATH: &str = "/generate";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Applied when neither flag, env, nor config sets a max range.
pub const DEFAULT_MAX_RANGE: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(name = "chapterlinks-server")]
#[command(about = "Serve chapter link generation over HTTP with Basic auth")]
#[command(
    after_help = "Config file keys (bind, username, password, max_range, title) are read from ./chapterlinks.toml or ~/.config/chapterlinks/config.toml. Flags and env vars override config."
)]
pub struct ServeArgs {
    /// Address to listen on (default 127.0.0.1:8080).
    #[arg(long, env = "CHAPTERLINKS_BIND")]
    pub bind: Option<String>,

    /// Basic auth user.
    #[arg(long, env = "CHAPTERLINKS_USER")]
    pub user: Option<String>,

    /// Basic auth password.
    #[arg(long, env = "CHAPTERLINKS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Reject ranges with more than this many entries (default 10000).
    #[arg(long, env = "MAX_RANGE")]
    pub max_range: Option<u64>,

    /// Default HTML page title.
    #[arg(long)]
    pub title: Option<String>,

    /// Debug logging.
    #[arg(long)]
    pub verbose: bool,
}

/// Fully resolved server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub credentials: Credentials,
    pub max_range: u64,
    pub title: String,
}

impl ServerConfig {
    /// Merge flags/env over config file over defaults. Credentials are mandatory.
    pub fn resolve(args: &ServeArgs, config: Option<&Config>) -> Result<Self> {
        let bind_str = args
            .bind
            .clone()
            .or_else(|| config.and_then(|c| c.bind.clone()))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .with_context(|| format!("invalid bind address '{}'", bind_str))?;

        let user = args
            .user
            .clone()
            .or_else(|| config.and_then(|c| c.username.clone()));
        let password = args
            .password
            .clone()
            .or_else(|| config.and_then(|c| c.password.clone()));
        let credentials = match (user, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Credentials::new(u, p),
            _ => bail!(
                "credentials required: set --user/--password, CHAPTERLINKS_USER/CHAPTERLINKS_PASSWORD, or username/password in config"
            ),
        };

        let max_range = args
            .max_range
            .or_else(|| config.and_then(|c| c.max_range))
            .unwrap_or(DEFAULT_MAX_RANGE);
        let title = args
            .title
            .clone()
            .or_else(|| config.and_then(|c| c.title.clone()))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        Ok(ServerConfig {
            bind,
            credentials,
            max_range,
            title,
        })
    }
}

/// Shared per-process state handed to handlers and the auth layer.
#[derive(Debug)]
pub struct AppState {
    pub credentials: Credentials,
    pub limits: Limits,
    pub title: String,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        AppState {
            credentials: config.credentials.clone(),
            limits: Limits {
                max_range: Some(config.max_range),
            },
            title: config.title.clone(),
        }
    }
}

/// Build the router: `/generate` (GET and POST), Basic auth on every matched route.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            GENERATE_PATH,
            get(handlers::generate_get).post(handlers::generate_post),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}

/// Bind, serve until Ctrl-C, then return.
pub async fn run_server(config: ServerConfig) -> Result<()> {
    let state = Arc::new(AppState::new(&config));
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(
        bind = %actual_addr,
        path = GENERATE_PATH,
        max_range = config.max_range,
        user = config.credentials.username(),
        "listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkRecord;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use tower::ServiceExt;

    const USER: &str = "admin";
    const PASSWORD: &str = "s3cret";

    fn test_router(max_range: u64) -> Router {
        let config = ServerConfig {
            bind: DEFAULT_BIND.parse().unwrap(),
            credentials: Credentials::new(USER, PASSWORD),
            max_range,
            title: "Test Links".to_string(),
        };
        router(Arc::new(AppState::new(&config)))
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    fn get_request(query: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("GET")
            .uri(format!("{}?{}", GENERATE_PATH, query));
        if let Some(a) = auth {
            builder = builder.header(header::AUTHORIZATION, a);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_request(json: serde_json::Value) -> Request<Body> {
        post_raw(&json.to_string())
    }

    fn post_raw(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(GENERATE_PATH)
            .header(header::AUTHORIZATION, basic(USER, PASSWORD))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const QUERY: &str = "url=example.com%2Fc%2F%7Bn%7D&start=1&end=5&step=2";

    #[tokio::test]
    async fn missing_credentials_returns_401() {
        let response = test_router(100)
            .oneshot(get_request(QUERY, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn wrong_password_returns_401() {
        let auth = basic(USER, "nope");
        let response = test_router(100)
            .oneshot(get_request(QUERY, Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn get_defaults_to_html() {
        let auth = basic(USER, PASSWORD);
        let response = test_router(100)
            .oneshot(get_request(QUERY, Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert!(!response.headers().contains_key(header::CONTENT_DISPOSITION));
        let body = body_string(response).await;
        assert!(body.contains("<title>Test Links</title>"));
        assert!(body.contains(r#"<a href="http://example.com/c/3">Capítulo 3</a>"#));
        assert_eq!(body.matches("<li>").count(), 3);
    }

    #[tokio::test]
    async fn get_json_format() {
        let auth = basic(USER, PASSWORD);
        let query = format!("{}&format=json&pad=2", QUERY);
        let response = test_router(100)
            .oneshot(get_request(&query, Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let records: Vec<LinkRecord> = serde_json::from_str(&body_string(response).await).unwrap();
        let ns: Vec<i64> = records.iter().map(|r| r.n).collect();
        assert_eq!(ns, vec![1, 3, 5]);
        assert_eq!(records[0].url, "http://example.com/c/01");
    }

    #[tokio::test]
    async fn post_csv_download() {
        let response = test_router(100)
            .oneshot(post_request(serde_json::json!({
                "url": "https://x.io/{n:03d}",
                "start": 1,
                "end": 2,
                "format": "csv",
                "label_template": "Ch {n}",
                "download": true
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"links.csv\""
        );
        assert_eq!(
            body_string(response).await,
            "n,url,label\r\n1,https://x.io/001,Ch 1\r\n2,https://x.io/002,Ch 2\r\n"
        );
    }

    #[tokio::test]
    async fn unsafe_template_returns_400() {
        let response = test_router(100)
            .oneshot(post_request(serde_json::json!({
                "url": "http://x/{n.__class__}",
                "start": 1,
                "end": 2
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "UNSAFE_TEMPLATE");
    }

    #[tokio::test]
    async fn range_over_limit_returns_400() {
        let auth = basic(USER, PASSWORD);
        let response = test_router(2)
            .oneshot(get_request(QUERY, Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "RANGE_TOO_LARGE");
    }

    #[tokio::test]
    async fn unknown_format_returns_400() {
        let auth = basic(USER, PASSWORD);
        let query = format!("{}&format=pdf", QUERY);
        let response = test_router(100)
            .oneshot(get_request(&query, Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "UNKNOWN_FORMAT");
    }

    #[tokio::test]
    async fn missing_parameters_returns_400() {
        let auth = basic(USER, PASSWORD);
        let response = test_router(100)
            .oneshot(get_request("start=1", Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn malformed_json_body_returns_400() {
        let response = test_router(100)
            .oneshot(post_raw(r#"{"url": "x/{n}", "start": 1,"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn wrong_type_in_json_body_returns_400() {
        let response = test_router(100)
            .oneshot(post_request(serde_json::json!({
                "url": "x/{n}",
                "start": "abc",
                "end": 3
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn non_numeric_query_parameter_returns_400() {
        let auth = basic(USER, PASSWORD);
        let response = test_router(100)
            .oneshot(get_request("url=x%2F%7Bn%7D&start=abc&end=3", Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn unknown_path_returns_404() {
        let request = Request::builder()
            .uri("/other")
            .body(Body::empty())
            .unwrap();
        let response = test_router(100).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let mut full = vec!["chapterlinks-server"];
        full.extend_from_slice(argv);
        ServeArgs::try_parse_from(full).unwrap()
    }

    #[test]
    fn resolve_requires_credentials() {
        let args = ServeArgs {
            bind: None,
            user: None,
            password: None,
            max_range: None,
            title: None,
            verbose: false,
        };
        let err = ServerConfig::resolve(&args, None).unwrap_err();
        assert!(err.to_string().contains("credentials required"));
    }

    #[test]
    fn resolve_uses_config_and_defaults() {
        let args = ServeArgs {
            bind: None,
            user: None,
            password: None,
            max_range: None,
            title: None,
            verbose: false,
        };
        let config = Config {
            username: Some("u".to_string()),
            password: Some("p".to_string()),
            ..Config::default()
        };
        let resolved = ServerConfig::resolve(&args, Some(&config)).unwrap();
        assert_eq!(resolved.bind, DEFAULT_BIND.parse::<SocketAddr>().unwrap());
        assert_eq!(resolved.credentials, Credentials::new("u", "p"));
        assert_eq!(resolved.max_range, DEFAULT_MAX_RANGE);
        assert_eq!(resolved.title, DEFAULT_TITLE);
    }

    #[test]
    fn resolve_flags_override_config() {
        let args = serve_args(&[
            "--bind", "0.0.0.0:9000", "--user", "flag", "--password", "pw", "--max-range", "7",
        ]);
        let config = Config {
            bind: Some("127.0.0.1:1".to_string()),
            username: Some("cfg".to_string()),
            password: Some("cfgpw".to_string()),
            max_range: Some(99),
            ..Config::default()
        };
        let resolved = ServerConfig::resolve(&args, Some(&config)).unwrap();
        assert_eq!(resolved.bind.port(), 9000);
        assert_eq!(resolved.credentials.username(), "flag");
        assert_eq!(resolved.max_range, 7);
    }

    #[test]
    fn resolve_rejects_bad_bind() {
        let args = serve_args(&["--bind", "not-an-addr", "--user", "u", "--password", "p"]);
        assert!(ServerConfig::resolve(&args, None).is_err());
    }
}
