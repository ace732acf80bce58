//! HTTP surface: the session-bound pet name and the shared registry.

use crate::config::Settings;
use crate::model::PetRecord;
use crate::registry::PetStore;
use crate::session::{Session, SessionError, SessionService};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

pub(crate) const NAME_COOKIE: &str = "tamagochi-name";
pub(crate) const COOKIE_MAX_AGE_DAYS: i64 = 30;

#[derive(Clone)]
pub(crate) struct AppState {
    sessions: SessionService,
    cookie_secure: bool,
}

impl AppState {
    pub(crate) fn new(store: Arc<dyn PetStore>, settings: &Settings) -> Self {
        Self {
            sessions: SessionService::new(store, settings.forget_on_clear),
            cookie_secure: settings.cookie_secure,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Storage(&'static str),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Storage(source) => {
                log::error!("could not save the tamagochi name: {source}");
                ApiError::Storage("Could not save the tamagochi to the data file.")
            }
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct NameBody {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListBody {
    tamagotchis: Vec<PetRecord>,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/pet-name",
            get(get_name).post(set_name).delete(clear_name),
        )
        .route("/api/tamagotchis", get(list_pets))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

fn session_from(jar: &CookieJar) -> Session {
    Session {
        name: jar
            .get(NAME_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty()),
    }
}

fn name_cookie(value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((NAME_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(max_age)
        .build()
}

async fn get_name(State(state): State<AppState>, jar: CookieJar) -> Json<NameBody> {
    let session = session_from(&jar);
    Json(NameBody {
        name: state.sessions.get(&session).map(str::to_string),
    })
}

async fn set_name(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, Json<NameBody>), ApiError> {
    let parsed: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Bad request: could not read the name.".to_string()))?;
    let raw = parsed
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let sessions = state.sessions.clone();
    let session = tokio::task::spawn_blocking(move || {
        let mut session = Session::default();
        sessions.set(&mut session, &raw).map(|_| session)
    })
    .await
    .map_err(|e| {
        log::error!("registry task failed: {e}");
        ApiError::Storage("Could not save the tamagochi to the data file.")
    })??;

    let name = session.name.unwrap_or_default();
    let jar = jar.add(name_cookie(
        name.clone(),
        time::Duration::days(COOKIE_MAX_AGE_DAYS),
        state.cookie_secure,
    ));
    Ok((jar, Json(NameBody { name: Some(name) })))
}

async fn clear_name(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<NameBody>), ApiError> {
    let mut session = session_from(&jar);
    let sessions = state.sessions.clone();
    let cleared = tokio::task::spawn_blocking(move || sessions.clear(&mut session)).await;
    match cleared {
        Ok(Ok(previous)) => {
            if let Some(name) = previous {
                log::info!("cleared session for {name:?}");
            }
        }
        Ok(Err(e)) => {
            log::error!("could not clear the tamagochi name: {e}");
            return Err(ApiError::Storage("Could not delete the tamagochi name."));
        }
        Err(e) => {
            log::error!("registry task failed: {e}");
            return Err(ApiError::Storage("Could not delete the tamagochi name."));
        }
    }
    let jar = jar.add(name_cookie(
        String::new(),
        time::Duration::ZERO,
        state.cookie_secure,
    ));
    Ok((jar, Json(NameBody { name: None })))
}

async fn list_pets(State(state): State<AppState>) -> Result<Json<ListBody>, ApiError> {
    let store = state.sessions.store().clone();
    let listed = tokio::task::spawn_blocking(move || store.list()).await;
    match listed {
        Ok(Ok(tamagotchis)) => Ok(Json(ListBody { tamagotchis })),
        Ok(Err(e)) => {
            log::error!("could not read the tamagochi list: {e}");
            Err(ApiError::Storage("Could not read the tamagochi companions."))
        }
        Err(e) => {
            log::error!("registry task failed: {e}");
            Err(ApiError::Storage("Could not read the tamagochi companions."))
        }
    }
}

pub(crate) async fn serve(settings: Settings, store: Arc<dyn PetStore>) -> Result<()> {
    let backend = store.backend();
    let app = router(AppState::new(store, &settings));
    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("could not bind {}", settings.bind_addr))?;
    log::info!(
        "pixelgotchi listening on http://{} ({backend} registry)",
        settings.bind_addr
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("could not listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FileStore, MemoryStore, StoreError};
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    struct FailingStore;

    impl PetStore for FailingStore {
        fn backend(&self) -> &'static str {
            "failing"
        }
        fn load(&self) -> Result<Option<Vec<PetRecord>>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn commit(&self, _: &[PetRecord]) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    fn app_with(store: Arc<dyn PetStore>, forget_on_clear: bool) -> Router {
        let settings = Settings {
            forget_on_clear,
            ..Settings::default()
        };
        router(AppState::new(store, &settings))
    }

    fn post_name(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/pet-name")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(resp: &Response) -> String {
        resp.headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn post_sets_cookie_and_registers() {
        let store: Arc<dyn PetStore> = Arc::new(MemoryStore::new());
        let app = app_with(store.clone(), false);

        let resp = app.oneshot(post_name(r#"{ "name": "  Bogi  " }"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = set_cookie(&resp);
        assert!(cookie.starts_with("tamagochi-name=Bogi"), "{cookie}");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(!cookie.contains("Secure"));
        assert_eq!(json_body(resp).await, json!({ "name": "Bogi" }));

        assert!(store.list().unwrap().iter().any(|r| r.name == "Bogi"));
    }

    #[tokio::test]
    async fn invalid_bodies_are_rejected_without_side_effects() {
        let store: Arc<dyn PetStore> = Arc::new(MemoryStore::new());
        let before = store.list().unwrap();
        let long = format!(r#"{{ "name": "{}" }}"#, "x".repeat(25));
        for body in ["not json", r#"{ "name": "   " }"#, r#"{ "name": 12 }"#, "{}", long.as_str()] {
            let resp = app_with(store.clone(), false)
                .oneshot(post_name(body))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
            assert!(resp.headers().get(header::SET_COOKIE).is_none());
            let err = json_body(resp).await;
            assert!(err["error"].as_str().is_some_and(|m| !m.is_empty()));
        }
        assert_eq!(store.list().unwrap(), before);
    }

    #[tokio::test]
    async fn storage_failure_is_500() {
        let resp = app_with(Arc::new(FailingStore), false)
            .oneshot(post_name(r#"{ "name": "Nova" }"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());

        let resp = app_with(Arc::new(FailingStore), false)
            .oneshot(Request::get("/api/tamagotchis").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn failed_forget_keeps_the_cookie() {
        let req = Request::delete("/api/pet-name")
            .header(header::COOKIE, "tamagochi-name=Mochi")
            .body(Body::empty())
            .unwrap();
        let resp = app_with(Arc::new(FailingStore), true).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        let err = json_body(resp).await;
        assert_eq!(err["error"], "Could not delete the tamagochi name.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_posts_all_land_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tamagotchis.json");
        let store: Arc<dyn PetStore> = Arc::new(FileStore::new(path));
        let app = app_with(store.clone(), false);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let app = app.clone();
                tokio::spawn(async move {
                    let body = format!(r#"{{ "name": "Racer {i}" }}"#);
                    app.oneshot(post_name(&body)).await.unwrap().status()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), StatusCode::OK);
        }

        let listed = store.list().unwrap();
        for i in 0..16 {
            let name = format!("Racer {i}");
            assert!(listed.iter().any(|r| r.name == name), "{name} was lost");
        }
    }

    #[tokio::test]
    async fn get_reads_cookie() {
        let app = app_with(Arc::new(MemoryStore::new()), false);
        let resp = app
            .clone()
            .oneshot(Request::get("/api/pet-name").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(json_body(resp).await, json!({ "name": null }));

        let req = Request::get("/api/pet-name")
            .header(header::COOKIE, "other=1; tamagochi-name=Mochi")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(json_body(resp).await, json!({ "name": "Mochi" }));
    }

    #[tokio::test]
    async fn delete_expires_cookie_and_optionally_forgets() {
        let store: Arc<dyn PetStore> = Arc::new(MemoryStore::new());
        store.upsert("Mochi").unwrap();

        let delete = || {
            Request::delete("/api/pet-name")
                .header(header::COOKIE, "tamagochi-name=Mochi")
                .body(Body::empty())
                .unwrap()
        };

        let resp = app_with(store.clone(), false).oneshot(delete()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(set_cookie(&resp).contains("Max-Age=0"));
        assert_eq!(json_body(resp).await, json!({ "name": null }));
        assert!(store.list().unwrap().iter().any(|r| r.name == "Mochi"));

        app_with(store.clone(), true).oneshot(delete()).await.unwrap();
        assert!(store.list().unwrap().iter().all(|r| r.name != "Mochi"));
    }

    #[tokio::test]
    async fn list_returns_seed_wrapped() {
        let resp = app_with(Arc::new(MemoryStore::new()), false)
            .oneshot(Request::get("/api/tamagotchis").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        let list = body["tamagotchis"].as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0]["name"], "Render Róka");
        assert_eq!(list[0]["createdAt"], "2023-11-03T18:15:00.000Z");
    }
}
