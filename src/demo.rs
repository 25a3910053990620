//! Demo endpoints served by the binary.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;

use http_kernel::hooks::builtin::AccessLog;
use http_kernel::hooks::{EndpointHooks, PreHook};
use http_kernel::http::{BoxError, Cookie, HttpError, RequestCookies, SameSite};
use http_kernel::observability::logging;
use http_kernel::routing::RouteError;
use http_kernel::{App, Endpoint, ExecutionContext, Handler};

type NoteStore = Arc<Mutex<HashMap<u64, Note>>>;

pub fn register(app: &mut App) -> Result<(), RouteError> {
    let store = NoteStore::default();
    let reader = Arc::clone(&store);

    app.endpoint(Health)?
        .route_factory(Method::GET, "/notes/(?<id>[0-9]+)", move || GetNote {
            store: Arc::clone(&reader),
        })?
        .route(Method::POST, "/notes", CreateNote { store })?
        .route(Method::POST, "/session", Session)?;
    Ok(())
}

/// Liveness check; kept out of the access log.
struct Health;

#[async_trait]
impl Handler for Health {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        ctx.with_response(|res| res.json(&json!({ "status": "ok" })).map(|_| ()))?;
        Ok(())
    }

    fn hooks(&self) -> EndpointHooks {
        EndpointHooks::new().exclude::<AccessLog>()
    }
}

impl Endpoint for Health {
    fn method(&self) -> Method {
        Method::GET
    }

    fn pattern(&self) -> &str {
        "/health"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    title: String,
    body: String,
}

struct GetNote {
    store: NoteStore,
}

#[async_trait]
impl Handler for GetNote {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let id: u64 = ctx
            .path_var("id")
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| HttpError::bad_request("Invalid note id"))?;

        let note = self
            .store
            .lock()
            .map_err(|_| HttpError::internal())?
            .get(&id)
            .cloned();
        match note {
            Some(note) => {
                ctx.with_response(|res| res.json(&note).map(|_| ()))?;
                Ok(())
            }
            None => Err(HttpError::not_found(format!("Note {id} not found"))
                .with_data(json!({ "id": id }))
                .into()),
        }
    }
}

/// Rejects requests without a JSON content type.
struct RequireJson;

#[async_trait]
impl PreHook for RequireJson {
    async fn before(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let is_json = ctx
            .request()
            .header("content-type")
            .is_some_and(|v| v.starts_with("application/json"));
        if !is_json {
            return Err(HttpError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Expected application/json",
            )
            .into());
        }
        Ok(())
    }
}

struct CreateNote {
    store: NoteStore,
}

#[async_trait]
impl Handler for CreateNote {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let note: Note = ctx.request().json()?;
        if note.title.trim().is_empty() {
            return Err(HttpError::bad_request("Title must not be empty")
                .with_data(json!({ "field": "title" }))
                .into());
        }

        let id = {
            let mut store = self.store.lock().map_err(|_| HttpError::internal())?;
            let id = store.len() as u64 + 1;
            store.insert(id, note.clone());
            id
        };
        if let Some(fields) = logging::request_fields() {
            tracing::info!(request_id = %fields.request_id, note_id = id, title = %note.title, "Note created");
        }

        ctx.with_response(|res| {
            res.set_status(StatusCode::CREATED);
            res.json(&json!({ "id": id, "title": note.title })).map(|_| ())
        })?;
        Ok(())
    }

    fn hooks(&self) -> EndpointHooks {
        EndpointHooks::new().pre(RequireJson)
    }
}

/// Issues a session cookie and echoes any cookie already present.
struct Session;

#[async_trait]
impl Handler for Session {
    async fn execute(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let previous = ctx
            .get::<RequestCookies>()
            .and_then(|cookies| cookies.get("session").map(str::to_string));
        let session = Cookie::new("session", uuid::Uuid::new_v4().simple().to_string())
            .http_only(true)
            .same_site(SameSite::Lax)
            .path("/");

        ctx.with_response(|res| {
            res.add_cookie(session);
            res.json(&json!({ "previous": previous })).map(|_| ())
        })?;
        Ok(())
    }
}
