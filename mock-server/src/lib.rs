use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_CLIENT_ID: &str = "test-client";
pub const DEFAULT_CLIENT_SECRET: &str = "test-secret";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

/// Body accepted by create and update. Absent fields are left unchanged on
/// update; unknown fields are merged into the entry's attributes.
#[derive(Debug, Default, Deserialize)]
pub struct EntryInput {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Photo {
    pub id: Uuid,
    pub format: String,
    pub size: usize,
    pub description: String,
}

/// Client id and secret the server accepts as HTTP Basic credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }

    /// Read `MOCK_CLIENT_ID` / `MOCK_CLIENT_SECRET`, falling back to defaults.
    pub fn from_env() -> Self {
        let id = std::env::var("MOCK_CLIENT_ID").unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string());
        let secret = std::env::var("MOCK_CLIENT_SECRET").unwrap_or_else(|_| DEFAULT_CLIENT_SECRET.to_string());
        Self::new(&id, &secret)
    }

    pub fn header_value(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_CLIENT_ID, DEFAULT_CLIENT_SECRET)
    }
}

#[derive(Clone)]
pub struct AppState {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
    photos: Arc<RwLock<HashMap<Uuid, Photo>>>,
    authorization: Arc<str>,
}

pub fn app(credentials: Credentials) -> Router {
    let state = AppState {
        entries: Arc::new(RwLock::new(HashMap::new())),
        photos: Arc::new(RwLock::new(HashMap::new())),
        authorization: credentials.header_value().into(),
    };
    Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route("/entries/{id}", get(get_entry).put(update_entry).delete(delete_entry))
        .route("/photos", post(upload_photo))
        .route("/photos/{id}", get(get_photo))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_credentials))
        .with_state(state)
}

pub async fn run(listener: TcpListener, credentials: Credentials) -> Result<(), std::io::Error> {
    axum::serve(listener, app(credentials)).await
}

async fn require_credentials(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, StatusCode> {
    let presented = request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if presented == Some(&*state.authorization) {
        return Ok(next.run(request).await);
    }
    warn!(method = %request.method(), uri = %request.uri(), "rejected request with bad credentials");
    Err(StatusCode::UNAUTHORIZED)
}

async fn list_entries(State(state): State<AppState>) -> Json<Vec<Entry>> {
    let entries = state.entries.read().await;
    Json(entries.values().cloned().collect())
}

async fn create_entry(State(state): State<AppState>, Json(input): Json<EntryInput>) -> (StatusCode, Json<Entry>) {
    let entry = Entry {
        id: Uuid::new_v4(),
        title: input.title,
        content: input.content,
        attributes: without_id(input.attributes),
    };
    info!(id = %entry.id, "entry created");
    state.entries.write().await.insert(entry.id, entry.clone());
    (StatusCode::CREATED, Json(entry))
}

async fn get_entry(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Entry>, StatusCode> {
    let entries = state.entries.read().await;
    entries.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<EntryInput>,
) -> Result<Json<Entry>, StatusCode> {
    let mut entries = state.entries.write().await;
    let entry = entries.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(title) = input.title {
        entry.title = Some(title);
    }
    if let Some(content) = input.content {
        entry.content = Some(content);
    }
    entry.attributes.extend(without_id(input.attributes));
    Ok(Json(entry.clone()))
}

async fn delete_entry(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, StatusCode> {
    let mut entries = state.entries.write().await;
    entries.remove(&id).map(|_| StatusCode::NO_CONTENT).ok_or(StatusCode::NOT_FOUND)
}

async fn upload_photo(State(state): State<AppState>, mut multipart: Multipart) -> Result<(StatusCode, Json<Photo>), StatusCode> {
    let mut image: Option<(String, usize)> = None;
    let mut description = String::new();

    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let format = field
                    .content_type()
                    .and_then(|ct| ct.strip_prefix("image/"))
                    .map(str::to_string)
                    .ok_or(StatusCode::BAD_REQUEST)?;
                let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                image = Some((format, data.len()));
            }
            Some("desc") => {
                description = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            }
            _ => {}
        }
    }

    let (format, size) = image.ok_or(StatusCode::BAD_REQUEST)?;
    let photo = Photo {
        id: Uuid::new_v4(),
        format,
        size,
        description,
    };
    info!(id = %photo.id, size = photo.size, "photo uploaded");
    state.photos.write().await.insert(photo.id, photo.clone());
    Ok((StatusCode::CREATED, Json(photo)))
}

async fn get_photo(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Photo>, StatusCode> {
    let photos = state.photos.read().await;
    photos.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// The server owns ids; a client-supplied one is ignored.
fn without_id(mut attributes: serde_json::Map<String, serde_json::Value>) -> serde_json::Map<String, serde_json::Value> {
    attributes.remove("id");
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_attributes_inline() {
        let mut attributes = serde_json::Map::new();
        attributes.insert("rating".to_string(), serde_json::json!(4));
        let entry = Entry {
            id: Uuid::nil(),
            title: Some("Test".to_string()),
            content: None,
            attributes,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["title"], "Test");
        assert_eq!(json["rating"], 4);
        assert!(json.get("content").is_none());
    }

    #[test]
    fn entry_input_all_fields_optional() {
        let input: EntryInput = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.title.is_none());
        assert!(input.content.is_none());
        assert!(input.attributes.is_empty());
    }

    #[test]
    fn entry_input_collects_unknown_fields() {
        let input: EntryInput = serde_json::from_str(r#"{"title":"t","mood":"happy"}"#).unwrap();
        assert_eq!(input.title.as_deref(), Some("t"));
        assert_eq!(input.attributes["mood"], "happy");
    }

    #[test]
    fn client_supplied_id_is_dropped() {
        let input: EntryInput = serde_json::from_str(r#"{"id":"abc","mood":"ok"}"#).unwrap();
        let attributes = without_id(input.attributes);
        assert!(attributes.get("id").is_none());
        assert_eq!(attributes["mood"], "ok");
    }

    #[test]
    fn default_credentials_header() {
        // base64("test-client:test-secret")
        assert_eq!(Credentials::default().header_value(), "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=");
    }
}
