//! Roundtable HTTP service.
//!
//! Exposes discussion sessions over HTTP so a browser front end can record
//! audio and play back the personas.
//!
//! # Endpoints
//!
//! - GET /                    - Liveness message
//! - POST /start_discussion   - Start a session from an `audio_file` or `topic` field
//! - POST /chat/{session_id}  - Submit a turn as `audio_file` or `text`
//! - POST /end/{session_id}   - Conclude a session and fetch the report

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use roundtable_core::{
    DiscussionError, DiscussionOrchestrator, PerformanceReport, Session, Transcriber, TurnOutcome,
    Utterance,
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Sessions idle longer than this are dropped by the sweeper.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_active: Instant,
}

/// Sessions keyed by id. Each session has its own lock so one slow
/// discussion never blocks another.
pub struct AppState {
    orchestrator: Arc<DiscussionOrchestrator>,
    transcriber: Arc<dyn Transcriber>,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<DiscussionOrchestrator>, transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            orchestrator,
            transcriber,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Drop sessions untouched for longer than `max_idle`. Returns how many
    /// were removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_active.elapsed() <= max_idle);
        before - sessions.len()
    }

    async fn insert(&self, session: Session) {
        self.sessions.lock().await.insert(
            session.id(),
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_active: Instant::now(),
            },
        );
    }

    async fn remove(&self, id: &Uuid) {
        self.sessions.lock().await.remove(id);
    }

    /// Look up a session and mark it active.
    async fn session(&self, id: &str) -> Result<(Uuid, Arc<Mutex<Session>>), ApiError> {
        let id = Uuid::parse_str(id).map_err(|_| ApiError::session_not_found())?;
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get_mut(&id).ok_or_else(ApiError::session_not_found)?;
        entry.last_active = Instant::now();
        Ok((id, Arc::clone(&entry.session)))
    }
}

pub type SharedState = Arc<AppState>;

/// Error body returned by every endpoint: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn session_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Session not found")
    }
}

impl From<DiscussionError> for ApiError {
    fn from(err: DiscussionError) -> Self {
        let status = match &err {
            DiscussionError::NoTopicProvided | DiscussionError::SessionEnded => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {err}");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
struct StartResponse {
    session_id: Uuid,
    topic: String,
    text: String,
    audio_b64: Option<String>,
    speaker: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    user_text: String,
    text: String,
    audio_b64: Option<String>,
    speaker: String,
    ended: bool,
    /// Present when a termination phrase ended the session and the human spoke.
    report: Option<PerformanceReport>,
}

#[derive(Debug, Serialize)]
struct EndResponse {
    text: String,
    audio_b64: Option<String>,
    speaker: String,
    report: Option<PerformanceReport>,
}

/// What the client sent for a turn.
enum TurnInput {
    Audio { bytes: Vec<u8>, file_name: String },
    Text(String),
}

/// Build the router for the discussion endpoints.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/start_discussion", post(start_handler))
        .route("/chat/{session_id}", post(chat_handler))
        .route("/end/{session_id}", post(end_handler))
        .with_state(state)
}

/// Serve until Ctrl-C, sweeping sessions idle longer than `idle_timeout`.
pub async fn serve(
    addr: SocketAddr,
    state: SharedState,
    idle_timeout: Duration,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Discussion server listening on http://{}", listener.local_addr()?);

    let sweeper = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(
            idle_timeout.clamp(Duration::from_secs(1), Duration::from_secs(60)),
        );
        loop {
            ticker.tick().await;
            let evicted = sweeper.evict_idle(idle_timeout).await;
            if evicted > 0 {
                info!(evicted, "Dropped idle discussion sessions");
            }
        }
    });

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Discussion server shutting down gracefully");
        })
        .await
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "Roundtable discussion backend is running." }))
}

async fn start_handler(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<StartResponse>, ApiError> {
    let topic = resolve_text(&state, read_input(multipart, &["audio_file", "topic"]).await?).await?;
    let (session, opening) = state.orchestrator.open(topic).await?;

    let session_id = session.id();
    let topic = session.topic().to_string();
    state.insert(session).await;

    Ok(Json(StartResponse {
        session_id,
        topic,
        audio_b64: encode_audio(&opening),
        text: opening.text,
        speaker: opening.speaker,
    }))
}

async fn chat_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ChatResponse>, ApiError> {
    let (id, session) = state.session(&session_id).await?;
    let user_text = resolve_text(&state, read_input(multipart, &["audio_file", "text"]).await?).await?;

    let mut session = session.lock().await;
    let outcome = state
        .orchestrator
        .advance(&mut session, user_text.clone())
        .await?;

    let (reply, ended, report) = match outcome {
        TurnOutcome::Continue { reply, .. } => (reply, false, None),
        TurnOutcome::Terminated(closing) => {
            state.remove(&id).await;
            (closing.summary, true, closing.report)
        }
    };

    Ok(Json(ChatResponse {
        user_text: user_text.unwrap_or_default(),
        audio_b64: encode_audio(&reply),
        text: reply.text,
        speaker: reply.speaker,
        ended,
        report,
    }))
}

async fn end_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<Json<EndResponse>, ApiError> {
    let (id, session) = state.session(&session_id).await?;

    let mut session = session.lock().await;
    let closing = state.orchestrator.conclude(&mut session).await?;
    state.remove(&id).await;

    Ok(Json(EndResponse {
        audio_b64: encode_audio(&closing.summary),
        text: closing.summary.text,
        speaker: closing.summary.speaker,
        report: closing.report,
    }))
}

/// First recognized field wins; other fields are ignored.
async fn read_input(mut multipart: Multipart, accepted: &[&str]) -> Result<Option<TurnInput>, ApiError> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid upload: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        if !accepted.contains(&name.as_str()) {
            continue;
        }

        if name == "audio_file" {
            let file_name = field.file_name().unwrap_or("audio.wav").to_string();
            let bytes = field.bytes().await.map_err(bad_upload)?;
            return Ok(Some(TurnInput::Audio {
                bytes: bytes.to_vec(),
                file_name,
            }));
        }

        let text = field.text().await.map_err(bad_upload)?;
        return Ok(Some(TurnInput::Text(text)));
    }

    Ok(None)
}

/// Turn the upload into text, transcribing audio when needed. Blank input
/// becomes `None`.
async fn resolve_text(state: &AppState, input: Option<TurnInput>) -> Result<Option<String>, ApiError> {
    let text = match input {
        None => return Ok(None),
        Some(TurnInput::Text(text)) => text,
        Some(TurnInput::Audio { bytes, file_name }) => {
            state.transcriber.transcribe(bytes, &file_name).await?
        }
    };

    let text = text.trim().to_string();
    Ok((!text.is_empty()).then_some(text))
}

fn encode_audio(utterance: &Utterance) -> Option<String> {
    utterance.audio.as_ref().map(|audio| BASE64.encode(audio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use roundtable_core::{ContextLine, LanguageResponder, SilentRenderer, default_config};
    use tower::ServiceExt;

    struct Plain;

    #[async_trait]
    impl LanguageResponder for Plain {
        async fn respond(&self, _: &[ContextLine], _: &str) -> Result<String, DiscussionError> {
            Ok("Let's keep going.".to_string())
        }
    }

    struct NoTranscription;

    #[async_trait]
    impl Transcriber for NoTranscription {
        async fn transcribe(&self, _: Vec<u8>, _: &str) -> Result<String, DiscussionError> {
            Err(DiscussionError::TranscriptionFailed("unused".to_string()))
        }
    }

    fn state() -> SharedState {
        let orchestrator =
            DiscussionOrchestrator::new(&default_config(), Arc::new(Plain), Arc::new(SilentRenderer))
                .unwrap();
        Arc::new(AppState::new(Arc::new(orchestrator), Arc::new(NoTranscription)))
    }

    #[tokio::test]
    async fn test_failed_end_keeps_session() {
        let state = state();
        let (mut session, _) = state
            .orchestrator
            .open(Some("Remote work".to_string()))
            .await
            .unwrap();
        state.orchestrator.conclude(&mut session).await.unwrap();
        let id = session.id();
        state.insert(session).await;

        let req = Request::builder()
            .method("POST")
            .uri(format!("/end/{id}"))
            .body(Body::empty())
            .unwrap();
        let resp = ServiceExt::<Request<Body>>::oneshot(router(state.clone()), req)
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_session_lookup_rejects_bad_ids() {
        let state = state();
        assert_eq!(
            state.session("not-a-uuid").await.unwrap_err().status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            state.session(&Uuid::new_v4().to_string()).await.unwrap_err().status,
            StatusCode::NOT_FOUND
        );
    }
}
