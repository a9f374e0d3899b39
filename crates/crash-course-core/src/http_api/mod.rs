use std::{
    collections::{BTreeMap, HashMap},
    net::SocketAddr,
    sync::Arc,
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

#[cfg(feature = "sqlite")]
use crate::{SqliteStore, SyllabusStore};
use crate::{
    AllocationConfig, CrashCoursePlan, Difficulty, Flashcard, FlashcardError, PlanError,
    PlanMetadata, PlannerConfig, RefreshSummary, Syllabus, SyllabusError, Topic, Upload,
    UploadError, UploadStatus, WeightageConfig,
};

#[derive(Default)]
struct Records {
    uploads: HashMap<Uuid, Upload>,
    flashcards: BTreeMap<i32, Flashcard>,
    latest_plan: Option<CrashCoursePlan>,
}

#[derive(Clone)]
pub struct AppState {
    syllabus: Arc<RwLock<Syllabus>>,
    config: Arc<RwLock<PlannerConfig>>,
    records: Arc<RwLock<Records>>,
    #[cfg(feature = "sqlite")]
    store: Option<Arc<SqliteStore>>,
}

/// A change that a backing store should write through.
enum Change<'a> {
    Syllabus(&'a Syllabus),
    Plan(&'a CrashCoursePlan),
    Upload(&'a Upload),
    Flashcard(&'a Flashcard),
    FlashcardDeleted(i32),
}

impl AppState {
    pub fn new(syllabus: Syllabus) -> Self {
        Self::with_config(syllabus, PlannerConfig::default())
    }

    pub fn with_config(syllabus: Syllabus, config: PlannerConfig) -> Self {
        Self {
            syllabus: Arc::new(RwLock::new(syllabus)),
            config: Arc::new(RwLock::new(config)),
            records: Arc::new(RwLock::new(Records::default())),
            #[cfg(feature = "sqlite")]
            store: None,
        }
    }

    /// Writes every change through to `store` and reloads state from it.
    ///
    /// A syllabus already stored wins over the one this state was built with;
    /// an empty store is seeded with the current syllabus.
    #[cfg(feature = "sqlite")]
    pub fn with_store(mut self, store: SqliteStore) -> crate::persistence::PersistenceResult<Self> {
        match store.load_syllabus()? {
            Some(stored) => {
                info!(topics = stored.topic_count(), "loaded syllabus from store");
                *self.syllabus.write() = stored;
            }
            None => store.save_syllabus(&self.syllabus.read())?,
        }
        {
            let mut records = self.records.write();
            for upload in store.load_uploads()? {
                records.uploads.insert(upload.id, upload);
            }
            for card in store.load_flashcards(None)? {
                records.flashcards.insert(card.id, card);
            }
            records.latest_plan = store.latest_plan()?;
        }
        self.store = Some(Arc::new(store));
        Ok(self)
    }

    fn syllabus(&self) -> Arc<RwLock<Syllabus>> {
        self.syllabus.clone()
    }

    #[cfg(feature = "sqlite")]
    fn persist(&self, change: Change<'_>) -> Result<(), ApiError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let result = match change {
            Change::Syllabus(syllabus) => store.save_syllabus(syllabus),
            Change::Plan(plan) => store.save_plan(plan).map(|_| ()),
            Change::Upload(upload) => store.save_upload(upload),
            Change::Flashcard(card) => store.save_flashcard(card),
            Change::FlashcardDeleted(id) => store.delete_flashcard(id).map(|_| ()),
        };
        result.map_err(|err| ApiError::internal(format!("failed to persist change: {err}")))
    }

    #[cfg(not(feature = "sqlite"))]
    fn persist(&self, _change: Change<'_>) -> Result<(), ApiError> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<polars::prelude::PolarsError> for ApiError {
    fn from(value: polars::prelude::PolarsError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

impl From<SyllabusError> for ApiError {
    fn from(value: SyllabusError) -> Self {
        match value {
            SyllabusError::TopicNotFound(_) => ApiError::NotFound(value.to_string()),
            SyllabusError::Frame(err) => ApiError::Internal(err.to_string()),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl From<PlanError> for ApiError {
    fn from(value: PlanError) -> Self {
        match value {
            PlanError::PrerequisiteCycle(_) => ApiError::Conflict(value.to_string()),
            PlanError::Frame(err) => ApiError::Internal(err.to_string()),
            PlanError::Syllabus(err) => err.into(),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(value: UploadError) -> Self {
        match value {
            UploadError::IllegalTransition { .. } => ApiError::Conflict(value.to_string()),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl From<FlashcardError> for ApiError {
    fn from(value: FlashcardError) -> Self {
        ApiError::Invalid(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        if status.is_server_error() {
            error!(code, %message, "request failed");
        } else {
            warn!(code, %message, "request rejected");
        }
        (
            status,
            Json(ErrorBody {
                error: code,
                message,
            }),
        )
            .into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metadata", get(get_metadata).put(update_metadata))
        .route("/topics", get(list_topics).post(create_topic))
        .route(
            "/topics/:id",
            get(get_topic).put(update_topic).delete(delete_topic),
        )
        .route("/refresh", post(refresh_priorities))
        .route("/generate-schedule", post(generate_schedule))
        .route("/schedule", get(get_schedule))
        .route("/uploads", get(list_uploads).post(create_upload))
        .route("/uploads/:id", get(get_upload))
        .route("/uploads/:id/status", put(update_upload_status))
        .route("/flashcards", get(list_flashcards).post(create_flashcard))
        .route(
            "/flashcards/:id",
            get(get_flashcard).delete(delete_flashcard),
        )
        .route("/flashcards/:id/review", post(review_flashcard))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "crash-course HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_metadata(State(state): State<AppState>) -> Json<PlanMetadata> {
    let syllabus = state.syllabus();
    let metadata = syllabus.read().metadata().clone();
    Json(metadata)
}

async fn update_metadata(
    State(state): State<AppState>,
    Json(metadata): Json<PlanMetadata>,
) -> Result<Json<PlanMetadata>, ApiError> {
    let syllabus = state.syllabus();
    let mut guard = syllabus.write();
    guard.set_metadata(metadata)?;
    state.persist(Change::Syllabus(&guard))?;
    Ok(Json(guard.metadata().clone()))
}

async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<Topic>>, ApiError> {
    let syllabus = state.syllabus();
    let topics = syllabus.read().topics()?;
    Ok(Json(topics))
}

async fn get_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<i32>,
) -> Result<Json<Topic>, ApiError> {
    let syllabus = state.syllabus();
    let result = syllabus.read().find_topic(topic_id)?;
    result
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("topic {topic_id} not found")))
}

async fn create_topic(
    State(state): State<AppState>,
    Json(topic): Json<Topic>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    let syllabus = state.syllabus();
    let mut guard = syllabus.write();
    if guard.find_topic(topic.id)?.is_some() {
        return Err(ApiError::Conflict(format!(
            "topic {} already exists",
            topic.id
        )));
    }
    guard.upsert_topic_record(topic.clone())?;
    state.persist(Change::Syllabus(&guard))?;
    let created = guard
        .find_topic(topic.id)?
        .ok_or_else(|| ApiError::internal("topic not found after creation"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<i32>,
    Json(topic): Json<Topic>,
) -> Result<Json<Topic>, ApiError> {
    if topic.id != topic_id {
        return Err(ApiError::invalid(
            "topic id in payload does not match path parameter",
        ));
    }
    let syllabus = state.syllabus();
    let mut guard = syllabus.write();
    if guard.find_topic(topic_id)?.is_none() {
        return Err(ApiError::not_found(format!("topic {topic_id} not found")));
    }
    guard.upsert_topic_record(topic)?;
    state.persist(Change::Syllabus(&guard))?;
    let updated = guard
        .find_topic(topic_id)?
        .ok_or_else(|| ApiError::internal("topic not found after update"))?;
    Ok(Json(updated))
}

async fn delete_topic(
    State(state): State<AppState>,
    Path(topic_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let syllabus = state.syllabus();
    let mut guard = syllabus.write();
    if !guard.delete_topic(topic_id)? {
        return Err(ApiError::not_found(format!("topic {topic_id} not found")));
    }
    state.persist(Change::Syllabus(&guard))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_priorities(
    State(state): State<AppState>,
) -> Result<Json<RefreshSummary>, ApiError> {
    let weightage = state.config.read().weightage.clone();
    let syllabus = state.syllabus();
    let mut guard = syllabus.write();
    let summary = guard.refresh_with(&weightage)?;
    state.persist(Change::Syllabus(&guard))?;
    Ok(Json(summary))
}

/// Per-request overrides of the server's planner config.
#[derive(Debug, Default, Deserialize)]
struct GeneratePayload {
    #[serde(default)]
    weightage: Option<WeightageConfig>,
    #[serde(default)]
    allocation: Option<AllocationConfig>,
}

async fn generate_schedule(
    State(state): State<AppState>,
    payload: Option<Json<GeneratePayload>>,
) -> Result<Json<CrashCoursePlan>, ApiError> {
    let overrides = payload.map(|Json(p)| p).unwrap_or_default();
    let mut config = state.config.read().clone();
    if let Some(weightage) = overrides.weightage {
        config.weightage = weightage;
    }
    if let Some(allocation) = overrides.allocation {
        config.allocation = allocation;
    }

    let plan = {
        let syllabus = state.syllabus();
        let mut guard = syllabus.write();
        // Priorities may be refreshed even when planning fails afterwards.
        let result = guard.generate_plan(&config);
        state.persist(Change::Syllabus(&guard))?;
        result?
    };
    state.persist(Change::Plan(&plan))?;
    state.records.write().latest_plan = Some(plan.clone());
    Ok(Json(plan))
}

async fn get_schedule(State(state): State<AppState>) -> Result<Json<CrashCoursePlan>, ApiError> {
    state
        .records
        .read()
        .latest_plan
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no schedule has been generated yet"))
}

#[derive(Debug, Deserialize)]
struct NewUpload {
    file_name: String,
    file_reference: String,
    size_bytes: u64,
}

async fn list_uploads(State(state): State<AppState>) -> Json<Vec<Upload>> {
    let mut uploads: Vec<Upload> = state.records.read().uploads.values().cloned().collect();
    uploads.sort_by_key(|upload| upload.created_at);
    Json(uploads)
}

async fn create_upload(
    State(state): State<AppState>,
    Json(payload): Json<NewUpload>,
) -> Result<(StatusCode, Json<Upload>), ApiError> {
    let upload = Upload::new(payload.file_name, payload.file_reference, payload.size_bytes)?;
    state.persist(Change::Upload(&upload))?;
    state.records.write().uploads.insert(upload.id, upload.clone());
    info!(upload_id = %upload.id, file = %upload.file_name, "registered upload");
    Ok((StatusCode::CREATED, Json(upload)))
}

async fn get_upload(
    State(state): State<AppState>,
    Path(upload_id): Path<Uuid>,
) -> Result<Json<Upload>, ApiError> {
    state
        .records
        .read()
        .uploads
        .get(&upload_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("upload {upload_id} not found")))
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: UploadStatus,
    #[serde(default)]
    reason: Option<String>,
}

async fn update_upload_status(
    State(state): State<AppState>,
    Path(upload_id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Upload>, ApiError> {
    let mut records = state.records.write();
    let upload = records
        .uploads
        .get_mut(&upload_id)
        .ok_or_else(|| ApiError::not_found(format!("upload {upload_id} not found")))?;
    let mut updated = upload.clone();
    updated.transition(payload.status, payload.reason)?;
    state.persist(Change::Upload(&updated))?;
    *upload = updated.clone();
    Ok(Json(updated))
}

#[derive(Debug, Default, Deserialize)]
struct FlashcardQuery {
    topic_id: Option<i32>,
    due: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct NewFlashcard {
    #[serde(default)]
    id: Option<i32>,
    topic_id: i32,
    question: String,
    answer: String,
    difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
struct ReviewPayload {
    grade: u8,
    #[serde(default)]
    reviewed_on: Option<NaiveDate>,
}

async fn list_flashcards(
    State(state): State<AppState>,
    Query(query): Query<FlashcardQuery>,
) -> Json<Vec<Flashcard>> {
    let records = state.records.read();
    let cards = records
        .flashcards
        .values()
        .filter(|card| query.topic_id.is_none_or(|id| card.topic_id == id))
        .filter(|card| query.due.is_none_or(|day| card.is_due(day)))
        .cloned()
        .collect();
    Json(cards)
}

async fn create_flashcard(
    State(state): State<AppState>,
    Json(payload): Json<NewFlashcard>,
) -> Result<(StatusCode, Json<Flashcard>), ApiError> {
    let topic_exists = state
        .syllabus()
        .read()
        .find_topic(payload.topic_id)?
        .is_some();
    if !topic_exists {
        return Err(ApiError::not_found(format!(
            "topic {} not found",
            payload.topic_id
        )));
    }

    let mut records = state.records.write();
    let id = match payload.id {
        Some(id) if records.flashcards.contains_key(&id) => {
            return Err(ApiError::Conflict(format!("flashcard {id} already exists")));
        }
        Some(id) => id,
        None => records
            .flashcards
            .keys()
            .next_back()
            .map_or(1, |last| last + 1),
    };
    let card = Flashcard::new(
        id,
        payload.topic_id,
        payload.question,
        payload.answer,
        payload.difficulty,
    )?;
    state.persist(Change::Flashcard(&card))?;
    records.flashcards.insert(card.id, card.clone());
    Ok((StatusCode::CREATED, Json(card)))
}

async fn get_flashcard(
    State(state): State<AppState>,
    Path(card_id): Path<i32>,
) -> Result<Json<Flashcard>, ApiError> {
    state
        .records
        .read()
        .flashcards
        .get(&card_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("flashcard {card_id} not found")))
}

async fn delete_flashcard(
    State(state): State<AppState>,
    Path(card_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let mut records = state.records.write();
    if !records.flashcards.contains_key(&card_id) {
        return Err(ApiError::not_found(format!("flashcard {card_id} not found")));
    }
    state.persist(Change::FlashcardDeleted(card_id))?;
    records.flashcards.remove(&card_id);
    Ok(StatusCode::NO_CONTENT)
}

async fn review_flashcard(
    State(state): State<AppState>,
    Path(card_id): Path<i32>,
    Json(payload): Json<ReviewPayload>,
) -> Result<Json<Flashcard>, ApiError> {
    let today = payload
        .reviewed_on
        .unwrap_or_else(|| Utc::now().date_naive());
    let mut records = state.records.write();
    let card = records
        .flashcards
        .get_mut(&card_id)
        .ok_or_else(|| ApiError::not_found(format!("flashcard {card_id} not found")))?;
    let mut reviewed = card.clone();
    reviewed.record_review(payload.grade, today)?;
    state.persist(Change::Flashcard(&reviewed))?;
    *card = reviewed.clone();
    Ok(Json(reviewed))
}
