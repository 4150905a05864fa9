//! Job matching and career chat endpoints.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::text::{extract_text, DocumentKind};
use crate::matching::advisor;
use crate::matching::engine::MatchResult;
use crate::matching::prompts::CAREER_CHAT_SYSTEM;
use crate::metering::plans::{Feature, PlanId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CallerQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub plan: PlanId,
}

#[derive(Debug, Serialize)]
pub struct MatchJobResponse {
    #[serde(flatten)]
    pub result: MatchResult,
}

struct MatchRequest {
    filename: String,
    resume_bytes: Vec<u8>,
    job_description: String,
}

async fn read_match_fields(multipart: &mut Multipart) -> Result<MatchRequest, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| {
                        AppError::Validation("File field is missing a filename".to_string())
                    })?
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?
                    .to_vec();
                upload = Some((filename, bytes));
            }
            Some("job_description") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read job description: {e}"))
                })?;
                job_description = Some(text);
            }
            _ => {}
        }
    }

    let (filename, resume_bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing multipart field 'file'".to_string()))?;
    let job_description = job_description.ok_or_else(|| {
        AppError::Validation("Missing multipart field 'job_description'".to_string())
    })?;
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Job description must not be empty".to_string(),
        ));
    }

    Ok(MatchRequest {
        filename,
        resume_bytes,
        job_description,
    })
}

/// POST /api/v1/jobs/match
///
/// Metered: consumes one `job_matching` use up front, handed back if the
/// résumé cannot be read.
pub async fn handle_match_job(
    State(state): State<AppState>,
    Query(caller): Query<CallerQuery>,
    mut multipart: Multipart,
) -> Result<Json<MatchJobResponse>, AppError> {
    let request = read_match_fields(&mut multipart).await?;
    let kind = DocumentKind::from_filename(&request.filename)?;

    let gate = state
        .ledger
        .increment_usage(caller.user_id, caller.plan, Feature::JobMatching)
        .await?;
    if !gate.allowed {
        return Err(AppError::LimitExceeded(gate));
    }

    let profile_skills = match extract_text(&request.resume_bytes, kind) {
        Ok(text) => state.extractor.extract(&text),
        Err(e) => {
            if let Err(release_err) = state
                .ledger
                .release(caller.user_id, Feature::JobMatching)
                .await
            {
                warn!("Failed to release job_matching use: {release_err}");
            }
            return Err(e.into());
        }
    };

    // Scoring cannot fail past this point; the engine falls back internally
    // when the analyzer does.
    let result = state
        .engine
        .match_skills(&profile_skills, &request.job_description)
        .await;
    info!(
        user_id = %caller.user_id,
        score = result.score,
        "Job match computed"
    );
    Ok(Json(MatchJobResponse { result }))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub plan: PlanId,
    pub prompt: String,
    /// Optional résumé text to ground the answer in.
    pub resume_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// POST /api/v1/chat
///
/// Metered: consumes one `ai_chat` use up front, handed back if the AI call
/// fails.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.prompt.trim().is_empty() {
        return Err(AppError::Validation("Prompt must not be empty".to_string()));
    }
    let llm = state
        .llm
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Chat requires an AI backend".to_string()))?;

    let gate = state
        .ledger
        .increment_usage(request.user_id, request.plan, Feature::AiChat)
        .await?;
    if !gate.allowed {
        return Err(AppError::LimitExceeded(gate));
    }

    let prompt = match &request.resume_text {
        Some(resume) => format!("Résumé:\n{resume}\n\nQuestion: {}", request.prompt),
        None => request.prompt.clone(),
    };

    let reply = match llm.call(&prompt, CAREER_CHAT_SYSTEM).await {
        Ok(completion) => completion.text().map(str::to_string),
        Err(e) => {
            release_chat_use(&state, request.user_id).await;
            return Err(AppError::Llm(e.to_string()));
        }
    };
    match reply {
        Some(reply) => Ok(Json(ChatResponse { reply })),
        None => {
            release_chat_use(&state, request.user_id).await;
            Err(AppError::Llm("Empty completion".to_string()))
        }
    }
}

async fn release_chat_use(state: &AppState, user_id: Uuid) {
    if let Err(e) = state.ledger.release(user_id, Feature::AiChat).await {
        warn!("Failed to release ai_chat use: {e}");
    }
}

#[derive(Debug, Deserialize)]
pub struct SkillRecommendationsRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub plan: PlanId,
    pub current_skills: Vec<String>,
    pub target_role: String,
}

#[derive(Debug, Serialize)]
pub struct SkillRecommendationsResponse {
    pub current_skills: Vec<String>,
    pub target_role: String,
    pub recommendations: advisor::SkillRecommendations,
}

/// POST /api/v1/skills/recommendations
///
/// Metered under `ai_chat`. Never fails past the gate: AI errors substitute
/// the deterministic plan, so no release path is needed.
pub async fn handle_skill_recommendations(
    State(state): State<AppState>,
    Json(request): Json<SkillRecommendationsRequest>,
) -> Result<Json<SkillRecommendationsResponse>, AppError> {
    if request.target_role.trim().is_empty() {
        return Err(AppError::Validation(
            "Target role must not be empty".to_string(),
        ));
    }

    let gate = state
        .ledger
        .increment_usage(request.user_id, request.plan, Feature::AiChat)
        .await?;
    if !gate.allowed {
        return Err(AppError::LimitExceeded(gate));
    }

    let recommendations = advisor::recommend_skills(
        state.llm.as_ref(),
        &state.extractor,
        &request.current_skills,
        &request.target_role,
    )
    .await;
    info!(
        user_id = %request.user_id,
        gaps = recommendations.missing_skills.len(),
        "Skill recommendations computed"
    );
    Ok(Json(SkillRecommendationsResponse {
        current_skills: request.current_skills,
        target_role: request.target_role,
        recommendations,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MarketTrendsRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub plan: PlanId,
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MarketTrendsResponse {
    pub skills: Vec<String>,
    pub trends: advisor::MarketTrends,
}

/// POST /api/v1/market/trends
///
/// Metered under `ai_chat`; same never-fails-past-the-gate posture as the
/// recommendations endpoint.
pub async fn handle_market_trends(
    State(state): State<AppState>,
    Json(request): Json<MarketTrendsRequest>,
) -> Result<Json<MarketTrendsResponse>, AppError> {
    if request.skills.is_empty() {
        return Err(AppError::Validation(
            "At least one skill is required".to_string(),
        ));
    }

    let gate = state
        .ledger
        .increment_usage(request.user_id, request.plan, Feature::AiChat)
        .await?;
    if !gate.allowed {
        return Err(AppError::LimitExceeded(gate));
    }

    let trends = advisor::analyze_market_trends(state.llm.as_ref(), &request.skills).await;
    Ok(Json(MarketTrendsResponse {
        skills: request.skills,
        trends,
    }))
}
