//! Résumé parsing endpoint.

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::entities::{extract_profile, ExtractedProfile};
use crate::extraction::text::{extract_text, DocumentKind};
use crate::metering::plans::{Feature, PlanId};
use crate::state::AppState;

/// Caller identity on metered endpoints. Plan defaults to free.
#[derive(Debug, Deserialize)]
pub struct CallerQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub plan: PlanId,
}

#[derive(Debug, Serialize)]
pub struct ParseResumeResponse {
    pub filename: String,
    pub profile: ExtractedProfile,
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .ok_or_else(|| AppError::Validation("File field is missing a filename".to_string()))?
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?
            .to_vec();
        return Ok(Upload { filename, bytes });
    }
    Err(AppError::Validation(
        "Missing multipart field 'file'".to_string(),
    ))
}

/// POST /api/v1/resumes/parse
///
/// Metered: consumes one `resume_analysis` use up front, handed back if
/// extraction fails.
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    Query(caller): Query<CallerQuery>,
    mut multipart: Multipart,
) -> Result<Json<ParseResumeResponse>, AppError> {
    let upload = read_file_field(&mut multipart).await?;
    // Reject unsupported formats before consuming a use.
    let kind = DocumentKind::from_filename(&upload.filename)?;

    let gate = state
        .ledger
        .increment_usage(caller.user_id, caller.plan, Feature::ResumeAnalysis)
        .await?;
    if !gate.allowed {
        return Err(AppError::LimitExceeded(gate));
    }

    let result = parse_resume(&state, &upload, kind);
    match result {
        Ok(profile) => {
            info!(
                user_id = %caller.user_id,
                skills = profile.skills.len(),
                "Résumé parsed"
            );
            Ok(Json(ParseResumeResponse {
                filename: upload.filename,
                profile,
            }))
        }
        Err(e) => {
            // The metered work failed; hand the use back.
            if let Err(release_err) = state
                .ledger
                .release(caller.user_id, Feature::ResumeAnalysis)
                .await
            {
                warn!("Failed to release resume_analysis use: {release_err}");
            }
            Err(e)
        }
    }
}

fn parse_resume(
    state: &AppState,
    upload: &Upload,
    kind: DocumentKind,
) -> Result<ExtractedProfile, AppError> {
    let text = extract_text(&upload.bytes, kind)?;
    let skills = state.extractor.extract(&text);
    Ok(extract_profile(&text, skills))
}
