use super::ApiError;
use super::types::CreateRequestPayload;
use crate::domain::RequestStatus;
use crate::services::RequestSubmission;

const MAX_FIELD_LENGTH: usize = 200;
const MAX_VIBE_TAGS: usize = 16;
const MAX_VIBE_TAG_LENGTH: usize = 40;
const MAX_NOTES_LENGTH: usize = 4000;

pub const CONTACT_METHODS: [&str; 2] = ["email", "social"];

fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_FIELD_LENGTH {
        return Err(ApiError::validation(format!(
            "{field} must be {MAX_FIELD_LENGTH} characters or less"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_submission(payload: CreateRequestPayload) -> Result<RequestSubmission, ApiError> {
    let operator_name = required("operator_name", &payload.operator_name)?;
    let character_name = required("character_name", &payload.character_name)?;
    let series_source = required("series_source", &payload.series_source)?;
    let contact_method = required("contact_method", &payload.contact_method)?.to_lowercase();
    let contact_handle = required("contact_handle", &payload.contact_handle)?;

    if !CONTACT_METHODS.contains(&contact_method.as_str()) {
        return Err(ApiError::validation(format!(
            "contact_method must be one of: {}",
            CONTACT_METHODS.join(", ")
        )));
    }
    if contact_method == "email" && !contact_handle.contains('@') {
        return Err(ApiError::validation(
            "contact_handle must be an email address",
        ));
    }

    if payload.sourcing_vibe.len() > MAX_VIBE_TAGS {
        return Err(ApiError::validation(format!(
            "sourcing_vibe accepts at most {MAX_VIBE_TAGS} tags"
        )));
    }
    let sourcing_vibe = payload
        .sourcing_vibe
        .iter()
        .map(|tag| {
            let tag = tag.trim();
            if tag.is_empty() || tag.chars().count() > MAX_VIBE_TAG_LENGTH {
                Err(ApiError::validation(format!(
                    "sourcing_vibe tags must be 1 to {MAX_VIBE_TAG_LENGTH} characters"
                )))
            } else {
                Ok(tag.to_string())
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let notes = payload
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if notes
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
    {
        return Err(ApiError::validation(format!(
            "notes must be {MAX_NOTES_LENGTH} characters or less"
        )));
    }

    Ok(RequestSubmission {
        operator_name,
        character_name,
        series_source,
        sourcing_vibe,
        contact_method,
        contact_handle,
        notes,
    })
}

pub fn parse_status(raw: &str) -> Result<RequestStatus, ApiError> {
    raw.trim().parse().map_err(|_| {
        let allowed: Vec<&str> = RequestStatus::ALL.iter().map(RequestStatus::as_str).collect();
        ApiError::validation(format!(
            "Unknown status '{raw}'. Expected one of: {}",
            allowed.join(", ")
        ))
    })
}

pub fn parse_id(resource: &str, raw: &str) -> Result<i32, ApiError> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation(format!(
            "Invalid {resource} ID: {raw}. ID must be a positive integer"
        ))),
    }
}

pub fn validate_login(username: &str, password: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    Ok(())
}
