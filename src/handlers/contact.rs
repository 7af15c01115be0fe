use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    error::ApiError,
    mail::OutgoingEmail,
    models::{ContactRequest, ContactResponse, NewMessage},
};

const DEFAULT_SUBJECT: &str = "We received your message - AutoShop";

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Confirmation sent back to whoever filled in the contact form.
pub fn confirmation_email(message: &NewMessage) -> OutgoingEmail {
    OutgoingEmail {
        to: message.email.clone(),
        subject: message
            .subject
            .clone()
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        text: format!(
            "Thank you for reaching out, {}! We received your message:\n\n{}",
            message.name, message.message
        ),
    }
}

/// submit_contact
///
/// [Public Route] Stores a contact-form message and mails a confirmation.
/// Mail delivery problems are logged; the message is saved regardless.
#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Stored", body = ContactResponse),
        (status = 400, description = "Missing required fields", body = crate::error::ErrorBody)
    )
)]
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    let (Some(name), Some(email), Some(message)) = (
        required(payload.name),
        required(payload.email),
        required(payload.message),
    ) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let new_message = NewMessage {
        name,
        email,
        subject: required(payload.subject),
        message,
    };
    let email = confirmation_email(&new_message);
    let saved = state.repo.create_message(new_message).await?;

    if let Err(e) = state.mailer.send(email).await {
        tracing::warn!(message_id = %saved.id, error = %e, "contact confirmation not delivered");
    }

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            ok: true,
            message: saved,
        }),
    ))
}
