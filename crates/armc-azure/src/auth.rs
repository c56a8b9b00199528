//! Azure AD OAuth2 authentication.
//!
//! Client-credentials (service-principal) flow against the Microsoft Identity
//! Platform v2.0 token endpoint. Tokens are not cached: every upstream call
//! goes through [`acquire_token`] first.

use chrono::{Duration, Utc};
use log::{debug, warn};
use secrecy::ExposeSecret;

use crate::client::{encode_segment, ArmClient};
use crate::types::{
    ArmCredentials, ArmError, ArmResult, ArmToken, TokenErrorResponse, TokenResponse,
};

/// Token endpoint URL for a given tenant.
fn token_url(login_base: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        login_base.trim_end_matches('/'),
        encode_segment(tenant_id)
    )
}

/// OAuth scope granting access to the management plane.
fn management_scope(arm_base: &str) -> String {
    format!("{}/.default", arm_base.trim_end_matches('/'))
}

/// Acquire a token using the client-credentials grant.
pub async fn acquire_token(client: &ArmClient, creds: &ArmCredentials) -> ArmResult<ArmToken> {
    if !creds.is_complete() {
        return Err(ArmError::validation(
            "client_id, client_secret, and tenant_id are all required",
        ));
    }

    let config = client.config();
    let url = token_url(&config.login_base, &creds.tenant_id);
    let scope = management_scope(&config.arm_base);
    debug!("ARM token request → {}", url);

    let form: Vec<(&str, &str)> = vec![
        ("grant_type", "client_credentials"),
        ("client_id", &creds.client_id),
        ("client_secret", creds.client_secret.expose_secret()),
        ("scope", &scope),
    ];

    let resp: TokenResponse = client
        .post_form_unauthenticated(&url, &form)
        .await
        .map_err(into_auth_error)?;
    token_from_response(resp)
}

/// Identity-provider rejections become [`ArmError::Auth`] so they are never
/// mistaken for a resource-level fault.
fn into_auth_error(err: ArmError) -> ArmError {
    match err {
        ArmError::Upstream { status, body } => {
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(body);
            warn!("token exchange rejected with HTTP {}", status);
            ArmError::Auth { status, message }
        }
        other => other,
    }
}

/// Convert the raw token endpoint response into an `ArmToken`.
fn token_from_response(resp: TokenResponse) -> ArmResult<ArmToken> {
    let access_token = resp
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ArmError::Auth {
            status: 401,
            message: "Invalid attempt to obtain the JWT token".into(),
        })?;
    let expires_at = resp
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs as i64));

    Ok(ArmToken {
        access_token,
        token_type: resp.token_type.unwrap_or_else(|| "Bearer".into()),
        expires_at,
        resource: resp.resource,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────
