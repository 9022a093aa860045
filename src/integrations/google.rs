//! Google Drive/Sheets adapter.
//!
//! Token acquisition is the interactive consent flow: the client redirects
//! the user to [`GoogleClient::authorize_url`], Google calls back with a
//! code, and [`GoogleClient::exchange_code`] trades it for an access token.
//! Tokens live in memory only; there is no refresh-token persistence, so an
//! expired token means re-consent.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::export::Workbook;

use super::IntegrationError;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DRIVE_UPLOAD_ENDPOINT: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart";
const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SCOPES: &str = "https://www.googleapis.com/auth/drive.file \
                      https://www.googleapis.com/auth/spreadsheets";

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_endpoint: String,
    pub drive_upload_endpoint: String,
    pub sheets_endpoint: String,
}

impl GoogleConfig {
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/integrations/google/callback".into());
        Some(Self {
            client_id,
            client_secret,
            redirect_uri,
            token_endpoint: TOKEN_ENDPOINT.into(),
            drive_upload_endpoint: DRIVE_UPLOAD_ENDPOINT.into(),
            sheets_endpoint: SHEETS_ENDPOINT.into(),
        })
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct GoogleClient {
    http: reqwest::Client,
    config: GoogleConfig,
    token: Mutex<Option<AccessToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct DriveFileResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(rename = "spreadsheetId")]
    spreadsheet_id: String,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    /// Where to send the user for interactive consent.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{AUTH_ENDPOINT}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            urlencode(&self.config.client_id),
            urlencode(&self.config.redirect_uri),
            urlencode(SCOPES),
            urlencode(state),
        )
    }

    /// Trades the consent-callback code for an access token, cached in
    /// memory until it expires.
    pub async fn exchange_code(&self, code: &str) -> Result<(), IntegrationError> {
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;
        *self.token.lock().unwrap_or_else(|p| p.into_inner()) = Some(AccessToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in.max(0)),
        });
        Ok(())
    }

    fn bearer(&self) -> Result<String, IntegrationError> {
        let guard = self.token.lock().unwrap_or_else(|p| p.into_inner());
        match guard.as_ref() {
            Some(token) if token.expires_at > Utc::now() => Ok(token.value.clone()),
            Some(_) => Err(IntegrationError::Auth("access token expired".into())),
            None => Err(IntegrationError::Auth("no access token; run consent first".into())),
        }
    }

    /// Multipart upload into a Drive folder. Returns the file id.
    pub async fn upload_file(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        folder_id: Option<&str>,
    ) -> Result<String, IntegrationError> {
        let bearer = self.bearer()?;
        let mut metadata = json!({ "name": name });
        if let Some(folder) = folder_id {
            metadata["parents"] = json!([folder]);
        }
        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata.to_string())
                    .mime_str("application/json")?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).mime_str(mime_type)?,
            );
        let response = self
            .http
            .post(&self.config.drive_upload_endpoint)
            .bearer_auth(bearer)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        let file: DriveFileResponse = response.json().await?;
        Ok(file.id)
    }

    /// Creates a spreadsheet titled after the workbook and appends every
    /// sheet's rows. Returns the spreadsheet id.
    pub async fn create_and_populate_spreadsheet(
        &self,
        workbook: &Workbook,
    ) -> Result<String, IntegrationError> {
        let bearer = self.bearer()?;
        let body = json!({
            "properties": { "title": workbook.title },
            "sheets": workbook
                .sheets
                .iter()
                .map(|sheet| json!({ "properties": { "title": sheet.name } }))
                .collect::<Vec<_>>(),
        });
        let response = self
            .http
            .post(&self.config.sheets_endpoint)
            .bearer_auth(&bearer)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let spreadsheet: SpreadsheetResponse = response.json().await?;

        for sheet in &workbook.sheets {
            if sheet.rows.is_empty() {
                continue;
            }
            let range = format!("'{}'!A1", sheet.name);
            let url = format!(
                "{}/{}/values/{}:append?valueInputOption=RAW",
                self.config.sheets_endpoint,
                spreadsheet.spreadsheet_id,
                urlencode(&range),
            );
            let response = self
                .http
                .post(&url)
                .bearer_auth(&bearer)
                .json(&json!({ "values": sheet.rows }))
                .send()
                .await?;
            check_status(response).await?;
        }
        Ok(spreadsheet.spreadsheet_id)
    }
}

async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, IntegrationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Api {
        status: status.as_u16(),
        body,
    })
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_client_and_state() {
        let client = GoogleClient::new(GoogleConfig {
            client_id: "abc".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost/cb".into(),
            token_endpoint: TOKEN_ENDPOINT.into(),
            drive_upload_endpoint: DRIVE_UPLOAD_ENDPOINT.into(),
            sheets_endpoint: SHEETS_ENDPOINT.into(),
        });
        let url = client.authorize_url("xyz");
        assert!(url.contains("client_id=abc"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%2Fcb"));
    }

    #[test]
    fn operations_fail_without_consent() {
        let client = GoogleClient::new(GoogleConfig {
            client_id: "abc".into(),
            client_secret: "secret".into(),
            redirect_uri: "http://localhost/cb".into(),
            token_endpoint: TOKEN_ENDPOINT.into(),
            drive_upload_endpoint: DRIVE_UPLOAD_ENDPOINT.into(),
            sheets_endpoint: SHEETS_ENDPOINT.into(),
        });
        assert!(matches!(client.bearer(), Err(IntegrationError::Auth(_))));
    }
}
