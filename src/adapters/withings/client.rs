//! Withings HTTP client
//!
//! Covers the OAuth2 authorization-code and refresh-token grants plus the
//! `getmeas` measurement endpoint. Transient failures are never retried
//! here; a failed run is re-run by the caller.

use super::models::{ApiEnvelope, MeasureBody, TokenGrant, WireGroup};
use crate::config::{SecretString, WithingsConfig};
use crate::domain::measurement::{Category, MeasureType, MeasurementGroup};
use crate::domain::{BridgeError, Result, SourceError};
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;
use url::Url;

/// Parameters of one `getmeas` request
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureQuery {
    /// Type codes sent as the `meastype` CSV
    pub meas_types: Vec<i32>,

    pub category: Category,

    /// Inclusive lower bound, omitted when `None`
    pub start: Option<DateTime<Utc>>,

    /// Inclusive upper bound, provider defaults to now when `None`
    pub end: Option<DateTime<Utc>>,

    pub limit: Option<u32>,
}

impl MeasureQuery {
    /// Query for a window of real measurements
    pub fn window(
        meas_types: Vec<i32>,
        category: Category,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            meas_types,
            category,
            start: Some(start),
            end,
            limit: None,
        }
    }

    /// Query without a window; the provider returns its recent history
    pub fn recent(meas_types: Vec<i32>, category: Category) -> Self {
        Self {
            meas_types,
            category,
            start: None,
            end: None,
            limit: None,
        }
    }

    /// Query for the most recent height
    pub fn latest_height() -> Self {
        Self {
            meas_types: vec![MeasureType::Height.code()],
            category: Category::Real,
            start: None,
            end: None,
            limit: Some(1),
        }
    }

    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("action", "getmeas".to_string())];

        if !self.meas_types.is_empty() {
            let csv = self
                .meas_types
                .iter()
                .map(|code| code.to_string())
                .collect::<Vec<_>>()
                .join(",");
            params.push(("meastype", csv));
        }

        params.push(("category", self.category.code().to_string()));

        if let Some(start) = self.start {
            params.push(("startdate", start.timestamp().to_string()));
        }
        if let Some(end) = self.end {
            params.push(("enddate", end.timestamp().to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }

        params
    }
}

/// Which grant a token request performs; selects the error variant
#[derive(Debug, Clone, Copy)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

impl Grant {
    fn error(self, status: u16, payload: String) -> SourceError {
        match self {
            Grant::AuthorizationCode => SourceError::AuthExchange { status, payload },
            Grant::RefreshToken => SourceError::AuthRefresh { status, payload },
        }
    }
}

/// Withings API client
///
/// # Example
///
/// ```no_run
/// use weighbridge::adapters::withings::WithingsClient;
/// use weighbridge::config::WithingsConfig;
///
/// # fn example(config: &WithingsConfig) -> weighbridge::domain::Result<()> {
/// let client = WithingsClient::new(config)?;
/// println!("Visit {}", client.authorize_url("init_auth")?);
/// # Ok(())
/// # }
/// ```
pub struct WithingsClient {
    http: Client,
    api_base_url: String,
    authorize_endpoint: String,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    scope: String,
}

impl WithingsClient {
    /// Builds a client from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the client secret is missing or the
    /// HTTP client cannot be built.
    pub fn new(config: &WithingsConfig) -> Result<Self> {
        let client_secret = config.client_secret.clone().ok_or_else(|| {
            BridgeError::Configuration("withings.client_secret is required".to_string())
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| BridgeError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            authorize_endpoint: config.authorize_url.clone(),
            client_id: config.client_id.clone(),
            client_secret,
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
        })
    }

    /// Redirect URI registered for this client
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Builds the user-facing authorization URL
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.authorize_endpoint,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| BridgeError::Configuration(format!("Invalid withings.authorize_url: {e}")))?;

        Ok(url.to_string())
    }

    /// Trades an authorization code for an initial token pair
    pub async fn exchange_code(&self, code: &str) -> Result<TokenGrant> {
        tracing::debug!("Exchanging authorization code for tokens");
        let secret = self.client_secret.expose_secret();
        let form = [
            ("action", "requesttoken"),
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        self.request_token(&form, Grant::AuthorizationCode).await
    }

    /// Refreshes a token pair
    ///
    /// A failure here is recoverable: the caller falls back to interactive
    /// authorization.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        tracing::debug!("Refreshing access token");
        let secret = self.client_secret.expose_secret();
        let form = [
            ("action", "requesttoken"),
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", secret.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.request_token(&form, Grant::RefreshToken).await
    }

    async fn request_token(&self, form: &[(&str, &str)], grant: Grant) -> Result<TokenGrant> {
        let url = format!("{}/v2/oauth2", self.api_base_url);
        let request = self.http.post(&url).form(form);

        let (status, text) = send(request).await?;
        let envelope = parse_envelope(status, &text, |s, p| grant.error(s, p))?;

        let grant_body: TokenGrant = serde_json::from_value(envelope.body).map_err(|e| {
            SourceError::InvalidResponse(format!("Token response missing fields: {e}"))
        })?;

        Ok(grant_body)
    }

    /// Fetches measurement groups matching `query`
    ///
    /// Groups come back in provider order (newest first). Any HTTP or API
    /// level failure aborts with [`SourceError::Fetch`].
    pub async fn fetch_measurements(
        &self,
        access_token: &str,
        query: &MeasureQuery,
    ) -> Result<Vec<MeasurementGroup>> {
        let url = format!("{}/measure", self.api_base_url);
        let params = query.to_params();

        tracing::debug!(
            meastype = ?query.meas_types,
            start = ?query.start,
            end = ?query.end,
            "Fetching measurements"
        );

        let request = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&params);

        let (status, text) = send(request).await?;
        let envelope = parse_envelope(status, &text, |status, payload| SourceError::Fetch {
            status,
            payload,
        })?;

        let body: MeasureBody = if envelope.body.is_null() {
            MeasureBody::default()
        } else {
            serde_json::from_value(envelope.body).map_err(|e| {
                SourceError::InvalidResponse(format!("Malformed measurement body: {e}"))
            })?
        };

        if body.more.unwrap_or(0) != 0 {
            tracing::warn!("Provider reported more measurements than returned; narrow the window");
        }

        let groups: Vec<MeasurementGroup> = body
            .measuregrps
            .into_iter()
            .filter_map(WireGroup::into_domain)
            .collect();

        tracing::info!(count = groups.len(), "Fetched measurement groups");
        Ok(groups)
    }

    /// Most recent height in metres, best effort
    ///
    /// Every failure is logged and mapped to `None`.
    pub async fn fetch_height(&self, access_token: &str) -> Option<f64> {
        match self
            .fetch_measurements(access_token, &MeasureQuery::latest_height())
            .await
        {
            Ok(groups) => {
                let height = groups.first().and_then(|group| {
                    group
                        .measures
                        .iter()
                        .find(|m| m.measure_type() == Some(MeasureType::Height))
                        .map(|m| m.real_value())
                });
                if height.is_none() {
                    tracing::info!("No height measurement found, BMI will not be calculated");
                }
                height
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch height, BMI will not be calculated");
                None
            }
        }
    }
}

async fn send(request: RequestBuilder) -> std::result::Result<(u16, String), SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::ConnectionFailed(e.to_string()))?;

    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .map_err(|e| SourceError::ConnectionFailed(format!("Failed to read response body: {e}")))?;

    Ok((status, text))
}

/// Checks the HTTP status and the provider status of a response
fn parse_envelope<F>(status: u16, text: &str, on_error: F) -> std::result::Result<ApiEnvelope, SourceError>
where
    F: Fn(u16, String) -> SourceError,
{
    if status != 200 {
        return Err(on_error(status, text.to_string()));
    }

    let envelope: ApiEnvelope = serde_json::from_str(text).map_err(|e| {
        SourceError::InvalidResponse(format!("Response is not a status envelope: {e}"))
    })?;

    if !envelope.is_success() {
        return Err(on_error(status, text.to_string()));
    }

    Ok(envelope)
}

/// Pulls the authorization code out of user input
///
/// Accepts either the bare code or the full callback URL the browser was
/// redirected to. When the URL carries a `state` and `expected_state` is
/// given, the two must match.
pub fn extract_code(
    input: &str,
    expected_state: Option<&str>,
) -> std::result::Result<String, SourceError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SourceError::InvalidResponse(
            "Empty authorization code".to_string(),
        ));
    }

    if !input.contains("code=") {
        return Ok(input.to_string());
    }

    let query = match Url::parse(input) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => input
            .split_once('?')
            .map_or(input, |(_, query)| query)
            .to_string(),
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" if code.is_none() => code = Some(value.into_owned()),
            "state" if state.is_none() => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if let (Some(expected), Some(actual)) = (expected_state, state.as_deref()) {
        if expected != actual {
            return Err(SourceError::StateMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    code.filter(|c| !c.is_empty()).ok_or_else(|| {
        SourceError::InvalidResponse("Callback URL does not contain a code".to_string())
    })
}
