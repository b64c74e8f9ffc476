use color_eyre::{eyre::eyre, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{
  DashboardStats, Envelope, GroupForm, HayabusaPayment, HayabusaStats, LoginResponse, MessageBody,
  PaymentForm, PaymentStatus, Report, ReportParams, Transaction, TransactionForm,
  TransactionGroup, TransactionQuery, User, ValidationBody,
};
use crate::api::FinanceApi;
use crate::config::Config;
use crate::db::SessionStore;

/// Requests slower than this are logged as warnings
const SLOW_REQUEST: Duration = Duration::from_secs(2);

/// Vertinova Finance API client
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  /// `<server>/api/`
  base: Url,
  session: Arc<SessionStore>,
  token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
  pub fn new(config: &Config, session: Arc<SessionStore>) -> Result<Self> {
    Self::build(&config.api.url, config.timeout(), session)
  }

  /// Create a client for the server at `url`, picking up any stored token.
  pub fn build(url: &str, timeout: Duration, session: Arc<SessionStore>) -> Result<Self> {
    let base = api_base(url)?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
      "X-Requested-With",
      HeaderValue::from_static("XMLHttpRequest"),
    );

    let http = reqwest::Client::builder()
      .timeout(timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    let token = session.token()?;

    Ok(Self {
      http,
      base,
      session,
      token: Arc::new(RwLock::new(token)),
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  pub fn has_token(&self) -> bool {
    self.token().is_some()
  }

  fn token(&self) -> Option<String> {
    self
      .token
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Use `token` for subsequent requests and persist it.
  pub fn set_token(&self, token: &str) -> Result<()> {
    *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
    self.session.set_token(token)
  }

  /// Forget the token in memory and in persisted storage.
  fn expire_session(&self) {
    *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    if let Err(e) = self.session.clear() {
      warn!("Failed to clear stored session: {}", e);
    }
  }

  fn endpoint(&self, path: &str) -> ApiResult<Url> {
    self
      .base
      .join(path.trim_start_matches('/'))
      .map_err(|e| ApiError::Decode(format!("invalid endpoint {}: {}", path, e)))
  }

  /// Send a request with auth and timing, without interpreting the status.
  async fn execute<F>(&self, method: Method, path: &str, build: F) -> ApiResult<Response>
  where
    F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
  {
    let url = self.endpoint(path)?;
    let mut request = self.http.request(method.clone(), url);
    if let Some(token) = self.token() {
      request = request.bearer_auth(token);
    }
    let request = build(request);

    let started = Instant::now();
    let result = request.send().await;
    let elapsed = started.elapsed();

    match &result {
      Ok(response) => debug!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "API response"
      ),
      Err(e) => debug!(%method, path, error = %e, "API request failed"),
    }
    if elapsed > SLOW_REQUEST {
      warn!(
        "Slow API request detected: {} {} took {}ms",
        method,
        path,
        elapsed.as_millis()
      );
    }

    result.map_err(ApiError::Network)
  }

  /// Map non-success statuses to errors. A 401 also ends the session.
  async fn check(&self, response: Response) -> ApiResult<(StatusCode, String)> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
      warn!("API returned 401, clearing stored session");
      self.expire_session();
      return Err(ApiError::SessionExpired);
    }

    let body = response.text().await.map_err(ApiError::Network)?;
    if status.is_success() {
      Ok((status, body))
    } else {
      Err(error_for_status(status, &body))
    }
  }

  async fn get_envelope<T, F>(&self, path: &str, build: F) -> ApiResult<Option<T>>
  where
    T: DeserializeOwned,
    F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
  {
    let response = self.execute(Method::GET, path, build).await?;
    let (status, body) = self.check(response).await?;
    open_envelope(status, &body)
  }

  async fn get_data<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
    self
      .get_envelope(path, |r| r)
      .await?
      .ok_or_else(|| ApiError::Decode(format!("{} returned no data", path)))
  }

  /// Write request whose response body only matters for its success flag.
  async fn write<F>(&self, method: Method, path: &str, build: F) -> ApiResult<()>
  where
    F: FnOnce(RequestBuilder) -> RequestBuilder + Send,
  {
    let response = self.execute(method, path, build).await?;
    let (status, body) = self.check(response).await?;

    if !body.trim().is_empty() {
      // Non-JSON bodies are accepted as long as the status was a success
      if let Ok(envelope) = serde_json::from_str::<Envelope<Value>>(&body) {
        if !envelope.success {
          return Err(ApiError::Status {
            status: status.as_u16(),
            message: envelope
              .message
              .unwrap_or_else(|| "Request was not successful".to_string()),
          });
        }
      }
    }
    Ok(())
  }

  /// Log in and persist the returned token and user.
  pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
    let body = serde_json::json!({ "email": email, "password": password });
    let response = self
      .execute(Method::POST, "login", |r| r.json(&body))
      .await?;

    let status = response.status();
    let text = response.text().await.map_err(ApiError::Network)?;
    if !status.is_success() {
      return Err(login_error(status, &text));
    }

    let login: LoginResponse =
      serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))?;

    *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(login.token.clone());
    if let Err(e) = self.session.save(&login.token, &login.user) {
      warn!("Failed to persist login: {}", e);
    }

    info!(user = %login.user.email, "Logged in");
    Ok(login.user)
  }

  /// Fetch the logged-in user and remember it.
  pub async fn current_user(&self) -> ApiResult<User> {
    if !self.has_token() {
      return Err(ApiError::Unauthenticated);
    }

    let response = self.execute(Method::GET, "user", |r| r).await?;
    let (_, body) = self.check(response).await?;
    let user: User = serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

    if let Err(e) = self.session.set_user(&user) {
      warn!("Failed to persist user: {}", e);
    }
    Ok(user)
  }

  /// Log out remotely, then forget the local session regardless of the outcome.
  pub async fn logout(&self) -> ApiResult<()> {
    let result = self.write(Method::POST, "logout", |r| r).await;
    self.expire_session();
    result
  }
}

impl FinanceApi for ApiClient {
  async fn statistics(&self) -> ApiResult<DashboardStats> {
    self.get_data("transactions/statistics").await
  }

  async fn transactions(&self, query: TransactionQuery) -> ApiResult<Vec<Transaction>> {
    let data = self
      .get_envelope("transactions", |r| r.query(&query))
      .await?;
    Ok(data.unwrap_or_default())
  }

  async fn report(&self, params: ReportParams) -> ApiResult<Report> {
    let query = params.query();
    let data = self
      .get_envelope("transactions/reports", |r| r.query(&query))
      .await?;
    Ok(data.unwrap_or_default())
  }

  async fn transaction_groups(&self) -> ApiResult<Vec<TransactionGroup>> {
    let data = self.get_envelope("transaction-groups", |r| r).await?;
    Ok(data.unwrap_or_default())
  }

  async fn transaction_group(&self, id: u64) -> ApiResult<TransactionGroup> {
    self.get_data(&format!("transaction-groups/{}", id)).await
  }

  async fn create_transaction(&self, form: TransactionForm) -> ApiResult<()> {
    self
      .write(Method::POST, "transactions", |r| r.json(&form))
      .await
  }

  async fn update_transaction(&self, id: u64, form: TransactionForm) -> ApiResult<()> {
    self
      .write(Method::PUT, &format!("transactions/{}", id), |r| {
        r.json(&form)
      })
      .await
  }

  async fn delete_transaction(&self, id: u64) -> ApiResult<()> {
    self
      .write(Method::DELETE, &format!("transactions/{}", id), |r| r)
      .await
  }

  async fn create_group(&self, form: GroupForm) -> ApiResult<()> {
    self
      .write(Method::POST, "transaction-groups", |r| r.json(&form))
      .await
  }

  async fn update_group(&self, id: u64, form: GroupForm) -> ApiResult<()> {
    self
      .write(Method::PUT, &format!("transaction-groups/{}", id), |r| {
        r.json(&form)
      })
      .await
  }

  async fn delete_group(&self, id: u64) -> ApiResult<()> {
    self
      .write(Method::DELETE, &format!("transaction-groups/{}", id), |r| r)
      .await
  }

  async fn hayabusa_statistics(&self) -> ApiResult<HayabusaStats> {
    let data = self.get_envelope("hayabusa/statistics", |r| r).await?;
    Ok(data.unwrap_or_default())
  }

  async fn hayabusa_payments(&self) -> ApiResult<Vec<HayabusaPayment>> {
    let data = self.get_envelope("hayabusa/payments", |r| r).await?;
    Ok(data.unwrap_or_default())
  }

  async fn hayabusa_users(&self) -> ApiResult<Vec<User>> {
    let data = self.get_envelope("hayabusa/users", |r| r).await?;
    Ok(data.unwrap_or_default())
  }

  async fn create_hayabusa_payment(&self, form: PaymentForm) -> ApiResult<()> {
    self
      .write(Method::POST, "hayabusa/payments", |r| r.json(&form))
      .await
  }

  async fn update_hayabusa_payment_status(&self, id: u64, status: PaymentStatus) -> ApiResult<()> {
    let body = serde_json::json!({ "status": status });
    self
      .write(
        Method::PATCH,
        &format!("hayabusa/payments/{}/status", id),
        |r| r.json(&body),
      )
      .await
  }
}

/// `<url>/api/`, keeping any path prefix of the server root.
fn api_base(url: &str) -> Result<Url> {
  let mut root =
    Url::parse(url.trim()).map_err(|e| eyre!("Invalid API url '{}': {}", url, e))?;
  if !root.path().ends_with('/') {
    let path = format!("{}/", root.path());
    root.set_path(&path);
  }
  root
    .join("api/")
    .map_err(|e| eyre!("Invalid API url '{}': {}", url, e))
}

fn open_envelope<T: DeserializeOwned>(status: StatusCode, body: &str) -> ApiResult<Option<T>> {
  let envelope: Envelope<T> =
    serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;

  if !envelope.success {
    return Err(ApiError::Status {
      status: status.as_u16(),
      message: envelope
        .message
        .unwrap_or_else(|| "Request was not successful".to_string()),
    });
  }
  Ok(envelope.data)
}

/// Error for a non-success, non-401 status.
fn error_for_status(status: StatusCode, body: &str) -> ApiError {
  match status {
    StatusCode::NOT_FOUND => ApiError::NotFound,
    StatusCode::UNPROCESSABLE_ENTITY => {
      let parsed: ValidationBody = serde_json::from_str(body).unwrap_or_default();
      ApiError::Validation {
        message: parsed
          .message
          .unwrap_or_else(|| "Validation error".to_string()),
        errors: parsed.errors,
      }
    }
    s if s.is_server_error() => ApiError::Server { status: s.as_u16() },
    s => {
      let parsed: MessageBody = serde_json::from_str(body).unwrap_or_default();
      ApiError::Status {
        status: s.as_u16(),
        message: parsed
          .message
          .or_else(|| s.canonical_reason().map(String::from))
          .unwrap_or_else(|| "Request failed".to_string()),
      }
    }
  }
}

/// Login failures keep the server's message; a 401 here is bad credentials.
fn login_error(status: StatusCode, body: &str) -> ApiError {
  let parsed: ValidationBody = serde_json::from_str(body).unwrap_or_default();
  let message = parsed
    .message
    .clone()
    .or_else(|| {
      parsed
        .errors
        .get("email")
        .and_then(|m| m.first())
        .cloned()
    })
    .unwrap_or_else(|| "Login failed".to_string());

  if status == StatusCode::UNPROCESSABLE_ENTITY {
    ApiError::Validation {
      message,
      errors: parsed.errors,
    }
  } else if status.is_server_error() {
    ApiError::Server {
      status: status.as_u16(),
    }
  } else {
    ApiError::Status {
      status: status.as_u16(),
      message,
    }
  }
}
