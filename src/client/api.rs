use chrono::NaiveDate;
use derive_more::Display;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    error::ErrorBody,
    model::{
        attendance::{AttendanceQuery, AttendanceRecord, MarkAllPresent, MarkAttendance},
        response::{DataResponse, ListResponse, MessageResponse},
    },
};

pub type AttendancePage = ListResponse<AttendanceRecord>;

/// Uniform failure shape handed to the notification layer. `status` is the
/// HTTP status, or 0 when no response was received or the input was rejected
/// before sending.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display(fmt = "{} ({})", message, status)]
pub struct ApiError {
    pub message: String,
    pub status: u16,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    /// Rejected on the client, nothing was sent.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message, 0)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16()).unwrap_or(0);
        ApiError::new(e.to_string(), status)
    }
}

/// The three attendance endpoints the dashboard talks to.
#[allow(async_fn_in_trait)]
pub trait AttendanceApi {
    async fn fetch_page(&self, query: &AttendanceQuery) -> Result<AttendancePage, ApiError>;

    async fn mark(&self, request: &MarkAttendance) -> Result<AttendanceRecord, ApiError>;

    async fn mark_all_present(&self, group_id: u64, date: NaiveDate) -> Result<(), ApiError>;
}

pub struct HttpAttendanceApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAttendanceApi {
    /// `base_url` includes the API prefix, e.g. `http://127.0.0.1:8080/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(ApiError::from);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    Err(ApiError::new(message, status.as_u16()))
}

impl AttendanceApi for HttpAttendanceApi {
    async fn fetch_page(&self, query: &AttendanceQuery) -> Result<AttendancePage, ApiError> {
        let response = self
            .client
            .get(self.url("/attendance"))
            .query(query)
            .send()
            .await?;
        decode(response).await
    }

    async fn mark(&self, request: &MarkAttendance) -> Result<AttendanceRecord, ApiError> {
        let response = self
            .client
            .patch(self.url("/attendance"))
            .json(request)
            .send()
            .await?;
        let body: DataResponse<AttendanceRecord> = decode(response).await?;
        Ok(body.data)
    }

    async fn mark_all_present(&self, group_id: u64, date: NaiveDate) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/attendance/mark-all-present"))
            .json(&MarkAllPresent { group_id, date })
            .send()
            .await?;
        let _: MessageResponse = decode(response).await?;
        Ok(())
    }
}
