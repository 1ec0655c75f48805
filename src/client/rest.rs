//! [`LoanBackend`] over the REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::ClientConfig,
    error::ErrorResponse,
    models::{
        CreateLoan, Item, ItemRecord, Loan, LoanDirection, LoanRecord, LoansPage, Notification,
        NotificationsPage,
    },
};

use super::{ClientError, ClientResult, LoanBackend};

const PAGE_SIZE: i64 = 500;

/// Backend for one signed-in user, authenticated with a bearer token
#[derive(Clone)]
pub struct RestBackend {
    http: Client,
    base_url: String,
    token: String,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &ClientConfig, token: impl Into<String>) -> ClientResult<Self> {
        Self::new(
            config.base_url.clone(),
            token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ClientResult<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_body(status.as_u16(), &body));
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn send_loan(&self, request: RequestBuilder) -> ClientResult<Loan> {
        let record: LoanRecord = self.send(request).await?;
        Loan::try_from(record).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Turn an error response into the most specific [`ClientError`]
pub(crate) fn error_from_body(status: u16, body: &[u8]) -> ClientError {
    let Ok(response) = serde_json::from_slice::<ErrorResponse>(body) else {
        return ClientError::Api {
            status,
            message: String::from_utf8_lossy(body).into_owned(),
        };
    };

    match response.error.parse() {
        Ok(kind) => ClientError::Rejected {
            kind,
            message: response.message,
        },
        Err(()) if status == 404 => ClientError::NotFound(response.message),
        Err(()) => ClientError::Api {
            status,
            message: response.message,
        },
    }
}

#[async_trait]
impl LoanBackend for RestBackend {
    async fn create_loan(&self, request: &CreateLoan) -> ClientResult<Loan> {
        self.send_loan(self.http.post(self.url("/loans")).json(request)).await
    }

    async fn respond(&self, loan_id: Uuid, accept: bool) -> ClientResult<Loan> {
        self.send_loan(
            self.http
                .post(self.url(&format!("/loans/{}/respond", loan_id)))
                .json(&json!({ "accept": accept })),
        )
        .await
    }

    async fn ratify(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.send_loan(self.http.post(self.url(&format!("/loans/{}/ratify", loan_id))))
            .await
    }

    async fn signal_return(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.send_loan(self.http.post(self.url(&format!("/loans/{}/signal-return", loan_id))))
            .await
    }

    async fn confirm_return(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.send_loan(self.http.post(self.url(&format!("/loans/{}/return", loan_id))))
            .await
    }

    async fn get_loan(&self, loan_id: Uuid) -> ClientResult<Loan> {
        self.send_loan(self.http.get(self.url(&format!("/loans/{}", loan_id))))
            .await
    }

    async fn list_loans(&self, direction: LoanDirection) -> ClientResult<Vec<Loan>> {
        let mut loans = Vec::new();
        loop {
            let page: LoansPage = self
                .send(self.http.get(self.url("/loans")).query(&[
                    ("direction", direction.as_str().to_string()),
                    ("skip", loans.len().to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                ]))
                .await?;

            let fetched = page.data.len();
            for record in page.data {
                loans.push(Loan::try_from(record).map_err(|e| ClientError::Decode(e.to_string()))?);
            }
            if fetched == 0 || loans.len() as i64 >= page.count {
                return Ok(loans);
            }
        }
    }

    async fn get_item(&self, item_id: Uuid) -> ClientResult<Item> {
        let record: ItemRecord = self
            .send(self.http.get(self.url(&format!("/items/{}", item_id))))
            .await?;
        Item::try_from(record).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn list_notifications(&self) -> ClientResult<NotificationsPage> {
        self.send(self.http.get(self.url("/notifications"))).await
    }

    async fn mark_notification_read(&self, notification_id: Uuid) -> ClientResult<Notification> {
        self.send(
            self.http
                .post(self.url(&format!("/notifications/{}/read", notification_id))),
        )
        .await
    }
}
