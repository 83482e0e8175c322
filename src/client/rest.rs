//! PostgREST plumbing
//!
//! [`BackendClient`] sends table requests with the headers the backend expects:
//! `apikey: <anon key>` and `Authorization: Bearer <access token>` (the anon key
//! stands in when nobody is signed in). Filters are expressed with
//! [`TableQuery`], which renders PostgREST's `column=op.value` parameters.

use std::fmt::Display;
use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::config::Config;
use crate::client::error::ClientError;

/// The current access token, shared by every client built from one session
#[derive(Debug, Clone, Default)]
pub struct AccessToken(Arc<RwLock<Option<String>>>);

impl AccessToken {
    pub async fn set(&self, token: Option<String>) {
        *self.0.write().await = token;
    }

    pub async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }
}

/// Filters, ordering and projection for one table request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: &'static str,
    params: Vec<(String, String)>,
}

impl TableQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            params: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".into(), columns.into()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.into(), format!("eq.{value}")));
        self
    }

    /// `or=(a,b,...)` where each condition is already in `column.op.value` form
    pub fn or(mut self, conditions: &[String]) -> Self {
        self.params
            .push(("or".into(), format!("({})", conditions.join(","))));
        self
    }

    /// Full-text match against a tsvector column
    pub fn fts(mut self, column: &str, tsquery: &str) -> Self {
        self.params.push((column.into(), format!("fts.{tsquery}")));
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.params.push(("order".into(), format!("{column}.desc")));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.params.push(("limit".into(), n.to_string()));
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// `column.in.(a,b,...)`, for use inside [`TableQuery::or`]
pub fn in_filter<I, T>(column: &str, values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let joined = values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("{column}.in.({joined})")
}

/// Turn free text into a `to_tsquery` expression that requires every word.
///
/// Returns `None` when nothing searchable is left.
pub fn to_tsquery(input: &str) -> Option<String> {
    let terms = input
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join("&"))
    }
}

/// HTTP client for the backend's REST surface
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    config: Config,
    token: AccessToken,
}

impl BackendClient {
    pub fn new(config: Config, token: AccessToken) -> Self {
        Self {
            http: Client::new(),
            config,
            token,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self
            .token
            .get()
            .await
            .unwrap_or_else(|| self.config.anon_key().to_string());
        self.http
            .request(method, url)
            .header("apikey", self.config.anon_key())
            .bearer_auth(bearer)
    }

    async fn table_request(&self, method: Method, query: &TableQuery) -> RequestBuilder {
        let url = self.config.rest_url(query.table());
        self.request(method, &url).await.query(query.params())
    }

    /// `GET /rest/v1/<table>?...`
    pub async fn select<T: DeserializeOwned>(
        &self,
        query: &TableQuery,
    ) -> Result<Vec<T>, ClientError> {
        debug!(table = query.table(), "select");
        let builder = self.table_request(Method::GET, query).await;
        decode(send(builder).await?).await
    }

    /// `POST` returning the inserted rows
    pub async fn insert<B, T>(&self, table: &'static str, body: &B) -> Result<Vec<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(table, "insert");
        let builder = self
            .table_request(Method::POST, &TableQuery::new(table))
            .await
            .header("Prefer", "return=representation")
            .json(body);
        decode(send(builder).await?).await
    }

    /// `POST` without reading the rows back
    pub async fn insert_minimal<B>(&self, table: &'static str, body: &B) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        debug!(table, "insert");
        let builder = self
            .table_request(Method::POST, &TableQuery::new(table))
            .await
            .header("Prefer", "return=minimal")
            .json(body);
        send(builder).await.map(|_| ())
    }

    /// `POST` merging on the primary key
    pub async fn upsert<B>(&self, table: &'static str, body: &B) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        debug!(table, "upsert");
        let builder = self
            .table_request(Method::POST, &TableQuery::new(table))
            .await
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body);
        send(builder).await.map(|_| ())
    }

    /// `PATCH` the rows matched by `query`, returning the rows actually changed
    pub async fn update<B, T>(&self, query: &TableQuery, body: &B) -> Result<Vec<T>, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(table = query.table(), "update");
        let builder = self
            .table_request(Method::PATCH, query)
            .await
            .header("Prefer", "return=representation")
            .json(body);
        decode(send(builder).await?).await
    }

    /// `DELETE` the rows matched by `query`, returning the rows actually removed
    pub async fn delete<T: DeserializeOwned>(
        &self,
        query: &TableQuery,
    ) -> Result<Vec<T>, ClientError> {
        debug!(table = query.table(), "delete");
        let builder = self
            .table_request(Method::DELETE, query)
            .await
            .header("Prefer", "return=representation");
        decode(send(builder).await?).await
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, ClientError> {
    let response = builder.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = ClientError::from_response(status, &body);
    warn!(%status, error = %err, "backend request failed");
    Err(err)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
