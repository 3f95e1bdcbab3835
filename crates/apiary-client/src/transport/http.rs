//! reqwest-backed transport with connection pooling

use std::time::Duration;

use apiary_core::error::{ApiaryError, ApiaryResult};
use apiary_core::types::HttpMethod;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, Method};

use super::{Transport, TransportBody, TransportRequest, TransportResponse};
use crate::api::{FormData, FormPart};

/// Default transport used by `HttpClient`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Underlying HTTP client with connection pooling
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport without a request timeout
    pub fn new() -> ApiaryResult<Self> {
        Self::with_timeout(None)
    }

    /// Create a transport with an optional per-request timeout
    pub fn with_timeout(timeout: Option<Duration>) -> ApiaryResult<Self> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("apiary/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ApiaryError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, request: TransportRequest) -> ApiaryResult<TransportResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Some(TransportBody::Text(text)) => builder.body(text),
            Some(TransportBody::Multipart(form)) => builder.multipart(to_multipart(form)?),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            ApiaryError::network(format!("{} {} failed: {}", request.method, request.url, e), e)
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiaryError::network(format!("Failed to read response body: {}", e), e))?;

        Ok(TransportResponse { status, body })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

fn to_multipart(form: FormData) -> ApiaryResult<Form> {
    let mut multipart = Form::new();

    for (name, part) in form.into_parts() {
        multipart = match part {
            FormPart::Text(value) => multipart.text(name, value),
            FormPart::File {
                file_name,
                content_type,
                bytes,
            } => {
                let mut file = Part::bytes(bytes).file_name(file_name);
                if let Some(content_type) = content_type {
                    file = file.mime_str(&content_type).map_err(|e| {
                        ApiaryError::network(format!("Invalid content type '{}'", content_type), e)
                    })?;
                }
                multipart.part(name, file)
            },
        };
    }

    Ok(multipart)
}
