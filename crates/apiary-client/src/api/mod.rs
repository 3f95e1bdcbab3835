//! Request-facing types and the `ApiClient` interface.
//!
//! `ApiClient` is the fixed surface shared by `HttpClient` and
//! `ClientRegistry`: implementors supply `request`, `abort` and the header
//! mutators, and get the verb helpers and the batch `all` for free.

use apiary_core::error::{ApiaryError, ApiaryResult};
use apiary_core::types::{param_to_string, HttpMethod, Params};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::headers::HeaderSet;
use crate::interceptors::{RequestInterceptor, ResponseInterceptor};
use crate::transport::{TransportBody, TransportRequest};

/// One part of a multipart form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text(String),
    File {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Multipart form payload, sent as-is by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    parts: Vec<(String, FormPart)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a form from a flat parameter map; `null` values are skipped
    pub fn from_params(params: &Params) -> Self {
        params
            .iter()
            .filter(|(_, value)| !value.is_null())
            .fold(FormData::new(), |form, (key, value)| {
                form.text(key.clone(), param_to_string(value))
            })
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Text(value.into())));
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push((
            name.into(),
            FormPart::File {
                file_name: file_name.into(),
                content_type,
                bytes,
            },
        ));
        self
    }

    pub fn parts(&self) -> &[(String, FormPart)] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<(String, FormPart)> {
        self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Body of an outgoing request before encoding
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(FormData),
}

impl Payload {
    pub fn is_form(&self) -> bool {
        matches!(self, Payload::Form(_))
    }
}

/// A fully layered request as seen by `on_request` interceptors
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderSet,
    pub body: Option<Payload>,
}

impl OutgoingRequest {
    /// Encode the body and hand the request to the transport layer
    pub fn into_transport(self) -> ApiaryResult<TransportRequest> {
        let body = match self.body {
            Some(Payload::Json(value)) => {
                let text = serde_json::to_string(&value).map_err(|e| ApiaryError::Serialization {
                    message: e.to_string(),
                    source: e,
                })?;
                Some(TransportBody::Text(text))
            },
            Some(Payload::Form(form)) => Some(TransportBody::Multipart(form)),
            None => None,
        };

        Ok(TransportRequest {
            method: self.method,
            url: self.url,
            headers: self.headers.to_pairs(),
            body,
        })
    }
}

/// Per-call request options
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Method used when the target carries no `"<METHOD>:"` prefix
    pub method: Option<HttpMethod>,
    /// Parameters appended to the URL as a query string
    pub query: Option<Params>,
    pub body: Option<Payload>,
    /// Headers applied after config, dynamic and runtime headers
    pub headers: HeaderSet,
    pub on_request: Option<RequestInterceptor>,
    pub on_response: Option<ResponseInterceptor>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn query(mut self, params: Params) -> Self {
        self.query = Some(params);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Payload::Json(body));
        self
    }

    pub fn form(mut self, form: FormData) -> Self {
        self.body = Some(Payload::Form(form));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn on_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut OutgoingRequest) -> Option<Value> + Send + Sync + 'static,
    {
        self.on_request = Some(std::sync::Arc::new(f));
        self
    }

    pub fn on_response<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.on_response = Some(std::sync::Arc::new(f));
        self
    }
}

/// One entry of a batch passed to `ApiClient::all`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// `get`, `post`, `put`, `delete` (or `del`) or `upload`
    pub method: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, String>,
}

impl RequestDescriptor {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            params: None,
            body: None,
            headers: IndexMap::new(),
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("get", uri)
    }

    pub fn post(uri: impl Into<String>, body: Value) -> Self {
        Self::new("post", uri).body(body)
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Translate into request options with the same placement rules as the
    /// verb helpers: `get` puts params in the query string, body verbs send
    /// `body` (or params when no body is given), `upload` builds a form.
    pub fn into_options(self) -> ApiaryResult<(String, RequestOptions)> {
        let mut options = RequestOptions::new();
        options.headers.extend(self.headers);

        match self.method.to_ascii_lowercase().as_str() {
            "get" => {
                options.method = Some(HttpMethod::Get);
                options.query = self.params;
            },
            verb @ ("post" | "put" | "delete" | "del") => {
                options.method = Some(match verb {
                    "post" => HttpMethod::Post,
                    "put" => HttpMethod::Put,
                    _ => HttpMethod::Delete,
                });
                match (self.body, self.params) {
                    (Some(body), params) => {
                        options.body = Some(Payload::Json(body));
                        options.query = params;
                    },
                    (None, Some(params)) => options.body = Some(Payload::Json(Value::Object(params))),
                    (None, None) => {},
                }
            },
            "upload" => {
                options.method = Some(HttpMethod::Post);
                let form = self.params.as_ref().map(FormData::from_params).unwrap_or_default();
                options.body = Some(Payload::Form(form));
            },
            _ => {
                return Err(ApiaryError::UnsupportedMethod {
                    method: self.method,
                })
            },
        }

        Ok((self.uri, options))
    }
}

/// Fixed client surface implemented by `HttpClient` and `ClientRegistry`
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Issue one request. `Ok(None)` is the abort sentinel.
    async fn request(&self, target: &str, options: RequestOptions) -> ApiaryResult<Option<Value>>;

    /// Cancel every in-flight request and start a fresh generation
    fn abort(&self) -> ApiaryResult<()>;

    /// Set a runtime header sent with every later request
    fn set_header(&self, name: &str, value: &str) -> ApiaryResult<()>;

    /// Remove a runtime header
    fn unset_header(&self, name: &str) -> ApiaryResult<()>;

    /// Remove all runtime headers; config headers are untouched
    fn clear_headers(&self) -> ApiaryResult<()>;

    async fn get(&self, target: &str, query: Option<Params>) -> ApiaryResult<Option<Value>> {
        let options = RequestOptions {
            method: Some(HttpMethod::Get),
            query,
            ..RequestOptions::default()
        };
        self.request(target, options).await
    }

    async fn post(&self, target: &str, body: Option<Value>) -> ApiaryResult<Option<Value>> {
        self.request(target, body_options(HttpMethod::Post, body)).await
    }

    async fn put(&self, target: &str, body: Option<Value>) -> ApiaryResult<Option<Value>> {
        self.request(target, body_options(HttpMethod::Put, body)).await
    }

    async fn del(&self, target: &str, body: Option<Value>) -> ApiaryResult<Option<Value>> {
        self.request(target, body_options(HttpMethod::Delete, body)).await
    }

    async fn upload(&self, target: &str, form: FormData) -> ApiaryResult<Option<Value>> {
        let options = RequestOptions::new().method(HttpMethod::Post).form(form);
        self.request(target, options).await
    }

    /// Run a batch concurrently; results keep input order.
    ///
    /// The batch fails as a whole on the first error, including an entry
    /// with an unsupported method.
    async fn all(&self, requests: Vec<RequestDescriptor>) -> ApiaryResult<Vec<Option<Value>>> {
        let prepared = requests
            .into_iter()
            .map(RequestDescriptor::into_options)
            .collect::<ApiaryResult<Vec<_>>>()?;

        let calls = prepared
            .iter()
            .map(|(uri, options)| self.request(uri, options.clone()));

        futures::future::try_join_all(calls).await
    }
}

fn body_options(method: HttpMethod, body: Option<Value>) -> RequestOptions {
    RequestOptions {
        method: Some(method),
        body: body.map(Payload::Json),
        ..RequestOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn test_get_descriptor_uses_query() {
        let (uri, options) = RequestDescriptor::get("users")
            .params(params(json!({"page": 2})))
            .into_options()
            .unwrap();
        assert_eq!(uri, "users");
        assert_eq!(options.method, Some(HttpMethod::Get));
        assert_eq!(options.query, Some(params(json!({"page": 2}))));
        assert!(options.body.is_none());
    }

    #[test]
    fn test_body_descriptor_falls_back_to_params() {
        let (_, options) = RequestDescriptor::new("PUT", "users/1")
            .params(params(json!({"name": "x"})))
            .into_options()
            .unwrap();
        assert_eq!(options.method, Some(HttpMethod::Put));
        assert_eq!(options.body, Some(Payload::Json(json!({"name": "x"}))));
        assert!(options.query.is_none());
    }

    #[test]
    fn test_del_alias_and_headers() {
        let (_, options) = RequestDescriptor::new("del", "users/1")
            .header("X-Trace", "abc")
            .into_options()
            .unwrap();
        assert_eq!(options.method, Some(HttpMethod::Delete));
        assert_eq!(options.headers.get("x-trace"), Some("abc"));
    }

    #[test]
    fn test_upload_descriptor_builds_form() {
        let (_, options) = RequestDescriptor::new("upload", "files")
            .params(params(json!({"name": "a.txt", "size": 3, "skip": null})))
            .into_options()
            .unwrap();
        let expected = FormData::new().text("name", "a.txt").text("size", "3");
        assert_eq!(options.body, Some(Payload::Form(expected)));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = RequestDescriptor::new("teleport", "x").into_options().err().unwrap();
        assert!(matches!(err, ApiaryError::UnsupportedMethod { method } if method == "teleport"));
    }

    #[test]
    fn test_into_transport_encodes_json() {
        let request = OutgoingRequest {
            method: HttpMethod::Post,
            url: "https://h/x".to_string(),
            headers: HeaderSet::new(),
            body: Some(Payload::Json(json!({"a": 1}))),
        };
        let transport = request.into_transport().unwrap();
        assert_eq!(transport.body, Some(TransportBody::Text("{\"a\":1}".to_string())));
    }

    #[test]
    fn test_descriptor_deserializes() {
        let descriptor: RequestDescriptor =
            serde_json::from_value(json!({"method": "get", "uri": "users", "params": {"q": "a"}}))
                .unwrap();
        assert_eq!(descriptor, RequestDescriptor::get("users").params(params(json!({"q": "a"}))));
    }
}
