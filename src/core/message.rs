use crate::core::value::Value;
use std::collections::BTreeMap;

/// Header naming the payload's content type.
pub const CONTENT_TYPE: &str = "content-type";
/// Header naming the content type the caller wants back.
pub const ACCEPT: &str = "accept";

/// A payload plus the headers negotiation reads.
///
/// Header names are stored lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    payload: Value,
    headers: BTreeMap<String, String>,
}

impl Message {
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header(CONTENT_TYPE, content_type)
    }

    pub fn with_accept(self, accept: impl Into<String>) -> Self {
        self.with_header(ACCEPT, accept)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    pub fn accept(&self) -> Option<&str> {
        self.header(ACCEPT)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}
