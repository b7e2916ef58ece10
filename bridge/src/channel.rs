//! Method channel
//!
//! A named channel that routes method calls to registered handlers. Calls for
//! a method with no handler get [`MethodResult::NotImplemented`]. That is a soft
//! signal, not an error, so callers can probe for operations added later.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

/// One invocation arriving on the channel
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: HashMap<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// String argument by key; `None` when missing or not a string
    pub fn argument_str(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(Value::as_str)
    }
}

/// Structured failure returned to the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodError {
    pub code: String,
    pub message: String,
    pub details: String,
}

/// Outcome of exactly one [`MethodCall`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodResult {
    Success(String),
    Error(MethodError),
    NotImplemented,
}

impl MethodResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success(_))
    }
}

/// Handler for a single method name
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Method name this handler answers to
    fn method(&self) -> &str;

    async fn handle(&self, call: MethodCall) -> MethodResult;
}

pub struct MethodChannel {
    name: String,
    handlers: DashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a handler; a later registration for the same method replaces the earlier one
    pub fn register(&self, handler: Arc<dyn MethodHandler>) {
        let method = handler.method().to_string();
        info!(target: "channel", channel = %self.name, method = %method, "Registering method handler");
        self.handlers.insert(method, handler);
    }

    /// Registered method names, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        methods.sort();
        methods
    }

    #[tracing::instrument(skip(self, call), fields(channel = %self.name, method = %call.method))]
    pub async fn dispatch(&self, call: MethodCall) -> MethodResult {
        // clone out of the map so no guard is held while the handler runs
        let handler = self.handlers.get(&call.method).map(|h| Arc::clone(h.value()));
        match handler {
            Some(h) => h.handle(call).await,
            None => {
                debug!(target: "channel", channel = %self.name, method = %call.method, "Method not implemented");
                MethodResult::NotImplemented
            }
        }
    }
}
