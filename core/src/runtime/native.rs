//! In-process module runtime
//!
//! Rust modules registered by name stand in for interpreter modules. Lookup is
//! dynamic, the same as in an interpreter: `invoke("local_tts", "generate_tts", ..)`
//! finds the module, then the function, then calls it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use super::{EmbeddedRuntime, HostPlatform, RuntimeValue};
use crate::{LogosError, Result};

/// A module callable through the native runtime
#[async_trait]
pub trait NativeModule: Send + Sync {
    fn name(&self) -> &str;

    /// Names of the callable attributes this module exposes
    fn functions(&self) -> Vec<String>;

    /// Hook run once when the owning runtime starts
    async fn on_start(&self, _platform: &HostPlatform) -> Result<()> {
        Ok(())
    }

    /// Call `function` with positional arguments. Only called for names listed by `functions`.
    async fn call(&self, function: &str, args: &[String]) -> Result<RuntimeValue>;
}

/// A single callable attribute
#[async_trait]
pub trait NativeFunction: Send + Sync {
    async fn call(&self, args: &[String]) -> Result<RuntimeValue>;
}

struct FnFunction<F>(F);

#[async_trait]
impl<F> NativeFunction for FnFunction<F>
where
    F: Fn(&[String]) -> Result<RuntimeValue> + Send + Sync,
{
    async fn call(&self, args: &[String]) -> Result<RuntimeValue> {
        (self.0)(args)
    }
}

/// Module assembled from a table of functions
pub struct FunctionModule {
    name: String,
    functions: BTreeMap<String, Arc<dyn NativeFunction>>,
}

impl FunctionModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: BTreeMap::new(),
        }
    }

    pub fn with_function(mut self, name: impl Into<String>, f: Arc<dyn NativeFunction>) -> Self {
        self.functions.insert(name.into(), f);
        self
    }

    /// Add a synchronous closure as a function
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[String]) -> Result<RuntimeValue> + Send + Sync + 'static,
    {
        self.with_function(name, Arc::new(FnFunction(f)))
    }
}

#[async_trait]
impl NativeModule for FunctionModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn functions(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    async fn call(&self, function: &str, args: &[String]) -> Result<RuntimeValue> {
        let f = self
            .functions
            .get(function)
            .cloned()
            .ok_or_else(|| LogosError::FunctionNotFound {
                module: self.name.clone(),
                function: function.to_string(),
            })?;
        f.call(args).await
    }
}

/// Registry-backed [`EmbeddedRuntime`]
#[derive(Default)]
pub struct NativeRuntime {
    modules: DashMap<String, Arc<dyn NativeModule>>,
}

impl NativeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module; a later registration with the same name replaces the earlier one
    pub fn register(&self, module: Arc<dyn NativeModule>) {
        let name = module.name().to_string();
        info!(target: "native_runtime", module = %name, functions = ?module.functions(), "Registering native module");
        self.modules.insert(name, module);
    }

    pub fn with_module(self, module: Arc<dyn NativeModule>) -> Self {
        self.register(module);
        self
    }

    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn get(&self, name: &str) -> Option<Arc<dyn NativeModule>> {
        self.modules.get(name).map(|m| Arc::clone(m.value()))
    }
}

#[async_trait]
impl EmbeddedRuntime for NativeRuntime {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn start(&self, platform: &HostPlatform) -> Result<()> {
        // collect first so no map guard is held across an await
        let modules: Vec<Arc<dyn NativeModule>> =
            self.modules.iter().map(|e| Arc::clone(e.value())).collect();
        for module in modules {
            module.on_start(platform).await?;
        }
        info!(target: "native_runtime", modules = ?self.module_names(), "Native runtime ready");
        Ok(())
    }

    async fn invoke(&self, module: &str, function: &str, args: &[String]) -> Result<RuntimeValue> {
        let m = self
            .get(module)
            .ok_or_else(|| LogosError::ModuleNotFound(module.to_string()))?;
        if !m.functions().iter().any(|f| f == function) {
            return Err(LogosError::FunctionNotFound {
                module: module.to_string(),
                function: function.to_string(),
            });
        }
        debug!(target: "native_runtime", module = %module, function = %function, "Invoking native function");
        m.call(function, args).await
    }
}
