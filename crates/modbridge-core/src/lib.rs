//! Modbridge core - native modules as script host objects
//!
//! A [`ModuleRegistry`] collects one native module's constants and functions
//! and exposes them to a script runtime as a single host object. Property
//! reads resolve constants (converted through the module's [`ValueCodec`])
//! and functions (converted once per runtime into script functions).
//! Synchronous functions run on the engine thread; asynchronous ones run on a
//! [`Dispatcher`] and settle a promise back on the engine thread.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use modbridge_core::{ModuleHost, WorkerPool};
//! use modbridge_sdk::{DynamicValue, TypeTag};
//!
//! let pool = Arc::new(WorkerPool::with_workers(2)?);
//! let host = ModuleHost::new("NativeModules", pool);
//!
//! let clipboard = host.create_module("Clipboard")?;
//! clipboard.export_constant("maxLength", 4096);
//! clipboard.register_async_function("read", vec![], |_args, promise| {
//!     promise.resolve("clipboard contents");
//! })?;
//!
//! host.install(&runtime)?;
//! ```
//!
//! [`ValueCodec`]: modbridge_sdk::ValueCodec
//! [`Dispatcher`]: modbridge_sdk::Dispatcher

#![warn(missing_docs)]

pub mod arena;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod module_host;
pub mod pool;
pub mod registry;

mod callable;
mod host_object;

pub use arena::{CallbackArena, CallbackId};
pub use codec::{DefaultCodec, DEFAULT_MAX_DEPTH};
pub use config::{
    BridgeConfig, CodecConfig, ConfigError, DispatcherConfig, DuplicatePolicy, RegistrationConfig,
};
pub use descriptor::MethodDescriptor;
pub use error::{BridgeError, BridgeResult};
pub use module_host::ModuleHost;
pub use pool::WorkerPool;
pub use registry::{ModuleRegistry, ModuleRegistryBuilder};
