//! Procedural macros for sigbridge.
//!
//! - `#[register_adapter(capability, "name")]` - wires an adapter constructor into
//!   the link-time `ADAPTER_REGISTRY` of `sigbridge-core`
//!
//! # Example
//!
//! ```rust,ignore
//! use sigbridge_core::{BoxedExternalSystemAdapter, BoxedProcessModelAdapter};
//! use sigbridge_macros::register_adapter;
//!
//! #[register_adapter(external_system, "opcua")]
//! fn opcua_external() -> BoxedExternalSystemAdapter {
//!     Box::new(OpcUaAdapter::default())
//! }
//!
//! #[register_adapter(process_model, "fmu")]
//! fn fmu_model() -> BoxedProcessModelAdapter {
//!     Box::new(FmuModel::default())
//! }
//! ```

mod register;

use proc_macro::TokenStream;

/// Registers a constructor function under a configured adapter type name.
///
/// The first argument is the capability (`external_system` or `process_model`),
/// the second the type name configuration refers to. The decorated function must
/// take no arguments and return the matching boxed adapter type.
#[proc_macro_attribute]
pub fn register_adapter(attr: TokenStream, item: TokenStream) -> TokenStream {
    register::register_adapter(attr, item)
}
