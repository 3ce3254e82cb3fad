//! FLOWGATE Extensions
//!
//! The installed-extension registry and the bundle compatibility checker.
//! A flow can only load when every live component resolves to an installed
//! bundle; components inside templates are exempt.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checker;
pub mod registry;

pub use checker::{
    BundleChecker, BundleReference, CheckError, MissingBundle, template_scope, within_template,
};
pub use registry::{
    Bundle, ExtensionManifest, ExtensionRegistry, ExtensionResolver, RegistryError, ResolveError,
    SharedRegistry,
};
