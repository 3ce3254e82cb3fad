//! Bundle compatibility checking.
//!
//! Every component declaring a `bundle` must resolve to an installed
//! extension, unless it sits inside a `template` subtree. Templates are
//! inert definitions and are never instantiated from the flow itself.

use crate::registry::{ExtensionResolver, ResolveError};
use flowgate_core::{BundleCoordinate, FlowError};
use flowgate_document::{Element, ElementId, FlowDocument};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

const BUNDLE: &str = "bundle";
const TEMPLATE: &str = "template";

/// Component type plus the bundle it declares
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BundleReference {
    /// Fully qualified component type (the component's `class`)
    pub component_type: String,
    /// Declared bundle coordinates
    pub coordinate: BundleCoordinate,
}

impl BundleReference {
    /// Read the reference declared by `bundle`, owned by `component`
    #[must_use]
    pub fn from_elements(component: Element<'_>, bundle: Element<'_>) -> Self {
        let text = |e: Element<'_>, name: &str| e.child_text(name).unwrap_or("").trim().to_string();
        Self {
            component_type: text(component, "class"),
            coordinate: BundleCoordinate::new(
                text(bundle, "group"),
                text(bundle, "artifact"),
                text(bundle, "version"),
            ),
        }
    }
}

impl fmt::Display for BundleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.component_type, self.coordinate)
    }
}

/// A live component whose bundle cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingBundle {
    /// The unresolved reference
    pub reference: BundleReference,
    /// The owning component element
    pub component: ElementId,
    /// Resolution failure
    pub reason: ResolveError,
}

impl fmt::Display for MissingBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reference, self.reason)
    }
}

/// Bundle check failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// A component outside any template declares an unresolvable bundle
    #[error("Missing bundle for {component_type} from {coordinate}: {reason}")]
    MissingBundle {
        /// Declared component type
        component_type: String,
        /// Declared bundle coordinates
        coordinate: BundleCoordinate,
        /// Resolution failure
        #[source]
        reason: ResolveError,
    },
}

impl From<MissingBundle> for CheckError {
    fn from(missing: MissingBundle) -> Self {
        Self::MissingBundle {
            component_type: missing.reference.component_type,
            coordinate: missing.reference.coordinate,
            reason: missing.reason,
        }
    }
}

impl From<CheckError> for FlowError {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::MissingBundle {
                component_type,
                coordinate,
                reason,
            } => FlowError::MissingBundle {
                component_type,
                coordinate,
                reason: reason.to_string(),
            },
        }
    }
}

/// Whether `element` is a template or lies anywhere inside one
#[must_use]
pub fn within_template(element: Element<'_>) -> bool {
    element.is_within(TEMPLATE)
}

/// Every element inside a template subtree, templates included.
///
/// Computed in one top-down pass: document order visits parents first.
#[must_use]
pub fn template_scope(doc: &FlowDocument) -> HashSet<ElementId> {
    let mut scope = HashSet::new();
    for element in doc.elements() {
        let inherited = element
            .parent()
            .is_some_and(|parent| scope.contains(&parent.id()));
        if inherited || element.name() == TEMPLATE {
            scope.insert(element.id());
        }
    }
    scope
}

/// Checks a document against the installed extensions
pub struct BundleChecker<'r> {
    resolver: &'r dyn ExtensionResolver,
}

impl<'r> BundleChecker<'r> {
    /// Create a checker backed by `resolver`
    #[must_use]
    pub fn new(resolver: &'r dyn ExtensionResolver) -> Self {
        Self { resolver }
    }

    /// Check every live component, stopping at the first missing bundle.
    ///
    /// # Errors
    ///
    /// Returns error for the first component, in document order, whose
    /// bundle cannot be resolved
    pub fn check(&self, doc: &FlowDocument) -> Result<(), CheckError> {
        let mut checked = 0usize;
        for bundle in doc.elements_named(BUNDLE) {
            let Some(component) = bundle.parent() else {
                continue;
            };
            if within_template(component) {
                debug!(component = component.name(), "skipping template component");
                continue;
            }

            if let Err(missing) = self.resolve(component, bundle) {
                error!(
                    component_type = %missing.reference.component_type,
                    coordinate = %missing.reference.coordinate,
                    "{}",
                    missing.reason
                );
                return Err(missing.into());
            }
            checked += 1;
        }

        debug!(components = checked, "bundle compatibility verified");
        Ok(())
    }

    /// Check every live component and report all missing bundles.
    ///
    /// Unlike [`check`](Self::check) this never stops early; an empty result
    /// means the document is compatible.
    #[must_use]
    pub fn check_all(&self, doc: &FlowDocument) -> Vec<MissingBundle> {
        let scope = template_scope(doc);
        let missing: Vec<_> = doc
            .elements_named(BUNDLE)
            .filter_map(|bundle| {
                let component = bundle.parent()?;
                if scope.contains(&component.id()) {
                    return None;
                }
                self.resolve(component, bundle).err()
            })
            .collect();

        for m in &missing {
            error!(
                component_type = %m.reference.component_type,
                coordinate = %m.reference.coordinate,
                "{}",
                m.reason
            );
        }
        missing
    }

    fn resolve(&self, component: Element<'_>, bundle: Element<'_>) -> Result<(), MissingBundle> {
        let reference = BundleReference::from_elements(component, bundle);
        match self
            .resolver
            .resolve(&reference.component_type, &reference.coordinate)
        {
            Ok(_) => Ok(()),
            Err(reason) => Err(MissingBundle {
                reference,
                component: component.id(),
                reason,
            }),
        }
    }
}

impl fmt::Debug for BundleChecker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleChecker").finish_non_exhaustive()
    }
}
