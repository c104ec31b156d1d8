//! Coverage scope resolution.
//!
//! Coverage declarations sit on packages and (possibly nested) types, which
//! form a containment tree keyed by dotted path. The nearest declared ancestor
//! of a unit, the unit itself included, decides whether it is measured. A unit
//! with no declaration anywhere on its ancestor chain is excluded.
//!
//! An excluded outer scope with an undeclared inner unit stays excluded: the
//! only way back in is an explicit nested inclusion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{normalize_unit, CoverageDecl};

/// Include/exclude decision for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDecision {
    pub included: bool,
    /// The declared path that decided, or `None` when nothing applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_at: Option<String>,
}

/// Per-project coverage scope declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeResolver {
    /// Declared path -> excluded.
    declarations: BTreeMap<String, bool>,
}

impl ScopeResolver {
    /// Build a resolver from one project's declarations.
    ///
    /// Repeating a declaration is harmless; declaring the same unit both
    /// included and excluded is an error.
    pub fn new<'a>(
        project: &str,
        decls: impl IntoIterator<Item = &'a CoverageDecl>,
    ) -> Result<Self, ConfigError> {
        let mut declarations = BTreeMap::new();
        for decl in decls {
            let unit = normalize_unit(&decl.unit);
            match declarations.insert(unit.clone(), decl.exclude) {
                Some(previous) if previous != decl.exclude => {
                    return Err(ConfigError::ConflictingScope {
                        project: project.to_string(),
                        unit,
                    });
                }
                _ => {}
            }
        }
        Ok(Self { declarations })
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Declared paths and their `exclude` flags, in path order.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, bool)> {
        self.declarations.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Resolve a unit against the nearest declared ancestor.
    pub fn resolve(&self, unit: &str) -> ScopeDecision {
        let unit = normalize_unit(unit);
        let decision = ancestors(&unit)
            .find_map(|path| {
                self.declarations.get(path).map(|excluded| ScopeDecision {
                    included: !excluded,
                    declared_at: Some(path.to_string()),
                })
            })
            .unwrap_or(ScopeDecision {
                included: false,
                declared_at: None,
            });
        decision
    }

    pub fn is_included(&self, unit: &str) -> bool {
        self.resolve(unit).included
    }
}

/// The unit itself, then each enclosing path: `a.b.C` -> `a.b.C`, `a.b`, `a`.
fn ancestors(unit: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(unit).filter(|u| !u.is_empty()), |&path| {
        path.rfind('.').map(|idx| &path[..idx])
    })
}
