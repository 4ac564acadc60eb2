//! Required-set vs. catalog gap computation.

use crate::prereqs::catalog::FeatureCatalog;

/// Identifiers in `required` that `catalog` does not mark installed.
///
/// Matching is by exact identifier. Identifiers the catalog does not list at
/// all count as missing. The result keeps the declaration order of
/// `required`, so install commands built from it are the same on every run.
pub fn resolve_missing<S: AsRef<str>>(required: &[S], catalog: &FeatureCatalog) -> Vec<String> {
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !catalog.is_installed(name))
        .map(str::to_string)
        .collect()
}

/// Gaps for one invocation: mandatory and recommended components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Mandatory components still to install, in declaration order.
    pub missing: Vec<String>,
    /// Recommended components that are absent; reported, never installed.
    pub recommended_missing: Vec<String>,
}

impl Resolution {
    /// Resolve both sets against one snapshot.
    pub fn compute<S: AsRef<str>>(
        required: &[S],
        recommended: &[S],
        catalog: &FeatureCatalog,
    ) -> Self {
        Self {
            missing: resolve_missing(required, catalog),
            recommended_missing: resolve_missing(recommended, catalog),
        }
    }

    /// Whether every mandatory component is present.
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty()
    }
}
