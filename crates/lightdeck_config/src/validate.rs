use crate::Diagnostic;

/// Trait for validating cross-field constraints in configuration.
///
/// Shape checks happen while the document is converted into typed config;
/// this hook runs afterwards and sees the whole typed value, so it can check
/// relationships between entries (for example the same light declared twice
/// in one group).
///
/// ## Example
///
/// ```ignore
/// impl Validate for CardConfig {
///     fn validate(&self) -> Vec<Diagnostic> {
///         self.groups
///             .iter()
///             .enumerate()
///             .filter(|(_, g)| g.entity.is_none() && g.lights.is_empty())
///             .map(|(i, _)| Diagnostic::ignored(format!("groups[{}]", i), "group has no lights"))
///             .collect()
///     }
/// }
/// ```
pub trait Validate {
    /// Validate cross-field constraints.
    ///
    /// Returns a vector of diagnostics (errors or warnings) found during
    /// validation. The default implementation performs no validation and
    /// returns an empty vector.
    fn validate(&self) -> Vec<Diagnostic> {
        Vec::new()
    }
}
