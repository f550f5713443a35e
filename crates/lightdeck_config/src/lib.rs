mod diagnostics;
mod source;
mod validate;

// Re-export diagnostic types
pub use diagnostics::Diagnostic;
pub use diagnostics::Diagnostics;
pub use diagnostics::Error;
pub use diagnostics::IgnoredEntry;
pub use diagnostics::LoadError;
pub use diagnostics::SourceInfo;
pub use diagnostics::ValidationError;
pub use diagnostics::Warning;
pub use diagnostics::format_diagnostics;
pub use source::Document;
pub use source::Format;
pub use validate::Validate;
