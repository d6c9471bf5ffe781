//! Option resolution for selectable fields.

pub mod resolver;
pub mod source;

pub use resolver::{DependentOptionResolver, ResolverConfig};
pub use source::{HttpOptionSource, OptionSource};
