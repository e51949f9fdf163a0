pub mod error;
pub mod document;
pub mod merge;
pub mod paths;
pub mod variant;
pub mod multilib;
pub mod uncleanup;
pub mod cli;

pub use document::{Document, DocumentFormat, load_document, save_document};
pub use error::{ManifestError, Result};
pub use multilib::{ExpansionStats, multilibify};
pub use uncleanup::{UncleanupRules, uncleanup};
pub use variant::{Variant, VariantSpec, VariantTable};
