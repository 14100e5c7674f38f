pub mod sanitize;
pub use sanitize::{LabelErrors, Sanitize, split_labels};
