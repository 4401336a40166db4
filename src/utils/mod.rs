pub mod format;
pub mod sequence;
pub mod validation;
