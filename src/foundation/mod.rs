/// Core value types shared by every module.
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
pub(crate) mod math;
