//! Core types shared across the crate.

/// Key-value pair list for request parameters.
///
/// Preserves the caller's insertion order (faster than a HashMap for
/// the small collections a single request carries). Duplicate keys are
/// tolerated; lookups treat the last occurrence as authoritative.
pub type ParamList = Vec<(String, String)>;
