//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Sizing class used by manifests in the integration suite.
pub const DEFAULT_SIZE_CLASS: &str = "DEV1-S";

/// Region used when a manifest names none.
pub const DEFAULT_REGION: &str = "fr-par";

/// Project used when a manifest names none.
pub const DEFAULT_PROJECT: &str = "11111111-2222-3333-4444-555555555555";
