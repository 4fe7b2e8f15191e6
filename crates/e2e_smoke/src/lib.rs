//! Test-only crate; see `tests/smoke.rs`.
