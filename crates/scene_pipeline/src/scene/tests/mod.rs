//! End-to-end scenarios for the cull → sort → render pipeline
//!
//! Scenes are built through the public graph API and rendered against the
//! headless backend, so every stage runs exactly as it does in an
//! application.

mod shadow_scenarios;
