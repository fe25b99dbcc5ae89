// handlers/mod.rs - Two-tier handler architecture
//
// Public (no auth): short link redirects, lead intake, liveness.
// Protected (JWT auth): everything under /api except the intake webhook.

pub mod protected;
pub mod public;
