// handlers/mod.rs - Handlers grouped by security tier
//
// Public (no session) → Protected (any signed-in subject) → Elevated (admin
// subject or trusted service key)
pub mod public;
pub mod protected;
pub mod elevated;
