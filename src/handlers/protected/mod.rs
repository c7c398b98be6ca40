// handlers/protected/mod.rs - Protected handlers (signed-in subject required)
//
// Security Level: session gate with the Authenticated predicate
// Middleware: member_page_gate (views) / member_api_gate (JSON endpoints)
// Handlers read the gated subject from the `Subject` extension.

pub mod dashboard;
pub mod upload;

pub use dashboard::{dashboard, me};
pub use upload::upload;
