// handlers/elevated/mod.rs - Elevated handlers (admin privileges required)
//
// Security Level: admin subject, or trusted service key for the claim API
// Middleware: admin_page_gate for /admin; the claim handlers authorize the
// caller themselves after validating the request body.

pub mod claims;
pub mod overview;

pub use claims::{grant_admin, revoke_admin};
pub use overview::overview;
