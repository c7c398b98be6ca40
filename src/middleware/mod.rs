pub mod gate;
pub mod response;

pub use gate::{admin_page_gate, member_api_gate, member_page_gate, GateMode, Subject};
pub use response::{ApiResponse, ApiResult};
