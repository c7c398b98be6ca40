pub mod admin;
pub mod preview;
pub mod token;
pub mod upload;
