//! Data models for Hallkeep

mod assignment;
mod audit;
mod request;
mod residence;
mod user;

pub use assignment::*;
pub use audit::*;
pub use request::*;
pub use residence::*;
pub use user::*;
