//! Data models

pub mod dataset;
pub mod session;
pub mod user;
pub mod view;

pub use dataset::*;
pub use session::*;
pub use user::*;
pub use view::*;
