pub mod handlers;
pub mod stager;
