pub mod gateway;
pub mod handlers;
pub mod notice;
pub mod turn;
