pub mod client;
pub mod dispatch;
pub mod server;

pub use client::call;
pub use server::run_blocking_tcp_server;
