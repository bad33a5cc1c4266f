pub mod config;
pub mod manager;
pub mod network;
pub mod request;
pub mod response;
pub mod storage;

pub use config::*;
pub use manager::*;
pub use network::*;
pub use request::*;
pub use response::*;
pub use storage::*;
