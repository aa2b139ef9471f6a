pub mod congestion;
pub mod consts;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod rtt;
pub mod segment;
pub mod stop_and_wait;
pub mod window;
pub mod wire;

pub use consts::*;
pub use error::*;
