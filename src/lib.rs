pub mod cors;
pub mod error;
pub mod io_struct;
pub mod relay_state;
pub mod server;

pub use error::RelayError;
pub use relay_state::{RelayConfig, RelayState};
