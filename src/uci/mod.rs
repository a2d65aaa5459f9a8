//! UCI engine subprocess transport (C1).

mod transport;

pub use transport::{EngineTransport, UciProcess};
