pub mod dispatch;
pub mod protocol;
pub mod state;
pub mod webhook;

// Re-export the pieces the binary wires together.
pub use dispatch::Dispatcher;
pub use state::AppState;
pub use webhook::{router, serve};
