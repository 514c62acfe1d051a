//! Server rendered front end of the campus events platform. Pages are plain
//! HTML forms, every session keeps its [`state::AppState`] on the server.

pub mod capacity;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod forms;
pub mod render;
pub mod server;
pub mod session;
pub mod state;

pub use error::FrontendError;
pub use server::{run_server, Frontend};
