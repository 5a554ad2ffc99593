pub mod collection_handlers;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod user_handlers;

pub use error::*;
pub use handlers::*;
pub use routes::*;
pub use server::*;
pub use state::*;
