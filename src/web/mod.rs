pub mod auth;
pub mod routes;
pub mod server;

pub use routes::AppState;
pub use server::WebServer;
