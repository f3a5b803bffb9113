pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod subtitles;
pub mod upstream;

pub use routes::create_router;
