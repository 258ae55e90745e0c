pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::SiteState;
pub use routes::create_site_router;
