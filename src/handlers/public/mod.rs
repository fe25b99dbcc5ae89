// handlers/public/mod.rs - Public handlers (no authentication required)

pub mod intake;
pub mod links;

// Re-export handler functions for use in routing
pub use intake::post as lead_intake_post;
pub use links::get as short_link_get;
