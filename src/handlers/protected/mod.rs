// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every handler here receives the authenticated Principal from the JWT
// middleware via request extensions.

pub mod access;
pub mod invites;
pub mod leads;
pub mod links;
pub mod team;

// Re-export handler functions for use in routing
pub use access::check as access_check;
pub use access::grant as access_grant;
pub use access::revoke as access_revoke;

pub use invites::accept as invite_accept;

pub use team::add_physician as team_add_physician;
pub use team::invite as team_invite;
pub use team::members as team_members;
pub use team::reactivate as team_reactivate;
pub use team::remove as team_remove;
pub use team::suspend as team_suspend;
pub use team::update_role as team_update_role;

pub use links::create as link_create;
pub use links::list as link_list;

pub use leads::list as lead_list;
