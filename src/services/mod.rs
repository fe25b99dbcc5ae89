pub mod access;
pub mod directory;
pub mod intake;
pub mod links;
pub mod team;
pub mod webhook;
