pub mod access;
pub mod leads;
pub mod links;
pub mod token;
