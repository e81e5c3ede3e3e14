pub mod comment;
pub mod geodata;
pub mod saved_search;
pub mod user;
