pub mod prelude;

pub mod comments;
pub mod geodata;
pub mod layers;
pub mod saved_searches;
pub mod users;
