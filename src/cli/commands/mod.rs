mod import;
mod list;
mod services;

pub use import::cmd_import;
pub use list::cmd_list_geodata;
pub use services::cmd_services;
