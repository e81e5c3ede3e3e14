pub use super::comments::Entity as Comments;
pub use super::geodata::Entity as Geodata;
pub use super::layers::Entity as Layers;
pub use super::saved_searches::Entity as SavedSearches;
pub use super::users::Entity as Users;
