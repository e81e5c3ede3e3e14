pub mod comment_groups;
pub use comment_groups::{CommentCount, RatingSummary};

pub mod geodata_service;
pub mod geodata_service_impl;
pub use geodata_service::{
    AddComment, GeodataComments, GeodataError, GeodataListEntry, GeodataService, LayerComments,
    MetadataLookup,
};
pub use geodata_service_impl::SeaOrmGeodataService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, UserInfo};
pub use auth_service_impl::SeaOrmAuthService;
