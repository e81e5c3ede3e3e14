pub mod comment;
pub mod geodata;
pub mod search;

pub use comment::{Comment, CommentAuthor, NewComment};
pub use geodata::{Geodata, Layer, ParsedMetadata};
pub use search::{SavedSearch, SearchFilter};
