pub mod accounts;
pub mod comments;
pub mod feed;
pub mod likes;
pub mod social;
pub mod videos;
