//! Blog domain: post and comment aggregates and their typed events.

pub mod comment;
pub mod event;
pub mod post;

pub use comment::{
    ApplyModeration, Comment, CommentCommand, CommentStatus, CreateComment,
};
pub use event::{
    BlogEvent, CommentCreated, CommentModerated, CommentUpdated, PayloadError, PostCreated,
    PostDeleted,
};
pub use post::{CreatePost, DeletePost, Post, PostCommand};
