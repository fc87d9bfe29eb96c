use serde::{Deserialize, Serialize};

use blogbus_core::{Aggregate, AggregateRoot, DomainError, Entity, PostId};

use crate::event::{BlogEvent, PostCreated, PostDeleted};

/// Aggregate root: Post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    id: PostId,
    title: String,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Post {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: PostId) -> Self {
        Self {
            id,
            title: String::new(),
            version: 0,
            created: false,
            deleted: false,
        }
    }

    /// Restore an existing post from a projected snapshot.
    pub fn restore(id: PostId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            version: 1,
            created: true,
            deleted: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn exists(&self) -> bool {
        self.created && !self.deleted
    }
}

impl AggregateRoot for Post {
    type Id = PostId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePost {
    pub id: PostId,
    pub title: String,
}

/// Command: DeletePost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePost {
    pub id: PostId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostCommand {
    CreatePost(CreatePost),
    DeletePost(DeletePost),
}

impl Aggregate for Post {
    type Command = PostCommand;
    type Event = BlogEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BlogEvent::PostCreated(e) if e.id == self.id => {
                self.title = e.title.clone();
                self.created = true;
            }
            BlogEvent::PostDeleted(e) if e.id == self.id => {
                self.deleted = true;
            }
            _ => return,
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PostCommand::CreatePost(cmd) => self.handle_create(cmd),
            PostCommand::DeletePost(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Post {
    fn handle_create(&self, cmd: &CreatePost) -> Result<Vec<BlogEvent>, DomainError> {
        if cmd.id != self.id {
            return Err(DomainError::mismatch("post id"));
        }
        if self.created {
            return Err(DomainError::already_exists(Entity::Post));
        }
        if cmd.title.trim().is_empty() {
            return Err(DomainError::missing("title"));
        }

        Ok(vec![BlogEvent::PostCreated(PostCreated {
            id: cmd.id.clone(),
            title: cmd.title.clone(),
        })])
    }

    fn handle_delete(&self, cmd: &DeletePost) -> Result<Vec<BlogEvent>, DomainError> {
        if cmd.id != self.id {
            return Err(DomainError::mismatch("post id"));
        }
        if !self.exists() {
            return Err(DomainError::not_found(Entity::Post));
        }

        Ok(vec![BlogEvent::PostDeleted(PostDeleted { id: cmd.id.clone() })])
    }
}
