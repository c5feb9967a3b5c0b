//! Persistence contracts for each entity.
//!
//! [`Database`](super::Database) implements both traits; the handlers only
//! see the traits, so tests can swap in the generated mocks.

use async_trait::async_trait;

use super::{database::Result, post, user, Context, Post, User};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user and return it with its id and timestamps set.
    ///
    /// An empty picture is replaced by [`user::DEFAULT_PICTURE`]. The
    /// password hash must already be derived.
    async fn create(&self, ctx: &Context, user: User) -> Result<User>;

    /// All users, ordered by id.
    async fn get_all(&self, ctx: &Context) -> Result<Vec<User>>;

    async fn get_all_users(&self, ctx: &Context) -> Result<Vec<User>> {
        self.get_all(ctx).await
    }

    async fn get_one(&self, ctx: &Context, id: user::Id) -> Result<User>;

    /// Unlike the other lookups, this one also loads the password hash.
    async fn get_by_username(&self, ctx: &Context, username: &str) -> Result<User>;

    /// Only the names, email and picture can change.
    async fn update(&self, ctx: &Context, id: user::Id, user: &User) -> Result<()>;

    async fn delete(&self, ctx: &Context, id: user::Id) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, ctx: &Context, post: Post) -> Result<Post>;

    async fn get_all(&self, ctx: &Context) -> Result<Vec<Post>>;

    async fn get_one(&self, ctx: &Context, id: post::Id) -> Result<Post>;

    /// Posts owned by `user_id`; empty when there are none.
    async fn get_by_user(&self, ctx: &Context, user_id: user::Id) -> Result<Vec<Post>>;

    /// Replaces the body.
    async fn update(&self, ctx: &Context, id: post::Id, post: &Post) -> Result<()>;

    async fn delete(&self, ctx: &Context, id: post::Id) -> Result<()>;
}
