mod context;
pub mod database;
pub mod post;
pub mod repository;
pub mod user;

pub use context::Context;
pub use database::Database;
pub use post::Post;
pub use user::User;
