use super::{now, row_id, Database, Error, Result};
use crate::model::{post, repository::PostRepository, user, Context, Post};
use async_trait::async_trait;
use log::{debug, trace};
use rusqlite::{params, OptionalExtension, Row};

const SELECT_ALL: &str =
    "SELECT id, body, user_id, created_at, updated_at FROM posts ORDER BY id ASC";

const SELECT_BY_ID: &str =
    "SELECT id, body, user_id, created_at, updated_at FROM posts WHERE id = ?1";

const SELECT_BY_USER: &str =
    "SELECT id, body, user_id, created_at, updated_at FROM posts WHERE user_id = ?1 ORDER BY id ASC";

const INSERT: &str =
    "INSERT INTO posts (body, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4) RETURNING id";

const UPDATE: &str = "UPDATE posts SET body = ?1, updated_at = ?2 WHERE id = ?3";

const DELETE: &str = "DELETE FROM posts WHERE id = ?1";

/// Posts stuff
#[async_trait]
impl PostRepository for Database {
    async fn create(&self, ctx: &Context, mut post: Post) -> Result<Post> {
        debug!("Adding post by user {} to database", post.user_id);

        let now = now();
        post.created_at = Some(now);
        post.updated_at = Some(now);

        let post = self
            .run(ctx, move |conn| {
                post.id = conn.query_row(
                    INSERT,
                    params![post.body, post.user_id, now, now],
                    |row| row.get(0),
                )?;
                Ok(post)
            })
            .await?;

        debug!("Added post {} to database", post.id);
        Ok(post)
    }

    async fn get_all(&self, ctx: &Context) -> Result<Vec<Post>> {
        trace!("Getting all posts");

        self.run(ctx, |conn| {
            let mut stmt = conn.prepare(SELECT_ALL)?;
            let posts = stmt
                .query_map((), map_post)?
                .collect::<rusqlite::Result<Vec<_>>>();

            posts
        })
        .await
    }

    async fn get_one(&self, ctx: &Context, id: post::Id) -> Result<Post> {
        debug!("Getting post {}", id);

        let row = row_id(id, "post")?;
        self.run(ctx, move |conn| {
            conn.query_row(SELECT_BY_ID, (row,), map_post).optional()
        })
        .await?
        .ok_or_else(|| Error::NotFound(format!("post {id}")))
    }

    async fn get_by_user(&self, ctx: &Context, user_id: user::Id) -> Result<Vec<Post>> {
        debug!("Getting posts of user {}", user_id);

        let Ok(user_row) = i64::try_from(user_id) else {
            return Ok(Vec::new());
        };
        self.run(ctx, move |conn| {
            let mut stmt = conn.prepare(SELECT_BY_USER)?;
            let posts = stmt
                .query_map((user_row,), map_post)?
                .collect::<rusqlite::Result<Vec<_>>>();

            posts
        })
        .await
    }

    async fn update(&self, ctx: &Context, id: post::Id, post: &Post) -> Result<()> {
        debug!("Updating post {}", id);

        let row = row_id(id, "post")?;
        let body = post.body.clone();
        let changed = self
            .run(ctx, move |conn| conn.execute(UPDATE, params![body, now(), row]))
            .await?;

        if changed == 0 {
            return Err(Error::NotFound(format!("post {id}")));
        }

        Ok(())
    }

    async fn delete(&self, ctx: &Context, id: post::Id) -> Result<()> {
        debug!("Deleting post {}", id);

        let row = row_id(id, "post")?;
        let changed = self
            .run(ctx, move |conn| conn.execute(DELETE, (row,)))
            .await?;

        if changed == 0 {
            return Err(Error::NotFound(format!("post {id}")));
        }

        Ok(())
    }
}

fn map_post(row: &Row) -> rusqlite::Result<Post> {
    trace!("Mapping db row to post");

    Ok(Post {
        id: row.get(0)?,
        body: row.get(1)?,
        user_id: row.get(2)?,
        created_at: Some(row.get(3)?),
        updated_at: Some(row.get(4)?),
    })
}
