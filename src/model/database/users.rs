use super::{now, row_id, Database, Error, Result};
use crate::model::{
    repository::UserRepository,
    user::{self, DEFAULT_PICTURE},
    Context, User,
};
use async_trait::async_trait;
use log::{debug, trace};
use rusqlite::{params, OptionalExtension, Row};

const SELECT_ALL: &str = "SELECT id, first_name, last_name, username, email, picture, created_at, updated_at
    FROM users ORDER BY id ASC";

const SELECT_BY_ID: &str = "SELECT id, first_name, last_name, username, email, picture, created_at, updated_at
    FROM users WHERE id = ?1";

const SELECT_BY_USERNAME: &str = "SELECT id, first_name, last_name, username, email, picture, created_at, updated_at, password_hash
    FROM users WHERE username = ?1";

const INSERT: &str = "INSERT INTO users (first_name, last_name, username, email, picture, password_hash, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING id";

const UPDATE: &str =
    "UPDATE users SET first_name = ?1, last_name = ?2, email = ?3, picture = ?4, updated_at = ?5 WHERE id = ?6";

const DELETE: &str = "DELETE FROM users WHERE id = ?1";

/// User stuff
#[async_trait]
impl UserRepository for Database {
    async fn create(&self, ctx: &Context, mut user: User) -> Result<User> {
        debug!("Adding user {} to database", user.username);

        if user.picture.is_empty() {
            user.picture = DEFAULT_PICTURE.to_string();
        }
        let now = now();
        user.created_at = Some(now);
        user.updated_at = Some(now);

        let user = self
            .run(ctx, move |conn| {
                user.id = conn.query_row(
                    INSERT,
                    params![
                        user.first_name,
                        user.last_name,
                        user.username,
                        user.email,
                        user.picture,
                        user.password_hash,
                        now,
                        now,
                    ],
                    |row| row.get(0),
                )?;
                Ok(user)
            })
            .await?;

        debug!("Added user {} to database", user.id);
        Ok(user)
    }

    async fn get_all(&self, ctx: &Context) -> Result<Vec<User>> {
        trace!("Getting all users");

        self.run(ctx, |conn| {
            let mut stmt = conn.prepare(SELECT_ALL)?;
            let users = stmt
                .query_map((), map_user)?
                .collect::<rusqlite::Result<Vec<_>>>();

            users
        })
        .await
    }

    async fn get_one(&self, ctx: &Context, id: user::Id) -> Result<User> {
        debug!("Getting user {}", id);

        let row = row_id(id, "user")?;
        self.run(ctx, move |conn| {
            conn.query_row(SELECT_BY_ID, (row,), map_user).optional()
        })
        .await?
        .ok_or_else(|| Error::NotFound(format!("user {id}")))
    }

    async fn get_by_username(&self, ctx: &Context, username: &str) -> Result<User> {
        debug!("Getting user (username: {})", username);

        let name = username.to_string();
        self.run(ctx, move |conn| {
            conn.query_row(SELECT_BY_USERNAME, (name,), |row| {
                Ok(User {
                    password_hash: row.get(8)?,
                    ..map_user(row)?
                })
            })
            .optional()
        })
        .await?
        .ok_or_else(|| Error::NotFound(format!("user {username}")))
    }

    async fn update(&self, ctx: &Context, id: user::Id, user: &User) -> Result<()> {
        debug!("Updating user {}", id);

        let row = row_id(id, "user")?;
        let user = user.clone();
        let changed = self
            .run(ctx, move |conn| {
                conn.execute(
                    UPDATE,
                    params![
                        user.first_name,
                        user.last_name,
                        user.email,
                        user.picture,
                        now(),
                        row
                    ],
                )
            })
            .await?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }

        Ok(())
    }

    async fn delete(&self, ctx: &Context, id: user::Id) -> Result<()> {
        debug!("Deleting user {}", id);

        let row = row_id(id, "user")?;
        let changed = self
            .run(ctx, move |conn| conn.execute(DELETE, (row,)))
            .await?;

        if changed == 0 {
            return Err(Error::NotFound(format!("user {id}")));
        }

        Ok(())
    }
}

fn map_user(row: &Row) -> rusqlite::Result<User> {
    trace!("Mapping db row to user");

    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        email: row.get(4)?,
        picture: row.get(5)?,
        created_at: Some(row.get(6)?),
        updated_at: Some(row.get(7)?),
        ..User::default()
    })
}
