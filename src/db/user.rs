use color_eyre::{eyre::OptionExt, Result};
use libsql::params;
use ulid::Ulid;

use super::models::AuthUser;
use super::Db;

impl Db {
    pub async fn create_user(&self, email: &str, display_name: &str) -> Result<String> {
        let conn = self.connect()?;

        let user_id = conn
            .query(
                "INSERT INTO users (id, email, display_name) VALUES (?, ?, ?) RETURNING id",
                params![Ulid::new().to_string(), email, display_name],
            )
            .await?
            .next()
            .await?
            .ok_or_eyre("could not get user id")?
            .get::<String>(0)?;

        tracing::info!("new user created: id={user_id}, email={email}");
        Ok(user_id)
    }

    /// Issue a bearer token for the user. Token creation normally happens in
    /// the external auth service; this exists for tooling and tests.
    pub async fn create_session_token(&self, user_id: &str) -> Result<String> {
        let token = Ulid::new().to_string();
        let conn = self.connect()?;

        conn.execute(
            "INSERT INTO user_sessions (id, user_id) VALUES (?, ?)",
            params![token.clone(), user_id],
        )
        .await?;

        tracing::info!("new session token created for user_id={user_id}");
        Ok(token)
    }

    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<AuthUser>> {
        let conn = self.connect()?;
        let row = conn
            .query(
                r#"
                SELECT u.id, u.email, u.display_name
                FROM user_sessions s
                JOIN users u ON u.id = s.user_id
                WHERE s.id = ?
                "#,
                params![token],
            )
            .await?
            .next()
            .await?;

        match row {
            Some(row) => Ok(Some(libsql::de::from_row::<AuthUser>(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_session_token(&self, token: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM user_sessions WHERE id = ?", params![token])
            .await?;
        Ok(())
    }
}
