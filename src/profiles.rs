use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("用户名为空")]
    EmptyUserName,
}

/// 用户档案
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user_name: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            email: None,
            display_name: None,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }
}

/// 用户目录
///
/// 认证触发器通过此 trait 读写用户档案
pub trait UserDirectory {
    /// 创建档案；已存在时不覆盖
    ///
    /// # 返回
    /// 是否新建了档案
    fn create_profile(&self, profile: &UserProfile) -> Result<bool, DirectoryError>;

    fn get_profile(&self, user_name: &str) -> Result<Option<UserProfile>, DirectoryError>;

    /// 更新最近登录时间
    ///
    /// # 返回
    /// 档案是否存在
    fn touch_login(&self, user_name: &str, at: DateTime<Utc>) -> Result<bool, DirectoryError>;

    fn delete_profile(&self, user_name: &str) -> Result<bool, DirectoryError>;
}

/// 基于 SQLite 的用户目录
pub struct SqliteUserDirectory {
    conn: Connection,
}

impl SqliteUserDirectory {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DirectoryError> {
        Ok(Self::new(crate::db::init_db(path)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl UserDirectory for SqliteUserDirectory {
    fn create_profile(&self, profile: &UserProfile) -> Result<bool, DirectoryError> {
        if profile.user_name.trim().is_empty() {
            return Err(DirectoryError::EmptyUserName);
        }

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO user_profiles (user_name, email, display_name, created_at, last_login_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.user_name,
                profile.email,
                profile.display_name,
                profile.created_at,
                profile.last_login_at
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get_profile(&self, user_name: &str) -> Result<Option<UserProfile>, DirectoryError> {
        let profile = self
            .conn
            .query_row(
                "SELECT user_name, email, display_name, created_at, last_login_at
                 FROM user_profiles WHERE user_name = ?1",
                [user_name],
                |row| {
                    Ok(UserProfile {
                        user_name: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        created_at: row.get(3)?,
                        last_login_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    fn touch_login(&self, user_name: &str, at: DateTime<Utc>) -> Result<bool, DirectoryError> {
        let updated = self.conn.execute(
            "UPDATE user_profiles SET last_login_at = ?1 WHERE user_name = ?2",
            params![at, user_name],
        )?;
        Ok(updated > 0)
    }

    fn delete_profile(&self, user_name: &str) -> Result<bool, DirectoryError> {
        let deleted = self
            .conn
            .execute("DELETE FROM user_profiles WHERE user_name = ?1", [user_name])?;
        Ok(deleted > 0)
    }
}
