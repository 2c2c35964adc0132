use thiserror::Error;

use crate::content::CatalogError;
use crate::profiles::DirectoryError;
use crate::tutor::TutorError;

#[derive(Error, Debug)]
pub enum HubError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Tutor(#[from] TutorError),

    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("找不到{0}")]
    NotFound(String),
}
