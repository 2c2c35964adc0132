use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use tracing::{info, warn};

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod flashcards;
pub mod formula;
pub mod practice;
pub mod profiles;
pub mod progress;
pub mod search;
pub mod triggers;
pub mod tutor;

pub use config::HubConfig;
pub use content::{Catalog, Chapter, Difficulty, Formula, PracticeProblem, Volume};
pub use error::HubError;
pub use search::{ContentFilter, FilteredContent};

use flashcards::Deck;
use practice::Verdict;
use profiles::SqliteUserDirectory;
use progress::ReviewSummary;
use tutor::Tutor;

/// 学习进度汇总
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub solved: Vec<u32>,
    pub total_problems: usize,
    pub reviews: ReviewSummary,
}

/// 学习中心
///
/// 持有只读内容目录和运行配置，对外提供界面调用的各项操作
pub struct StudyHub {
    config: HubConfig,
    catalog: Catalog,
}

impl StudyHub {
    /// 按配置加载内容目录
    pub fn open(config: HubConfig) -> Result<Self, HubError> {
        let catalog = match &config.content_path {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::builtin()?,
        };
        Ok(Self::with_catalog(config, catalog))
    }

    pub fn with_catalog(config: HubConfig, catalog: Catalog) -> Self {
        Self { config, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    // 辅助函数：打开进度数据库，确保目录存在
    fn open_db(&self) -> Result<Connection, HubError> {
        let db_path = self.config.db_path();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(db::init_db(&db_path)?)
    }

    /// 搜索框 + 分卷选择
    pub fn search(&self, query: &str, volume: Volume) -> FilteredContent<'_> {
        ContentFilter::new(query, volume).apply(&self.catalog)
    }

    pub fn problems(&self, query: &str, difficulty: Option<Difficulty>) -> Vec<&PracticeProblem> {
        practice::filter_problems(self.catalog.problems(), query, difficulty)
    }

    pub fn featured_problems(&self, limit: usize) -> Vec<&PracticeProblem> {
        practice::featured_problems(self.catalog.problems(), limit)
    }

    /// 判定并记录一次作答
    pub fn submit_answer(&self, problem_id: u32, answer: &str) -> Result<Verdict, HubError> {
        let problem = self
            .catalog
            .problem(problem_id)
            .ok_or_else(|| HubError::NotFound(format!("练习题 {}", problem_id)))?;

        let verdict = practice::check_answer(&problem.answer, answer);
        let conn = self.open_db()?;
        progress::record_attempt(&conn, problem_id, answer, verdict == Verdict::Correct)?;
        info!("Problem {} answered: {:?}", problem_id, verdict);
        Ok(verdict)
    }

    /// 生成闪卡组
    ///
    /// # 参数
    /// - `volume`: 分卷
    /// - `chapter_id`: 指定章节；为 None 时使用整个分卷
    pub fn flashcards(&self, volume: Volume, chapter_id: Option<u32>) -> Result<Deck, HubError> {
        match chapter_id {
            Some(id) => {
                let chapter = self
                    .catalog
                    .chapter(volume, id)
                    .ok_or_else(|| HubError::NotFound(format!("章节 {}/{}", volume, id)))?;
                Ok(Deck::from_chapters(volume, [chapter]))
            }
            None => Ok(Deck::from_chapters(volume, self.catalog.chapters(volume))),
        }
    }

    pub fn record_review(&self, card_key: &str, known: bool) -> Result<(), HubError> {
        let conn = self.open_db()?;
        progress::record_review(&conn, card_key, known)?;
        Ok(())
    }

    pub fn progress(&self) -> Result<ProgressReport, HubError> {
        let conn = self.open_db()?;
        Ok(ProgressReport {
            solved: progress::solved_problem_ids(&conn)?,
            total_problems: self.catalog.problems().len(),
            reviews: progress::review_summary(&conn)?,
        })
    }

    /// 创建助教会话；指定章节时带上章节上下文
    pub fn tutor(&self, focus: Option<(Volume, u32)>) -> Result<Tutor, HubError> {
        let mut tutor = Tutor::new(self.config.tutor.clone())?;
        if let Some((volume, id)) = focus {
            let chapter = self
                .catalog
                .chapter(volume, id)
                .ok_or_else(|| HubError::NotFound(format!("章节 {}/{}", volume, id)))?;
            tutor.focus_chapter(chapter);
        }
        Ok(tutor)
    }

    /// 处理认证触发事件
    ///
    /// 数据库打不开时同样只记录日志并原样返回事件
    pub fn handle_trigger(&self, event: Value) -> Value {
        match self.open_db() {
            Ok(conn) => {
                let directory = SqliteUserDirectory::new(conn);
                triggers::handle_event(&directory, &self.config.triggers, event)
            }
            Err(e) => {
                warn!("User directory unavailable, passing trigger through: {}", e);
                event
            }
        }
    }
}
