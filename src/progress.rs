use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result};
use serde::Serialize;

// ==================== 练习记录 ====================

/// 已保存的作答记录
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub id: i64,
    pub problem_id: u32,
    pub answer: String,
    pub correct: bool,
    pub attempted_at: DateTime<Utc>,
}

/// 记录一次作答
pub fn record_attempt(
    conn: &Connection,
    problem_id: u32,
    answer: &str,
    correct: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO attempts (problem_id, answer, correct, attempted_at) VALUES (?1, ?2, ?3, ?4)",
        params![problem_id, answer, correct, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// 获取某道题的所有作答记录，按时间先后
pub fn attempts_for_problem(conn: &Connection, problem_id: u32) -> Result<Vec<AttemptRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, problem_id, answer, correct, attempted_at
         FROM attempts WHERE problem_id = ?1 ORDER BY id",
    )?;

    let attempts = stmt
        .query_map([problem_id], |row| {
            Ok(AttemptRecord {
                id: row.get(0)?,
                problem_id: row.get(1)?,
                answer: row.get(2)?,
                correct: row.get(3)?,
                attempted_at: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(attempts)
}

/// 至少答对过一次的题目 ID
pub fn solved_problem_ids(conn: &Connection) -> Result<Vec<u32>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT problem_id FROM attempts WHERE correct = 1 ORDER BY problem_id",
    )?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<u32>, _>>()?;
    Ok(ids)
}

// ==================== 闪卡复习 ====================

/// 记录一次闪卡复习
///
/// # 参数
/// - `card_key`: 闪卡标识
/// - `known`: 学生是否已掌握
pub fn record_review(conn: &Connection, card_key: &str, known: bool) -> Result<i64> {
    conn.execute(
        "INSERT INTO reviews (card_key, known, reviewed_at) VALUES (?1, ?2, ?3)",
        params![card_key, known, Utc::now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// 复习汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewSummary {
    /// 复习过的闪卡数
    pub reviewed: usize,
    /// 最近一次复习标记为已掌握的闪卡数
    pub known: usize,
}

pub fn review_summary(conn: &Connection) -> Result<ReviewSummary> {
    // 每张卡只看最近一次复习
    let mut stmt = conn.prepare(
        "SELECT r.known FROM reviews r
         JOIN (SELECT card_key, MAX(id) AS last_id FROM reviews GROUP BY card_key) latest
           ON r.id = latest.last_id",
    )?;
    let latest = stmt
        .query_map([], |row| row.get::<_, bool>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReviewSummary {
        reviewed: latest.len(),
        known: latest.iter().filter(|k| **k).count(),
    })
}
