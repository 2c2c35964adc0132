use crate::content::{Difficulty, PracticeProblem};
use crate::search;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// 数值答案允许的相对误差
const RELATIVE_TOLERANCE: f64 = 0.02;

/// 精选练习题（首页展示用）
///
/// 按 Easy、Medium、Hard 轮流挑选，每种难度内保持原有顺序
///
/// # 参数
/// - `problems`: 全部练习题
/// - `limit`: 最多返回的题目数
pub fn featured_problems(problems: &[PracticeProblem], limit: usize) -> Vec<&PracticeProblem> {
    let mut buckets: Vec<Vec<&PracticeProblem>> = Difficulty::ALL
        .iter()
        .map(|d| problems.iter().filter(|p| p.difficulty == *d).rev().collect())
        .collect();

    let mut featured = Vec::with_capacity(limit.min(problems.len()));
    while featured.len() < limit {
        let mut picked = false;
        for bucket in buckets.iter_mut() {
            if featured.len() >= limit {
                break;
            }
            if let Some(problem) = bucket.pop() {
                featured.push(problem);
                picked = true;
            }
        }
        if !picked {
            break;
        }
    }
    featured
}

/// 按查询串和难度筛选练习题
///
/// `difficulty` 为 None 时不限难度
pub fn filter_problems<'a>(
    problems: &'a [PracticeProblem],
    query: &str,
    difficulty: Option<Difficulty>,
) -> Vec<&'a PracticeProblem> {
    search::filter_problems(problems, query)
        .into_iter()
        .filter(|p| difficulty.map_or(true, |d| p.difficulty == d))
        .collect()
}

/// 答案判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
}

fn leading_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^\s*([-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?)",
            r"(?:\s*[×x*·]\s*10\s*\^\s*\{?\s*([-+]?\d+)\s*\}?)?",
        ))
        .unwrap()
    })
}

/// 提取答案开头的数值（单位等后缀忽略）
///
/// `3 × 10^8`、`3x10^{-5}` 这类写法的指数并入数值
fn leading_number(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "").replace('\u{2212}', "-");
    let caps = leading_number_regex().captures(&cleaned)?;
    let mantissa: f64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2) {
        Some(exp) => {
            let exp: i32 = exp.as_str().parse().ok()?;
            Some(mantissa * 10f64.powi(exp))
        }
        None => Some(mantissa),
    }
}

/// 统一大小写和空白
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 判定学生答案
///
/// 两边都以数字开头时按相对误差比较，否则比较规范化后的文本
///
/// # 参数
/// - `expected`: 标准答案，如 "24 m"
/// - `given`: 学生输入
pub fn check_answer(expected: &str, given: &str) -> Verdict {
    if given.trim().is_empty() {
        return Verdict::Incorrect;
    }

    if let (Some(want), Some(got)) = (leading_number(expected), leading_number(given)) {
        let scale = want.abs().max(f64::EPSILON);
        return if (want - got).abs() / scale <= RELATIVE_TOLERANCE {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        };
    }

    if normalize(expected) == normalize(given) {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

/// 单次作答记录
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub problem_id: u32,
    pub answer: String,
    pub verdict: Verdict,
}

/// 练习会话
///
/// 依次浏览一组题目，逐条揭示提示，可查看解析
pub struct PracticeSession<'a> {
    problems: Vec<&'a PracticeProblem>,
    current: usize,
    hints_shown: usize,
    solution_shown: bool,
    attempts: Vec<Attempt>,
}

impl<'a> PracticeSession<'a> {
    pub fn new(problems: Vec<&'a PracticeProblem>) -> Self {
        Self {
            problems,
            current: 0,
            hints_shown: 0,
            solution_shown: false,
            attempts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn position(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&'a PracticeProblem> {
        self.problems.get(self.current).copied()
    }

    /// 揭示下一条提示
    ///
    /// # 返回
    /// 新揭示的提示；已无更多提示时返回 None
    pub fn reveal_hint(&mut self) -> Option<&'a str> {
        let problem = self.current()?;
        let hint = problem.hints.get(self.hints_shown)?;
        self.hints_shown += 1;
        Some(hint.as_str())
    }

    /// 当前题目已揭示的提示
    pub fn visible_hints(&self) -> &'a [String] {
        match self.current() {
            Some(problem) => &problem.hints[..self.hints_shown],
            None => &[],
        }
    }

    pub fn reveal_solution(&mut self) -> Option<&'a str> {
        let problem = self.current()?;
        self.solution_shown = true;
        Some(problem.solution.as_str())
    }

    pub fn solution_shown(&self) -> bool {
        self.solution_shown
    }

    /// 提交当前题目的答案
    pub fn submit(&mut self, answer: &str) -> Option<Verdict> {
        let problem = self.current()?;
        let verdict = check_answer(&problem.answer, answer);
        self.attempts.push(Attempt {
            problem_id: problem.id,
            answer: answer.to_string(),
            verdict,
        });
        Some(verdict)
    }

    /// 前进到下一题，提示和解析状态重置
    ///
    /// # 返回
    /// 是否还有下一题
    pub fn advance(&mut self) -> bool {
        if self.current + 1 >= self.problems.len() {
            return false;
        }
        self.current += 1;
        self.hints_shown = 0;
        self.solution_shown = false;
        true
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    /// 答对的题目数（同一题多次答对只算一次）
    pub fn score(&self) -> usize {
        let mut solved: Vec<u32> = self
            .attempts
            .iter()
            .filter(|a| a.verdict == Verdict::Correct)
            .map(|a| a.problem_id)
            .collect();
        solved.sort_unstable();
        solved.dedup();
        solved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(id: u32, difficulty: Difficulty, answer: &str, hints: &[&str]) -> PracticeProblem {
        PracticeProblem {
            id,
            difficulty,
            topic: format!("Topic {}", id),
            question: format!("Question {}", id),
            solution: format!("Solution {}", id),
            answer: answer.to_string(),
            hints: hints.iter().map(|h| h.to_string()).collect(),
        }
    }

    fn ids(problems: &[&PracticeProblem]) -> Vec<u32> {
        problems.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_featured_round_robin() {
        let problems = vec![
            problem(1, Difficulty::Easy, "1", &[]),
            problem(2, Difficulty::Easy, "1", &[]),
            problem(3, Difficulty::Medium, "1", &[]),
            problem(4, Difficulty::Hard, "1", &[]),
            problem(5, Difficulty::Easy, "1", &[]),
            problem(6, Difficulty::Hard, "1", &[]),
        ];
        assert_eq!(ids(&featured_problems(&problems, 4)), vec![1, 3, 4, 2]);
        assert_eq!(ids(&featured_problems(&problems, 10)), vec![1, 3, 4, 2, 6, 5]);
        assert!(featured_problems(&problems, 0).is_empty());
    }

    #[test]
    fn test_featured_from_builtin() {
        let catalog = crate::content::Catalog::builtin().unwrap();
        let featured = featured_problems(catalog.problems(), 3);
        let difficulties: Vec<Difficulty> = featured.iter().map(|p| p.difficulty).collect();
        assert_eq!(difficulties, Difficulty::ALL.to_vec());
    }

    #[test]
    fn test_filter_by_difficulty() {
        let problems = vec![
            problem(1, Difficulty::Easy, "1", &[]),
            problem(2, Difficulty::Hard, "1", &[]),
            problem(3, Difficulty::Hard, "1", &[]),
        ];
        assert_eq!(ids(&filter_problems(&problems, "", Some(Difficulty::Hard))), vec![2, 3]);
        assert_eq!(ids(&filter_problems(&problems, "topic 3", Some(Difficulty::Hard))), vec![3]);
        assert_eq!(ids(&filter_problems(&problems, "", None)), vec![1, 2, 3]);
    }

    #[test]
    fn test_check_numeric_answer() {
        assert_eq!(check_answer("24 m", "24"), Verdict::Correct);
        assert_eq!(check_answer("24 m", "24.3 m"), Verdict::Correct);
        assert_eq!(check_answer("24 m", "26 m"), Verdict::Incorrect);
        assert_eq!(check_answer("125580 J", "125,580 J"), Verdict::Correct);
        assert_eq!(check_answer("0.5", ".5"), Verdict::Correct);
        assert_eq!(check_answer("3000 N", "3e3"), Verdict::Correct);
    }

    #[test]
    fn test_check_power_of_ten_answer() {
        let expected = "3 × 10^8 m/s";
        assert_eq!(check_answer(expected, "3 × 10^8 m/s"), Verdict::Correct);
        assert_eq!(check_answer(expected, "3x10^8"), Verdict::Correct);
        assert_eq!(check_answer(expected, "3e8"), Verdict::Correct);
        assert_eq!(check_answer(expected, "300000000"), Verdict::Correct);
        assert_eq!(check_answer(expected, "3 × 10^5 m/s"), Verdict::Incorrect);
        assert_eq!(check_answer(expected, "3"), Verdict::Incorrect);
        assert_eq!(
            check_answer("6.6 × 10^{-34} J·s", "6.63*10^{\u{2212}34}"),
            Verdict::Correct
        );
    }

    #[test]
    fn test_check_text_answer() {
        assert_eq!(check_answer("Zero", "  zero "), Verdict::Correct);
        assert_eq!(check_answer("Zero", "one"), Verdict::Incorrect);
        assert_eq!(check_answer("24 m", ""), Verdict::Incorrect);
        assert_eq!(check_answer("24 m", "twenty four"), Verdict::Incorrect);
    }

    #[test]
    fn test_check_zero_expected() {
        assert_eq!(check_answer("0 J", "0"), Verdict::Correct);
        assert_eq!(check_answer("0 J", "0.1"), Verdict::Incorrect);
    }

    #[test]
    fn test_session_hints_revealed_in_order() {
        let problems = vec![problem(1, Difficulty::Easy, "1", &["first", "second"])];
        let mut session = PracticeSession::new(problems.iter().collect());

        assert!(session.visible_hints().is_empty());
        assert_eq!(session.reveal_hint(), Some("first"));
        assert_eq!(session.reveal_hint(), Some("second"));
        assert_eq!(session.reveal_hint(), None);
        assert_eq!(session.visible_hints().len(), 2);
    }

    #[test]
    fn test_session_advance_resets_state() {
        let problems = vec![
            problem(1, Difficulty::Easy, "1", &["h"]),
            problem(2, Difficulty::Easy, "2", &["h"]),
        ];
        let mut session = PracticeSession::new(problems.iter().collect());

        session.reveal_hint();
        assert_eq!(session.reveal_solution(), Some("Solution 1"));
        assert!(session.solution_shown());

        assert!(session.advance());
        assert_eq!(session.current().unwrap().id, 2);
        assert!(session.visible_hints().is_empty());
        assert!(!session.solution_shown());
        assert!(!session.advance());
        assert_eq!(session.position(), 1);
    }

    #[test]
    fn test_session_score_counts_unique_correct() {
        let problems = vec![
            problem(1, Difficulty::Easy, "10 m", &[]),
            problem(2, Difficulty::Easy, "5 s", &[]),
        ];
        let mut session = PracticeSession::new(problems.iter().collect());

        assert_eq!(session.submit("9"), Some(Verdict::Incorrect));
        assert_eq!(session.submit("10"), Some(Verdict::Correct));
        assert_eq!(session.submit("10.0 m"), Some(Verdict::Correct));
        session.advance();
        assert_eq!(session.submit("5"), Some(Verdict::Correct));

        assert_eq!(session.attempts().len(), 4);
        assert_eq!(session.score(), 2);
    }

    #[test]
    fn test_empty_session() {
        let mut session = PracticeSession::new(vec![]);
        assert!(session.is_empty());
        assert!(session.current().is_none());
        assert!(session.reveal_hint().is_none());
        assert!(session.submit("1").is_none());
        assert!(!session.advance());
    }
}
