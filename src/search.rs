use crate::content::{Catalog, Chapter, Formula, PracticeProblem, Volume};
use serde::Serialize;

/// 可搜索内容
///
/// 每种内容类型声明参与匹配的字段
pub trait Searchable {
    /// 参与子串匹配的字段
    fn search_fields(&self) -> Vec<&str>;

    /// 判断是否匹配
    ///
    /// # 参数
    /// - `needle`: 已转为小写的查询串
    fn matches(&self, needle: &str) -> bool {
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

impl Searchable for Chapter {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = Vec::with_capacity(self.topics.len() + 2);
        fields.push(self.title.as_str());
        fields.extend(self.topics.iter().map(String::as_str));
        fields.push(self.summary.as_str());
        fields
    }
}

impl Searchable for PracticeProblem {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.topic.as_str(), self.question.as_str()]
    }
}

impl Searchable for Formula {
    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.formula.as_str(),
            self.description.as_str(),
        ]
    }
}

/// 按查询串过滤集合
///
/// 大小写不敏感的子串匹配，不分词、不排序，保持原有顺序。空查询返回全部。
///
/// # 参数
/// - `items`: 源集合
/// - `query`: 用户输入的查询串
///
/// # 返回
/// 匹配项的引用列表
pub fn filter<'a, T, I>(items: I, query: &str) -> Vec<&'a T>
where
    T: Searchable + 'a,
    I: IntoIterator<Item = &'a T>,
{
    if query.is_empty() {
        return items.into_iter().collect();
    }

    let needle = query.to_lowercase();
    items
        .into_iter()
        .filter(|item| item.matches(&needle))
        .collect()
}

pub fn filter_chapters<'a>(chapters: &'a [Chapter], query: &str) -> Vec<&'a Chapter> {
    filter(chapters, query)
}

pub fn filter_problems<'a>(
    problems: &'a [PracticeProblem],
    query: &str,
) -> Vec<&'a PracticeProblem> {
    filter(problems, query)
}

/// 先按章节顺序展开所有公式，再过滤
pub fn filter_formulas<'a>(chapters: &'a [Chapter], query: &str) -> Vec<&'a Formula> {
    filter(chapters.iter().flat_map(|c| c.key_formulas.iter()), query)
}

/// 过滤结果
#[derive(Debug, Clone, Serialize)]
pub struct FilteredContent<'a> {
    pub volume: Volume,
    pub chapters: Vec<&'a Chapter>,
    pub problems: Vec<&'a PracticeProblem>,
    pub formulas: Vec<&'a Formula>,
}

impl FilteredContent<'_> {
    /// 三类结果都为空（界面显示“无结果”）
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty() && self.problems.is_empty() && self.formulas.is_empty()
    }
}

/// 内容过滤器
///
/// 对应界面的搜索框和分卷选择状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub query: String,
    pub volume: Volume,
}

impl ContentFilter {
    pub fn new(query: impl Into<String>, volume: Volume) -> Self {
        Self {
            query: query.into(),
            volume,
        }
    }

    /// 对目录执行过滤
    ///
    /// 只有章节取当前分卷的集合；练习题和公式（全部分卷展开）不受分卷影响
    pub fn apply<'a>(&self, catalog: &'a Catalog) -> FilteredContent<'a> {
        FilteredContent {
            volume: self.volume,
            chapters: filter_chapters(catalog.chapters(self.volume), &self.query),
            problems: filter_problems(catalog.problems(), &self.query),
            formulas: filter(catalog.all_formulas(), &self.query),
        }
    }
}
