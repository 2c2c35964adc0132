use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// 子模块声明
pub mod catalog;

pub use catalog::{Catalog, CatalogError, VolumeContent};

/// 教材分卷
///
/// 分卷只是导航分组，章节本身不记录所属分卷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volume {
    #[default]
    Vol1,
    Vol2,
    Vol3,
}

impl Volume {
    /// 所有分卷，按导航顺序
    pub const ALL: [Volume; 3] = [Volume::Vol1, Volume::Vol2, Volume::Vol3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Volume::Vol1 => "vol1",
            Volume::Vol2 => "vol2",
            Volume::Vol3 => "vol3",
        }
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Volume {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vol1" | "1" => Ok(Volume::Vol1),
            "vol2" | "2" => Ok(Volume::Vol2),
            "vol3" | "3" => Ok(Volume::Vol3),
            other => Err(format!("未知的分卷: {}", other)),
        }
    }
}

/// 公式中的变量说明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub symbol: String,
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
}

/// 公式
///
/// `formula` 字段带有 `_`/`^` 上下标标记，由 [`crate::formula`] 渲染
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    pub formula: String,
    pub description: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// 概念
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub term: String,
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
}

/// 章节
///
/// `id` 只在所属分卷内唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub summary: String,
    #[serde(default)]
    pub key_formulas: Vec<Formula>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub external_url: Option<String>,
}

/// 练习题难度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("未知的难度: {}", other)),
        }
    }
}

/// 练习题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeProblem {
    pub id: u32,
    pub difficulty: Difficulty,
    pub topic: String,
    pub question: String,
    pub solution: String,
    pub answer: String,
    #[serde(default)]
    pub hints: Vec<String>,
}
