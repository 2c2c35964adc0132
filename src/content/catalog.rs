use super::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// 内置的物理内容包
const BUILTIN_PACK: &str = include_str!("physics.json");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("内容包读取失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("内容包格式错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("缺少分卷: {0}")]
    MissingVolume(Volume),
    #[error("分卷重复: {0}")]
    DuplicateVolume(Volume),
    #[error("分卷 {volume} 中章节 ID 重复: {id}")]
    DuplicateChapter { volume: Volume, id: u32 },
    #[error("分卷 {volume} 的可见章节不存在: {id}")]
    UnknownVisibleChapter { volume: Volume, id: u32 },
    #[error("练习题 ID 重复: {0}")]
    DuplicateProblem(u32),
}

/// 内容包中的单个分卷（反序列化用）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumePack {
    id: Volume,
    title: String,
    /// 可见章节 ID 列表；缺省时分卷内所有章节可见
    #[serde(default)]
    visible_chapter_ids: Option<Vec<u32>>,
    chapters: Vec<Chapter>,
}

/// 内容包文件结构
#[derive(Debug, Deserialize)]
struct ContentPack {
    volumes: Vec<VolumePack>,
    #[serde(default)]
    problems: Vec<PracticeProblem>,
}

/// 一个分卷解析后的章节集合
#[derive(Debug, Clone)]
pub struct VolumeContent {
    pub volume: Volume,
    pub title: String,
    chapters: Vec<Chapter>,
}

impl VolumeContent {
    /// 分卷内的章节，保持内容包中的顺序
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, id: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    /// 按章节顺序展开所有关键公式
    pub fn formulas(&self) -> Vec<&Formula> {
        self.chapters
            .iter()
            .flat_map(|c| c.key_formulas.iter())
            .collect()
    }
}

/// 只读内容目录
///
/// 启动时加载一次，之后只通过访问函数读取，不提供任何修改接口
#[derive(Debug, Clone)]
pub struct Catalog {
    /// 按 `Volume::ALL` 顺序排列
    volumes: Vec<VolumeContent>,
    problems: Vec<PracticeProblem>,
}

impl Catalog {
    /// 加载内置内容包
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_PACK)
    }

    /// 从文件加载内容包
    ///
    /// # 参数
    /// - `path`: JSON 内容包路径
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        info!("Loading content pack from {}", path.display());
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// 解析并校验内容包
    ///
    /// # 返回
    /// 校验通过的目录；分卷缺失/重复、章节或练习题 ID 重复时返回错误
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let pack: ContentPack = serde_json::from_str(raw)?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(pack.volumes.len());
        for volume_pack in pack.volumes {
            if !seen.insert(volume_pack.id) {
                return Err(CatalogError::DuplicateVolume(volume_pack.id));
            }
            resolved.push(resolve_volume(volume_pack)?);
        }

        let mut volumes = Vec::with_capacity(Volume::ALL.len());
        for volume in Volume::ALL {
            let pos = resolved
                .iter()
                .position(|v| v.volume == volume)
                .ok_or(CatalogError::MissingVolume(volume))?;
            volumes.push(resolved.swap_remove(pos));
        }

        let mut problem_ids = HashSet::new();
        for problem in &pack.problems {
            if !problem_ids.insert(problem.id) {
                return Err(CatalogError::DuplicateProblem(problem.id));
            }
        }

        let catalog = Self {
            volumes,
            problems: pack.problems,
        };
        info!(
            "Catalog loaded: {} chapters, {} problems",
            catalog.volumes.iter().map(|v| v.chapters.len()).sum::<usize>(),
            catalog.problems.len()
        );
        Ok(catalog)
    }

    pub fn volume(&self, volume: Volume) -> &VolumeContent {
        // from_json 保证每个分卷都存在且按 Volume::ALL 排列
        let index = Volume::ALL
            .iter()
            .position(|v| *v == volume)
            .unwrap_or_default();
        &self.volumes[index]
    }

    pub fn volumes(&self) -> &[VolumeContent] {
        &self.volumes
    }

    pub fn chapters(&self, volume: Volume) -> &[Chapter] {
        self.volume(volume).chapters()
    }

    pub fn chapter(&self, volume: Volume, id: u32) -> Option<&Chapter> {
        self.volume(volume).chapter(id)
    }

    pub fn formulas(&self, volume: Volume) -> Vec<&Formula> {
        self.volume(volume).formulas()
    }

    /// 全部分卷的公式，按分卷、章节、公式顺序展开
    ///
    /// 公式搜索不受分卷选择影响
    pub fn all_formulas(&self) -> Vec<&Formula> {
        self.volumes.iter().flat_map(|v| v.formulas()).collect()
    }

    pub fn problems(&self) -> &[PracticeProblem] {
        &self.problems
    }

    pub fn problem(&self, id: u32) -> Option<&PracticeProblem> {
        self.problems.iter().find(|p| p.id == id)
    }
}

/// 校验分卷并按可见 ID 列表截取章节
fn resolve_volume(pack: VolumePack) -> Result<VolumeContent, CatalogError> {
    let mut ids = HashSet::new();
    for chapter in &pack.chapters {
        if !ids.insert(chapter.id) {
            return Err(CatalogError::DuplicateChapter {
                volume: pack.id,
                id: chapter.id,
            });
        }
    }

    let chapters = match pack.visible_chapter_ids {
        Some(visible) => {
            if let Some(missing) = visible.iter().find(|id| !ids.contains(id)) {
                return Err(CatalogError::UnknownVisibleChapter {
                    volume: pack.id,
                    id: *missing,
                });
            }
            let total = pack.chapters.len();
            let kept: Vec<Chapter> = pack
                .chapters
                .into_iter()
                .filter(|c| visible.contains(&c.id))
                .collect();
            debug!(
                "Volume {}: {} of {} chapters visible",
                pack.id,
                kept.len(),
                total
            );
            kept
        }
        None => pack.chapters,
    };

    Ok(VolumeContent {
        volume: pack.id,
        title: pack.title,
        chapters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn minimal_pack(vol2_extra: &str) -> String {
        format!(
            r#"{{
                "volumes": [
                    {{"id": "vol1", "title": "One", "chapters": [
                        {{"id": 1, "title": "A", "summary": "a"}},
                        {{"id": 2, "title": "B", "summary": "b"}}
                    ]}},
                    {{"id": "vol2", "title": "Two", {} "chapters": [
                        {{"id": 1, "title": "C", "summary": "c"}}
                    ]}},
                    {{"id": "vol3", "title": "Three", "chapters": []}}
                ],
                "problems": []
            }}"#,
            vol2_extra
        )
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.volumes().len(), 3);
        assert!(!catalog.chapters(Volume::Vol1).is_empty());
        assert!(!catalog.problems().is_empty());
    }

    #[test]
    fn test_builtin_volume2_restricted() {
        let catalog = Catalog::builtin().unwrap();
        let ids: Vec<u32> = catalog.chapters(Volume::Vol2).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(catalog.chapter(Volume::Vol2, 5).is_none());
    }

    #[test]
    fn test_chapter_ids_scoped_to_volume() {
        let catalog = Catalog::builtin().unwrap();
        let vol1 = catalog.chapter(Volume::Vol1, 1).unwrap();
        let vol3 = catalog.chapter(Volume::Vol3, 1).unwrap();
        assert_ne!(vol1.title, vol3.title);
    }

    #[test]
    fn test_formulas_flattened_in_order() {
        let catalog = Catalog::builtin().unwrap();
        let formulas = catalog.formulas(Volume::Vol2);
        let expected: usize = catalog
            .chapters(Volume::Vol2)
            .iter()
            .map(|c| c.key_formulas.len())
            .sum();
        assert_eq!(formulas.len(), expected);
        assert_eq!(formulas[0].name, "Heat and temperature change");
    }

    #[test]
    fn test_all_formulas_span_volumes() {
        let catalog = Catalog::builtin().unwrap();
        let all = catalog.all_formulas();
        let per_volume: Vec<&Formula> = Volume::ALL
            .iter()
            .flat_map(|v| catalog.formulas(*v))
            .collect();
        assert_eq!(all, per_volume);
        assert!(all.len() > catalog.formulas(Volume::Vol1).len());
        assert_eq!(all[0].name, catalog.formulas(Volume::Vol1)[0].name);
        assert!(all.iter().any(|f| f.name == "Snell's law"));
    }

    #[test]
    fn test_problem_lookup() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.problem(3).unwrap().topic, "Thermodynamics");
        assert!(catalog.problem(999).is_none());
    }

    #[test]
    fn test_missing_volume() {
        let raw = r#"{"volumes": [{"id": "vol1", "title": "One", "chapters": []}]}"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(matches!(err, CatalogError::MissingVolume(Volume::Vol2)));
    }

    #[test]
    fn test_duplicate_volume() {
        let raw = r#"{"volumes": [
            {"id": "vol1", "title": "One", "chapters": []},
            {"id": "vol1", "title": "Again", "chapters": []}
        ]}"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateVolume(Volume::Vol1)));
    }

    #[test]
    fn test_duplicate_chapter_id() {
        let raw = r#"{"volumes": [
            {"id": "vol1", "title": "One", "chapters": [
                {"id": 1, "title": "A", "summary": "a"},
                {"id": 1, "title": "B", "summary": "b"}
            ]},
            {"id": "vol2", "title": "Two", "chapters": []},
            {"id": "vol3", "title": "Three", "chapters": []}
        ]}"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::DuplicateChapter { volume: Volume::Vol1, id: 1 }
        ));
    }

    #[test]
    fn test_unknown_visible_chapter() {
        let raw = minimal_pack(r#""visibleChapterIds": [1, 9],"#);
        let err = Catalog::from_json(&raw).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnknownVisibleChapter { volume: Volume::Vol2, id: 9 }
        ));
    }

    #[test]
    fn test_duplicate_problem() {
        let raw = r#"{"volumes": [
            {"id": "vol1", "title": "One", "chapters": []},
            {"id": "vol2", "title": "Two", "chapters": []},
            {"id": "vol3", "title": "Three", "chapters": []}
        ], "problems": [
            {"id": 4, "difficulty": "Easy", "topic": "t", "question": "q", "solution": "s", "answer": "a"},
            {"id": 4, "difficulty": "Hard", "topic": "t", "question": "q", "solution": "s", "answer": "a"}
        ]}"#;
        let err = Catalog::from_json(raw).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateProblem(4)));
    }

    #[test]
    fn test_volume_order_normalised() {
        let raw = r#"{"volumes": [
            {"id": "vol3", "title": "Three", "chapters": []},
            {"id": "vol1", "title": "One", "chapters": []},
            {"id": "vol2", "title": "Two", "chapters": []}
        ]}"#;
        let catalog = Catalog::from_json(raw).unwrap();
        let order: Vec<Volume> = catalog.volumes().iter().map(|v| v.volume).collect();
        assert_eq!(order, Volume::ALL.to_vec());
        assert_eq!(catalog.volume(Volume::Vol3).title, "Three");
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(minimal_pack("").as_bytes()).unwrap();

        let catalog = Catalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.chapters(Volume::Vol1).len(), 2);
        assert_eq!(catalog.chapters(Volume::Vol2).len(), 1);
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
