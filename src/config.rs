use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::triggers::TriggerSettings;
use crate::tutor::TutorConfig;

/// 运行配置，全部来自环境变量
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// 数据目录（progress.db 所在位置）
    pub data_dir: PathBuf,
    /// 自定义内容包路径；为空时使用内置内容
    pub content_path: Option<PathBuf>,
    pub tutor: TutorConfig,
    pub triggers: TriggerSettings,
}

impl HubConfig {
    pub fn load() -> Self {
        let defaults = TutorConfig::default();
        let timeout_secs = try_load("STUDY_HUB_TUTOR_TIMEOUT_SECS", defaults.timeout.as_secs());

        Self {
            data_dir: PathBuf::from(try_load("STUDY_HUB_DATA_DIR", "data".to_string())),
            content_path: optional("STUDY_HUB_CONTENT").map(PathBuf::from),
            tutor: TutorConfig {
                endpoint: optional("STUDY_HUB_TUTOR_URL"),
                api_key: optional("STUDY_HUB_TUTOR_KEY"),
                model: try_load("STUDY_HUB_TUTOR_MODEL", defaults.model),
                timeout: Duration::from_secs(timeout_secs),
                max_tokens: try_load("STUDY_HUB_TUTOR_MAX_TOKENS", defaults.max_tokens),
            },
            triggers: TriggerSettings {
                autoconfirm_domains: optional("STUDY_HUB_AUTOCONFIRM_DOMAINS")
                    .map(|raw| parse_list(&raw))
                    .unwrap_or_default(),
            },
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("progress.db")
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not set");
    })
}

/// 可选变量，空字符串视为未设置
fn optional(key: &str) -> Option<String> {
    var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 读取并解析变量；缺失或无法解析时使用默认值
fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(raw) = var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value: {e}, using default: {default}");
            default
        }
    }
}

/// 逗号分隔列表，去空白、转小写
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
