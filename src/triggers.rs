use crate::profiles::{DirectoryError, UserDirectory, UserProfile};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// 认证触发来源
///
/// 已知来源的封闭集合，未识别的来源保留原始字符串
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSource {
    /// 注册前（自助注册、管理员创建、外部身份源）
    PreSignUp,
    /// 注册确认后
    PostConfirmation,
    /// 找回密码确认后
    PasswordResetConfirmed,
    PreAuthentication,
    PostAuthentication,
    TokenGeneration,
    CustomMessage,
    UserMigration,
    Unknown(String),
}

impl TriggerSource {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PreSignUp_SignUp" | "PreSignUp_AdminCreateUser" | "PreSignUp_ExternalProvider" => {
                TriggerSource::PreSignUp
            }
            "PostConfirmation_ConfirmSignUp" => TriggerSource::PostConfirmation,
            "PostConfirmation_ConfirmForgotPassword" => TriggerSource::PasswordResetConfirmed,
            "PreAuthentication_Authentication" => TriggerSource::PreAuthentication,
            "PostAuthentication_Authentication" => TriggerSource::PostAuthentication,
            s if s.starts_with("TokenGeneration_") => TriggerSource::TokenGeneration,
            s if s.starts_with("CustomMessage_") => TriggerSource::CustomMessage,
            s if s.starts_with("UserMigration_") => TriggerSource::UserMigration,
            other => TriggerSource::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerRequest {
    #[serde(default)]
    user_attributes: HashMap<String, String>,
}

/// 触发器事件中用到的字段
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerEvent {
    trigger_source: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    user_pool_id: Option<String>,
    #[serde(default)]
    request: TriggerRequest,
}

impl TriggerEvent {
    fn attribute(&self, name: &str) -> Option<String> {
        self.request
            .user_attributes
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// 触发器设置
#[derive(Debug, Clone, Default)]
pub struct TriggerSettings {
    /// 注册时自动确认的邮箱域名（小写）
    pub autoconfirm_domains: Vec<String>,
}

/// 处理认证触发事件
///
/// 按 `triggerSource` 分发到对应处理逻辑。任何错误只记录日志，
/// 事件总是原样（或附带 `response` 补丁）返回，不阻塞认证流程。
///
/// # 参数
/// - `directory`: 用户目录
/// - `settings`: 触发器设置
/// - `event`: 原始事件 JSON
pub fn handle_event<D: UserDirectory>(
    directory: &D,
    settings: &TriggerSettings,
    mut event: Value,
) -> Value {
    let parsed = match TriggerEvent::deserialize(&event) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Malformed trigger event, passing through: {}", e);
            return event;
        }
    };

    let source = TriggerSource::parse(&parsed.trigger_source);
    debug!(
        "Trigger {} for user {} (pool {:?})",
        parsed.trigger_source, parsed.user_name, parsed.user_pool_id
    );

    let outcome = match source {
        TriggerSource::PreSignUp => {
            pre_sign_up(settings, &parsed, &mut event);
            Ok(())
        }
        TriggerSource::PostConfirmation => post_confirmation(directory, &parsed),
        TriggerSource::PasswordResetConfirmed => {
            info!("Password reset confirmed for {}", parsed.user_name);
            Ok(())
        }
        TriggerSource::PreAuthentication => pre_authentication(directory, &parsed),
        TriggerSource::PostAuthentication => post_authentication(directory, &parsed),
        TriggerSource::TokenGeneration => token_generation(directory, &parsed, &mut event),
        TriggerSource::CustomMessage | TriggerSource::UserMigration => {
            debug!("No handler configured for {}", parsed.trigger_source);
            Ok(())
        }
        TriggerSource::Unknown(raw) => {
            warn!("Unknown trigger source: {}", raw);
            Ok(())
        }
    };

    if let Err(e) = outcome {
        warn!(
            "Trigger {} failed for {}: {}",
            parsed.trigger_source, parsed.user_name, e
        );
    }

    event
}

/// 取得（必要时创建）事件中的 `response` 对象
fn response_mut(event: &mut Value) -> Option<&mut Map<String, Value>> {
    let root = event.as_object_mut()?;
    let response = root
        .entry("response")
        .or_insert_with(|| Value::Object(Map::new()));
    if !response.is_object() {
        *response = Value::Object(Map::new());
    }
    response.as_object_mut()
}

fn email_domain(email: &str) -> Option<String> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim().to_lowercase())
        .filter(|d| !d.is_empty())
}

fn pre_sign_up(settings: &TriggerSettings, event: &TriggerEvent, raw: &mut Value) {
    let Some(domain) = event.attribute("email").as_deref().and_then(email_domain) else {
        return;
    };

    if settings.autoconfirm_domains.iter().any(|d| *d == domain) {
        info!("Auto-confirming {} ({})", event.user_name, domain);
        if let Some(response) = response_mut(raw) {
            response.insert("autoConfirmUser".to_string(), Value::Bool(true));
            response.insert("autoVerifyEmail".to_string(), Value::Bool(true));
        }
    }
}

fn profile_from_event(event: &TriggerEvent) -> UserProfile {
    let mut profile = UserProfile::new(event.user_name.clone());
    profile.email = event.attribute("email");
    profile.display_name = event.attribute("name");
    profile
}

fn post_confirmation<D: UserDirectory>(
    directory: &D,
    event: &TriggerEvent,
) -> Result<(), DirectoryError> {
    if directory.create_profile(&profile_from_event(event))? {
        info!("Created profile for {}", event.user_name);
    } else {
        debug!("Profile for {} already exists", event.user_name);
    }
    Ok(())
}

fn pre_authentication<D: UserDirectory>(
    directory: &D,
    event: &TriggerEvent,
) -> Result<(), DirectoryError> {
    if directory.get_profile(&event.user_name)?.is_none() {
        warn!("Sign-in attempt for {} without a profile", event.user_name);
    }
    Ok(())
}

fn post_authentication<D: UserDirectory>(
    directory: &D,
    event: &TriggerEvent,
) -> Result<(), DirectoryError> {
    let now = Utc::now();
    if !directory.touch_login(&event.user_name, now)? {
        // 确认触发器丢失时补建档案
        let mut profile = profile_from_event(event);
        profile.last_login_at = Some(now);
        directory.create_profile(&profile)?;
        info!("Backfilled profile for {}", event.user_name);
    }
    Ok(())
}

fn token_generation<D: UserDirectory>(
    directory: &D,
    event: &TriggerEvent,
    raw: &mut Value,
) -> Result<(), DirectoryError> {
    let display_name = directory
        .get_profile(&event.user_name)?
        .and_then(|p| p.display_name);

    if let Some(name) = display_name {
        if let Some(response) = response_mut(raw) {
            response.insert(
                "claimsOverrideDetails".to_string(),
                json!({ "claimsToAddOrOverride": { "custom:display_name": name } }),
            );
        }
    }
    Ok(())
}
