// ==========================================
// 中小企业 ERP - 配置管理 API
// ==========================================
// 职责: 配置查询、更新、快照管理
// 存储: config_kv（scope_id = global）
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::action_recorder::ActionRecorder;
use crate::api::error::{config_error, ApiError, ApiResult};
use crate::api::validator::require_operator;
use crate::config::config_manager::{config_keys, ConfigManager};
use crate::config::settings::is_valid_date_format;
use crate::config::{ApplicationSettings, InvoiceSettings, SettingsReader};
use crate::domain::customer::MAX_TERM_DAYS;
use crate::domain::action_log::{ActionLog, ActionType};

/// 配置项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    recorder: Arc<ActionRecorder>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>, recorder: Arc<ActionRecorder>) -> Self {
        Self {
            config_manager,
            recorder,
        }
    }

    /// 查询所有配置（按键排序）
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let map = self
            .config_manager
            .list_config_values()
            .map_err(config_error)?;
        Ok(map
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect())
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<String>> {
        self.config_manager
            .get_config_value(key.trim())
            .map_err(config_error)
    }

    /// 发票相关配置（已解析）
    pub fn invoice_settings(&self) -> ApiResult<InvoiceSettings> {
        self.config_manager.invoice_settings().map_err(config_error)
    }

    pub fn application_settings(&self) -> ApiResult<ApplicationSettings> {
        self.config_manager
            .application_settings()
            .map_err(config_error)
    }

    /// 更新单个配置
    pub fn update_config(&self, key: &str, value: &str, operator: &str, reason: &str) -> ApiResult<()> {
        require_operator(operator)?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiError::InvalidInput("配置键不能为空".to_string()));
        }
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作原因不能为空".to_string()));
        }

        check_config_value(key, value)?;

        let previous = self.get_config(key)?;
        self.config_manager
            .set_config_value(key, value)
            .map_err(config_error)?;

        info!(config_key = key, "配置已更新");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateConfig, Some(key.to_string()), operator)
                .with_payload(serde_json::json!({
                    "key": key,
                    "old_value": previous,
                    "new_value": value,
                    "reason": reason,
                }))
                .with_detail(format!("更新配置: {}={}", key, value)),
        )?;
        Ok(())
    }

    /// 配置快照（JSON）
    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        self.config_manager
            .get_config_snapshot()
            .map_err(config_error)
    }

    /// 从快照恢复，返回写入的配置数
    pub fn restore_from_snapshot(&self, snapshot_json: &str, operator: &str, reason: &str) -> ApiResult<usize> {
        require_operator(operator)?;
        if snapshot_json.trim().is_empty() {
            return Err(ApiError::InvalidInput("快照JSON不能为空".to_string()));
        }
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作原因不能为空".to_string()));
        }

        let count = self
            .config_manager
            .restore_config_from_snapshot(snapshot_json)
            .map_err(|e| ApiError::InvalidInput(format!("快照无效: {}", e)))?;

        info!(restored = count, "配置已从快照恢复");
        self.recorder.record(
            ActionLog::new(ActionType::RestoreConfig, None, operator)
                .with_payload(serde_json::json!({
                    "restored_count": count,
                    "reason": reason,
                }))
                .with_detail(format!("从快照恢复{}个配置", count)),
        )?;
        Ok(count)
    }
}

/// 有格式约束的配置键在写入前校验
fn check_config_value(key: &str, value: &str) -> ApiResult<()> {
    match key {
        config_keys::DATE_FORMAT if !is_valid_date_format(value) => Err(ApiError::InvalidInput(
            format!("日期格式不可用: {}", value),
        )),
        config_keys::DEFAULT_PAYMENT_TERM_DAYS => match value.trim().parse::<i32>() {
            Ok(days) if (0..=MAX_TERM_DAYS).contains(&days) => Ok(()),
            _ => Err(ApiError::InvalidInput(format!(
                "付款期限必须是 0 到 {} 之间的整数: {}",
                MAX_TERM_DAYS, value
            ))),
        },
        _ => Ok(()),
    }
}
