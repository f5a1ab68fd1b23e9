// ==========================================
// 中小企业 ERP - 操作日志领域模型
// ==========================================
// 红线: 所有写操作必须记录（审计开关开启时）
// 用途: 审计追踪，只追加不修改
// 对齐: scripts/schema.sql action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,             // 日志ID (uuid)
    pub action_type: String,           // 操作类型 (ActionType::as_str)
    pub entity_type: String,           // 实体类型: Customer / Item / Invoice ...
    pub entity_id: Option<String>,     // 实体主键或编号
    pub action_ts: NaiveDateTime,      // 操作时间 (UTC)
    pub actor: String,                 // 操作人
    pub payload_json: Option<JsonValue>, // 操作参数
    pub detail: Option<String>,        // 详细描述
}

impl ActionLog {
    /// 以新 uuid 和当前时间构造
    pub fn new(action_type: ActionType, entity_id: Option<String>, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            entity_type: action_type.entity_type().to_string(),
            entity_id,
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    // ===== 客户 =====
    CreateCustomer,
    UpdateCustomer,
    DeleteCustomer,
    RestoreCustomer,
    // ===== 商品 =====
    CreateItem,
    UpdateItem,
    AdjustStock,
    DeleteItem,
    // ===== 发票 =====
    CreateInvoice,
    UpdateInvoice,
    SendInvoice,
    RegisterPayment,
    CancelInvoice,
    DeleteInvoice,
    RefreshOverdue,
    // ===== 公司与模板 =====
    SaveCompany,
    CreateTemplate,
    UpdateTemplate,
    SetDefaultTemplate,
    DeleteTemplate,
    // ===== 配置 =====
    UpdateConfig,
    RestoreConfig,
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateCustomer => "CreateCustomer",
            ActionType::UpdateCustomer => "UpdateCustomer",
            ActionType::DeleteCustomer => "DeleteCustomer",
            ActionType::RestoreCustomer => "RestoreCustomer",
            ActionType::CreateItem => "CreateItem",
            ActionType::UpdateItem => "UpdateItem",
            ActionType::AdjustStock => "AdjustStock",
            ActionType::DeleteItem => "DeleteItem",
            ActionType::CreateInvoice => "CreateInvoice",
            ActionType::UpdateInvoice => "UpdateInvoice",
            ActionType::SendInvoice => "SendInvoice",
            ActionType::RegisterPayment => "RegisterPayment",
            ActionType::CancelInvoice => "CancelInvoice",
            ActionType::DeleteInvoice => "DeleteInvoice",
            ActionType::RefreshOverdue => "RefreshOverdue",
            ActionType::SaveCompany => "SaveCompany",
            ActionType::CreateTemplate => "CreateTemplate",
            ActionType::UpdateTemplate => "UpdateTemplate",
            ActionType::SetDefaultTemplate => "SetDefaultTemplate",
            ActionType::DeleteTemplate => "DeleteTemplate",
            ActionType::UpdateConfig => "UpdateConfig",
            ActionType::RestoreConfig => "RestoreConfig",
        }
    }

    /// 操作所属实体类型
    pub fn entity_type(&self) -> &'static str {
        match self {
            ActionType::CreateCustomer
            | ActionType::UpdateCustomer
            | ActionType::DeleteCustomer
            | ActionType::RestoreCustomer => "Customer",
            ActionType::CreateItem
            | ActionType::UpdateItem
            | ActionType::AdjustStock
            | ActionType::DeleteItem => "Item",
            ActionType::CreateInvoice
            | ActionType::UpdateInvoice
            | ActionType::SendInvoice
            | ActionType::RegisterPayment
            | ActionType::CancelInvoice
            | ActionType::DeleteInvoice
            | ActionType::RefreshOverdue => "Invoice",
            ActionType::SaveCompany => "Company",
            ActionType::CreateTemplate
            | ActionType::UpdateTemplate
            | ActionType::SetDefaultTemplate
            | ActionType::DeleteTemplate => "EmailTemplate",
            ActionType::UpdateConfig | ActionType::RestoreConfig => "Config",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
