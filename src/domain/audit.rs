// ==========================================
// 中小企业 ERP - 审计字段与软删除
// ==========================================
// 职责: 所有实体共用的创建/修改/删除元数据
// 红线: is_deleted 与 deleted_at 必须同步
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// AuditInfo - 审计信息
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub created_at: NaiveDateTime,      // 创建时间 (UTC)
    pub updated_at: NaiveDateTime,      // 最后修改时间 (UTC)
    pub created_by: Option<String>,     // 创建人
    pub updated_by: Option<String>,     // 最后修改人
    pub is_deleted: bool,               // 软删除标志
    pub deleted_at: Option<NaiveDateTime>, // 删除时间
    pub deleted_by: Option<String>,     // 删除人
}

impl AuditInfo {
    /// 新建实体时的审计信息
    pub fn new(actor: Option<&str>, now: NaiveDateTime) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            created_by: actor.map(str::to_string),
            updated_by: actor.map(str::to_string),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// 以当前 UTC 时间新建
    pub fn now(actor: Option<&str>) -> Self {
        Self::new(actor, chrono::Utc::now().naive_utc())
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// 标记为已修改
    pub fn mark_updated(&mut self, actor: Option<&str>, now: NaiveDateTime) {
        self.updated_at = now;
        self.updated_by = actor.map(str::to_string);
    }

    /// 软删除
    pub fn mark_deleted(&mut self, actor: Option<&str>, now: NaiveDateTime) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.deleted_by = actor.map(str::to_string);
        self.mark_updated(actor, now);
    }

    /// 恢复已删除实体
    pub fn restore(&mut self, actor: Option<&str>, now: NaiveDateTime) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.deleted_by = None;
        self.mark_updated(actor, now);
    }
}

impl Default for AuditInfo {
    fn default() -> Self {
        Self::now(None)
    }
}
