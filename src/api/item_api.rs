// ==========================================
// 中小企业 ERP - 商品/服务 API
// ==========================================
// 职责: 目录维护、上下架、库存调整、低库存查询
// 红线: 库存调整仅限实物商品，减少不可超过现有库存
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::action_recorder::ActionRecorder;
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{ensure_valid, require_id, require_operator};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::audit::AuditInfo;
use crate::domain::item::Item;
use crate::domain::types::ItemKind;
use crate::perf::PerfGuard;
use crate::repository::item_repo::ItemRepository;

/// 库存调整方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockAdjustment {
    Increase,
    Decrease,
    Set,
}

impl StockAdjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockAdjustment::Increase => "INCREASE",
            StockAdjustment::Decrease => "DECREASE",
            StockAdjustment::Set => "SET",
        }
    }
}

// ==========================================
// ItemApi - 商品/服务 API
// ==========================================
pub struct ItemApi {
    item_repo: Arc<ItemRepository>,
    recorder: Arc<ActionRecorder>,
}

impl ItemApi {
    pub fn new(item_repo: Arc<ItemRepository>, recorder: Arc<ActionRecorder>) -> Self {
        Self { item_repo, recorder }
    }

    /// 新建商品或服务（货号唯一）
    pub fn create_item(&self, mut item: Item, operator: &str) -> ApiResult<Item> {
        let _perf = PerfGuard::new("item_api.create_item");
        require_operator(operator)?;
        item.item_number = item.item_number.trim().to_string();
        ensure_valid(item.validate())?;

        if self.item_repo.find_by_number(&item.item_number)?.is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "货号{}已存在",
                item.item_number
            )));
        }

        item.id = 0;
        item.audit = AuditInfo::now(Some(operator));
        item.id = self.item_repo.insert(&item)?;

        info!(item_id = item.id, item_number = %item.item_number, kind = item.kind().to_db_str(), "条目已创建");
        self.recorder.record(
            ActionLog::new(ActionType::CreateItem, Some(item.id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "item_number": item.item_number,
                    "kind": item.kind().to_db_str(),
                    "sale_price": item.sale_price.to_string(),
                }))
                .with_detail(format!("新建条目 {}", item.item_number)),
        )?;
        Ok(item)
    }

    /// 修改条目（类型与货号不可修改）
    pub fn update_item(&self, mut item: Item, operator: &str) -> ApiResult<Item> {
        require_operator(operator)?;
        require_id("item_id", item.id)?;
        ensure_valid(item.validate())?;

        let existing = self.get_item(item.id)?;
        if existing.kind() != item.kind() {
            return Err(ApiError::InvalidInput(format!(
                "条目{}的类型不可修改",
                existing.item_number
            )));
        }
        item.item_number = existing.item_number;
        item.audit = existing.audit;
        item.audit.mark_updated(Some(operator), Utc::now().naive_utc());

        self.item_repo.update(&item)?;

        info!(item_id = item.id, "条目已更新");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateItem, Some(item.id.to_string()), operator)
                .with_detail(format!("修改条目 {}", item.item_number)),
        )?;
        Ok(item)
    }

    pub fn get_item(&self, id: i64) -> ApiResult<Item> {
        self.item_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("条目(id={})不存在", id)))
    }

    pub fn get_item_by_number(&self, item_number: &str) -> ApiResult<Item> {
        self.item_repo
            .find_by_number(item_number.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("条目({})不存在", item_number)))
    }

    pub fn list_items(&self) -> ApiResult<Vec<Item>> {
        Ok(self.item_repo.list_all()?)
    }

    /// 在售条目（按货号）
    pub fn list_active_items(&self) -> ApiResult<Vec<Item>> {
        let items = self.item_repo.list_active()?;
        debug!(count = items.len(), "查询在售条目");
        Ok(items)
    }

    pub fn list_items_by_kind(&self, kind: ItemKind) -> ApiResult<Vec<Item>> {
        Ok(self.item_repo.list_by_kind(kind)?)
    }

    /// 库存低于最低库存的商品
    pub fn list_low_stock(&self) -> ApiResult<Vec<Item>> {
        let items = self.item_repo.list_low_stock()?;
        debug!(count = items.len(), "查询低库存商品");
        Ok(items)
    }

    /// 库存调整（增加 / 减少 / 盘点设定）
    pub fn adjust_stock(
        &self,
        id: i64,
        adjustment: StockAdjustment,
        quantity: Decimal,
        reason: Option<&str>,
        operator: &str,
    ) -> ApiResult<Item> {
        let _perf = PerfGuard::new("item_api.adjust_stock");
        require_operator(operator)?;

        let mut item = self.get_item(id)?;
        let before = item.available_quantity();
        match adjustment {
            StockAdjustment::Increase => item.increase_stock(quantity, reason)?,
            StockAdjustment::Decrease => item.decrease_stock(quantity, reason)?,
            StockAdjustment::Set => item.set_stock(quantity, reason)?,
        }
        item.audit.mark_updated(Some(operator), Utc::now().naive_utc());
        self.item_repo.update(&item)?;

        let after = item.available_quantity();
        info!(
            item_id = id,
            adjustment = adjustment.as_str(),
            before = %before,
            after = %after,
            "库存已调整"
        );
        self.recorder.record(
            ActionLog::new(ActionType::AdjustStock, Some(id.to_string()), operator)
                .with_payload(serde_json::json!({
                    "adjustment": adjustment.as_str(),
                    "quantity": quantity.to_string(),
                    "before": before.to_string(),
                    "after": after.to_string(),
                    "reason": reason,
                }))
                .with_detail(format!("库存调整 {}: {} -> {}", item.item_number, before, after)),
        )?;
        Ok(item)
    }

    pub fn activate_item(&self, id: i64, operator: &str) -> ApiResult<Item> {
        self.set_active(id, true, operator)
    }

    pub fn deactivate_item(&self, id: i64, operator: &str) -> ApiResult<Item> {
        self.set_active(id, false, operator)
    }

    fn set_active(&self, id: i64, active: bool, operator: &str) -> ApiResult<Item> {
        require_operator(operator)?;
        let mut item = self.get_item(id)?;
        if active {
            item.activate();
        } else {
            item.deactivate();
        }
        item.audit.mark_updated(Some(operator), Utc::now().naive_utc());
        self.item_repo.update(&item)?;

        info!(item_id = id, active, "条目上下架状态已变更");
        self.recorder.record(
            ActionLog::new(ActionType::UpdateItem, Some(id.to_string()), operator)
                .with_payload(serde_json::json!({ "is_active": active }))
                .with_detail(format!(
                    "{}条目 {}",
                    if active { "启用" } else { "停用" },
                    item.item_number
                )),
        )?;
        Ok(item)
    }

    /// 软删除条目（已开票明细保留货号快照）
    pub fn delete_item(&self, id: i64, operator: &str) -> ApiResult<()> {
        require_operator(operator)?;
        let item = self.get_item(id)?;
        self.item_repo
            .soft_delete(id, Some(operator), &Utc::now().naive_utc())?;

        info!(item_id = id, item_number = %item.item_number, "条目已删除");
        self.recorder.record(
            ActionLog::new(ActionType::DeleteItem, Some(id.to_string()), operator)
                .with_detail(format!("删除条目 {}", item.item_number)),
        )?;
        Ok(())
    }

    pub fn count_active_items(&self) -> ApiResult<i64> {
        Ok(self.item_repo.count_active()?)
    }
}
