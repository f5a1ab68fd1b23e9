// ==========================================
// 中小企业 ERP - 商品/服务目录实体
// ==========================================
// 职责: 目录条目（实物商品 / 服务）与库存规则
// 红线: 库存不可为负；服务类条目无库存
// ==========================================

use crate::domain::audit::AuditInfo;
use crate::domain::error::{DomainError, DomainResult, ValidationViolation, Violations};
use crate::domain::money::{is_valid_percentage, percent_of, round_money, HUNDRED, MAX_QUANTITY, MAX_UNIT_PRICE};
use crate::domain::types::{ItemKind, StockStatus, Unit};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 默认增值税率 (%)
pub const DEFAULT_VAT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

// ==========================================
// ProductDetails - 实物商品属性
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDetails {
    pub barcode: Option<String>,
    pub stock_quantity: Decimal,
    pub minimum_stock: Decimal,
    pub maximum_stock: Option<Decimal>,
    pub storage_location: Option<String>,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub supplier_id: Option<i64>,
    pub supplier_item_number: Option<String>,
}

// ==========================================
// ServiceDetails - 服务属性
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceDetails {
    pub estimated_duration_hours: Option<Decimal>,
    pub minimum_duration_hours: Option<Decimal>,
    pub billing_rhythm: Option<String>,
    pub is_recurring: bool,
    pub recurrence_interval: Option<String>,
    pub required_qualifications: Option<String>,
    pub work_location: Option<String>,
    pub can_be_remote: bool,
    pub additional_material_costs: Option<Decimal>,
    pub travel_cost_per_km: Option<Decimal>,
    pub flat_travel_cost: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemDetails {
    Product(ProductDetails),
    Service(ServiceDetails),
}

impl ItemDetails {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemDetails::Product(_) => ItemKind::Product,
            ItemDetails::Service(_) => ItemKind::Service,
        }
    }
}

// ==========================================
// Item - 目录条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub item_number: String, // 唯一货号
    pub name: String,
    pub description: Option<String>,
    pub sale_price: Decimal,
    pub purchase_price: Option<Decimal>,
    pub vat_rate: Decimal,
    pub unit: Unit,
    pub category: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
    pub details: ItemDetails,
    pub audit: AuditInfo,
}

impl Item {
    fn with_details(item_number: &str, name: &str, sale_price: Decimal, details: ItemDetails) -> Self {
        Self {
            id: 0,
            item_number: item_number.to_string(),
            name: name.to_string(),
            description: None,
            sale_price,
            purchase_price: None,
            vat_rate: DEFAULT_VAT_RATE,
            unit: Unit::Piece,
            category: None,
            is_active: true,
            notes: None,
            details,
            audit: AuditInfo::default(),
        }
    }

    /// 新建实物商品
    pub fn new_product(item_number: &str, name: &str, sale_price: Decimal) -> Self {
        Self::with_details(
            item_number,
            name,
            sale_price,
            ItemDetails::Product(ProductDetails::default()),
        )
    }

    /// 新建服务（默认按小时计）
    pub fn new_service(item_number: &str, name: &str, sale_price: Decimal) -> Self {
        let mut item = Self::with_details(
            item_number,
            name,
            sale_price,
            ItemDetails::Service(ServiceDetails::default()),
        );
        item.unit = Unit::Hour;
        item
    }

    pub fn kind(&self) -> ItemKind {
        self.details.kind()
    }

    pub fn product(&self) -> Option<&ProductDetails> {
        match &self.details {
            ItemDetails::Product(p) => Some(p),
            ItemDetails::Service(_) => None,
        }
    }

    pub fn service(&self) -> Option<&ServiceDetails> {
        match &self.details {
            ItemDetails::Service(s) => Some(s),
            ItemDetails::Product(_) => None,
        }
    }

    fn product_mut(&mut self) -> DomainResult<&mut ProductDetails> {
        match &mut self.details {
            ItemDetails::Product(p) => Ok(p),
            ItemDetails::Service(_) => Err(DomainError::NotAProduct(self.item_number.clone())),
        }
    }

    // ==========================================
    // 价格
    // ==========================================

    /// 含税售价
    pub fn sale_price_including_vat(&self) -> Decimal {
        round_money(self.sale_price + percent_of(self.sale_price, self.vat_rate))
    }

    /// 含税进价
    pub fn purchase_price_including_vat(&self) -> Option<Decimal> {
        self.purchase_price
            .map(|p| round_money(p + percent_of(p, self.vat_rate)))
    }

    /// 毛利率 (%)，进价缺失、为 0 或结果超出范围时为 None
    pub fn profit_margin_percentage(&self) -> Option<Decimal> {
        match self.purchase_price {
            Some(p) if p > Decimal::ZERO => (self.sale_price - p)
                .checked_div(p)
                .and_then(|ratio| ratio.checked_mul(HUNDRED))
                .map(round_money),
            _ => None,
        }
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn update_sale_price(&mut self, price: Decimal) -> DomainResult<()> {
        if price < Decimal::ZERO {
            return Err(DomainError::out_of_range("sale_price", "售价不能为负"));
        }
        self.sale_price = price;
        Ok(())
    }

    // ==========================================
    // 库存（仅实物商品）
    // ==========================================

    pub fn is_below_minimum_stock(&self) -> bool {
        self.product()
            .map(|p| p.stock_quantity < p.minimum_stock)
            .unwrap_or(false)
    }

    pub fn is_above_maximum_stock(&self) -> bool {
        self.product()
            .and_then(|p| p.maximum_stock.map(|max| p.stock_quantity > max))
            .unwrap_or(false)
    }

    pub fn stock_status(&self) -> Option<StockStatus> {
        let p = self.product()?;
        let status = if p.stock_quantity <= Decimal::ZERO {
            StockStatus::OutOfStock
        } else if self.is_below_minimum_stock() {
            StockStatus::Low
        } else if self.is_above_maximum_stock() {
            StockStatus::Overstocked
        } else {
            StockStatus::Normal
        };
        Some(status)
    }

    /// 可用数量（不小于 0）
    pub fn available_quantity(&self) -> Decimal {
        self.product()
            .map(|p| p.stock_quantity.max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO)
    }

    pub fn has_sufficient_stock(&self, required: Decimal) -> bool {
        self.product()
            .map(|p| p.stock_quantity >= required)
            .unwrap_or(false)
    }

    pub fn increase_stock(&mut self, quantity: Decimal, reason: Option<&str>) -> DomainResult<()> {
        if quantity <= Decimal::ZERO {
            return Err(DomainError::out_of_range("quantity", "数量必须大于 0"));
        }
        let p = self.product_mut()?;
        let stock = p
            .stock_quantity
            .checked_add(quantity)
            .filter(|s| *s <= MAX_QUANTITY)
            .ok_or_else(|| DomainError::out_of_range("stock_quantity", format!("库存不能超过 {}", MAX_QUANTITY)))?;
        p.stock_quantity = stock;
        self.append_note(reason, || format!("库存增加 {}", quantity.normalize()));
        Ok(())
    }

    pub fn decrease_stock(&mut self, quantity: Decimal, reason: Option<&str>) -> DomainResult<()> {
        if quantity <= Decimal::ZERO {
            return Err(DomainError::out_of_range("quantity", "数量必须大于 0"));
        }
        let p = self.product_mut()?;
        if quantity > p.stock_quantity {
            return Err(DomainError::InsufficientStock {
                required: quantity.normalize().to_string(),
                available: p.stock_quantity.normalize().to_string(),
            });
        }
        p.stock_quantity -= quantity;
        self.append_note(reason, || format!("库存减少 {}", quantity.normalize()));
        Ok(())
    }

    pub fn set_stock(&mut self, quantity: Decimal, reason: Option<&str>) -> DomainResult<()> {
        if quantity < Decimal::ZERO {
            return Err(DomainError::out_of_range("quantity", "库存不能为负"));
        }
        if quantity > MAX_QUANTITY {
            return Err(DomainError::out_of_range("quantity", format!("库存不能超过 {}", MAX_QUANTITY)));
        }
        let p = self.product_mut()?;
        let old = p.stock_quantity;
        p.stock_quantity = quantity;
        self.append_note(reason, || {
            format!("库存由 {} 调整为 {}", old.normalize(), quantity.normalize())
        });
        Ok(())
    }

    fn append_note(&mut self, reason: Option<&str>, head: impl FnOnce() -> String) {
        let reason = match reason.map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => return,
        };
        let line = format!("{}: {}", head(), reason);
        self.notes = match self.notes.take() {
            Some(existing) if !existing.trim().is_empty() => Some(format!("{}\n{}", existing, line)),
            _ => Some(line),
        };
    }

    // ==========================================
    // 校验
    // ==========================================

    pub fn validate(&self) -> Vec<ValidationViolation> {
        let mut v = Violations::new();
        v.require("item_number", &self.item_number);
        v.max_len("item_number", &self.item_number, 50);
        v.require("name", &self.name);
        v.max_len("name", &self.name, 200);

        if self.sale_price < Decimal::ZERO {
            v.push("sale_price", "售价不能为负");
        } else if self.sale_price > MAX_UNIT_PRICE {
            v.push("sale_price", format!("售价不能超过 {}", MAX_UNIT_PRICE));
        }
        match self.purchase_price {
            Some(p) if p < Decimal::ZERO => v.push("purchase_price", "进价不能为负"),
            Some(p) if p > MAX_UNIT_PRICE => {
                v.push("purchase_price", format!("进价不能超过 {}", MAX_UNIT_PRICE))
            }
            _ => {}
        }
        if !is_valid_percentage(self.vat_rate) {
            v.push("vat_rate", "税率必须在 0 到 100 之间");
        }

        match &self.details {
            ItemDetails::Product(p) => {
                if p.stock_quantity < Decimal::ZERO {
                    v.push("stock_quantity", "库存不能为负");
                } else if p.stock_quantity > MAX_QUANTITY {
                    v.push("stock_quantity", format!("库存不能超过 {}", MAX_QUANTITY));
                }
                if p.minimum_stock < Decimal::ZERO {
                    v.push("minimum_stock", "最低库存不能为负");
                } else if p.minimum_stock > MAX_QUANTITY {
                    v.push("minimum_stock", format!("最低库存不能超过 {}", MAX_QUANTITY));
                }
                if let Some(max) = p.maximum_stock {
                    if max < Decimal::ZERO {
                        v.push("maximum_stock", "最高库存不能为负");
                    } else if max < p.minimum_stock {
                        v.push("maximum_stock", "最高库存不能小于最低库存");
                    }
                }
                if matches!(p.weight, Some(w) if w < Decimal::ZERO) {
                    v.push("weight", "重量不能为负");
                }
            }
            ItemDetails::Service(s) => {
                let non_negative = [
                    ("estimated_duration_hours", s.estimated_duration_hours),
                    ("minimum_duration_hours", s.minimum_duration_hours),
                    ("additional_material_costs", s.additional_material_costs),
                    ("travel_cost_per_km", s.travel_cost_per_km),
                    ("flat_travel_cost", s.flat_travel_cost),
                ];
                for (field, value) in non_negative {
                    if matches!(value, Some(x) if x < Decimal::ZERO) {
                        v.push(field, format!("{}不能为负", field));
                    }
                }
            }
        }

        v.into_vec()
    }
}
