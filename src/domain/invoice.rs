// ==========================================
// 中小企业 ERP - 发票与发票明细
// ==========================================
// 职责: 明细金额计算、发票汇总、状态流转、付款登记
// 红线: 金额全程十进制定点运算，汇总统一两位小数
// 红线: 仅草稿状态允许修改明细
// ==========================================

use crate::domain::audit::AuditInfo;
use crate::domain::error::{DomainError, DomainResult, ValidationViolation, Violations};
use crate::domain::item::Item;
use crate::domain::customer::MAX_TERM_DAYS;
use crate::domain::money::{is_valid_percentage, percent_of, round_money, MAX_QUANTITY, MAX_UNIT_PRICE};
use crate::domain::types::{InvoiceStatus, Unit};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 日期加天数，溢出返回 None
pub fn add_days(date: NaiveDate, days: i32) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(i64::from(days)))
}

/// 视为已结清的容差
pub const PAYMENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

// ==========================================
// InvoiceLine - 发票明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub id: i64,
    pub invoice_id: i64,
    pub position: i32,               // 行号（从 1 开始）
    pub item_id: Option<i64>,        // 关联目录条目（自由行为空）
    pub item_number: Option<String>, // 货号快照
    pub description: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_price: Decimal, // 净单价
    pub discount_percentage: Option<Decimal>,
    pub vat_rate: Decimal,
    pub additional_info: Option<String>,
    pub sort_order: i32,
    pub audit: AuditInfo,
}

impl InvoiceLine {
    /// 自由明细行
    pub fn new(description: &str, quantity: Decimal, unit_price: Decimal, vat_rate: Decimal) -> Self {
        Self {
            id: 0,
            invoice_id: 0,
            position: 0,
            item_id: None,
            item_number: None,
            description: description.to_string(),
            quantity,
            unit: Unit::Piece,
            unit_price,
            discount_percentage: None,
            vat_rate,
            additional_info: None,
            sort_order: 0,
            audit: AuditInfo::default(),
        }
    }

    /// 由目录条目生成明细（复制货号/名称/单位/售价/税率）
    pub fn from_item(item: &Item, quantity: Decimal) -> Self {
        let mut line = Self::new(&item.name, quantity, item.sale_price, item.vat_rate);
        line.item_id = (item.id > 0).then_some(item.id);
        line.item_number = Some(item.item_number.clone());
        line.unit = item.unit;
        line
    }

    /// 毛净额 = 数量 × 单价
    pub fn gross_net_amount(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// 行折扣金额
    pub fn discount_amount(&self) -> Decimal {
        match self.discount_percentage {
            Some(pct) => percent_of(self.gross_net_amount(), pct),
            None => Decimal::ZERO,
        }
    }

    /// 折后净额
    pub fn total_net_amount(&self) -> Decimal {
        self.gross_net_amount() - self.discount_amount()
    }

    pub fn vat_amount(&self) -> Decimal {
        percent_of(self.total_net_amount(), self.vat_rate)
    }

    /// 含税总额
    pub fn total_gross_amount(&self) -> Decimal {
        self.total_net_amount() + self.vat_amount()
    }

    pub fn unit_price_including_vat(&self) -> Decimal {
        round_money(self.unit_price + percent_of(self.unit_price, self.vat_rate))
    }

    pub fn apply_discount(&mut self, pct: Decimal) -> DomainResult<()> {
        if !is_valid_percentage(pct) {
            return Err(DomainError::out_of_range(
                "discount_percentage",
                "折扣必须在 0 到 100 之间",
            ));
        }
        self.discount_percentage = Some(pct);
        Ok(())
    }

    pub fn remove_discount(&mut self) {
        self.discount_percentage = None;
    }

    pub fn validate(&self) -> Vec<ValidationViolation> {
        let mut v = Violations::new();
        if self.position < 1 {
            v.push("position", "行号必须从 1 开始");
        }
        v.require("description", &self.description);
        v.max_len("description", &self.description, 500);
        if self.quantity <= Decimal::ZERO {
            v.push("quantity", "数量必须大于 0");
        } else if self.quantity > MAX_QUANTITY {
            v.push("quantity", format!("数量不能超过 {}", MAX_QUANTITY));
        }
        if self.unit_price < Decimal::ZERO {
            v.push("unit_price", "单价不能为负");
        } else if self.unit_price > MAX_UNIT_PRICE {
            v.push("unit_price", format!("单价不能超过 {}", MAX_UNIT_PRICE));
        }
        if matches!(self.discount_percentage, Some(p) if !is_valid_percentage(p)) {
            v.push("discount_percentage", "折扣必须在 0 到 100 之间");
        }
        if !is_valid_percentage(self.vat_rate) {
            v.push("vat_rate", "税率必须在 0 到 100 之间");
        }
        v.into_vec()
    }
}

/// 按税率汇总的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VatBreakdownEntry {
    pub vat_rate: Decimal,
    pub net_amount: Decimal,
    pub vat_amount: Decimal,
}

// ==========================================
// Invoice - 发票
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub invoice_number: String, // RG-2025-0001
    pub customer_id: i64,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    pub status: InvoiceStatus,

    // ===== 金额（由明细汇总）=====
    pub net_amount: Decimal,
    pub vat_amount: Decimal,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,

    // ===== 付款条件 =====
    pub discount_percentage: Option<Decimal>, // 现金折扣 (Skonto) %
    pub discount_days: Option<i32>,
    pub payment_term_days: i32,

    // ===== 文本 =====
    pub subject: Option<String>,
    pub introduction_text: Option<String>,
    pub conclusion_text: Option<String>,
    pub internal_notes: Option<String>,
    pub customer_reference: Option<String>,
    pub project_number: Option<String>,

    pub sent_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,

    pub lines: Vec<InvoiceLine>,
    pub audit: AuditInfo,
}

impl Invoice {
    /// 新建草稿发票（编号由 API 层分配）
    ///
    /// 付款期限超出日期范围时到期日取发票日期，由 validate 报告期限越界
    pub fn new(customer_id: i64, invoice_date: NaiveDate, payment_term_days: i32) -> Self {
        Self {
            id: 0,
            invoice_number: String::new(),
            customer_id,
            invoice_date,
            due_date: add_days(invoice_date, payment_term_days).unwrap_or(invoice_date),
            service_date: None,
            status: InvoiceStatus::Draft,
            net_amount: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            paid_amount: Decimal::ZERO,
            discount_percentage: None,
            discount_days: None,
            payment_term_days,
            subject: None,
            introduction_text: None,
            conclusion_text: None,
            internal_notes: None,
            customer_reference: None,
            project_number: None,
            sent_date: None,
            paid_date: None,
            lines: Vec::new(),
            audit: AuditInfo::default(),
        }
    }

    /// 未删除的明细
    pub fn active_lines(&self) -> impl Iterator<Item = &InvoiceLine> {
        self.lines.iter().filter(|l| !l.audit.is_deleted())
    }

    // ==========================================
    // 汇总
    // ==========================================

    /// 重新汇总金额: 净额与税额各自舍入，总额 = 净额 + 税额
    pub fn recalculate_totals(&mut self) {
        let (net, vat) = self
            .active_lines()
            .fold((Decimal::ZERO, Decimal::ZERO), |(net, vat), line| {
                (net + line.total_net_amount(), vat + line.vat_amount())
            });
        self.net_amount = round_money(net);
        self.vat_amount = round_money(vat);
        self.total_amount = self.net_amount + self.vat_amount;
    }

    /// 按税率分组（税率升序）
    pub fn vat_breakdown(&self) -> Vec<VatBreakdownEntry> {
        let mut groups: BTreeMap<Decimal, (Decimal, Decimal)> = BTreeMap::new();
        for line in self.active_lines() {
            let entry = groups
                .entry(line.vat_rate.normalize())
                .or_insert((Decimal::ZERO, Decimal::ZERO));
            entry.0 += line.total_net_amount();
            entry.1 += line.vat_amount();
        }
        groups
            .into_iter()
            .map(|(vat_rate, (net, vat))| VatBreakdownEntry {
                vat_rate,
                net_amount: round_money(net),
                vat_amount: round_money(vat),
            })
            .collect()
    }

    // ==========================================
    // 付款状态
    // ==========================================

    pub fn outstanding_amount(&self) -> Decimal {
        self.total_amount - self.paid_amount
    }

    pub fn is_fully_paid(&self) -> bool {
        self.outstanding_amount().abs() < PAYMENT_TOLERANCE
    }

    /// 逾期判定（草稿/已结清/已作废不算逾期）
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !matches!(
            self.status,
            InvoiceStatus::Draft | InvoiceStatus::Paid | InvoiceStatus::Cancelled
        ) && self.due_date < today
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if self.is_overdue(today) {
            (today - self.due_date).num_days()
        } else {
            0
        }
    }

    /// 现金折扣金额（按含税总额）
    pub fn cash_discount_amount(&self) -> Option<Decimal> {
        self.discount_percentage
            .map(|pct| round_money(percent_of(self.total_amount, pct)))
    }

    pub fn cash_discount_due_date(&self) -> Option<NaiveDate> {
        self.discount_days
            .and_then(|days| add_days(self.invoice_date, days))
    }

    pub fn is_cash_discount_valid(&self, today: NaiveDate) -> bool {
        self.discount_percentage.is_some()
            && self
                .cash_discount_due_date()
                .map(|due| today <= due)
                .unwrap_or(false)
    }

    // ==========================================
    // 明细维护（仅草稿）
    // ==========================================

    pub fn is_editable(&self) -> bool {
        self.status == InvoiceStatus::Draft
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if !self.is_editable() {
            return Err(DomainError::RuleViolation(format!(
                "发票{}状态为{}，仅草稿可修改明细",
                self.invoice_number, self.status
            )));
        }
        Ok(())
    }

    /// 下一个行号 = 最大行号 + 1（含已删除行，行号不复用）
    pub fn next_position(&self) -> i32 {
        self.lines.iter().map(|l| l.position).max().unwrap_or(0) + 1
    }

    /// 追加明细，返回分配的行号
    pub fn add_line(&mut self, mut line: InvoiceLine) -> DomainResult<i32> {
        self.ensure_editable()?;
        line.invoice_id = self.id;
        line.position = self.next_position();
        if line.sort_order == 0 {
            line.sort_order = line.position;
        }
        let violations = line.validate();
        if let Some(first) = violations.first() {
            return Err(DomainError::out_of_range(&first.field, first.reason.clone()));
        }
        let position = line.position;
        self.lines.push(line);
        self.recalculate_totals();
        Ok(position)
    }

    pub fn line_mut(&mut self, position: i32) -> Option<&mut InvoiceLine> {
        self.lines
            .iter_mut()
            .find(|l| l.position == position && !l.audit.is_deleted())
    }

    /// 修改明细（回调内修改，完成后校验并重算）
    pub fn update_line<F>(&mut self, position: i32, f: F) -> DomainResult<()>
    where
        F: FnOnce(&mut InvoiceLine),
    {
        self.ensure_editable()?;
        let line = self
            .line_mut(position)
            .ok_or_else(|| DomainError::RuleViolation(format!("明细行{}不存在", position)))?;
        let mut draft = line.clone();
        f(&mut draft);
        draft.position = position;
        let violations = draft.validate();
        if let Some(first) = violations.first() {
            return Err(DomainError::out_of_range(&first.field, first.reason.clone()));
        }
        *line = draft;
        self.recalculate_totals();
        Ok(())
    }

    /// 软删除明细
    pub fn remove_line(&mut self, position: i32, actor: Option<&str>) -> DomainResult<()> {
        self.ensure_editable()?;
        let now = chrono::Utc::now().naive_utc();
        let line = self
            .line_mut(position)
            .ok_or_else(|| DomainError::RuleViolation(format!("明细行{}不存在", position)))?;
        line.audit.mark_deleted(actor, now);
        self.recalculate_totals();
        Ok(())
    }

    // ==========================================
    // 状态流转
    // ==========================================

    fn transition_error(&self, to: InvoiceStatus) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// 草稿 -> 已发送（至少一条明细）
    pub fn mark_sent(&mut self, date: NaiveDate) -> DomainResult<()> {
        if self.status != InvoiceStatus::Draft {
            return Err(self.transition_error(InvoiceStatus::Sent));
        }
        if self.active_lines().next().is_none() {
            return Err(DomainError::RuleViolation("发票没有明细，不能发送".to_string()));
        }
        self.recalculate_totals();
        self.status = InvoiceStatus::Sent;
        self.sent_date = Some(date);
        Ok(())
    }

    /// 登记付款，返回新的状态
    pub fn register_payment(&mut self, amount: Decimal, date: NaiveDate) -> DomainResult<InvoiceStatus> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::out_of_range("amount", "付款金额必须大于 0"));
        }
        if !self.status.is_open() {
            return Err(self.transition_error(InvoiceStatus::Paid));
        }
        if amount > self.outstanding_amount() + PAYMENT_TOLERANCE {
            return Err(DomainError::RuleViolation(format!(
                "付款金额 {} 超过未结金额 {}",
                amount,
                self.outstanding_amount()
            )));
        }

        self.paid_amount = round_money(self.paid_amount + amount);
        if self.is_fully_paid() {
            self.status = InvoiceStatus::Paid;
            self.paid_date = Some(date);
        } else {
            self.status = InvoiceStatus::PartiallyPaid;
        }
        Ok(self.status)
    }

    /// 作废（已结清不可作废）
    pub fn cancel(&mut self) -> DomainResult<()> {
        if matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
            return Err(self.transition_error(InvoiceStatus::Cancelled));
        }
        self.status = InvoiceStatus::Cancelled;
        Ok(())
    }

    /// 已发送/部分付款且逾期 -> OVERDUE；返回是否发生变化
    pub fn refresh_overdue(&mut self, today: NaiveDate) -> bool {
        if matches!(self.status, InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid)
            && self.is_overdue(today)
        {
            self.status = InvoiceStatus::Overdue;
            return true;
        }
        false
    }

    pub fn validate(&self) -> Vec<ValidationViolation> {
        let mut v = Violations::new();
        if self.customer_id <= 0 {
            v.push("customer_id", "客户不能为空");
        }
        if self.due_date < self.invoice_date {
            v.push("due_date", "到期日不能早于发票日期");
        }
        if !(0..=MAX_TERM_DAYS).contains(&self.payment_term_days) {
            v.push("payment_term_days", "付款期限必须在 0 到 365 天之间");
        }
        if matches!(self.discount_percentage, Some(p) if !is_valid_percentage(p)) {
            v.push("discount_percentage", "现金折扣必须在 0 到 100 之间");
        }
        if matches!(self.discount_days, Some(d) if !(0..=MAX_TERM_DAYS).contains(&d)) {
            v.push("discount_days", "现金折扣天数必须在 0 到 365 之间");
        }
        if let Some(subject) = &self.subject {
            v.max_len("subject", subject, 200);
        }
        v.into_vec()
    }
}
