// ==========================================
// 中小企业 ERP - 商品/服务数据仓储
// ==========================================
// 对齐: scripts/schema.sql item 表（单表存储，item_kind 区分）
// 红线: Repository 不含业务逻辑；默认查询排除已软删除记录
// ==========================================

use crate::domain::item::{Item, ItemDetails, ProductDetails, ServiceDetails};
use crate::domain::types::{ItemKind, Unit};
use crate::repository::common::{
    fmt_dec, fmt_opt_dec, fmt_ts, get_decimal, get_opt_decimal, read_audit, restore_row,
    soft_delete_row, SoftDeleteTable, AUDIT_COLUMNS,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

const ITEM_COLUMNS: &str = "id, item_kind, item_number, name, description, sale_price,
    purchase_price, vat_rate, unit, category, is_active, notes,
    barcode, stock_quantity, minimum_stock, maximum_stock, storage_location, weight,
    dimensions, manufacturer, manufacturer_part_number, supplier_id, supplier_item_number,
    estimated_duration_hours, minimum_duration_hours, billing_rhythm, is_recurring,
    recurrence_interval, required_qualifications, work_location, can_be_remote,
    additional_material_costs, travel_cost_per_km, flat_travel_cost";

/// 写入用的列值（商品/服务互斥列置 NULL）
struct ItemColumns {
    barcode: Option<String>,
    stock_quantity: Option<String>,
    minimum_stock: Option<String>,
    maximum_stock: Option<String>,
    storage_location: Option<String>,
    weight: Option<String>,
    dimensions: Option<String>,
    manufacturer: Option<String>,
    manufacturer_part_number: Option<String>,
    supplier_id: Option<i64>,
    supplier_item_number: Option<String>,
    estimated_duration_hours: Option<String>,
    minimum_duration_hours: Option<String>,
    billing_rhythm: Option<String>,
    is_recurring: bool,
    recurrence_interval: Option<String>,
    required_qualifications: Option<String>,
    work_location: Option<String>,
    can_be_remote: bool,
    additional_material_costs: Option<String>,
    travel_cost_per_km: Option<String>,
    flat_travel_cost: Option<String>,
}

impl ItemColumns {
    fn from_details(details: &ItemDetails) -> Self {
        let empty = Self {
            barcode: None,
            stock_quantity: None,
            minimum_stock: None,
            maximum_stock: None,
            storage_location: None,
            weight: None,
            dimensions: None,
            manufacturer: None,
            manufacturer_part_number: None,
            supplier_id: None,
            supplier_item_number: None,
            estimated_duration_hours: None,
            minimum_duration_hours: None,
            billing_rhythm: None,
            is_recurring: false,
            recurrence_interval: None,
            required_qualifications: None,
            work_location: None,
            can_be_remote: false,
            additional_material_costs: None,
            travel_cost_per_km: None,
            flat_travel_cost: None,
        };
        match details {
            ItemDetails::Product(p) => Self {
                barcode: p.barcode.clone(),
                stock_quantity: Some(fmt_dec(&p.stock_quantity)),
                minimum_stock: Some(fmt_dec(&p.minimum_stock)),
                maximum_stock: fmt_opt_dec(&p.maximum_stock),
                storage_location: p.storage_location.clone(),
                weight: fmt_opt_dec(&p.weight),
                dimensions: p.dimensions.clone(),
                manufacturer: p.manufacturer.clone(),
                manufacturer_part_number: p.manufacturer_part_number.clone(),
                supplier_id: p.supplier_id,
                supplier_item_number: p.supplier_item_number.clone(),
                ..empty
            },
            ItemDetails::Service(s) => Self {
                estimated_duration_hours: fmt_opt_dec(&s.estimated_duration_hours),
                minimum_duration_hours: fmt_opt_dec(&s.minimum_duration_hours),
                billing_rhythm: s.billing_rhythm.clone(),
                is_recurring: s.is_recurring,
                recurrence_interval: s.recurrence_interval.clone(),
                required_qualifications: s.required_qualifications.clone(),
                work_location: s.work_location.clone(),
                can_be_remote: s.can_be_remote,
                additional_material_costs: fmt_opt_dec(&s.additional_material_costs),
                travel_cost_per_km: fmt_opt_dec(&s.travel_cost_per_km),
                flat_travel_cost: fmt_opt_dec(&s.flat_travel_cost),
                ..empty
            },
        }
    }

    /// 与 SQL 中 detail 列顺序一致
    fn as_params(&self) -> [&dyn ToSql; 22] {
        [
            &self.barcode,
            &self.stock_quantity,
            &self.minimum_stock,
            &self.maximum_stock,
            &self.storage_location,
            &self.weight,
            &self.dimensions,
            &self.manufacturer,
            &self.manufacturer_part_number,
            &self.supplier_id,
            &self.supplier_item_number,
            &self.estimated_duration_hours,
            &self.minimum_duration_hours,
            &self.billing_rhythm,
            &self.is_recurring,
            &self.recurrence_interval,
            &self.required_qualifications,
            &self.work_location,
            &self.can_be_remote,
            &self.additional_material_costs,
            &self.travel_cost_per_km,
            &self.flat_travel_cost,
        ]
    }
}

// ==========================================
// ItemRepository - 商品仓储
// ==========================================
pub struct ItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn select_sql(where_clause: &str) -> String {
        format!("SELECT {}, {} FROM item {}", ITEM_COLUMNS, AUDIT_COLUMNS, where_clause)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Item> {
        let kind = ItemKind::from_str(&row.get::<_, String>("item_kind")?);
        let details = match kind {
            ItemKind::Product => ItemDetails::Product(ProductDetails {
                barcode: row.get("barcode")?,
                stock_quantity: get_opt_decimal(row, "stock_quantity")?.unwrap_or(Decimal::ZERO),
                minimum_stock: get_opt_decimal(row, "minimum_stock")?.unwrap_or(Decimal::ZERO),
                maximum_stock: get_opt_decimal(row, "maximum_stock")?,
                storage_location: row.get("storage_location")?,
                weight: get_opt_decimal(row, "weight")?,
                dimensions: row.get("dimensions")?,
                manufacturer: row.get("manufacturer")?,
                manufacturer_part_number: row.get("manufacturer_part_number")?,
                supplier_id: row.get("supplier_id")?,
                supplier_item_number: row.get("supplier_item_number")?,
            }),
            ItemKind::Service => ItemDetails::Service(ServiceDetails {
                estimated_duration_hours: get_opt_decimal(row, "estimated_duration_hours")?,
                minimum_duration_hours: get_opt_decimal(row, "minimum_duration_hours")?,
                billing_rhythm: row.get("billing_rhythm")?,
                is_recurring: row.get("is_recurring")?,
                recurrence_interval: row.get("recurrence_interval")?,
                required_qualifications: row.get("required_qualifications")?,
                work_location: row.get("work_location")?,
                can_be_remote: row.get("can_be_remote")?,
                additional_material_costs: get_opt_decimal(row, "additional_material_costs")?,
                travel_cost_per_km: get_opt_decimal(row, "travel_cost_per_km")?,
                flat_travel_cost: get_opt_decimal(row, "flat_travel_cost")?,
            }),
        };

        Ok(Item {
            id: row.get("id")?,
            item_number: row.get("item_number")?,
            name: row.get("name")?,
            description: row.get("description")?,
            sale_price: get_decimal(row, "sale_price")?,
            purchase_price: get_opt_decimal(row, "purchase_price")?,
            vat_rate: get_decimal(row, "vat_rate")?,
            unit: Unit::from_str(&row.get::<_, String>("unit")?),
            category: row.get("category")?,
            is_active: row.get("is_active")?,
            notes: row.get("notes")?,
            details,
            audit: read_audit(row)?,
        })
    }

    fn query_list(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepositoryResult<Vec<Item>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::map_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入商品，返回新主键
    pub fn insert(&self, item: &Item) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let detail = ItemColumns::from_details(&item.details);

        let kind = item.kind().to_db_str();
        let sale_price = fmt_dec(&item.sale_price);
        let purchase_price = fmt_opt_dec(&item.purchase_price);
        let vat_rate = fmt_dec(&item.vat_rate);
        let unit = item.unit.to_db_str();

        let head_values: [&dyn ToSql; 11] = [
            &kind,
            &item.item_number,
            &item.name,
            &item.description,
            &sale_price,
            &purchase_price,
            &vat_rate,
            &unit,
            &item.category,
            &item.is_active,
            &item.notes,
        ];
        let created_at = fmt_ts(&item.audit.created_at);
        let updated_at = fmt_ts(&item.audit.updated_at);
        let deleted_at = item.audit.deleted_at.as_ref().map(fmt_ts);
        let audit_values: [&dyn ToSql; 7] = [
            &created_at,
            &updated_at,
            &item.audit.created_by,
            &item.audit.updated_by,
            &item.audit.is_deleted,
            &deleted_at,
            &item.audit.deleted_by,
        ];

        let values: Vec<&dyn ToSql> = head_values
            .iter()
            .chain(detail.as_params().iter())
            .chain(audit_values.iter())
            .copied()
            .collect();
        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let columns = ITEM_COLUMNS.trim_start_matches("id, ");
        let sql = format!(
            "INSERT INTO item ({}, {}) VALUES ({})",
            columns, AUDIT_COLUMNS, placeholders
        );

        conn.execute(&sql, values.as_slice())?;
        Ok(conn.last_insert_rowid())
    }

    /// 更新商品（类型与货号不可修改）
    pub fn update(&self, item: &Item) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let detail = ItemColumns::from_details(&item.details);

        let sale_price = fmt_dec(&item.sale_price);
        let purchase_price = fmt_opt_dec(&item.purchase_price);
        let vat_rate = fmt_dec(&item.vat_rate);
        let unit = item.unit.to_db_str();
        let updated_at = fmt_ts(&item.audit.updated_at);

        let head_values: [&dyn ToSql; 8] = [
            &item.name,
            &item.description,
            &sale_price,
            &purchase_price,
            &vat_rate,
            &unit,
            &item.category,
            &item.is_active,
        ];
        let tail_values: [&dyn ToSql; 4] =
            [&item.notes, &updated_at, &item.audit.updated_by, &item.id];

        let values: Vec<&dyn ToSql> = head_values
            .iter()
            .chain(detail.as_params().iter())
            .chain(tail_values.iter())
            .copied()
            .collect();

        let affected = conn.execute(
            r#"
            UPDATE item SET
                name = ?1, description = ?2, sale_price = ?3, purchase_price = ?4, vat_rate = ?5,
                unit = ?6, category = ?7, is_active = ?8,
                barcode = ?9, stock_quantity = ?10, minimum_stock = ?11, maximum_stock = ?12,
                storage_location = ?13, weight = ?14, dimensions = ?15, manufacturer = ?16,
                manufacturer_part_number = ?17, supplier_id = ?18, supplier_item_number = ?19,
                estimated_duration_hours = ?20, minimum_duration_hours = ?21, billing_rhythm = ?22,
                is_recurring = ?23, recurrence_interval = ?24, required_qualifications = ?25,
                work_location = ?26, can_be_remote = ?27, additional_material_costs = ?28,
                travel_cost_per_km = ?29, flat_travel_cost = ?30,
                notes = ?31, updated_at = ?32, updated_by = ?33
            WHERE id = ?34 AND is_deleted = 0
            "#,
            values.as_slice(),
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Item", item.id));
        }
        Ok(())
    }

    pub fn soft_delete(&self, id: i64, actor: Option<&str>, now: &NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        soft_delete_row(&conn, SoftDeleteTable::Item, id, actor, now)
    }

    pub fn restore(&self, id: i64, actor: Option<&str>, now: &NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        restore_row(&conn, SoftDeleteTable::Item, id, actor, now)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Item>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE id = ?1 AND is_deleted = 0");
        Ok(conn.query_row(&sql, params![id], Self::map_row).optional()?)
    }

    pub fn find_by_number(&self, item_number: &str) -> RepositoryResult<Option<Item>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE item_number = ?1 AND is_deleted = 0");
        Ok(conn
            .query_row(&sql, params![item_number], Self::map_row)
            .optional()?)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Item>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE is_deleted = 0 ORDER BY item_number");
        Self::query_list(&conn, &sql, [])
    }

    /// 在售条目（按货号排序）
    pub fn list_active(&self) -> RepositoryResult<Vec<Item>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE is_deleted = 0 AND is_active = 1 ORDER BY item_number");
        Self::query_list(&conn, &sql, [])
    }

    pub fn list_by_kind(&self, kind: ItemKind) -> RepositoryResult<Vec<Item>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql("WHERE is_deleted = 0 AND item_kind = ?1 ORDER BY item_number");
        Self::query_list(&conn, &sql, params![kind.to_db_str()])
    }

    /// 库存低于最低库存的在售商品
    ///
    /// 数量以 TEXT 存储，比较放在内存中做十进制比较。
    pub fn list_low_stock(&self) -> RepositoryResult<Vec<Item>> {
        let conn = self.get_conn()?;
        let sql = Self::select_sql(
            "WHERE is_deleted = 0 AND is_active = 1 AND item_kind = 'PRODUCT' ORDER BY item_number",
        );
        let items = Self::query_list(&conn, &sql, [])?;
        Ok(items
            .into_iter()
            .filter(|i| i.is_below_minimum_stock())
            .collect())
    }

    pub fn count_active(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM item WHERE is_deleted = 0 AND is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
