// ==========================================
// 中小企业 ERP - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::settings::{is_valid_date_format, ApplicationSettings, InvoiceSettings, SettingsReader};
use crate::domain::customer::MAX_TERM_DAYS;
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 全局作用域
pub const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        if key.trim().is_empty() {
            return Err("配置键不能为空".into());
        }
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key.trim(), value],
        )?;
        Ok(())
    }

    /// 全部 global 配置（按键排序）
    pub fn list_config_values(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 解析失败时记录告警并回退默认值
    fn parse_or_default<T: FromStr>(key: &str, raw: &str, default: T) -> T {
        match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                default
            }
        }
    }

    fn term_days_or_default(raw: &str, default: i32) -> i32 {
        let days = Self::parse_or_default(config_keys::DEFAULT_PAYMENT_TERM_DAYS, raw, default);
        if (0..=MAX_TERM_DAYS).contains(&days) {
            days
        } else {
            tracing::warn!(config_key = config_keys::DEFAULT_PAYMENT_TERM_DAYS, days, "付款期限超出范围，使用默认值");
            default
        }
    }

    fn parse_bool(key: &str, raw: &str, default: bool) -> bool {
        match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                tracing::warn!(config_key = key, raw_value = %raw, "布尔配置格式错误，使用默认值");
                default
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let config_map = self.list_config_values()?;
        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 注意
    /// - 快照中的键覆盖现有值，快照外的键保持不变
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            let affected = tx.execute(
                "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
                params![GLOBAL_SCOPE, key, value],
            )?;
            count += affected;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// SettingsReader Trait 实现
// ==========================================
impl SettingsReader for ConfigManager {
    fn invoice_settings(&self) -> Result<InvoiceSettings, Box<dyn Error>> {
        let d = InvoiceSettings::default();

        let number_prefix = self.get_config_or_default(config_keys::INVOICE_NUMBER_PREFIX, &d.number_prefix)?;
        let start_number = self.get_config_or_default(config_keys::INVOICE_START_NUMBER, "1")?;
        let yearly_reset = self.get_config_or_default(config_keys::INVOICE_YEARLY_RESET, "true")?;
        let term_days = self.get_config_or_default(config_keys::DEFAULT_PAYMENT_TERM_DAYS, "14")?;
        let vat_rate = self.get_config_or_default(config_keys::DEFAULT_VAT_RATE, "20")?;
        let currency = self.get_config_or_default(config_keys::CURRENCY, &d.currency)?;
        let symbol = self.get_config_or_default(config_keys::CURRENCY_SYMBOL, &d.currency_symbol)?;

        let number_prefix = match number_prefix.trim() {
            "" => d.number_prefix.clone(),
            p => p.to_string(),
        };

        Ok(InvoiceSettings {
            number_prefix,
            start_number: Self::parse_or_default(config_keys::INVOICE_START_NUMBER, &start_number, d.start_number)
                .max(1),
            yearly_reset: Self::parse_bool(config_keys::INVOICE_YEARLY_RESET, &yearly_reset, d.yearly_reset),
            default_payment_term_days: Self::term_days_or_default(&term_days, d.default_payment_term_days),
            default_vat_rate: Self::parse_or_default::<Decimal>(
                config_keys::DEFAULT_VAT_RATE,
                &vat_rate,
                d.default_vat_rate,
            ),
            currency: currency.trim().to_uppercase(),
            currency_symbol: symbol,
        })
    }

    fn application_settings(&self) -> Result<ApplicationSettings, Box<dyn Error>> {
        let d = ApplicationSettings::default();

        let language = self.get_config_or_default(config_keys::DEFAULT_LANGUAGE, &d.default_language)?;
        let date_format = self.get_config_or_default(config_keys::DATE_FORMAT, &d.date_format)?;
        let audit = self.get_config_or_default(config_keys::ENABLE_AUDIT_LOGS, "true")?;

        let date_format = if is_valid_date_format(&date_format) {
            date_format
        } else {
            tracing::warn!(config_key = config_keys::DATE_FORMAT, raw_value = %date_format, "日期格式不可用，使用默认值");
            d.date_format.clone()
        };

        Ok(ApplicationSettings {
            default_language: language,
            date_format,
            enable_audit_logs: Self::parse_bool(config_keys::ENABLE_AUDIT_LOGS, &audit, d.enable_audit_logs),
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 发票编号
    pub const INVOICE_NUMBER_PREFIX: &str = "invoice_number_prefix";
    pub const INVOICE_START_NUMBER: &str = "invoice_start_number";
    pub const INVOICE_YEARLY_RESET: &str = "invoice_yearly_reset";

    // 默认条款
    pub const DEFAULT_PAYMENT_TERM_DAYS: &str = "default_payment_term_days";
    pub const DEFAULT_VAT_RATE: &str = "default_vat_rate";
    pub const CURRENCY: &str = "currency";
    pub const CURRENCY_SYMBOL: &str = "currency_symbol";

    // 应用
    pub const DEFAULT_LANGUAGE: &str = "default_language";
    pub const DATE_FORMAT: &str = "date_format";
    pub const ENABLE_AUDIT_LOGS: &str = "enable_audit_logs";
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn setup() -> ConfigManager {
        let conn = crate::db::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let cm = setup();
        assert_eq!(cm.invoice_settings().unwrap(), InvoiceSettings::default());
        assert_eq!(cm.application_settings().unwrap(), ApplicationSettings::default());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cm = setup();
        cm.set_config_value(config_keys::INVOICE_NUMBER_PREFIX, "AR").unwrap();
        cm.set_config_value(config_keys::INVOICE_START_NUMBER, "100").unwrap();
        cm.set_config_value(config_keys::INVOICE_YEARLY_RESET, "false").unwrap();
        cm.set_config_value(config_keys::DEFAULT_VAT_RATE, "10.5").unwrap();
        cm.set_config_value(config_keys::DEFAULT_PAYMENT_TERM_DAYS, "abc").unwrap();
        cm.set_config_value(config_keys::ENABLE_AUDIT_LOGS, "0").unwrap();

        let s = cm.invoice_settings().unwrap();
        assert_eq!(s.number_prefix, "AR");
        assert_eq!(s.start_number, 100);
        assert!(!s.yearly_reset);
        assert_eq!(s.default_vat_rate, dec!(10.5));
        assert_eq!(s.default_payment_term_days, 14);
        assert!(!cm.application_settings().unwrap().enable_audit_logs);

        cm.set_config_value(config_keys::DEFAULT_PAYMENT_TERM_DAYS, "2147483647").unwrap();
        cm.set_config_value(config_keys::DATE_FORMAT, "%H:%M").unwrap();
        assert_eq!(cm.invoice_settings().unwrap().default_payment_term_days, 14);
        assert_eq!(cm.application_settings().unwrap().date_format, "%d.%m.%Y");
    }

    #[test]
    fn test_snapshot_restore() {
        let cm = setup();
        cm.set_config_value(config_keys::CURRENCY, "CHF").unwrap();
        let snapshot = cm.get_config_snapshot().unwrap();

        cm.set_config_value(config_keys::CURRENCY, "USD").unwrap();
        assert_eq!(cm.restore_config_from_snapshot(&snapshot).unwrap(), 1);
        assert_eq!(cm.invoice_settings().unwrap().currency, "CHF");

        assert!(cm.restore_config_from_snapshot("not json").is_err());
        assert!(cm.set_config_value("  ", "x").is_err());
    }
}
