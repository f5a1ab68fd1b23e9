// ==========================================
// 中小企业 ERP - 应用状态
// ==========================================
// 职责: 打开数据库、建表，装配 Repository 与 API 实例
// 约束: 所有 Repository 共享同一个连接
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    ActionRecorder, CompanyApi, ConfigApi, CustomerApi, DashboardApi, EmailTemplateApi, InvoiceApi,
    ItemApi,
};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::perf::install_sqlite_tracing;
use crate::repository::{
    ActionLogRepository, CompanyRepository, CustomerRepository, EmailTemplateRepository,
    InvoiceRepository, ItemRepository,
};

/// 默认数据库文件名
pub const DB_FILE_NAME: &str = "smb_erp.db";

/// 指定数据库路径的环境变量
pub const DB_PATH_ENV: &str = "SMB_ERP_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    pub customer_api: Arc<CustomerApi>,
    pub item_api: Arc<ItemApi>,
    pub invoice_api: Arc<InvoiceApi>,
    pub company_api: Arc<CompanyApi>,
    pub email_template_api: Arc<EmailTemplateApi>,
    pub dashboard_api: Arc<DashboardApi>,
    pub config_api: Arc<ConfigApi>,

    /// 配置管理器（类型化配置读取）
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 为内存库）
    ///
    /// # 返回
    /// - Err(String): 打开数据库或建表失败
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn =
            open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        install_sqlite_tracing(&mut conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let customer_repo = Arc::new(CustomerRepository::new(conn.clone()));
        let item_repo = Arc::new(ItemRepository::new(conn.clone()));
        let invoice_repo = Arc::new(InvoiceRepository::new(conn.clone()));
        let company_repo = Arc::new(CompanyRepository::new(conn.clone()));
        let template_repo = Arc::new(EmailTemplateRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let recorder = Arc::new(ActionRecorder::new(
            action_log_repo.clone(),
            config_manager.clone(),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let customer_api = Arc::new(CustomerApi::new(
            customer_repo.clone(),
            invoice_repo.clone(),
            recorder.clone(),
        ));
        let item_api = Arc::new(ItemApi::new(item_repo.clone(), recorder.clone()));
        let invoice_api = Arc::new(InvoiceApi::new(
            invoice_repo.clone(),
            customer_repo.clone(),
            item_repo.clone(),
            recorder.clone(),
        ));
        let company_api = Arc::new(CompanyApi::new(company_repo.clone(), recorder.clone()));
        let email_template_api = Arc::new(EmailTemplateApi::new(
            template_repo,
            invoice_repo.clone(),
            customer_repo.clone(),
            company_repo,
            recorder.clone(),
        ));
        let dashboard_api = Arc::new(DashboardApi::new(
            customer_repo,
            item_repo,
            invoice_repo,
            action_log_repo.clone(),
        ));
        let config_api = Arc::new(ConfigApi::new(config_manager.clone(), recorder));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            customer_api,
            item_api,
            invoice_api,
            company_api,
            email_template_api,
            dashboard_api,
            config_api,
            config_manager,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - `SMB_ERP_DB_PATH` 环境变量（非空时）
/// - 开发环境: 用户数据目录/smb-erp-dev/smb_erp.db
/// - 生产环境: 用户数据目录/smb-erp/smb_erp.db
/// - 无法获取数据目录时: ./smb_erp.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from(".").join(DB_FILE_NAME);

    if let Some(data_dir) = dirs::data_dir() {
        let dir = if cfg!(debug_assertions) {
            data_dir.join("smb-erp-dev")
        } else {
            data_dir.join("smb-erp")
        };

        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("无法创建数据目录 {}: {}，使用当前目录", dir.display(), e);
        } else {
            path = dir.join(DB_FILE_NAME);
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_in_memory() {
        let state = AppState::new(":memory:".to_string()).unwrap();
        assert_eq!(state.get_db_path(), ":memory:");
        let today = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let summary = state.dashboard_api.summary(today).unwrap();
        assert_eq!(summary.customer_count, 0);
        assert_eq!(state.action_log_repo.count().unwrap(), 0);
    }
}
