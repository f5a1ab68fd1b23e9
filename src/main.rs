// ==========================================
// 中小企业 ERP - 命令行入口
// ==========================================
// 打开默认数据库（不存在则建表），输出概览
// ==========================================

use smb_erp::app::{get_default_db_path, AppState};
use smb_erp::{i18n, logging};

fn main() {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", smb_erp::APP_NAME);
    tracing::info!("系统版本: {}", smb_erp::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let app_state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            std::process::exit(1);
        }
    };

    let language = app_state
        .config_api
        .application_settings()
        .map(|s| s.default_language)
        .unwrap_or_default();
    i18n::set_locale(i18n::normalize_locale(&language));

    let today = chrono::Local::now().date_naive();
    match app_state.invoice_api.refresh_overdue_statuses(today, "system") {
        Ok(0) => {}
        Ok(n) => tracing::info!("{} 张发票已标记为逾期", n),
        Err(e) => tracing::warn!("逾期刷新失败: {}", e),
    }

    match app_state.dashboard_api.summary(today) {
        Ok(summary) => println!("{}", summary.summary_line()),
        Err(e) => {
            tracing::error!("概览汇总失败: {}", e);
            std::process::exit(1);
        }
    }
}
