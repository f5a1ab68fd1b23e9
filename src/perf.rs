// ==========================================
// 中小企业 ERP - SQL 计数与慢 SQL 日志
// ==========================================
// 依赖 rusqlite 的 trace feature（profile 回调）
// 计数按线程累计，PerfGuard 取作用域内差值
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 开关: 1/true/yes/on 开启
pub const PERF_SQL_ENV: &str = "SMB_ERP_PERF_SQL";
/// 慢 SQL 阈值（毫秒，0 表示不记录）
pub const SLOW_SQL_MS_ENV: &str = "SMB_ERP_SLOW_SQL_MS";

static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

/// SQL 统计配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerfSettings {
    pub enabled: bool,
    pub slow_sql_ms: u64,
}

impl PerfSettings {
    /// 读取环境变量；未设置时 debug 构建开启、阈值 50ms，release 关闭、阈值 200ms
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var(PERF_SQL_ENV).ok().as_deref(),
            std::env::var(SLOW_SQL_MS_ENV).ok().as_deref(),
        )
    }

    fn parse(enabled: Option<&str>, slow_sql_ms: Option<&str>) -> Self {
        let enabled = match enabled {
            Some(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            None => cfg!(debug_assertions),
        };
        let default_ms = if cfg!(debug_assertions) { 50 } else { 200 };
        let slow_sql_ms = slow_sql_ms
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(default_ms);
        Self {
            enabled,
            slow_sql_ms,
        }
    }
}

/// 按环境变量为连接安装 SQL 统计
pub fn install_sqlite_tracing(conn: &mut Connection) {
    install_with(conn, PerfSettings::from_env());
}

pub fn install_with(conn: &mut Connection, settings: PerfSettings) {
    if !settings.enabled {
        conn.profile(None);
        return;
    }
    SLOW_SQL_MS.store(settings.slow_sql_ms, Ordering::Relaxed);
    conn.profile(Some(on_statement));
    tracing::debug!(slow_sql_ms = settings.slow_sql_ms, "SQL 统计已开启");
}

fn on_statement(sql: &str, duration: Duration) {
    STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));

    let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold > 0 && ms >= threshold {
        tracing::warn!(target: "slow_sql", duration_ms = ms, sql = %sql.trim(), "慢 SQL");
    }
}

/// 当前线程已执行的 SQL 语句数
pub fn statement_count() -> u64 {
    STATEMENTS.with(|c| c.get())
}

/// API 操作耗时与 SQL 语句数，drop 时输出一条 debug 日志
///
/// ```ignore
/// let _perf = PerfGuard::new("invoice_api.create_invoice");
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    statements_before: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            statements_before: statement_count(),
        }
    }

    /// 作用域内已执行的语句数
    pub fn statements(&self) -> u64 {
        statement_count().saturating_sub(self.statements_before)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        tracing::debug!(
            target: "perf",
            op = self.op,
            elapsed_ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX),
            sql_count = self.statements(),
            "操作完成"
        );
    }
}
