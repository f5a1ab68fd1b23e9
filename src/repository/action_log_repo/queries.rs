use super::core::ActionLogRepository;
use crate::domain::action_log::ActionLog;
use crate::repository::common::get_ts;
use crate::repository::error::RepositoryResult;
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};

const LOG_COLUMNS: &str =
    "action_id, action_type, entity_type, entity_id, action_ts, actor, payload_json, detail";

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM action_log WHERE action_id = ?", LOG_COLUMNS);
        Ok(conn
            .query_row(&sql, params![action_id], Self::map_row)
            .optional()?)
    }

    /// 某实体的操作历史（新到旧）
    pub fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE entity_type = ? AND entity_id = ?
             ORDER BY action_ts DESC, rowid DESC",
            LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![entity_type, entity_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 最近的操作日志
    pub fn list_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 按操作人查询
    pub fn find_by_actor(&self, actor: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE actor = ? ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            LOG_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params![actor, limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM action_log", [], |row| row.get(0))?;
        Ok(n)
    }

    fn map_row(row: &Row<'_>) -> SqliteResult<ActionLog> {
        let payload_json_str: Option<String> = row.get("payload_json")?;

        Ok(ActionLog {
            action_id: row.get("action_id")?,
            action_type: row.get("action_type")?,
            entity_type: row.get("entity_type")?,
            entity_id: row.get("entity_id")?,
            action_ts: get_ts(row, "action_ts")?,
            actor: row.get("actor")?,
            // 无法解析的 JSON 视为空
            payload_json: payload_json_str.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get("detail")?,
        })
    }
}
