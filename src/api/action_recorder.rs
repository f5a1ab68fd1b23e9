// ==========================================
// 中小企业 ERP - 操作日志记录
// ==========================================
// 职责: 写操作完成后追加 ActionLog（受 enable_audit_logs 开关控制）
// ==========================================

use std::sync::Arc;

use crate::api::error::{config_error, ApiResult};
use crate::config::SettingsReader;
use crate::domain::action_log::ActionLog;
use crate::repository::action_log_repo::ActionLogRepository;

pub struct ActionRecorder {
    action_log_repo: Arc<ActionLogRepository>,
    settings: Arc<dyn SettingsReader>,
}

impl ActionRecorder {
    pub fn new(action_log_repo: Arc<ActionLogRepository>, settings: Arc<dyn SettingsReader>) -> Self {
        Self {
            action_log_repo,
            settings,
        }
    }

    /// 追加操作日志；审计关闭时直接返回
    pub fn record(&self, log: ActionLog) -> ApiResult<()> {
        let enabled = self
            .settings
            .application_settings()
            .map_err(config_error)?
            .enable_audit_logs;
        if !enabled {
            tracing::debug!(action_type = %log.action_type, "审计日志已关闭，跳过记录");
            return Ok(());
        }
        self.action_log_repo.insert(&log)?;
        Ok(())
    }

    pub fn settings(&self) -> &Arc<dyn SettingsReader> {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedSettings;
    use crate::domain::action_log::ActionType;
    use std::sync::Mutex;

    fn setup(enable: bool) -> (ActionRecorder, Arc<ActionLogRepository>) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        let repo = Arc::new(ActionLogRepository::new(conn));
        let mut settings = FixedSettings::default();
        settings.application.enable_audit_logs = enable;
        (ActionRecorder::new(repo.clone(), Arc::new(settings)), repo)
    }

    #[test]
    fn test_record_respects_switch() {
        let (recorder, repo) = setup(true);
        recorder
            .record(ActionLog::new(ActionType::SaveCompany, None, "admin"))
            .unwrap();
        assert_eq!(repo.count().unwrap(), 1);

        let (recorder, repo) = setup(false);
        recorder
            .record(ActionLog::new(ActionType::SaveCompany, None, "admin"))
            .unwrap();
        assert_eq!(repo.count().unwrap(), 0);
    }
}
