// ==========================================
// 中小企业 ERP - 公司信息 API
// ==========================================
// 职责: 读取与保存本公司资料（单行）
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::api::action_recorder::ActionRecorder;
use crate::api::error::ApiResult;
use crate::api::validator::{ensure_valid, require_operator};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::audit::AuditInfo;
use crate::domain::company::Company;
use crate::repository::company_repo::{CompanyRepository, COMPANY_ROW_ID};

pub struct CompanyApi {
    company_repo: Arc<CompanyRepository>,
    recorder: Arc<ActionRecorder>,
}

impl CompanyApi {
    pub fn new(company_repo: Arc<CompanyRepository>, recorder: Arc<ActionRecorder>) -> Self {
        Self {
            company_repo,
            recorder,
        }
    }

    /// 公司信息（尚未维护时为 None）
    pub fn get_company(&self) -> ApiResult<Option<Company>> {
        Ok(self.company_repo.get()?)
    }

    /// 保存公司信息（首次保存即创建）
    pub fn save_company(&self, mut company: Company, operator: &str) -> ApiResult<Company> {
        require_operator(operator)?;
        company.second_bank = company.second_bank.filter(|b| !b.is_empty());
        ensure_valid(company.validate())?;

        company.id = COMPANY_ROW_ID;
        company.audit = match self.company_repo.get()? {
            Some(existing) => {
                let mut audit = existing.audit;
                audit.mark_updated(Some(operator), Utc::now().naive_utc());
                audit
            }
            None => AuditInfo::now(Some(operator)),
        };
        self.company_repo.upsert(&company)?;

        info!(company = %company.name, "公司信息已保存");
        self.recorder.record(
            ActionLog::new(ActionType::SaveCompany, Some(COMPANY_ROW_ID.to_string()), operator)
                .with_payload(serde_json::json!({
                    "name": company.name,
                    "is_small_business": company.is_small_business,
                }))
                .with_detail(format!("保存公司信息 {}", company.full_name())),
        )?;
        Ok(company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::config::FixedSettings;
    use crate::repository::action_log_repo::ActionLogRepository;
    use std::sync::Mutex;

    fn setup() -> (CompanyApi, Arc<ActionLogRepository>) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        let logs = Arc::new(ActionLogRepository::new(conn.clone()));
        let recorder = Arc::new(ActionRecorder::new(logs.clone(), Arc::new(FixedSettings::default())));
        (CompanyApi::new(Arc::new(CompanyRepository::new(conn)), recorder), logs)
    }

    #[test]
    fn test_save_and_update_company() {
        let (api, logs) = setup();
        assert!(api.get_company().unwrap().is_none());

        let company = Company::new("Mustermann GmbH", "Hauptstraße 1", "1010", "Wien", "office@mustermann.at");
        api.save_company(company, "admin").unwrap();

        let mut stored = api.get_company().unwrap().unwrap();
        assert_eq!(stored.id, COMPANY_ROW_ID);
        assert_eq!(stored.audit.created_by.as_deref(), Some("admin"));

        stored.city = "Graz".to_string();
        api.save_company(stored, "buchhaltung").unwrap();
        let stored = api.get_company().unwrap().unwrap();
        assert_eq!(stored.city, "Graz");
        assert_eq!(stored.audit.created_by.as_deref(), Some("admin"));
        assert_eq!(stored.audit.updated_by.as_deref(), Some("buchhaltung"));
        assert_eq!(logs.count().unwrap(), 2);
    }

    #[test]
    fn test_invalid_company_rejected() {
        let (api, _) = setup();
        let company = Company::new("", "Hauptstraße 1", "1010", "Wien", "kein-email");
        let err = api.save_company(company, "admin").unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed { .. }));
        assert!(err.violations().len() >= 2);
    }
}
