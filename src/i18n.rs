// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）、英文、德文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 3] = ["zh-CN", "en", "de"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码（"zh-CN" / "en" / "de"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 将 "de-DE" / "en-US" 之类的区域代码归一到已支持的语言
pub fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.trim().to_lowercase();
    if lower.starts_with("de") {
        "de"
    } else if lower.starts_with("en") {
        "en"
    } else {
        "zh-CN"
    }
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use smb_erp::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 按指定语言翻译（不改变全局语言）
pub fn t_locale(key: &str, locale: &str) -> String {
    let locale = normalize_locale(locale);
    rust_i18n::t!(key, locale = locale).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use smb_erp::i18n::t_with_args;
/// let msg = t_with_args("invoice.not_editable", &[("number", "RG-2025-0001")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{InvoiceStatus, Unit};
    use std::sync::Mutex;

    // rust-i18n 的 locale 为全局状态，且 Rust 测试默认并行执行；
    // 为避免测试互相干扰，这里对 i18n 相关测试串行化。
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");

        // 恢复默认语言
        set_locale("zh-CN");
        assert_eq!(current_locale(), "zh-CN");
    }

    #[test]
    fn test_translate_simple() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("zh-CN");
        assert_eq!(t("common.success"), "操作成功");

        set_locale("de");
        assert_eq!(t("common.success"), "Vorgang erfolgreich");

        set_locale("zh-CN");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        let msg = t_with_args("invoice.not_editable", &[("number", "RG-2025-0001")]);
        assert!(msg.contains("RG-2025-0001"));
        assert!(msg.contains("draft"));

        set_locale("zh-CN");
    }

    #[test]
    fn test_labels_by_locale() {
        assert_eq!(normalize_locale("de-DE"), "de");
        assert_eq!(normalize_locale("en-US"), "en");
        assert_eq!(normalize_locale("fr"), "zh-CN");

        assert_eq!(InvoiceStatus::Paid.label("de-DE"), "Bezahlt");
        assert_eq!(InvoiceStatus::Paid.label("en"), "Paid");
        assert_eq!(Unit::Hour.label("zh-CN"), "小时");
    }
}
