// ==========================================
// Message catalogue (rust-i18n)
// ==========================================
// French (default) and English, files under locales/
// The rust_i18n::i18n! macro is invoked in lib.rs
// ==========================================

/// Current locale
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// Switch locale ("fr" or "en")
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// Translate a key without arguments
///
/// # Example
/// ```no_run
/// use its_stock_ledger::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// Translate a key and substitute `%{name}` placeholders
///
/// # Example
/// ```no_run
/// use its_stock_ledger::i18n::t_with_args;
/// let msg = t_with_args("report.shortfall", &[("quantity", "50"), ("unit", "tonnes")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// Label for a status stored as SCREAMING_SNAKE_CASE, e.g. `status_label("rotation_status", "SHORT_DELIVERED")`
pub fn status_label(group: &str, db_value: &str) -> String {
    t(&format!("{}.{}", group, db_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // locale is process-global and tests run in parallel
    static LOCALE_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_set_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");
        assert_eq!(current_locale(), "en");

        set_locale("fr");
        assert_eq!(current_locale(), "fr");
    }

    #[test]
    fn test_status_label_follows_locale() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("fr");
        assert_eq!(status_label("rotation_status", "SHORT_DELIVERED"), "Manquant");

        set_locale("en");
        assert_eq!(status_label("rotation_status", "SHORT_DELIVERED"), "Short-delivered");

        set_locale("fr");
    }

    #[test]
    fn test_translate_with_args() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("fr");
        let msg = t_with_args("report.shortfall", &[("quantity", "50"), ("unit", "tonnes")]);
        assert_eq!(msg, "Écart de 50 tonnes");

        set_locale("en");
        let msg = t_with_args("report.shortfall", &[("quantity", "50"), ("unit", "tonnes")]);
        assert_eq!(msg, "Shortfall of 50 tonnes");

        set_locale("fr");
    }
}
