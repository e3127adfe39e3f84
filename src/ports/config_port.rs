//! Configuration access port.

/// Read-only view of the process configuration, keyed by section and key.
/// Numeric getters fall back to the supplied default on missing or
/// unparseable values; only `get_string` distinguishes absence.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
}
