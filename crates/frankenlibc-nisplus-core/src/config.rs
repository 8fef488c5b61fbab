//! Backend configuration read from the process environment.

use std::path::PathBuf;

/// JSON table dump served as the services table.
pub const TABLE_PATH_ENV: &str = "FRANKENLIBC_NISPLUS_TABLE_PATH";
/// Overrides the local NIS+ directory (otherwise `getdomainname`).
pub const LOCAL_DIRECTORY_ENV: &str = "FRANKENLIBC_NIS_LOCAL_DIRECTORY";
/// `strict` or `atoi`; see [`PortPolicy`].
pub const PORT_POLICY_ENV: &str = "FRANKENLIBC_NISPLUS_PORT_POLICY";

/// How the textual `port` column becomes a port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortPolicy {
    /// C `atoi` semantics: leading decimal prefix, anything unparsable is 0,
    /// result truncated to 16 bits.
    #[default]
    AtoiCompatible,
    /// The column must be a plain `u16`; otherwise the record is skipped.
    Strict,
}

impl PortPolicy {
    pub fn from_env_value(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" | "reject" => Self::Strict,
            _ => Self::AtoiCompatible,
        }
    }

    /// Port in host byte order, or `None` when the policy rejects the text.
    pub fn parse(self, text: &[u8]) -> Option<u16> {
        match self {
            Self::AtoiCompatible => Some(atoi(text) as u16),
            Self::Strict => core::str::from_utf8(text).ok()?.trim().parse::<u16>().ok(),
        }
    }
}

/// C `atoi`: optional whitespace and sign, then digits until the first
/// non-digit. Overflow wraps.
fn atoi(text: &[u8]) -> i32 {
    let mut bytes = text.iter().copied().skip_while(u8::is_ascii_whitespace).peekable();
    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };
    let mut acc: i32 = 0;
    for b in bytes.take_while(u8::is_ascii_digit) {
        acc = acc.wrapping_mul(10).wrapping_add(i32::from(b - b'0'));
    }
    if negative { acc.wrapping_neg() } else { acc }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    pub table_path: Option<PathBuf>,
    pub local_directory: Option<String>,
    pub port_policy: PortPolicy,
}

impl BackendConfig {
    /// Build from an environment-like lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            table_path: non_empty(TABLE_PATH_ENV).map(PathBuf::from),
            local_directory: non_empty(LOCAL_DIRECTORY_ENV),
            port_policy: non_empty(PORT_POLICY_ENV)
                .map(|v| PortPolicy::from_env_value(&v))
                .unwrap_or_default(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn atoi_policy_matches_c() {
        let p = PortPolicy::AtoiCompatible;
        assert_eq!(p.parse(b"80"), Some(80));
        assert_eq!(p.parse(b"  443/tcp"), Some(443));
        assert_eq!(p.parse(b"+21"), Some(21));
        assert_eq!(p.parse(b"http"), Some(0));
        assert_eq!(p.parse(b""), Some(0));
        // 65616 does not fit in 16 bits; the C cast keeps the low half.
        assert_eq!(p.parse(b"65616"), Some(80));
        assert_eq!(p.parse(b"-1"), Some(u16::MAX));
    }

    #[test]
    fn strict_policy_rejects_garbage() {
        let p = PortPolicy::Strict;
        assert_eq!(p.parse(b"80"), Some(80));
        assert_eq!(p.parse(b" 8080 "), Some(8080));
        assert_eq!(p.parse(b"http"), None);
        assert_eq!(p.parse(b"65616"), None);
        assert_eq!(p.parse(b"-1"), None);
    }

    #[test]
    fn policy_from_env_value() {
        assert_eq!(PortPolicy::from_env_value("STRICT"), PortPolicy::Strict);
        assert_eq!(PortPolicy::from_env_value("atoi"), PortPolicy::AtoiCompatible);
        assert_eq!(PortPolicy::from_env_value("bogus"), PortPolicy::AtoiCompatible);
    }

    #[test]
    fn config_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            (TABLE_PATH_ENV, "/tmp/services.json"),
            (LOCAL_DIRECTORY_ENV, "example.org."),
            (PORT_POLICY_ENV, "strict"),
        ]);
        let cfg = BackendConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.table_path, Some(PathBuf::from("/tmp/services.json")));
        assert_eq!(cfg.local_directory.as_deref(), Some("example.org."));
        assert_eq!(cfg.port_policy, PortPolicy::Strict);
    }

    #[test]
    fn blank_values_are_ignored() {
        let cfg = BackendConfig::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(cfg, BackendConfig::default());
    }
}
