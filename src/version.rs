//! Version information for uikit

/// The version of uikit-core, set at build time
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the package
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Get the full version string
pub fn full_version() -> String {
    format!("{} v{}", APP_NAME, VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "uikit-core");
    }

    #[test]
    fn test_full_version() {
        let full = full_version();
        assert!(full.starts_with("uikit-core v"));
        assert!(full.contains(VERSION));
    }
}
