//! System namespace registry for policy exclusions
//!
//! Objects in these namespaces are managed by the platform itself and are
//! never mutated by the webhook.

/// Core Kubernetes namespaces
pub const CORE: &[&str] = &["kube-system", "kube-public"];

/// Get all namespaces excluded from annotation defaulting
pub fn all() -> Vec<&'static str> {
    CORE.to_vec()
}

/// Check whether `namespace` is one of `excluded`.
pub fn is_excluded<S: AsRef<str>>(namespace: &str, excluded: &[S]) -> bool {
    excluded.iter().any(|ns| ns.as_ref() == namespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_includes_platform_namespaces() {
        let namespaces = all();
        assert!(namespaces.contains(&"kube-system"));
        assert!(namespaces.contains(&"kube-public"));
        assert_eq!(namespaces.len(), CORE.len());
    }

    #[test]
    fn exclusion_is_exact_match() {
        let excluded = all();
        assert!(is_excluded("kube-system", &excluded));
        assert!(!is_excluded("default", &excluded));
        assert!(!is_excluded("kube-system-extra", &excluded));
        assert!(!is_excluded("KUBE-SYSTEM", &excluded));
    }
}
