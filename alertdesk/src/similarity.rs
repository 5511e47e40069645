//! Token-set similarity between alerts.

use std::collections::HashSet;

use alertdesk_shared::{Alert, FieldRef};

/// Lower-cased whitespace tokens of `text`.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard index `|a ∩ b| / |a ∪ b|`; 0 when both sets are empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// The configured fields of `alert`, joined by spaces. Absent fields contribute nothing.
pub fn field_text(alert: &Alert, fields: &[FieldRef]) -> String {
    fields
        .iter()
        .filter_map(|f| f.read(alert))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity of two alerts over `fields`.
pub fn similarity(a: &Alert, b: &Alert, fields: &[FieldRef]) -> f64 {
    jaccard(&tokenize(&field_text(a, fields)), &tokenize(&field_text(b, fields)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn set(text: &str) -> HashSet<String> {
        tokenize(text)
    }

    #[test]
    fn jaccard_is_symmetric() {
        let a = set("disk full on host-1");
        let b = set("disk nearly full");
        assert_eq!(jaccard(&a, &b), jaccard(&b, &a));
    }

    #[test]
    fn jaccard_bounds() {
        assert_eq!(jaccard(&set(""), &set("   ")), 0.0);
        assert_eq!(jaccard(&set("Disk FULL"), &set("disk full")), 1.0);
        assert_eq!(jaccard(&set("a b"), &set("c d")), 0.0);
    }

    #[test]
    fn near_duplicate_summaries_clear_half_threshold() {
        let a = Alert::new("h1", "disk full on host-1", None, Utc::now());
        let b = Alert::new("h2", "disk full on host-2", None, Utc::now());
        let fields = vec![FieldRef::resolve("summary")];
        let score = similarity(&a, &b, &fields);
        assert!((score - 0.6).abs() < 1e-9);
        assert!(score >= 0.5);
    }

    #[test]
    fn fields_are_concatenated_before_scoring() {
        let a = Alert::new("h1", "cpu high", None, Utc::now()).with_service("pay-api");
        let b = Alert::new("h2", "cpu high", None, Utc::now()).with_service("auth-api");
        let fields = vec![FieldRef::resolve("summary"), FieldRef::resolve("service")];
        assert!((similarity(&a, &b, &fields) - 0.5).abs() < 1e-9);
    }
}
