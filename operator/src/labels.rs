use std::collections::BTreeMap;

/// Label attached to the harness Service and ConfigMap.
pub const PROJECT_LABEL: (&str, &str) = ("project", "ucac");

/// Label identifying the harness Job and the pods it runs.
pub const HARNESS_APP_LABEL: (&str, &str) = ("app.name", "performanceTest");

/// Create labels that can be used as a unique selector for the harness pods.
pub fn harness_labels() -> BTreeMap<String, String> {
    BTreeMap::from_iter(vec![(
        HARNESS_APP_LABEL.0.to_owned(),
        HARNESS_APP_LABEL.1.to_owned(),
    )])
}

/// Labels shared by the supporting harness objects.
pub fn project_labels() -> BTreeMap<String, String> {
    BTreeMap::from_iter(vec![(PROJECT_LABEL.0.to_owned(), PROJECT_LABEL.1.to_owned())])
}

/// Labels that indicate the resource is managed by ucac.
pub fn managed_labels() -> BTreeMap<String, String> {
    BTreeMap::from_iter(vec![("managed-by".to_owned(), "ucac".to_owned())])
}

/// Managed labels extended with the provided labels.
pub fn managed_labels_extend(labels: BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    let mut managed = managed_labels();
    managed.extend(labels);
    Some(managed)
}

/// Report the selector entries that are missing or differ in `labels`.
pub fn unmatched_selector(
    selector: &BTreeMap<String, String>,
    labels: &BTreeMap<String, String>,
) -> Vec<String> {
    selector
        .iter()
        .filter(|(key, value)| labels.get(*key) != Some(*value))
        .map(|(key, value)| format!("{key}={value}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_labels_satisfy_their_own_selector() {
        assert!(unmatched_selector(&harness_labels(), &harness_labels()).is_empty());
    }

    #[test]
    fn project_labels_do_not_select_harness_pods() {
        assert_eq!(
            unmatched_selector(&project_labels(), &harness_labels()),
            vec!["project=ucac".to_owned()]
        );
    }

    #[test]
    fn extend_keeps_managed_by() {
        let labels = managed_labels_extend(project_labels()).unwrap();
        assert_eq!(labels.get("managed-by").map(String::as_str), Some("ucac"));
        assert_eq!(labels.get("project").map(String::as_str), Some("ucac"));
    }
}
