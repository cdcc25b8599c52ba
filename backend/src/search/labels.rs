/// Case-insensitive exact label comparison.
pub fn label_matches(image_label: &str, required: &str) -> bool {
    image_label == required || image_label.to_lowercase() == required.to_lowercase()
}

pub fn contains_label(image_labels: &[String], required: &str) -> bool {
    image_labels.iter().any(|label| label_matches(label, required))
}

/// True iff every required label appears in `image_labels`. Vacuously true for no requirements.
pub fn contains_all(image_labels: &[String], required: &[String]) -> bool {
    required
        .iter()
        .all(|label| contains_label(image_labels, label))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn empty_requirement_is_vacuous() {
        assert!(contains_all(&labels(&["sky", "tree"]), &[]));
        assert!(contains_all(&[], &[]));
    }

    #[test]
    fn every_label_must_be_present() {
        assert!(!contains_all(&labels(&["sky"]), &labels(&["sky", "tree"])));
        assert!(contains_all(
            &labels(&["tree", "sky", "cloud"]),
            &labels(&["sky", "tree"])
        ));
    }

    #[test]
    fn comparison_ignores_case_but_not_substrings() {
        assert!(contains_label(&labels(&["Sky"]), "sky"));
        assert!(!contains_label(&labels(&["skyline"]), "sky"));
    }
}
