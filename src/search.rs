use crate::models::Report;

pub fn normalize_query(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Lowercased texts a report is searchable by, in a fixed field order:
/// reference, author name, category id, category label, description.
pub fn searchable_fields(report: &Report) -> Vec<String> {
    let mut fields: Vec<String> = Vec::with_capacity(5);
    fields.push(report.reference.to_lowercase());
    // anonymous reports have no searchable author
    fields.push(report.author_name().unwrap_or_default().to_lowercase());
    fields.push(report.category.to_lowercase());
    fields.push(report.category_label().to_lowercase());
    fields.push(report.description.to_lowercase());
    fields
}

pub fn fields_contain(fields: &[String], needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    fields
        .iter()
        .any(|text| !text.is_empty() && text.contains(needle))
}

pub fn build_search_mask(reports: &[Report], indices: &[usize], needle: &str) -> Vec<bool> {
    if needle.is_empty() {
        return vec![true; indices.len()];
    }
    indices
        .iter()
        .map(|&idx| {
            reports
                .get(idx)
                .map(|report| fields_contain(&searchable_fields(report), needle))
                .unwrap_or(false)
        })
        .collect()
}

pub fn report_matches(report: &Report, query: &str) -> bool {
    fields_contain(&searchable_fields(report), &normalize_query(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(value: serde_json::Value) -> Report {
        Report::from_value(value).unwrap()
    }

    #[test]
    fn category_label_matches_partial_query() {
        let r = report(json!({ "id": 1, "category": "corruption" }));
        assert!(report_matches(&r, "corrup"));
        assert!(report_matches(&r, "  CORRUP "));
        assert!(!report_matches(&r, "diplome"));
    }

    #[test]
    fn matches_label_accents_and_reference() {
        let r = report(json!({
            "id": 2,
            "reference": "REF-0042",
            "category": "faux-diplomes",
            "description": "Diplôme falsifié présenté au concours"
        }));
        assert!(report_matches(&r, "ref-00"));
        assert!(report_matches(&r, "faux diplômes"));
        assert!(report_matches(&r, "falsifié"));
        assert!(report_matches(&r, ""));
    }

    #[test]
    fn anonymous_author_is_not_searchable() {
        let named = report(json!({ "id": 3, "name": "Rasoanaivo" }));
        let hidden = report(json!({ "id": 4, "name": "Rasoanaivo", "is_anonymous": true }));
        assert!(report_matches(&named, "rasoa"));
        assert!(!report_matches(&hidden, "rasoa"));
    }

    #[test]
    fn mask_follows_index_order() {
        let reports = vec![
            report(json!({ "id": 1, "description": "absence" })),
            report(json!({ "id": 2, "description": "examen" })),
        ];
        let mask = build_search_mask(&reports, &[1, 0], "exam");
        assert_eq!(mask, vec![true, false]);
    }
}
