//! Query assembly.
//!
//! Turns a `ScanRequest` into up to three finalized search queries: one main
//! query from the configured context plus two angle variations (market
//! analysis, procurement). UK-scoped scans get the site-restriction clause
//! and gl/hl hints the search API understands.

use chrono::{Datelike, Utc};

use tidescan_common::{ScanError, ScanRequest, SourceScope};

/// Queries per scan, including variations.
const MAX_QUERIES: usize = 3;
/// Components joined into the main query before it gets unwieldy.
const MAX_COMPONENTS: usize = 6;

const UK_SITE_CLAUSE: &str = "(site:gov.uk OR site:ac.uk OR site:co.uk)";

/// A finalized query string plus the scope parameters that accompany it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Google `dateRestrict` value, e.g. "m6".
    pub date_restrict: Option<String>,
    /// Geolocation bias, e.g. "uk".
    pub gl: Option<String>,
    /// Interface language hint, e.g. "en-GB".
    pub hl: Option<String>,
}

/// Build the scan's search queries. Pure; no side effects.
///
/// Fails with a configuration error when no usable keywords are present.
pub fn build_queries(request: &ScanRequest) -> Result<Vec<SearchQuery>, ScanError> {
    let keywords: Vec<&str> = request
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.is_empty() {
        return Err(ScanError::Configuration(
            "No search keywords configured. Add at least one keyword to the scan request."
                .to_string(),
        ));
    }

    let date_restrict = date_restrict(request);
    let (gl, hl) = if request.is_uk_focused() {
        (Some("uk".to_string()), Some("en-GB".to_string()))
    } else {
        (None, Some("en".to_string()))
    };

    let finalize = |text: String| SearchQuery {
        text: scope_query(request, &text),
        date_restrict: date_restrict.clone(),
        gl: gl.clone(),
        hl: hl.clone(),
    };

    // Custom scope: the user's keywords verbatim, no context terms or variations.
    if request.scope == SourceScope::Custom {
        return Ok(vec![finalize(keywords.join(" "))]);
    }

    let mut components: Vec<String> = Vec::new();
    if let Some(sector) = &request.sector {
        components.push(sector.clone());
    }
    components.extend(request.categories.iter().cloned());
    components.extend(keywords.iter().map(|k| k.to_string()));
    components.extend(request.geographic_scope.iter().cloned());

    let main: Vec<&str> = components
        .iter()
        .take(MAX_COMPONENTS)
        .map(String::as_str)
        .collect();
    let mut queries = vec![finalize(main.join(" "))];

    // Variations for broader coverage, mirroring the single-topic case where
    // only the main query is worth issuing.
    if components.len() > 2 {
        let year = Utc::now().year();
        queries.push(finalize(format!(
            "{} {} market analysis {year}",
            components[0], components[1]
        )));
        queries.push(finalize(format!(
            "{} procurement suppliers trends",
            components[0]
        )));
    }

    queries.truncate(MAX_QUERIES);
    Ok(queries)
}

/// Append the scope clauses to a bare query string.
fn scope_query(request: &ScanRequest, text: &str) -> String {
    let mut query = text.to_string();
    if request.scope == SourceScope::News {
        query.push_str(" latest news");
    }
    if request.is_uk_focused() {
        query.push(' ');
        query.push_str(UK_SITE_CLAUSE);
    }
    query
}

/// Map the request's date range onto the search API's `dateRestrict`
/// buckets. The range is anchored at its start: a scan over the last
/// quarter restricts to "m3", half a year to "m6", up to a year to "y1".
/// Older ranges go unrestricted.
fn date_restrict(request: &ScanRequest) -> Option<String> {
    let range = request.date_range?;
    let days = (Utc::now().date_naive() - range.start).num_days();
    match days {
        i64::MIN..=93 => Some("m3".to_string()),
        94..=186 => Some("m6".to_string()),
        187..=366 => Some("y1".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tidescan_common::DateRange;

    fn request() -> ScanRequest {
        ScanRequest::new(vec!["leakage reduction".into()])
            .with_sector("Water")
            .with_categories(vec!["Infrastructure".into()])
    }

    #[test]
    fn empty_keywords_is_configuration_error() {
        let req = ScanRequest::new(vec![]);
        assert!(matches!(
            build_queries(&req),
            Err(ScanError::Configuration(_))
        ));

        let req = ScanRequest::new(vec!["   ".into()]);
        assert!(matches!(
            build_queries(&req),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn non_empty_keywords_never_fail() {
        let req = ScanRequest::new(vec!["pipe relining".into()]);
        assert!(build_queries(&req).is_ok());
    }

    #[test]
    fn capped_at_three_queries() {
        let req = request().with_categories(vec![
            "Infrastructure".into(),
            "Technology".into(),
            "Materials".into(),
        ]);
        let queries = build_queries(&req).unwrap();
        assert!(queries.len() <= MAX_QUERIES);
    }

    #[test]
    fn uk_scope_adds_site_clause_and_hints() {
        let queries = build_queries(&request()).unwrap();
        let q = &queries[0];
        assert!(q.text.contains(UK_SITE_CLAUSE));
        assert_eq!(q.gl.as_deref(), Some("uk"));
        assert_eq!(q.hl.as_deref(), Some("en-GB"));
    }

    #[test]
    fn global_scope_has_no_site_clause() {
        let req = request().with_geographic_scope(vec!["Global".into()]);
        let queries = build_queries(&req).unwrap();
        assert!(!queries[0].text.contains("site:gov.uk"));
        assert_eq!(queries[0].gl, None);
    }

    #[test]
    fn custom_scope_is_verbatim_single_query() {
        let req = request().with_scope(SourceScope::Custom);
        let queries = build_queries(&req).unwrap();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].text.starts_with("leakage reduction"));
        assert!(!queries[0].text.contains("Water Infrastructure"));
    }

    #[test]
    fn date_restrict_buckets() {
        let today = Utc::now().date_naive();
        let range = |days: i64| DateRange {
            start: today - Duration::days(days),
            end: today,
        };

        let q = build_queries(&request().with_date_range(range(30))).unwrap();
        assert_eq!(q[0].date_restrict.as_deref(), Some("m3"));

        let q = build_queries(&request().with_date_range(range(150))).unwrap();
        assert_eq!(q[0].date_restrict.as_deref(), Some("m6"));

        let q = build_queries(&request().with_date_range(range(300))).unwrap();
        assert_eq!(q[0].date_restrict.as_deref(), Some("y1"));

        let q = build_queries(&request().with_date_range(range(800))).unwrap();
        assert_eq!(q[0].date_restrict, None);

        let q = build_queries(&request()).unwrap();
        assert_eq!(q[0].date_restrict, None);
    }
}
