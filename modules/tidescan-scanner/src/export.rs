//! CSV export of the result store.
//!
//! Format-out only: one row per insight for download into a spreadsheet,
//! no import or round-trip path. Fields are quoted per RFC 4180.

use std::io::{self, Write};

use tidescan_common::Insight;

const HEADER: &str = "id,title,category,impact_level,relevance_score,summary,\
key_points,recommended_actions,suppliers_mentioned,source_urls,generated_at";

pub fn write_csv<W: Write>(insights: &[Insight], out: &mut W) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for insight in insights {
        let fields = [
            insight.id.to_string(),
            insight.title.clone(),
            insight.category.clone(),
            insight.impact_level.to_string(),
            format!("{:.2}", insight.relevance_score),
            insight.summary.clone(),
            insight.key_points.join("; "),
            insight.recommended_actions.join("; "),
            insight.suppliers_mentioned.join("; "),
            insight
                .source_urls
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join("; "),
            insight.generated_at.to_rfc3339(),
        ];
        let row: Vec<String> = fields.iter().map(|f| quote(f)).collect();
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

/// Quote a field when it contains a delimiter, quote, or newline.
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use tidescan_common::ImpactLevel;
    use uuid::Uuid;

    fn insight(title: &str, summary: &str) -> Insight {
        Insight {
            id: Uuid::new_v4(),
            title: title.to_string(),
            category: "Regulatory".into(),
            summary: summary.to_string(),
            impact_level: ImpactLevel::High,
            key_points: vec!["PR24 final determinations".into(), "leakage targets".into()],
            recommended_actions: vec![],
            suppliers_mentioned: vec![],
            relevance_score: 0.85,
            source_urls: BTreeSet::from(["https://ofwat.gov.uk/pr24".to_string()]),
            generated_at: Utc::now(),
        }
    }

    fn export(insights: &[Insight]) -> String {
        let mut buf = Vec::new();
        write_csv(insights, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_plus_one_row_per_insight() {
        let out = export(&[insight("a", "s"), insight("b", "s")]);
        assert_eq!(out.lines().count(), 3);
        assert!(out.starts_with("id,title,category"));
    }

    #[test]
    fn commas_and_quotes_are_escaped() {
        let out = export(&[insight(
            "Bid, rebid, and \"final\" award",
            "Summary with\nnewline",
        )]);
        assert!(out.contains("\"Bid, rebid, and \"\"final\"\" award\""));
        assert!(out.contains("\"Summary with\nnewline\""));
    }

    #[test]
    fn plain_fields_are_unquoted() {
        let out = export(&[insight("Plain title", "Plain summary")]);
        assert!(out.contains(",Plain title,"));
    }
}
