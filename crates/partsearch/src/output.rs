//! Text and JSON rendering of lookup results

use partsearch_core::{Lookup, MatchField, MatchResult, Record};
use serde::Serialize;

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    matches: &'a [MatchResult],
}

/// Wrap each contiguous run of highlighted chars in brackets.
pub fn highlight(text: &str, positions: &[usize]) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut open = false;

    for (idx, c) in text.chars().enumerate() {
        let hit = positions.binary_search(&idx).is_ok();
        if hit && !open {
            out.push('[');
            open = true;
        } else if !hit && open {
            out.push(']');
            open = false;
        }
        out.push(c);
    }
    if open {
        out.push(']');
    }
    out
}

pub fn render_record(record: &Record) -> String {
    format!(
        "{}\t{}\t{}\tid={}",
        record.key, record.label, record.status, record.id
    )
}

pub fn render_match(m: &MatchResult) -> String {
    let (key, label) = match m.field {
        MatchField::Key => (highlight(&m.record.key, &m.positions), m.record.label.clone()),
        MatchField::Label => (m.record.key.clone(), highlight(&m.record.label, &m.positions)),
    };
    format!(
        "{}\t{}\t{}\tid={}\t({} {:.3})",
        key,
        label,
        m.record.status,
        m.record.id,
        m.tier.as_str(),
        m.score
    )
}

/// Render ranked candidates for `query`.
pub fn render_matches(query: &str, matches: &[MatchResult], json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string(&QueryOutput { query, matches });
    }
    if matches.is_empty() {
        return Ok(format!("{}: no match", query));
    }
    let lines: Vec<String> = matches.iter().map(render_match).collect();
    Ok(lines.join("\n"))
}

/// Render a single-result lookup.
pub fn render_lookup(query: &str, lookup: &Lookup, json: bool) -> serde_json::Result<String> {
    match lookup {
        Lookup::Found(m) => render_matches(query, std::slice::from_ref(m), json),
        Lookup::NotFound => render_matches(query, &[], json),
        Lookup::Prompt => Ok("enter a part number to look up".to_string()),
        Lookup::NotReady => Ok("records are still loading".to_string()),
        Lookup::Unavailable { reason } => Ok(format!("data unavailable: {}", reason)),
    }
}

pub fn render_records(records: &[Record], json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string(records);
    }
    let lines: Vec<String> = records.iter().map(render_record).collect();
    Ok(lines.join("\n"))
}
