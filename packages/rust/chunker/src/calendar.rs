//! Calendar-style chunking: one chunk file per period.
//!
//! Calendar sources are reconciled per filename, so each period's chunk name
//! must be stable across runs: `{site}_{period}.md` with dots in the period
//! label mapped to underscores.

use chrono::{DateTime, Utc};
use corpusync_shared::{CalendarEvent, Chunk};

/// Group events by their period label, preserving first-seen period order,
/// and render one chunk per period.
pub fn group_events_by_period(
    events: &[CalendarEvent],
    site_name: &str,
    updated_at: DateTime<Utc>,
) -> Vec<Chunk> {
    let mut periods: Vec<(&str, Vec<&CalendarEvent>)> = Vec::new();
    for event in events {
        match periods.iter_mut().find(|(p, _)| *p == event.period) {
            Some((_, group)) => group.push(event),
            None => periods.push((&event.period, vec![event])),
        }
    }

    let safe_site = sanitize(site_name);

    periods
        .into_iter()
        .map(|(period, group)| {
            let filename = format!("{safe_site}_{}.md", period.replace('.', "_"));

            let mut content = vec![
                format!("# {site_name} schedule - {period}"),
                format!("Updated: {}\n", updated_at.format("%Y-%m-%d %H:%M")),
            ];
            for event in group {
                content.push(render_event(event));
            }

            Chunk::new(filename, content.join("\n"))
        })
        .collect()
}

fn render_event(event: &CalendarEvent) -> String {
    let link = event.link.as_deref().unwrap_or("-");
    format!(
        "## {}\n- **When:** {}\n- **Where:** {}\n- **Link:** {}\n---\n",
        event.title, event.schedule, event.place, link
    )
}

/// Keep only alphanumeric characters so the site name is filename-safe.
fn sanitize(site_name: &str) -> String {
    site_name.chars().filter(|c| c.is_alphanumeric()).collect()
}
