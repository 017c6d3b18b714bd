//! Plain-text rendering of a snapshot

use std::fmt::Write;

use crate::types::{RankingEntry, StatsSnapshot};

const BAR_WIDTH: usize = 20;

/// Format a number with thousand separators (e.g., 1234567 -> "1,234,567")
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let len = s.len();
    let mut result = String::with_capacity(len + len / 3);

    // Digits are ASCII, so byte indexing is safe
    for (i, ch) in s.bytes().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch as char);
    }

    result
}

/// Example: 50.0% with width 10 → "█████░░░░░"
pub fn format_percentage_bar(percent: f64, width: usize) -> String {
    let filled = (((percent / 100.0) * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

fn ranking(out: &mut String, title: &str, entries: &[RankingEntry]) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}", title);
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {:<22} {} {:>5.1}%  {} tokens",
            i + 1,
            entry.display_name,
            format_percentage_bar(entry.percentage, BAR_WIDTH),
            entry.percentage,
            format_number(entry.tokens)
        );
    }
}

pub fn no_data_message(snapshot: &StatsSnapshot) -> String {
    format!(
        "No Claude Code usage found for {}. Nothing to wrap yet.",
        snapshot.period
    )
}

pub fn render(snapshot: &StatsSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Claude Code Wrapped {}", snapshot.period);
    let _ = writeln!(
        out,
        "First session {} ({} days ago)",
        snapshot.first_session_date.format("%Y-%m-%d"),
        snapshot.days_since_first_session
    );

    let _ = writeln!(out, "\nSessions     {}", format_number(snapshot.total_sessions));
    let _ = writeln!(out, "Messages     {}", format_number(snapshot.total_messages));
    let _ = writeln!(out, "Tool calls   {}", format_number(snapshot.total_tool_calls));
    let _ = writeln!(out, "Tokens       {}", format_number(snapshot.total_tokens));
    let _ = writeln!(out, "Cost         ${:.2}", snapshot.total_cost);
    let _ = writeln!(out, "Cache hits   {:.1}%", snapshot.cache_hit_rate);

    let _ = writeln!(
        out,
        "\nActive days {}  longest streak {}  current streak {}",
        snapshot.active_days, snapshot.max_streak, snapshot.current_streak
    );
    if let Some(day) = &snapshot.most_active_day {
        let _ = writeln!(
            out,
            "Busiest day {} ({} messages)",
            day.date.format("%Y-%m-%d"),
            format_number(day.count)
        );
    }
    if let Some(label) = snapshot.weekday_activity.most_active_label() {
        let _ = writeln!(out, "Favorite weekday {}", label);
    }
    if let Some(label) = snapshot.monthly_activity.most_active_label() {
        let _ = writeln!(out, "Busiest month {}", label);
    }

    ranking(&mut out, "Top models", &snapshot.top_models);
    ranking(&mut out, "Top providers", &snapshot.top_providers);
    out
}
