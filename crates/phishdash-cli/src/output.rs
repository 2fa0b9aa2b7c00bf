//! Plain-text tables for command output.

use phishdash_core::models::{
    DailyCount, DashboardSummary, DomainCount, GlobalMetrics, RecentUrl, SearchHit, StatusCount,
    ThreatCount, UrlRecord, UserProfile,
};
use phishdash_core::utils::{format_optional, format_timestamp, mask_token, truncate_string};
use phishdash_core::SessionSnapshot;

// Column widths
const URL_WIDTH: usize = 48;
const DOMAIN_WIDTH: usize = 28;
const LABEL_WIDTH: usize = 12;

pub fn print_urls(urls: &[UrlRecord]) {
    if urls.is_empty() {
        println!("No URLs.");
        return;
    }
    println!(
        "{:>6}  {:<URL_WIDTH$}  {:<DOMAIN_WIDTH$}  {:<LABEL_WIDTH$}  {:<LABEL_WIDTH$}  {:<16}  SOURCE",
        "ID", "URL", "DOMAIN", "THREAT", "STATUS", "ADDED"
    );
    for url in urls {
        println!(
            "{:>6}  {:<URL_WIDTH$}  {:<DOMAIN_WIDTH$}  {:<LABEL_WIDTH$}  {:<LABEL_WIDTH$}  {:<16}  {}",
            url.id,
            truncate_string(&url.url, URL_WIDTH),
            truncate_string(&url.domain, DOMAIN_WIDTH),
            truncate_string(&url.threat, LABEL_WIDTH),
            truncate_string(&url.status, LABEL_WIDTH),
            format_timestamp(&url.date_added),
            url.source
        );
    }
    println!("{} URL(s)", urls.len());
}

pub fn print_metrics(metrics: &GlobalMetrics) {
    println!("Total URLs: {}", metrics.total);
    print_threat_counts(&metrics.by_threat);
    print_status_counts(&metrics.by_status);
}

pub fn print_threat_counts(counts: &[ThreatCount]) {
    print_counts("THREAT", counts.iter().map(|t| (t.threat.as_str(), t.count)));
}

pub fn print_status_counts(counts: &[StatusCount]) {
    print_counts("STATUS", counts.iter().map(|s| (s.status.as_str(), s.count)));
}

pub fn print_domains(domains: &[DomainCount]) {
    print_counts("DOMAIN", domains.iter().map(|d| (d.domain.as_str(), d.count)));
}

pub fn print_activity(days: &[DailyCount]) {
    print_counts("DATE", days.iter().map(|d| (d.date.as_str(), d.count)));
}

fn print_counts<'a>(label: &str, rows: impl Iterator<Item = (&'a str, i64)>) {
    println!();
    println!("{:<DOMAIN_WIDTH$}  {:>8}", label, "COUNT");
    for (name, count) in rows {
        println!("{:<DOMAIN_WIDTH$}  {:>8}", truncate_string(name, DOMAIN_WIDTH), count);
    }
}

pub fn print_recent(urls: &[RecentUrl]) {
    if urls.is_empty() {
        println!("Nothing to show.");
        return;
    }
    for url in urls {
        println!(
            "{:>6}  {:<URL_WIDTH$}  {:<DOMAIN_WIDTH$}  {:<LABEL_WIDTH$}  {}",
            url.id,
            truncate_string(&url.url, URL_WIDTH),
            truncate_string(&format_optional(url.domain.as_deref(), "-"), DOMAIN_WIDTH),
            format_optional(url.threat.as_deref(), "-"),
            format_optional(url.date_added.as_deref(), "")
        );
    }
}

pub fn print_search(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No matches.");
        return;
    }
    for hit in hits {
        println!(
            "{:>6}  {:<URL_WIDTH$}  {:<DOMAIN_WIDTH$}  {}",
            hit.id,
            truncate_string(&hit.url, URL_WIDTH),
            truncate_string(&format_optional(hit.domain.as_deref(), "-"), DOMAIN_WIDTH),
            format_optional(hit.threat.as_deref(), "-")
        );
    }
}

pub fn print_summary(summary: &DashboardSummary) {
    print_metrics(&summary.metrics);
    print_domains(&summary.top_domains);
    print_activity(&summary.daily_activity);
    println!();
    println!("Recent URLs");
    print_recent(&summary.recent_urls);
}

pub fn print_profile(profile: &UserProfile, session: &SessionSnapshot) {
    println!("User:   {}", profile.display_name());
    if profile.display_name() != profile.username {
        println!("Login:  {}", profile.username);
    }
    println!("Email:  {}", format_optional(profile.email.as_deref(), "-"));
    println!("Admin:  {}", if profile.is_admin { "yes" } else { "no" });
    if let Some(ref token) = session.token {
        println!("Token:  {}", mask_token(token));
    }
}

/// Stored session only, for when the server could not be asked
pub fn print_session(session: &SessionSnapshot) {
    println!(
        "User:   {}",
        format_optional(session.username.as_deref(), "(unknown)")
    );
    println!("Admin:  {}", if session.is_admin { "yes" } else { "no" });
    if let Some(ref token) = session.token {
        println!("Token:  {}", mask_token(token));
    }
}
