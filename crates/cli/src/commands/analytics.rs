//! `studentdesk analytics`: summarize conversation logs.

use std::path::Path;

use studentdesk_telemetry::{Analytics, FileConversationLog};
use tracing::debug;

fn render(analytics: &Analytics) -> String {
    let mut out = String::new();
    out.push_str(&format!("📊 Conversations, last {} days\n", analytics.period_days));
    out.push_str("─────────────────────────────────────\n");
    out.push_str(&format!("  Sessions:          {}\n", analytics.total_sessions));
    out.push_str(&format!("  Messages:          {}\n", analytics.total_messages));
    out.push_str(&format!(
        "  Avg per session:   {:.1}\n",
        analytics.avg_messages_per_session
    ));
    match analytics.peak_hour() {
        Some(hour) => out.push_str(&format!("  Peak hour (UTC):   {hour:02}:00\n")),
        None => out.push_str("  Peak hour (UTC):   -\n"),
    }

    out.push_str("\n  Answers by source:\n");
    for (source, count) in &analytics.response_sources {
        out.push_str(&format!("    {source:<12} {count:>6}\n"));
    }

    let e = &analytics.user_engagement;
    out.push_str("\n  Engagement:\n");
    out.push_str(&format!("    short (<=3)   {:>6}\n", e.short_sessions));
    out.push_str(&format!("    medium (4-10) {:>6}\n", e.medium_sessions));
    out.push_str(&format!("    long (>10)    {:>6}\n", e.long_sessions));
    out
}

pub fn run(config_path: Option<&Path>, days: u32, export: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let log = FileConversationLog::new(&config.logging.log_dir)?;
    debug!(dir = %log.dir().display(), days, "Computing analytics");

    let analytics = log.analytics(days)?;
    print!("{}", render(&analytics));

    if let Some(path) = export {
        let written = log.export(Some(path))?;
        println!("\n  ✅ Exported to {}", written.display());
    }
    Ok(())
}
