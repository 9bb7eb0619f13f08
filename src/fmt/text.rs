use crate::domain::ntp::{ServerResponse, SyncReport};
use console::style;

fn render_response(r: &ServerResponse, verbose: bool) -> String {
    let mut out = format!(
        "{srv_lbl} {srv_val}\n\
         {ip_lbl} {ip_val} (v4)\n\
         {utc_lbl} {utc_val}\n\
         {loc_lbl} {loc_val}\n\
         {rtt_lbl} {rtt_val:.3} ms",
        srv_lbl = style("Server:").cyan().bold(),
        srv_val = style(&r.target.name).green(),
        ip_lbl = style("IP:").cyan().bold(),
        ip_val = style(r.target.addr.ip()).green(),
        utc_lbl = style("UTC Time:").cyan().bold(),
        utc_val = style(r.synced_time.to_rfc2822()).green(),
        loc_lbl = style("Local Time:").cyan().bold(),
        loc_val = style(r.local_time().format("%Y-%m-%d %H:%M:%S%.6f")).green(),
        rtt_lbl = style("Round Trip Delay:").cyan().bold(),
        rtt_val = r.rtt_ms(),
    );

    if verbose {
        out.push_str(&format!(
            "\n{str_lbl} {str_val}\n{ref_lbl} {ref_val}",
            str_lbl = style("Stratum:").cyan().bold(),
            str_val = r.stratum,
            ref_lbl = style("Reference ID:").cyan().bold(),
            ref_val = r.ref_id
        ));
    }
    out
}

/// Render a sync pass. Failed attempts are listed when `verbose` is set or
/// when no server answered.
pub fn render_report(report: &SyncReport, verbose: bool) -> String {
    let mut out = match report.response() {
        Some(r) => render_response(r, verbose),
        None if report.cancelled => style("Sync cancelled").yellow().bold().to_string(),
        None => style("Sync failed: no server answered").red().bold().to_string(),
    };

    if verbose || !report.success() {
        for (server, err) in report.failures() {
            out.push_str(&format!(
                "\n  {} {} [{}] {}",
                style("x").red(),
                style(server).yellow(),
                err.kind(),
                err
            ));
        }
    }
    out
}

/// One line per pass, for periodic mode.
pub fn render_short(report: &SyncReport) -> String {
    match report.response() {
        Some(r) => format!(
            "{} {} {} ({:.3} ms)",
            style(report.started_at.format("%H:%M:%S")).dim(),
            style(&r.target.name).green(),
            r.synced_time.to_rfc3339(),
            r.rtt_ms()
        ),
        None => format!(
            "{} {} ({} servers tried)",
            style(report.started_at.format("%H:%M:%S")).dim(),
            style("sync failed").red(),
            report.attempts.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ntp::{ServerAttempt, Target};
    use crate::error::NtpError;
    use chrono::DateTime;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::time::{Duration, Instant};

    fn report(success: bool) -> SyncReport {
        let mut report = SyncReport::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        report.attempts.push(ServerAttempt {
            server: "dead.example".into(),
            result: Err(NtpError::Timeout(Duration::from_millis(5000))),
        });
        if success {
            report.attempts.push(ServerAttempt {
                server: "ok.example".into(),
                result: Ok(ServerResponse {
                    target: Target {
                        name: "ok.example".into(),
                        addr: SocketAddrV4::new(Ipv4Addr::new(192, 0, 2, 7), 123),
                    },
                    synced_time: DateTime::from_timestamp(1_700_000_001, 500_000_000).unwrap(),
                    round_trip: Duration::from_micros(12_345),
                    received_at: Instant::now(),
                    stratum: 2,
                    ref_id: "192.0.2.1".into(),
                }),
            });
        }
        report
    }

    #[test]
    fn success_shows_server_and_time() {
        console::set_colors_enabled(false);
        let text = render_report(&report(true), false);
        assert!(text.contains("Server: ok.example"));
        assert!(text.contains("IP: 192.0.2.7 (v4)"));
        assert!(text.contains("12.345 ms"));
        assert!(!text.contains("dead.example"));
    }

    #[test]
    fn verbose_lists_failures_and_stratum() {
        console::set_colors_enabled(false);
        let text = render_report(&report(true), true);
        assert!(text.contains("Stratum: 2"));
        assert!(text.contains("dead.example [timeout]"));
    }

    #[test]
    fn failure_always_lists_attempts() {
        console::set_colors_enabled(false);
        let text = render_report(&report(false), false);
        assert!(text.starts_with("Sync failed"));
        assert!(text.contains("dead.example"));
        assert!(render_short(&report(false)).contains("1 servers tried"));
    }
}
