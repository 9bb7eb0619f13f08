use chrono::Utc;
#[cfg(feature = "json")]
use serde::Serialize;

use crate::domain::ntp::SyncReport;
use crate::error::NtpError;

#[cfg(feature = "json")]
#[derive(Serialize)]
pub struct JsonAttempt {
    pub server: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stratum: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(feature = "json")]
#[derive(Serialize)]
pub struct JsonRun {
    pub schema_version: u8,
    pub run_ts: String,
    pub started_at: String,
    pub success: bool,
    pub cancelled: bool,
    pub synced_time: Option<String>,
    pub attempts: Vec<JsonAttempt>,
}

/// Serialize a sync pass into a JSON string.
pub fn to_json(report: &SyncReport, pretty: bool) -> Result<String, NtpError> {
    #[cfg(feature = "json")]
    {
        let attempts = report
            .attempts
            .iter()
            .map(|a| match &a.result {
                Ok(r) => JsonAttempt {
                    server: a.server.clone(),
                    ok: true,
                    ip: Some(r.target.addr.ip().to_string()),
                    utc: Some(r.synced_time.to_rfc3339()),
                    rtt_ms: Some(r.rtt_ms()),
                    stratum: Some(r.stratum),
                    ref_id: Some(r.ref_id.clone()),
                    error_kind: None,
                    error: None,
                },
                Err(e) => JsonAttempt {
                    server: a.server.clone(),
                    ok: false,
                    ip: None,
                    utc: None,
                    rtt_ms: None,
                    stratum: None,
                    ref_id: None,
                    error_kind: Some(e.kind().as_str()),
                    error: Some(e.to_string()),
                },
            })
            .collect();
        let run = JsonRun {
            schema_version: 1,
            run_ts: Utc::now().to_rfc3339(),
            started_at: report.started_at.to_rfc3339(),
            success: report.success(),
            cancelled: report.cancelled,
            synced_time: report.synced_time().map(|t| t.to_rfc3339()),
            attempts,
        };
        let text = if pretty {
            serde_json::to_string_pretty(&run).map_err(|e| NtpError::Other(e.to_string()))?
        } else {
            serde_json::to_string(&run).map_err(|e| NtpError::Other(e.to_string()))?
        };
        Ok(text)
    }
    #[cfg(not(feature = "json"))]
    {
        let _ = report;
        let _ = pretty;
        Err(NtpError::Other("json feature disabled".into()))
    }
}
