// Backend API - Typed endpoints of the dashboard backend over a bounded fetch
use crate::application::bounded_fetch::BoundedFetch;
use crate::application::error::FetchError;
use crate::application::transport::ApiRequest;
use crate::domain::command::{PlotOutcome, ReportOutcome};
use crate::domain::sample::Sample;
use crate::domain::source::{SourceKey, SourcePayload};
use crate::domain::stats::StatsSnapshot;
use crate::domain::status::{HealthStatus, Mode, ModeInfo, ServiceStatus};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    status: String,
    #[serde(default)]
    data: Option<Sample>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatsEnvelope {
    status: String,
    #[serde(default)]
    stats: Option<StatsSnapshot>,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionEnvelope {
    status: String,
    #[serde(default)]
    plot_id: Option<String>,
    #[serde(default)]
    report: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Raw plot image as served by the renderer.
#[derive(Debug, Clone)]
pub struct PlotImage {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct BackendApi {
    fetch: BoundedFetch,
}

impl BackendApi {
    pub fn new(fetch: BoundedFetch) -> Self {
        Self { fetch }
    }

    /// Fetch the current value of one polled source.
    pub async fn poll(&self, key: SourceKey, bound: Duration) -> Result<SourcePayload, FetchError> {
        match key {
            SourceKey::Status => self.status(bound).await.map(SourcePayload::Status),
            SourceKey::Stats => self.stats(bound).await.map(SourcePayload::Stats),
            SourceKey::Data => self.data(bound).await.map(SourcePayload::Data),
            SourceKey::Mode => self.mode(bound).await.map(SourcePayload::Mode),
            SourceKey::AuthHealth
            | SourceKey::FeatureHealth
            | SourceKey::PlotHealth
            | SourceKey::ReportHealth => self.health(key, bound).await.map(SourcePayload::Health),
        }
    }

    pub async fn status(&self, bound: Duration) -> Result<ServiceStatus, FetchError> {
        let status: ServiceStatus = self
            .fetch
            .fetch_json(ApiRequest::get("/api/status"), bound)
            .await?;
        if !status.connected {
            return Err(FetchError::Application(non_empty_or(
                &status.message,
                "Rolling statistics service not responding.",
            )));
        }
        Ok(status)
    }

    pub async fn data(&self, bound: Duration) -> Result<Sample, FetchError> {
        let envelope: DataEnvelope = self
            .fetch
            .fetch_json(ApiRequest::get("/api/data"), bound)
            .await?;
        unwrap_sample(envelope)
    }

    pub async fn generate(&self, bound: Duration) -> Result<Sample, FetchError> {
        let envelope: DataEnvelope = self
            .fetch
            .fetch_json(ApiRequest::post("/api/generate"), bound)
            .await?;
        unwrap_sample(envelope)
    }

    pub async fn stats(&self, bound: Duration) -> Result<StatsSnapshot, FetchError> {
        let envelope: StatsEnvelope = self
            .fetch
            .fetch_json(ApiRequest::get("/api/stats"), bound)
            .await?;

        if envelope.status != "ok" {
            return Err(FetchError::Application(
                envelope
                    .message
                    .unwrap_or_else(|| "Statistics unavailable.".to_string()),
            ));
        }

        let mut stats = envelope
            .stats
            .ok_or_else(|| FetchError::Decode("stats missing from ok response".to_string()))?;
        if envelope.last_updated.is_some() {
            stats.last_updated = envelope.last_updated;
        }
        Ok(stats)
    }

    /// Clear the backend's rolling window. The body is not inspected.
    pub async fn reset(&self, bound: Duration) -> Result<(), FetchError> {
        self.fetch.fetch(ApiRequest::post("/api/reset"), bound).await?;
        Ok(())
    }

    pub async fn mode(&self, bound: Duration) -> Result<ModeInfo, FetchError> {
        self.fetch.fetch_json(ApiRequest::get("/api/mode"), bound).await
    }

    pub async fn set_mode(&self, mode: Mode, bound: Duration) -> Result<ModeInfo, FetchError> {
        let request = ApiRequest::post("/api/mode").with_json(json!({ "mode": mode }));
        self.fetch.fetch_json(request, bound).await
    }

    pub async fn health(&self, key: SourceKey, bound: Duration) -> Result<HealthStatus, FetchError> {
        let path = match key {
            SourceKey::AuthHealth => "/api/auth/health",
            SourceKey::FeatureHealth => "/api/feature-flags/health",
            SourceKey::PlotHealth => "/api/plots/health",
            SourceKey::ReportHealth => "/api/report/health",
            other => {
                return Err(FetchError::Application(format!(
                    "{} is not a health check",
                    other
                )));
            }
        };

        let health: HealthStatus = self.fetch.fetch_json(ApiRequest::get(path), bound).await?;
        if !health.connected {
            return Err(FetchError::Application(non_empty_or(
                &health.message,
                "Service not responding.",
            )));
        }
        Ok(health)
    }

    pub async fn create_plot(
        &self,
        stats: &StatsSnapshot,
        bound: Duration,
    ) -> Result<PlotOutcome, FetchError> {
        let request = ApiRequest::post("/api/plots").with_json(json!({ "stats": stats }));
        let envelope: ActionEnvelope = self.fetch.fetch_json(request, bound).await?;

        match envelope.status.as_str() {
            "ok" => {
                let plot_id = envelope
                    .plot_id
                    .ok_or_else(|| FetchError::Decode("plot_id missing from ok response".to_string()))?;
                Ok(PlotOutcome::Created {
                    plot_id,
                    message: envelope.message,
                })
            }
            "skipped" => Ok(PlotOutcome::Skipped {
                message: envelope
                    .message
                    .unwrap_or_else(|| "Plot generation skipped.".to_string()),
            }),
            other => Err(application_failure(other, envelope.message)),
        }
    }

    pub async fn plot_image(&self, plot_id: &str, bound: Duration) -> Result<PlotImage, FetchError> {
        let path = format!("/api/plots/{}", urlencoding::encode(plot_id));
        let response = self.fetch.fetch(ApiRequest::get(path), bound).await?;
        Ok(PlotImage {
            content_type: response
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            bytes: response.body,
        })
    }

    /// Compile a report from the given statistics and, when one exists, a
    /// previously generated plot.
    pub async fn create_report(
        &self,
        stats: &StatsSnapshot,
        plot_id: Option<&str>,
        bound: Duration,
    ) -> Result<ReportOutcome, FetchError> {
        let mut body = json!({ "stats": stats });
        if let Some(plot_id) = plot_id {
            body["plot_id"] = json!(plot_id);
        }
        let request = ApiRequest::post("/api/report").with_json(body);
        let envelope: ActionEnvelope = self.fetch.fetch_json(request, bound).await?;

        match envelope.status.as_str() {
            "ok" => Ok(ReportOutcome::Compiled {
                report: envelope.report.unwrap_or(serde_json::Value::Null),
                message: envelope.message,
            }),
            "skipped" => Ok(ReportOutcome::Skipped {
                message: envelope
                    .message
                    .unwrap_or_else(|| "Report generation skipped.".to_string()),
            }),
            other => Err(application_failure(other, envelope.message)),
        }
    }
}

fn unwrap_sample(envelope: DataEnvelope) -> Result<Sample, FetchError> {
    if envelope.status != "ok" {
        return Err(application_failure(&envelope.status, envelope.message));
    }
    envelope
        .data
        .ok_or_else(|| FetchError::Decode("data missing from ok response".to_string()))
}

fn application_failure(status: &str, message: Option<String>) -> FetchError {
    FetchError::Application(message.unwrap_or_else(|| format!("Service reported status '{}'.", status)))
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{Reply, ScriptedTransport};
    use crate::application::transport::Method;
    use std::sync::Arc;

    const BOUND: Duration = Duration::from_secs(2);

    fn api(transport: &Arc<ScriptedTransport>) -> BackendApi {
        BackendApi::new(BoundedFetch::new(transport.clone()))
    }

    #[tokio::test]
    async fn test_stats_carries_server_timestamp() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Get,
            "/api/stats",
            Reply::ok(json!({
                "status": "ok",
                "stats": {"mean": 5, "min": 1, "max": 9, "count": 40},
                "last_updated": "12:00:01"
            })),
        );

        let stats = api(&transport).stats(BOUND).await.unwrap();
        assert_eq!(stats.mean, Some(5.0));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(9.0));
        assert_eq!(stats.std_dev, None);
        assert_eq!(stats.count, 40);
        assert_eq!(stats.last_updated.as_deref(), Some("12:00:01"));
    }

    #[tokio::test]
    async fn test_stats_unavailable_is_application_error() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Get,
            "/api/stats",
            Reply::ok(json!({"status": "error", "message": "window locked"})),
        );

        let err = api(&transport).stats(BOUND).await.unwrap_err();
        assert_eq!(err, FetchError::Application("window locked".to_string()));
    }

    #[tokio::test]
    async fn test_data_non_ok_status() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/api/data", Reply::ok(json!({"status": "degraded"})));

        let err = api(&transport).data(BOUND).await.unwrap_err();
        assert!(matches!(err, FetchError::Application(_)));
    }

    #[tokio::test]
    async fn test_disconnected_status_is_a_failure() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Get,
            "/api/status",
            Reply::ok(json!({"connected": false, "message": "maintenance"})),
        );

        let err = api(&transport).poll(SourceKey::Status, BOUND).await.unwrap_err();
        assert_eq!(err.user_message(), "maintenance");
    }

    #[tokio::test]
    async fn test_health_routes() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Get,
            "/api/feature-flags/health",
            Reply::ok(json!({"connected": true, "message": "flags ok"})),
        );

        let payload = api(&transport)
            .poll(SourceKey::FeatureHealth, BOUND)
            .await
            .unwrap();
        assert_eq!(
            payload,
            SourcePayload::Health(HealthStatus {
                connected: true,
                message: "flags ok".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_set_mode_sends_requested_mode() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/api/mode",
            Reply::ok(json!({"mode": "production", "message": "now production"})),
        );

        let info = api(&transport).set_mode(Mode::Production, BOUND).await.unwrap();
        assert_eq!(info.mode, Mode::Production);

        let sent = transport.requests();
        assert_eq!(sent[0].body, Some(json!({"mode": "production"})));
    }

    #[tokio::test]
    async fn test_plot_skipped_is_not_an_error() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/api/plots",
            Reply::ok(json!({"status": "skipped", "message": "disabled in test mode"})),
        );

        let outcome = api(&transport)
            .create_plot(&StatsSnapshot::default(), BOUND)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            PlotOutcome::Skipped {
                message: "disabled in test mode".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_report_references_existing_plot() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Post,
            "/api/report",
            Reply::ok(json!({"status": "ok", "report": {"title": "window"}})),
        );

        let stats = StatsSnapshot {
            count: 31,
            ..Default::default()
        };
        let outcome = api(&transport)
            .create_report(&stats, Some("p-7"), BOUND)
            .await
            .unwrap();
        assert!(matches!(outcome, ReportOutcome::Compiled { .. }));

        let body = transport.requests()[0].body.clone().unwrap();
        assert_eq!(body["plot_id"], "p-7");
        assert_eq!(body["stats"]["count"], 31);
    }

    #[tokio::test]
    async fn test_plot_image_escapes_identifier() {
        let transport = ScriptedTransport::new();
        transport.respond(
            Method::Get,
            "/api/plots/a%20b",
            Reply::raw(200, "image/png", &[0x89, 0x50]),
        );

        let image = api(&transport).plot_image("a b", BOUND).await.unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes.as_ref(), &[0x89, 0x50]);
    }
}
