//! Counters for the inspection lifecycle, using Prometheus naming conventions.

use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    InspectionsCreated,
    InspectionsSent,
    InspectionsSigned,
    EmailsSent,
    EmailsFailed,
    MediaUploads,
    MediaUploadsFailed,
    PdfRendered,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricName::InspectionsCreated => "cart_inspections_created_total",
            MetricName::InspectionsSent => "cart_inspections_sent_total",
            MetricName::InspectionsSigned => "cart_inspections_signed_total",
            MetricName::EmailsSent => "cart_inspections_emails_sent_total",
            MetricName::EmailsFailed => "cart_inspections_emails_failed_total",
            MetricName::MediaUploads => "cart_inspections_media_uploads_total",
            MetricName::MediaUploadsFailed => "cart_inspections_media_uploads_failed_total",
            MetricName::PdfRendered => "cart_inspections_pdf_rendered_total",
        };
        f.write_str(name)
    }
}

pub fn increment(metric: MetricName) {
    ::metrics::counter!(metric.to_string()).increment(1);
}

/// Installs the Prometheus exporter on its own listener.
pub fn init_metrics(port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            tracing::info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            tracing::warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}
