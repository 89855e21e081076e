// SPDX-License-Identifier: Apache-2.0

use axum::http::StatusCode;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

const LATENCY_SAMPLE_CAP: usize = 4096;

#[derive(Debug, Default, Clone, Copy)]
struct RouteStats {
    requests: u64,
    status_2xx: u64,
    status_3xx: u64,
    status_4xx: u64,
    status_5xx: u64,
    total_ns: u128,
    max_ns: u64,
}

/// Per-route request counters plus a bounded latency sample buffer. The
/// `/metrics` endpoint renders these as Prometheus text lines.
#[derive(Default)]
pub struct RequestMetrics {
    routes: Mutex<BTreeMap<&'static str, RouteStats>>,
    latency_ns: Mutex<Vec<u64>>,
}

impl RequestMetrics {
    pub async fn observe_request(
        &self,
        route: &'static str,
        status: StatusCode,
        elapsed: Duration,
        slow_threshold: Duration,
    ) {
        let elapsed_ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        {
            let mut routes = self.routes.lock().await;
            let stats = routes.entry(route).or_default();
            stats.requests += 1;
            match status.as_u16() {
                200..=299 => stats.status_2xx += 1,
                300..=399 => stats.status_3xx += 1,
                400..=499 => stats.status_4xx += 1,
                _ => stats.status_5xx += 1,
            }
            stats.total_ns += u128::from(elapsed_ns);
            stats.max_ns = stats.max_ns.max(elapsed_ns);
        }
        {
            let mut samples = self.latency_ns.lock().await;
            if samples.len() < LATENCY_SAMPLE_CAP {
                samples.push(elapsed_ns);
            } else {
                let slot = (elapsed_ns as usize) % LATENCY_SAMPLE_CAP;
                samples[slot] = elapsed_ns;
            }
        }
        if elapsed > slow_threshold {
            warn!(route, status = status.as_u16(), elapsed_ms = elapsed.as_millis() as u64, "slow request");
        }
    }

    pub async fn render_text(&self) -> String {
        let mut body = String::new();
        let routes = self.routes.lock().await;
        for (route, stats) in routes.iter() {
            let avg_ms = if stats.requests == 0 {
                0.0
            } else {
                (stats.total_ns as f64 / stats.requests as f64) / 1_000_000.0
            };
            body.push_str(&format!(
                "paylane_requests_total{{route=\"{route}\",class=\"2xx\"}} {}\n",
                stats.status_2xx
            ));
            body.push_str(&format!(
                "paylane_requests_total{{route=\"{route}\",class=\"3xx\"}} {}\n",
                stats.status_3xx
            ));
            body.push_str(&format!(
                "paylane_requests_total{{route=\"{route}\",class=\"4xx\"}} {}\n",
                stats.status_4xx
            ));
            body.push_str(&format!(
                "paylane_requests_total{{route=\"{route}\",class=\"5xx\"}} {}\n",
                stats.status_5xx
            ));
            body.push_str(&format!(
                "paylane_request_latency_avg_ms{{route=\"{route}\"}} {avg_ms:.3}\n"
            ));
            body.push_str(&format!(
                "paylane_request_latency_max_ms{{route=\"{route}\"}} {:.3}\n",
                stats.max_ns as f64 / 1_000_000.0
            ));
        }
        drop(routes);

        let samples = self.latency_ns.lock().await.clone();
        body.push_str(&format!(
            "paylane_request_latency_p50_ms {:.3}\n",
            percentile_ms(&samples, 50.0)
        ));
        body.push_str(&format!(
            "paylane_request_latency_p95_ms {:.3}\n",
            percentile_ms(&samples, 95.0)
        ));
        body
    }
}

fn percentile_ms(samples: &[u64], percentile: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let rank = ((percentile / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)] as f64 / 1_000_000.0
}
