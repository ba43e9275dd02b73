// SPDX-License-Identifier: Apache-2.0

use pressbox_store::CounterMetricsSnapshot;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, Copy)]
struct RouteStat {
    count: u64,
    latency_ms_total: u128,
}

/// In-process request metrics, rendered in Prometheus text format at
/// `/metrics`. Route labels are templates, never raw paths, so slugs do not
/// explode cardinality.
#[derive(Default)]
pub struct RequestMetrics {
    routes: Mutex<HashMap<(String, u16), RouteStat>>,
}

impl RequestMetrics {
    pub async fn observe_request(&self, route: &str, status: u16, elapsed: Duration) {
        let mut routes = self.routes.lock().await;
        let stat = routes.entry((route.to_string(), status)).or_default();
        stat.count += 1;
        stat.latency_ms_total += elapsed.as_millis();
    }

    pub async fn render_prometheus(&self, counter: &CounterMetricsSnapshot) -> String {
        let mut out = String::new();
        out.push_str("# TYPE pressbox_requests_total counter\n");
        let routes = self.routes.lock().await;
        let mut keys: Vec<&(String, u16)> = routes.keys().collect();
        keys.sort();
        for key in &keys {
            if let Some(stat) = routes.get(*key) {
                out.push_str(&format!(
                    "pressbox_requests_total{{route=\"{}\",status=\"{}\"}} {}\n",
                    key.0, key.1, stat.count
                ));
            }
        }
        out.push_str("# TYPE pressbox_request_latency_ms_total counter\n");
        for key in &keys {
            if let Some(stat) = routes.get(*key) {
                out.push_str(&format!(
                    "pressbox_request_latency_ms_total{{route=\"{}\",status=\"{}\"}} {}\n",
                    key.0, key.1, stat.latency_ms_total
                ));
            }
        }
        out.push_str(&format!(
            "# TYPE pressbox_view_counter_increments_total counter\n\
             pressbox_view_counter_increments_total {}\n\
             # TYPE pressbox_view_counter_fail_open_total counter\n\
             pressbox_view_counter_fail_open_total {}\n\
             # TYPE pressbox_view_counter_breaker_open_total counter\n\
             pressbox_view_counter_breaker_open_total {}\n\
             # TYPE pressbox_view_counter_takes_total counter\n\
             pressbox_view_counter_takes_total {}\n\
             # TYPE pressbox_view_counter_restores_total counter\n\
             pressbox_view_counter_restores_total {}\n",
            counter.increments,
            counter.fail_open_total,
            counter.breaker_open_total,
            counter.takes,
            counter.restores,
        ));
        out
    }
}
