use super::{Extractor, MetricKind, MetricSpec};

use Extractor::{Available, Bytes, Value};
use MetricKind::{Counter, Gauge};

macro_rules! spec {
    ($key:literal, $suffix:literal, $help:literal, $kind:expr, $extractor:ident) => {
        MetricSpec {
            key: $key,
            suffix: $suffix,
            help: $help,
            kind: $kind,
            extractor: $extractor($key),
        }
    };
}

pub(crate) const METRICS: &[MetricSpec] = &[
    // client side
    spec!("clientside.bitsIn", "clientside_bytes_received_total", "Bytes received from clients", Counter, Bytes),
    spec!("clientside.bitsOut", "clientside_bytes_transmitted_total", "Bytes sent to clients", Counter, Bytes),
    spec!("clientside.pktsIn", "clientside_packets_received_total", "Packets received from clients", Counter, Value),
    spec!("clientside.pktsOut", "clientside_packets_transmitted_total", "Packets sent to clients", Counter, Value),
    spec!("clientside.curConns", "clientside_connections", "Current client-side connections", Gauge, Value),
    spec!("clientside.maxConns", "clientside_connections_concurrent_max", "Peak concurrent client-side connections", Counter, Value),
    spec!("clientside.totConns", "clientside_connections_total", "Client-side connections opened", Counter, Value),
    spec!("clientside.evictedConns", "clientside_connections_evicted_total", "Client-side connections evicted", Counter, Value),
    spec!("clientside.slowKilled", "clientside_slow_killed", "Slow client-side connections killed", Counter, Value),
    // ephemeral
    spec!("ephemeral.bitsIn", "ephemeral_bytes_received_total", "Ephemeral bytes received", Counter, Bytes),
    spec!("ephemeral.bitsOut", "ephemeral_bytes_transmitted_total", "Ephemeral bytes sent", Counter, Bytes),
    spec!("ephemeral.pktsIn", "ephemeral_packets_received_total", "Ephemeral packets received", Counter, Value),
    spec!("ephemeral.pktsOut", "ephemeral_packets_transmitted_total", "Ephemeral packets sent", Counter, Value),
    spec!("ephemeral.curConns", "ephemeral_connections", "Current ephemeral connections", Gauge, Value),
    spec!("ephemeral.maxConns", "ephemeral_connections_concurrent_max", "Peak concurrent ephemeral connections", Counter, Value),
    spec!("ephemeral.totConns", "ephemeral_connections_total", "Ephemeral connections opened", Counter, Value),
    spec!("ephemeral.evictedConns", "ephemeral_connections_evicted_total", "Ephemeral connections evicted", Counter, Value),
    spec!("ephemeral.slowKilled", "ephemeral_slow_killed", "Slow ephemeral connections killed", Counter, Value),
    // SYN cookies
    spec!("syncookie.accepts", "syncookie_accepts", "SYN cookies accepted", Counter, Value),
    spec!("syncookie.rejects", "syncookie_rejects", "SYN cookies rejected", Counter, Value),
    spec!("syncookie.syncookies", "syncookie_syncookies", "SYN cookies issued", Counter, Value),
    spec!("syncookie.hwAccepts", "syncookie_hw_accepts", "Hardware SYN cookies accepted", Counter, Value),
    spec!("syncookie.hwSyncookies", "syncookie_hw_syncookies", "Hardware SYN cookies issued", Counter, Value),
    spec!("syncookie.swsyncookieInstance", "syncookie_swsyncookie_instance", "Software SYN cookie instances", Counter, Value),
    spec!("syncookie.hwsyncookieInstance", "syncookie_hwsyncookie_instance", "Hardware SYN cookie instances", Counter, Value),
    spec!("syncookie.syncacheCurr", "syncookie_syncache_curr", "Current SYN cache entries", Gauge, Value),
    spec!("syncookie.syncacheOver", "syncookie_syncache_over", "SYN cache overflows", Counter, Value),
    // connection durations, milliseconds
    spec!("csMinConnDur", "cs_min_conn_dur", "Shortest client-side connection duration", Gauge, Value),
    spec!("csMeanConnDur", "cs_mean_conn_dur", "Mean client-side connection duration", Gauge, Value),
    spec!("csMaxConnDur", "cs_max_conn_dur", "Longest client-side connection duration", Counter, Value),
    // usage ratios
    spec!("fiveSecAvgUsageRatio", "five_sec_avg_usage_ratio", "Usage ratio over the last five seconds", Gauge, Value),
    spec!("oneMinAvgUsageRatio", "one_min_avg_usage_ratio", "Usage ratio over the last minute", Gauge, Value),
    spec!("fiveMinAvgUsageRatio", "five_min_avg_usage_ratio", "Usage ratio over the last five minutes", Gauge, Value),
    spec!("totRequests", "requests_total", "Requests handled by the virtual server", Counter, Value),
    spec!("status.availabilityState", "status_availability_state", "1 if the virtual server is available, 0 otherwise", Gauge, Available),
];
