use super::{Extractor, MetricKind, MetricSpec};

use Extractor::{Available, Bytes, Value};
use MetricKind::{Counter, Gauge};

pub(crate) const METRICS: &[MetricSpec] = &[
    MetricSpec {
        key: "serverside.bitsIn",
        suffix: "serverside_bytes_received_total",
        help: "Bytes received from the node",
        kind: Counter,
        extractor: Bytes("serverside.bitsIn"),
    },
    MetricSpec {
        key: "serverside.bitsOut",
        suffix: "serverside_bytes_transmitted_total",
        help: "Bytes sent to the node",
        kind: Counter,
        extractor: Bytes("serverside.bitsOut"),
    },
    MetricSpec {
        key: "serverside.pktsIn",
        suffix: "serverside_packets_received_total",
        help: "Packets received from the node",
        kind: Counter,
        extractor: Value("serverside.pktsIn"),
    },
    MetricSpec {
        key: "serverside.pktsOut",
        suffix: "serverside_packets_transmitted_total",
        help: "Packets sent to the node",
        kind: Counter,
        extractor: Value("serverside.pktsOut"),
    },
    MetricSpec {
        key: "serverside.curConns",
        suffix: "serverside_connections",
        help: "Current server-side connections",
        kind: Gauge,
        extractor: Value("serverside.curConns"),
    },
    MetricSpec {
        key: "serverside.maxConns",
        suffix: "serverside_connections_concurrent_max",
        help: "Peak concurrent server-side connections",
        kind: Counter,
        extractor: Value("serverside.maxConns"),
    },
    MetricSpec {
        key: "serverside.totConns",
        suffix: "serverside_connections_total",
        help: "Server-side connections opened",
        kind: Counter,
        extractor: Value("serverside.totConns"),
    },
    MetricSpec {
        key: "totRequests",
        suffix: "requests_total",
        help: "Requests handled by the node",
        kind: Counter,
        extractor: Value("totRequests"),
    },
    MetricSpec {
        key: "curSessions",
        suffix: "sessions",
        help: "Current sessions",
        kind: Gauge,
        extractor: Value("curSessions"),
    },
    MetricSpec {
        key: "status.availabilityState",
        suffix: "status_availability_state",
        help: "1 if the node is available, 0 otherwise",
        kind: Gauge,
        extractor: Available("status.availabilityState"),
    },
];
