use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, register_counter, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("query_snitch_demo_requests_total", "Total number of demo requests").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "query_snitch_demo_request_latency_seconds",
        "Demo request latency in seconds"
    )
    .unwrap();
}
