use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, CounterVec, Gauge, IntCounter,
};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref REGISTRATIONS_COUNTER: IntCounter = register_int_counter!(
        "api_registrations_total",
        "Accounts registered"
    ).unwrap();

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by outcome",
        &["status"]
    ).unwrap();

    pub static ref ACCOUNT_CASCADES_COUNTER: IntCounter = register_int_counter!(
        "api_account_cascades_total",
        "Accounts removed because their last child was deleted"
    ).unwrap();

    pub static ref LOCATION_SAMPLES_COUNTER: CounterVec = register_counter_vec!(
        "api_location_samples_total",
        "Location samples appended, by origin (recorded or synthesized)",
        &["origin"]
    ).unwrap();

    pub static ref TRACKING_POLLS_COUNTER: CounterVec = register_counter_vec!(
        "api_tracking_polls_total",
        "Tracking loop polls by outcome",
        &["status"]
    ).unwrap();

    // ── Live state ──────────────────────────────────────────────────────────
    pub static ref ACTIVE_TRACKING_GAUGE: Gauge = register_gauge!(
        "api_tracking_loops_active",
        "Tracking loops currently polling"
    ).unwrap();
}

/// Force registration so `/metrics` lists every series from the first scrape.
pub fn init() {
    lazy_static::initialize(&REGISTRATIONS_COUNTER);
    lazy_static::initialize(&LOGINS_COUNTER);
    lazy_static::initialize(&ACCOUNT_CASCADES_COUNTER);
    lazy_static::initialize(&LOCATION_SAMPLES_COUNTER);
    lazy_static::initialize(&TRACKING_POLLS_COUNTER);
    lazy_static::initialize(&ACTIVE_TRACKING_GAUGE);
}
