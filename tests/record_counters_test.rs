mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::TestApp;
use metrics::{Counter, CounterFn, Gauge, Histogram, Key, KeyName, Recorder, SharedString, Unit};

type Totals = Arc<Mutex<HashMap<String, u64>>>;

/// Sums counter increments per `name{entity}`.
struct CountingRecorder {
    totals: Totals,
}

struct Handle {
    key: String,
    totals: Totals,
}

impl CounterFn for Handle {
    fn increment(&self, value: u64) {
        let mut totals = self.totals.lock().unwrap();
        *totals.entry(self.key.clone()).or_default() += value;
    }

    fn absolute(&self, value: u64) {
        let mut totals = self.totals.lock().unwrap();
        let entry = totals.entry(self.key.clone()).or_default();
        *entry = (*entry).max(value);
    }
}

impl Recorder for CountingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key) -> Counter {
        let entity = key
            .labels()
            .find(|label| label.key() == "entity")
            .map(|label| label.value().to_string())
            .unwrap_or_default();
        Counter::from_arc(Arc::new(Handle {
            key: format!("{}{{{}}}", key.name(), entity),
            totals: self.totals.clone(),
        }))
    }

    fn register_gauge(&self, _: &Key) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key) -> Histogram {
        Histogram::noop()
    }
}

fn total(totals: &Totals, key: &str) -> u64 {
    totals.lock().unwrap().get(key).copied().unwrap_or(0)
}

// One test per binary: the recorder is process-global.
#[tokio::test]
async fn status_changes_count_as_bom_updates() {
    let totals = Totals::default();
    metrics::set_boxed_recorder(Box::new(CountingRecorder {
        totals: totals.clone(),
    }))
    .expect("install recorder");
    const UPDATED: &str = "manufacturing_records_updated{BillOfMaterials}";

    let app = TestApp::new().await;
    let a = app.create_bom("A", "A-1").await;
    let b = app.create_bom("B", "B-1").await;
    assert_eq!(total(&totals, "manufacturing_records_created{BillOfMaterials}"), 2);
    assert_eq!(total(&totals, UPDATED), 0);

    app.post_form(&format!("/manufacturing/bom/{a}/toggle/"), &[])
        .await;
    assert_eq!(total(&totals, UPDATED), 1);

    let (a_id, b_id) = (a.to_string(), b.to_string());
    app.post_form(
        "/manufacturing/bom/bulk/",
        &[
            ("ids", a_id.as_str()),
            ("ids", b_id.as_str()),
            ("action", "deactivate"),
        ],
    )
    .await;
    assert_eq!(total(&totals, UPDATED), 3);

    app.post_form(
        "/manufacturing/bom/bulk/",
        &[("ids", a_id.as_str()), ("action", "activate")],
    )
    .await;
    assert_eq!(total(&totals, UPDATED), 4);
}
