mod common;

use std::collections::HashMap;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use taskmaster::application::repos::TaskQueryFilter;
use taskmaster::cache::{
    METRIC_CACHE_ERROR, METRIC_CACHE_HIT, METRIC_CACHE_MISS, METRIC_INVALIDATED_KEYS,
    METRIC_INVALIDATION_FAILED,
};
use taskmaster::domain::types::TaskPriority;

use common::{app, app_with_offline_cache, new_task};

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    // hit, miss and invalidation on a healthy cache
    let (healthy, _store) = app();
    let filter = TaskQueryFilter::default();
    healthy.tasks.list_tasks(filter).await.expect("list");
    healthy.tasks.list_tasks(filter).await.expect("list");
    healthy
        .tasks
        .create_task(new_task("Count me", TaskPriority::Low, 1, None))
        .await
        .expect("create");

    // read error and failed invalidation on an unreachable cache
    let offline = app_with_offline_cache();
    offline.tasks.list_tasks(filter).await.expect("list");
    offline
        .tasks
        .create_task(new_task("Still saved", TaskPriority::Low, 1, None))
        .await
        .expect("create");

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .fold(HashMap::new(), |mut totals, (name, count)| {
            *totals.entry(name).or_default() += count;
            totals
        });

    assert_eq!(counters.get(METRIC_CACHE_HIT), Some(&1));
    assert_eq!(counters.get(METRIC_CACHE_MISS), Some(&1));
    assert_eq!(counters.get(METRIC_INVALIDATED_KEYS), Some(&1));
    assert!(counters.get(METRIC_CACHE_ERROR).is_some_and(|count| *count >= 1));
    assert_eq!(counters.get(METRIC_INVALIDATION_FAILED), Some(&1));
}
