// src/storage/tests/mod.rs


// Common utilities for storage tests
pub(crate) mod common {
    use std::time::Duration;

    use crate::error::Result;
    use crate::storage::{RequestRecord, WindowStore};

    // Window behaviour that should hold on any backend
    pub async fn test_window_semantics<S: WindowStore>(store: &S, scope: &str) -> Result<()> {
        let window = Duration::from_millis(1_000);
        store.clear(scope).await?;

        assert_eq!(store.count(scope, 10_000, window).await?, 0);
        assert_eq!(store.oldest(scope, 10_000, window).await?, None);

        store
            .record(scope, RequestRecord::new(10_000, Some("u1")), window)
            .await?;
        store
            .record(scope, RequestRecord::new(10_400, Some("u1")), window)
            .await?;

        assert_eq!(store.count(scope, 10_500, window).await?, 2);
        assert_eq!(store.oldest(scope, 10_500, window).await?, Some(10_000));

        // Exactly one window after the first record it no longer counts
        assert_eq!(store.count(scope, 11_000, window).await?, 1);
        assert_eq!(store.oldest(scope, 11_000, window).await?, Some(10_400));

        assert_eq!(store.count(scope, 11_400, window).await?, 0);

        store.clear(scope).await?;
        Ok(())
    }

    // Records in the same millisecond are distinct events
    pub async fn test_same_instant_records<S: WindowStore>(store: &S, scope: &str) -> Result<()> {
        let window = Duration::from_millis(500);
        store.clear(scope).await?;

        for _ in 0..3 {
            store
                .record(scope, RequestRecord::new(2_000, None), window)
                .await?;
        }
        assert_eq!(store.count(scope, 2_000, window).await?, 3);

        store.clear(scope).await?;
        assert_eq!(store.count(scope, 2_000, window).await?, 0);
        Ok(())
    }
}
