//! Run a body with a group that is torn down when the body finishes.

use std::future::Future;
use std::sync::Arc;

use super::{DisposableGroup, GroupConfig};
use crate::errors::Result;

/// Runs `body` with a fresh group, then tears the group down synchronously.
///
/// A teardown failure is returned in place of the body's value. If `body` panics the
/// group is still torn down on drop when the config asks for it.
pub fn scope<T, F>(config: GroupConfig, body: F) -> Result<T>
where
    F: FnOnce(&DisposableGroup) -> T,
{
    let group = DisposableGroup::with_config(config);
    let value = body(&group);
    group.teardown()?;
    Ok(value)
}

/// Runs an async `body` with a fresh shared group, then awaits its suspending teardown.
///
/// The group is torn down even if the body kept clones of the handle; resources
/// registered through them afterwards are rejected.
pub async fn scope_async<T, F, Fut>(config: GroupConfig, body: F) -> Result<T>
where
    F: FnOnce(Arc<DisposableGroup>) -> Fut,
    Fut: Future<Output = T>,
{
    let group = Arc::new(DisposableGroup::with_config(config));
    let value = body(group.clone()).await;
    group.teardown_async().await?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DisposeError;
    use crate::testing::ReleaseLog;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scope_tears_down_after_body() {
        let log = ReleaseLog::new();

        let value = scope(GroupConfig::new(), |group| {
            let log1 = log.clone();
            let log2 = log.clone();
            group.add_fn(move || log1.push("a")).unwrap();
            group.add_fn(move || log2.push("b")).unwrap();
            log.push("body");
            42
        })
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(log.entries(), vec!["body", "b", "a"]);
    }

    #[test]
    fn test_scope_reports_teardown_failure() {
        let result = scope(GroupConfig::new(), |group| {
            group
                .add(crate::disposable::try_create(|| {
                    Err::<(), _>(anyhow::anyhow!("socket busy"))
                }))
                .unwrap();
        });

        assert!(matches!(result, Err(DisposeError::Release { index: 0, .. })));
    }

    #[tokio::test]
    async fn test_scope_async_awaits_teardown() {
        let log = ReleaseLog::new();
        let log_body = log.clone();

        let value = scope_async(GroupConfig::new(), |group| async move {
            let log1 = log_body.clone();
            group
                .add_async_fn(move || async move {
                    tokio::task::yield_now().await;
                    log1.push("async");
                })
                .unwrap();
            let log2 = log_body.clone();
            group.add_fn(move || log2.push("sync")).unwrap();
            "done"
        })
        .await
        .unwrap();

        assert_eq!(value, "done");
        assert_eq!(log.entries(), vec!["sync", "async"]);
    }

    #[tokio::test]
    async fn test_scope_async_rejects_late_registration() {
        let mut leaked = None;
        scope_async(GroupConfig::new(), |group| {
            leaked = Some(group);
            async {}
        })
        .await
        .unwrap();

        let group = leaked.unwrap();
        assert!(matches!(group.add_fn(|| {}), Err(DisposeError::AlreadyTornDown)));
    }
}
