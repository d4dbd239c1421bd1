use std::future::Future;

use serde::Serialize;
use tokio::sync::watch;

/// Outcome of a remote-backed operation as seen by a caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum Resource<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> Resource<T> {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    /// `true` once the operation has finished either way.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.is_loading()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Resource::Loading => Resource::Loading,
            Resource::Success(data) => Resource::Success(f(data)),
            Resource::Error(message) => Resource::Error(message),
        }
    }

    /// The payload on success, the message as an error otherwise.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Resource::Success(data) => Ok(data),
            Resource::Error(message) => Err(message),
            Resource::Loading => Err("Still loading".to_string()),
        }
    }
}

/// Run `fut` on the tokio runtime, publishing `Loading` first and the
/// terminal value once it resolves.
///
/// Dropping the receiver discards the result; the task itself runs to
/// completion.
pub fn launch<T, F>(fut: F) -> watch::Receiver<Resource<T>>
where
    T: Send + Sync + 'static,
    F: Future<Output = Resource<T>> + Send + 'static,
{
    let (tx, rx) = watch::channel(Resource::Loading);
    tokio::spawn(async move {
        let outcome = fut.await;
        // Receiver gone means nobody wants the result.
        let _ = tx.send(outcome);
    });
    rx
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_launch_publishes_loading_then_terminal() {
        let (release, gate) = oneshot::channel::<()>();
        let mut rx = launch(async move {
            let _ = gate.await;
            Resource::Success(3)
        });

        assert!(rx.borrow().is_loading());
        release.send(()).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Resource::Success(3));
    }

    #[tokio::test]
    async fn test_launch_error() {
        let mut rx = launch(async { Resource::<()>::Error("Recipe not found".to_string()) });
        rx.wait_for(Resource::is_terminal).await.unwrap();
        assert_eq!(
            rx.borrow().clone().into_result(),
            Err("Recipe not found".to_string())
        );
    }

    #[test]
    fn test_map_keeps_state() {
        assert_eq!(Resource::Success(2).map(|n| n * 2), Resource::Success(4));
        assert_eq!(
            Resource::<i32>::Error("x".to_string()).map(|n| n * 2),
            Resource::Error("x".to_string())
        );
        assert!(Resource::<i32>::Loading.map(|n| n * 2).is_loading());
    }

    #[test]
    fn test_serialize_shape() {
        let json = serde_json::to_value(Resource::Success(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "data": [1, 2]}));
        let json = serde_json::to_value(Resource::<()>::Loading).unwrap();
        assert_eq!(json, serde_json::json!({"status": "loading"}));
    }
}
