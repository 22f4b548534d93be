//! Panic containment for poll loop work.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

/// Run `fut`, turning a panic into `Err` with the panic message.
pub async fn catch_panic<F, T>(fut: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_value_through() {
        assert_eq!(catch_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_captures_str_panic() {
        let result: Result<(), String> = catch_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_captures_formatted_panic() {
        let id = 42;
        let result: Result<(), String> = catch_panic(async move { panic!("bad id {}", id) }).await;
        assert_eq!(result, Err("bad id 42".to_string()));
    }
}
