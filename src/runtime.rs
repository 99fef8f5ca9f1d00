use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::error::{OrchestrationError, Result};

/// Drive `future` to completion on a private current-thread runtime.
///
/// Backs the blocking `kickoff` entry points. Calling it from inside a tokio
/// runtime is refused instead of panicking.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(OrchestrationError::RuntimeError(
            "blocking kickoff called from inside an async runtime, use kickoff_async".to_string(),
        )
        .into());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| OrchestrationError::RuntimeError(format!("Failed to start runtime: {}", e)))?;

    Ok(runtime.block_on(future))
}

/// Run `future`, turning a panic inside it into a `RuntimeError`.
///
/// Lets crews and flows report a panicking task or method through their
/// normal failure path.
pub async fn catch_panic<T, F>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(OrchestrationError::RuntimeError(format!("panicked: {}", panic_message(&*payload))).into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_outside_runtime() {
        let value = block_on(async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime_is_refused() {
        let error = block_on(async {}).unwrap_err();
        assert!(error.to_string().contains("kickoff_async"));
    }

    async fn blow_up() -> Result<()> {
        panic!("worker blew up");
    }

    async fn missing_topic() -> Result<u32> {
        Err(OrchestrationError::MissingInput("topic".to_string()).into())
    }

    async fn seven() -> Result<u32> {
        Ok(7)
    }

    #[tokio::test]
    async fn test_catch_panic_reports_message() {
        let error = catch_panic(blow_up()).await.unwrap_err();

        match error.downcast_ref::<OrchestrationError>() {
            Some(OrchestrationError::RuntimeError(msg)) => assert_eq!(msg, "panicked: worker blew up"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_catch_panic_passes_results_through() {
        assert_eq!(catch_panic(seven()).await.unwrap(), 7);

        let error = catch_panic(missing_topic()).await.unwrap_err();
        assert_eq!(error.to_string(), "Missing input: topic");
    }
}
