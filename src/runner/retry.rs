use std::future::Future;

/// Run `attempt`; if it fails, run `recover` with the error and attempt
/// exactly once more. The second attempt's result is returned as-is.
pub async fn attempt_with_recovery<T, E, A, AFut, R, RFut>(mut attempt: A, recover: R) -> Result<T, E>
where
    A: FnMut() -> AFut,
    AFut: Future<Output = Result<T, E>>,
    R: FnOnce(E) -> RFut,
    RFut: Future<Output = ()>,
{
    match attempt().await {
        Ok(value) => Ok(value),
        Err(err) => {
            recover(err).await;
            attempt().await
        }
    }
}
