// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Single-retry combinator for operations that fail on stale authorization.

use std::future::Future;

/// Why a retried operation ultimately failed.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// The first failure was not retryable.
    NotRetried(E),
    /// Both the first attempt and the retry failed.
    Exhausted { original: E, retry: E },
}

/// Run `op`, and if it fails with an error `is_retryable` accepts, call
/// `recover` with that error and run `op` exactly once more.
///
/// `op` receives the attempt number (0 or 1).
pub async fn retry_once<T, E, Op, Fut, P, R>(
    mut op: Op,
    is_retryable: P,
    recover: R,
) -> Result<T, RetryFailure<E>>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    R: FnOnce(&E),
{
    let original = match op(0).await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if !is_retryable(&original) {
        return Err(RetryFailure::NotRetried(original));
    }

    recover(&original);

    match op(1).await {
        Ok(value) => Ok(value),
        Err(retry) => Err(RetryFailure::Exhausted { original, retry }),
    }
}
