//! Bounded retry with linear backoff.

use std::thread;
use std::time::Duration;

/// Runs `op` up to `attempts` times, sleeping `delay × attempt` between tries.
///
/// `op` receives the 1-based attempt number. Returns the first success or the
/// error of the final attempt. `attempts` below 1 is treated as 1.
pub fn retry_with_backoff<T, E>(
    attempts: u32,
    delay: Duration,
    mut op: impl FnMut(u32) -> Result<T, E>,
) -> Result<T, E> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(_) => {
                thread::sleep(delay * attempt);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::retry_with_backoff;
    use std::time::Duration;

    #[test]
    fn stops_at_first_success() {
        let mut calls = 0;
        let result: Result<u32, &str> = retry_with_backoff(3, Duration::ZERO, |attempt| {
            calls += 1;
            if attempt == 2 {
                Ok(attempt)
            } else {
                Err("boom")
            }
        });
        assert_eq!(result, Ok(2));
        assert_eq!(calls, 2);
    }

    #[test]
    fn returns_last_error_when_exhausted() {
        let result: Result<(), String> =
            retry_with_backoff(3, Duration::ZERO, |attempt| Err(format!("attempt {attempt}")));
        assert_eq!(result, Err("attempt 3".to_string()));
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let mut calls = 0;
        let _: Result<(), ()> = retry_with_backoff(0, Duration::ZERO, |_| {
            calls += 1;
            Err(())
        });
        assert_eq!(calls, 1);
    }
}
