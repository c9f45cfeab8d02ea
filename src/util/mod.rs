use futures::future::{select, Either};
use gloo_timers::future::TimeoutFuture;
use std::future::Future;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 16;

pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Random base36 token for rows created without an id.
///
/// Falls back to a clock-derived token only if the platform RNG is unavailable.
pub(crate) fn generate_id() -> String {
    let mut buf = [0u8; ID_LEN];
    if getrandom::getrandom(&mut buf).is_err() {
        let seed = now_ms().unsigned_abs();
        for (i, b) in buf.iter_mut().enumerate() {
            *b = (seed >> ((i % 8) * 8)) as u8 ^ (i as u8).wrapping_mul(31);
        }
    }
    buf.iter()
        .map(|b| ID_ALPHABET[(*b as usize) % ID_ALPHABET.len()] as char)
        .collect()
}

/// Split the admin form's comma separated amenity input.
pub(crate) fn parse_amenities(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Race `fut` against a browser timer. `None` means the timer won.
pub(crate) async fn with_timeout<F: Future>(fut: F, timeout_ms: u32) -> Option<F::Output> {
    let fut = Box::pin(fut);
    let timer = Box::pin(TimeoutFuture::new(timeout_ms));
    match select(fut, timer).await {
        Either::Left((out, _)) => Some(out),
        Either::Right(((), _)) => None,
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use futures::future::pending;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn test_with_timeout_gives_up_on_stalled_future() {
        assert_eq!(with_timeout(pending::<u8>(), 10).await, None);
    }

    #[wasm_bindgen_test]
    async fn test_with_timeout_returns_ready_output() {
        assert_eq!(with_timeout(async { 5u8 }, 1_000).await, Some(5));
    }
}
