use crate::session::Session;
use serde::{Deserialize, Serialize};

pub(crate) const SESSION_KEY: &str = "reccenter_session";
pub(crate) const LAST_QUERY_KEY: &str = "reccenter_last_query";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let json = local_storage()?.get_item(key).ok().flatten()?;
    serde_json::from_str(&json).ok()
}

pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        if let Some(storage) = local_storage() {
            let _ = storage.set_item(key, &json);
        }
    }
}

pub(crate) fn remove_from_storage(key: &str) {
    if let Some(storage) = local_storage() {
        let _ = storage.remove_item(key);
    }
}

pub(crate) fn save_session(session: &Session) {
    save_json_to_storage(SESSION_KEY, session);
}

/// Stored session, if any. A value that no longer parses is dropped.
pub(crate) fn load_session() -> Option<Session> {
    let session = load_json_from_storage::<Session>(SESSION_KEY);
    if session.is_none() {
        remove_from_storage(SESSION_KEY);
    }
    session
}

pub(crate) fn clear_session() {
    remove_from_storage(SESSION_KEY);
}

pub(crate) fn save_last_query(query: &str) {
    if query.trim().is_empty() {
        remove_from_storage(LAST_QUERY_KEY);
    } else {
        save_json_to_storage(LAST_QUERY_KEY, &query);
    }
}

pub(crate) fn load_last_query() -> String {
    load_json_from_storage::<String>(LAST_QUERY_KEY).unwrap_or_default()
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn session() -> Session {
        Session {
            user_id: "u1".to_string(),
            email: Some("u@example.com".to_string()),
            access_token: "t1".to_string(),
            is_admin: false,
        }
    }

    #[wasm_bindgen_test]
    fn test_session_roundtrip() {
        clear_session();
        assert!(load_session().is_none());

        save_session(&session());
        assert_eq!(load_session(), Some(session()));

        clear_session();
        assert!(load_session().is_none());
    }

    #[wasm_bindgen_test]
    fn test_corrupt_session_is_dropped() {
        save_json_to_storage(SESSION_KEY, &serde_json::json!({"user_id": 7}));
        assert!(load_session().is_none());
        assert!(load_json_from_storage::<serde_json::Value>(SESSION_KEY).is_none());
    }

    #[wasm_bindgen_test]
    fn test_last_query_roundtrip() {
        save_last_query("pool");
        assert_eq!(load_last_query(), "pool");
        save_last_query("  ");
        assert_eq!(load_last_query(), "");
    }
}
