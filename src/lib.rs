mod api;
mod app;
mod components;
mod config;
mod favorites;
mod health;
mod logging;
mod models;
mod pages;
mod search;
mod session;
mod state;
mod storage;
mod store;
mod util;

use crate::app::App;
use crate::config::EnvConfig;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    logging::init(EnvConfig::new().log_level);
    log::info!("starting rec center finder");
    mount_to_body(App);
}
