//! Panic visibility: every panic lands in the logs and a counter, even
//! when a background task dies far from any request handler.

use metrics::counter;
use once_cell::sync::OnceCell;
use std::{panic, thread};
use tracing::error;

static INSTALLED: OnceCell<()> = OnceCell::new();

pub fn install_hook() {
    if INSTALLED.set(()).is_err() {
        return;
    }

    let prev = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let thread = thread::current();
        let payload = payload_str(info);
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "<unknown>".into());

        error!(
            thread = thread.name().unwrap_or("<unnamed>"),
            %location,
            payload,
            "panic captured"
        );
        counter!("fluxgate_panics_total").increment(1);

        // keep default printing and backtraces
        prev(info);
    }));
}

fn payload_str<'a>(info: &'a panic::PanicHookInfo<'_>) -> &'a str {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        s
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
