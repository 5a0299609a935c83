//! Demo widget plugin: two classes exported through `modula_abi::export_plugin!`.

use core::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Widgets created and not yet destroyed.
static LIVE: AtomicUsize = AtomicUsize::new(0);

struct Clock {
    _started: Instant,
}

struct Counter {
    _value: i64,
}

fn track<T>(widget: T) -> *mut c_void {
    LIVE.fetch_add(1, Ordering::SeqCst);
    Box::into_raw(Box::new(widget)).cast()
}

/// # Safety
/// `widget` must come from `track::<T>` and be released once.
unsafe fn release<T>(widget: *mut c_void) {
    if widget.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(widget.cast::<T>()) });
    LIVE.fetch_sub(1, Ordering::SeqCst);
}

extern "C" fn clock_create() -> *mut c_void {
    track(Clock {
        _started: Instant::now(),
    })
}

unsafe extern "C" fn clock_destroy(widget: *mut c_void) {
    unsafe { release::<Clock>(widget) }
}

extern "C" fn counter_create() -> *mut c_void {
    track(Counter { _value: 0 })
}

unsafe extern "C" fn counter_destroy(widget: *mut c_void) {
    unsafe { release::<Counter>(widget) }
}

#[unsafe(no_mangle)]
pub extern "C" fn demo_widgets_live() -> usize {
    LIVE.load(Ordering::SeqCst)
}

modula_abi::export_plugin! {
    name: "Demo widgets",
    description: "A clock and a counter",
    widgets: [
        "DemoClock" => (clock_create, clock_destroy),
        "DemoCounter" => (counter_create, counter_destroy),
    ],
}
