use anyhow::{Context, Result};
use heliolapse_core::pipeline::CancelFlag;

/// Cancel flag that trips on Ctrl-C.
///
/// Installs the process-wide handler, so call it once per command.
pub fn cancel_on_interrupt() -> Result<CancelFlag> {
    let cancel = CancelFlag::new();
    let handler = cancel.clone();
    ctrlc::set_handler(move || {
        if !handler.is_cancelled() {
            eprintln!("\nInterrupt received, stopping...");
        }
        handler.cancel();
    })
    .context("Failed to install interrupt handler")?;
    Ok(cancel)
}
