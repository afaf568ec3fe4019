//! The render-completion barrier.

use std::time::Duration;

use futures::future::{select, Either};
use futures::pin_mut;

use super::surface::{DesignSurface, Timer};
use super::types::CaptureError;

/// Wait until `surface` has finished rendering, or fail after `timeout`.
///
/// Dropping the returned future abandons the wait without touching the
/// surface, which is only borrowed.
pub async fn wait_for_render<S, T>(
    surface: &S,
    timer: &T,
    timeout: Duration,
) -> Result<(), CaptureError>
where
    S: DesignSurface + ?Sized,
    T: Timer + ?Sized,
{
    let rendered = surface.rendered();
    let expired = timer.sleep(timeout);
    pin_mut!(rendered, expired);

    match select(rendered, expired).await {
        Either::Left(((), _)) => Ok(()),
        Either::Right(((), _)) => {
            log::warn!(
                "surface '{}' did not finish rendering within {}ms",
                surface.id(),
                timeout.as_millis()
            );
            Err(CaptureError::Timeout {
                waited_ms: timeout.as_millis() as u64,
            })
        }
    }
}
