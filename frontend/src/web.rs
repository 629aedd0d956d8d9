use log::warn;
use web_sys::window;

use crate::funnel::CheckoutRedirector;

/// Opens checkout in a new tab (mobile browsers keep the funnel alive that
/// way) and falls back to navigating the current tab when popups are blocked.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowRedirector;

impl CheckoutRedirector for WindowRedirector {
    fn redirect(&self, url: &str) {
        let Some(window) = window() else {
            warn!("no window to redirect to {}", url);
            return;
        };
        match window.open_with_url_and_target(url, "_blank") {
            Ok(Some(_)) => {}
            _ => {
                if window.location().set_href(url).is_err() {
                    warn!("failed to redirect to {}", url);
                }
            }
        }
    }
}
