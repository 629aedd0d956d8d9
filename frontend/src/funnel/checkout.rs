use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::info;

use crate::config::FunnelConfig;
use crate::notify::{NotificationSink, Severity};
use crate::timer::{Scheduler, TimerHandle};

/// Performs the hand-off to the payment provider.
pub trait CheckoutRedirector {
    fn redirect(&self, url: &str);
}

pub fn checkout_url(base_url: &str, plan_id: &str, contact: &str) -> String {
    format!(
        "{}/{}?prefilled_email={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(plan_id),
        urlencoding::encode(contact)
    )
}

#[derive(Default)]
struct CheckoutTimers {
    confirm: Option<TimerHandle>,
    redirect: Option<TimerHandle>,
}

/// Paces a purchase: a "securing your seat" notice right away, a success
/// notice after `checkout_confirm_ms`, and the redirect `checkout_redirect_ms`
/// after that. Starting a new checkout replaces the pending one.
pub struct CheckoutFlow {
    base_url: String,
    confirm_ms: u32,
    redirect_ms: u32,
    scheduler: Rc<dyn Scheduler>,
    sink: Rc<dyn NotificationSink>,
    redirector: Rc<dyn CheckoutRedirector>,
    timers: Rc<RefCell<CheckoutTimers>>,
}

impl CheckoutFlow {
    pub fn new(
        config: &FunnelConfig,
        scheduler: Rc<dyn Scheduler>,
        sink: Rc<dyn NotificationSink>,
        redirector: Rc<dyn CheckoutRedirector>,
    ) -> Self {
        Self {
            base_url: config.checkout_base_url.clone(),
            confirm_ms: config.checkout_confirm_ms,
            redirect_ms: config.checkout_redirect_ms,
            scheduler,
            sink,
            redirector,
            timers: Rc::new(RefCell::new(CheckoutTimers::default())),
        }
    }

    pub fn begin(&self, plan_id: &str, contact: &str) {
        self.cancel();
        info!("checkout started for plan {}", plan_id);
        self.sink
            .notify(Severity::Loading, "Securing your seat... please keep this page open");

        let url = checkout_url(&self.base_url, plan_id, contact);
        let redirect_ms = self.redirect_ms;
        let scheduler: Weak<dyn Scheduler> = Rc::downgrade(&self.scheduler);
        let sink = self.sink.clone();
        let redirector = self.redirector.clone();
        let timers: Weak<RefCell<CheckoutTimers>> = Rc::downgrade(&self.timers);

        let confirm = self.scheduler.schedule(
            self.confirm_ms,
            Box::new(move || {
                let (Some(scheduler), Some(timers)) = (scheduler.upgrade(), timers.upgrade()) else {
                    return;
                };
                sink.notify(Severity::Success, "Taking you to checkout...");
                let finished = Rc::downgrade(&timers);
                let redirect = scheduler.schedule(
                    redirect_ms,
                    Box::new(move || {
                        info!("redirecting to {}", url);
                        redirector.redirect(&url);
                        if let Some(finished) = finished.upgrade() {
                            let spent = std::mem::take(&mut *finished.borrow_mut());
                            drop(spent);
                        }
                    }),
                );
                timers.borrow_mut().redirect = Some(redirect);
            }),
        );
        self.timers.borrow_mut().confirm = Some(confirm);
    }

    pub fn is_pending(&self) -> bool {
        let timers = self.timers.borrow();
        timers.confirm.is_some() || timers.redirect.is_some()
    }

    pub fn cancel(&self) {
        let timers = std::mem::take(&mut *self.timers.borrow_mut());
        drop(timers);
    }
}
