use std::rc::Rc;

use log::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Loading,
    Error,
}

/// Fire-and-forget user facing messages. How (and whether) they are shown is
/// up to the implementation.
pub trait NotificationSink {
    fn notify(&self, severity: Severity, message: &str);
}

/// Writes every notice to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Success | Severity::Info | Severity::Loading => {
                info!("[{:?}] {}", severity, message)
            }
            Severity::Error => error!("{}", message),
        }
    }
}

/// Logs, then hands the notice to a UI callback (the toast banner).
#[derive(Clone)]
pub struct CallbackSink {
    forward: Rc<dyn Fn(Severity, String)>,
}

impl CallbackSink {
    pub fn new(forward: impl Fn(Severity, String) + 'static) -> Self {
        Self {
            forward: Rc::new(forward),
        }
    }
}

impl NotificationSink for CallbackSink {
    fn notify(&self, severity: Severity, message: &str) {
        if severity == Severity::Error {
            warn!("{}", message);
        } else {
            LogSink.notify(severity, message);
        }
        (self.forward)(severity, message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_callback_sink_forwards_owned_message() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let sink = CallbackSink::new(move |severity, message| log.borrow_mut().push((severity, message)));

        sink.notify(Severity::Success, "report sent");
        sink.notify(Severity::Error, "checkout unavailable");

        assert_eq!(
            *seen.borrow(),
            vec![
                (Severity::Success, "report sent".to_string()),
                (Severity::Error, "checkout unavailable".to_string()),
            ]
        );
    }
}
