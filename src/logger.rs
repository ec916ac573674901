//! Injectable logging sink.
//!
//! The crate does not talk to a global logger directly. A [`Client`] carries
//! a boxed [`LogSink`] so that embedding applications can route diagnostics
//! wherever they like and tests can capture output deterministically. The
//! default sink, [`StdLog`], forwards everything to the [`log`] crate's
//! macros, which is what most callers want.
//!
//! [`Client`]: crate::Client

/// A sink for the diagnostics produced by client operations.
///
/// All methods take `&self`; implementations that accumulate output should
/// use interior mutability.
pub trait LogSink {
    /// Fine-grained detail, useful when debugging message parsing.
    fn debug(&self, message: &str);
    /// Normal operational progress.
    fn info(&self, message: &str);
    /// Something unexpected that the operation recovered from.
    fn warning(&self, message: &str);
    /// An operation failed.
    fn error(&self, message: &str);
}

/// The default sink: forwards to the `log` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdLog;

impl LogSink for StdLog {
    fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn warning(&self, message: &str) {
        log::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}
