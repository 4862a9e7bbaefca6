//! Health evaluation and alerting
//!
//! Classifies probe results against configurable thresholds and delivers
//! alert messages for non-healthy verdicts.

pub mod config;
pub mod dispatcher;
pub mod evaluator;
pub mod notifier;

pub use config::{AlertMessage, Severity, Thresholds};
pub use dispatcher::{AlertDispatcher, DispatchResult};
pub use evaluator::{evaluate, Evaluation, HealthVerdict};
pub use notifier::{LogNotifier, Notifier, NotifierError, WebhookNotifier};
