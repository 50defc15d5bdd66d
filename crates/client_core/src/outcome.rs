use anyhow::Result;
use tracing::warn;

use shared::{
    error::FieldErrorMap,
    protocol::{ApiResponse, VALIDATION_STATUS},
};

use crate::notification::{Notification, NotificationSink};

/// Message shown when a request faults before producing a response; the
/// fault's own detail is logged but never reaches the user.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unknown error occured, please try again later";

/// Terminal result of one dispatched action. No error propagates past the
/// dispatcher boundary; callers branch on this value instead of catching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success {
        message: String,
    },
    ValidationFailure {
        message: String,
        field_errors: FieldErrorMap,
    },
    Failure {
        status_code: u16,
        message: String,
    },
    Fault,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ActionOutcome::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ActionOutcome::Success { message }
            | ActionOutcome::ValidationFailure { message, .. }
            | ActionOutcome::Failure { message, .. } => message,
            ActionOutcome::Fault => FALLBACK_ERROR_MESSAGE,
        }
    }
}

/// A settled request, classified once for every store: the outcome to report,
/// the record to reconcile (success only), and the field errors to install
/// (validation failures only).
pub(crate) struct Settled<T> {
    pub outcome: ActionOutcome,
    pub data: Option<T>,
    pub field_errors: Option<FieldErrorMap>,
}

pub(crate) fn settle_response<T>(op: &'static str, result: Result<ApiResponse<T>>) -> Settled<T> {
    match result {
        Ok(response) if response.success => Settled {
            data: response.data.record(),
            outcome: ActionOutcome::Success {
                message: response.message,
            },
            field_errors: None,
        },
        Ok(response) if response.status_code == VALIDATION_STATUS => {
            let field_errors = response.data.validation();
            Settled {
                outcome: ActionOutcome::ValidationFailure {
                    message: response.message,
                    field_errors: field_errors.clone().unwrap_or_default(),
                },
                data: None,
                field_errors,
            }
        }
        Ok(response) => Settled {
            outcome: ActionOutcome::Failure {
                status_code: response.status_code,
                message: response.message,
            },
            data: None,
            field_errors: None,
        },
        Err(err) => {
            warn!("{op}: request faulted: {err:#}");
            Settled {
                outcome: ActionOutcome::Fault,
                data: None,
                field_errors: None,
            }
        }
    }
}

/// Single policy point translating an outcome into the user-visible
/// notification. The title is only attached to successes; failure toasts are
/// untitled. Queries pass `failures_only` so a successful fetch stays quiet.
pub(crate) fn notify_outcome(
    sink: &dyn NotificationSink,
    title: Option<&str>,
    outcome: &ActionOutcome,
    failures_only: bool,
) {
    let notification = match outcome {
        ActionOutcome::Success { message } => {
            if failures_only {
                return;
            }
            Notification::success(title, message.clone())
        }
        _ => Notification::danger(outcome.message().to_string()),
    };
    sink.publish(notification);
}
