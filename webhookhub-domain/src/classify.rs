/// Outcome of one HTTP delivery attempt (spec §4.4, §9 — "encode outcomes
/// as a tagged variant ... match exhaustively at the call site").
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Success,
    Failure {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },
}

/// Pure classifier: network/timeout errors (no status code) are always
/// retryable; 429 and 5xx are retryable; every other non-2xx is terminal.
/// Kept free of I/O so it's unit-testable in isolation (spec §9).
pub fn is_retryable_status(status_code: u16) -> bool {
    status_code == 429 || (500..=599).contains(&status_code)
}

pub fn classify_status(status_code: u16, message: impl Into<String>) -> DeliveryOutcome {
    if (200..300).contains(&status_code) {
        DeliveryOutcome::Success
    } else {
        DeliveryOutcome::Failure {
            message: message.into(),
            status_code: Some(status_code),
            retryable: is_retryable_status(status_code),
        }
    }
}

pub fn classify_transport_error(message: impl Into<String>) -> DeliveryOutcome {
    DeliveryOutcome::Failure {
        message: message.into(),
        status_code: None,
        retryable: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_xx_is_always_success() {
        assert_eq!(classify_status(200, "ok"), DeliveryOutcome::Success);
        assert_eq!(classify_status(204, "ok"), DeliveryOutcome::Success);
    }

    #[test]
    fn rate_limit_and_server_errors_are_retryable() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
    }

    #[test]
    fn other_non_2xx_are_terminal() {
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(301));
    }

    #[test]
    fn transport_errors_are_retryable_with_no_status() {
        match classify_transport_error("connection refused") {
            DeliveryOutcome::Failure { status_code, retryable, .. } => {
                assert_eq!(status_code, None);
                assert!(retryable);
            }
            DeliveryOutcome::Success => panic!("expected failure"),
        }
    }
}
