//! Partner responses and their classification
//!
//! Every partner call yields a status code plus either a typed success body
//! or a problem body. [`classify`] maps that pair onto [`ResponseClass`]
//! without touching the transport, so reconcilers share one decision table.

use crate::models::ProblemDetails;

/// Status codes logged and retried on the next scheduled pass
pub const TRANSIENT_STATUSES: [u16; 7] = [401, 404, 409, 422, 500, 503, 520];

/// Outcome of a partner call
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerResponse<T> {
    /// HTTP status code
    pub status: u16,
    /// Decoded success body, when the call has one
    pub body: Option<T>,
    /// Decoded problem body of a non-2xx answer, when present
    pub problem: Option<ProblemDetails>,
}

impl<T> PartnerResponse<T> {
    /// 2xx answer carrying `body`
    pub fn ok(status: u16, body: T) -> Self {
        Self {
            status,
            body: Some(body),
            problem: None,
        }
    }

    /// Answer without any body
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: None,
            problem: None,
        }
    }

    /// Non-2xx answer carrying a problem body
    #[must_use]
    pub fn problem(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: None,
            problem: Some(ProblemDetails::new(status, detail)),
        }
    }

    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Problem detail text, if any
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.problem.as_ref().and_then(|p| p.detail.as_deref())
    }

    /// Classification of this response
    #[must_use]
    pub fn class(&self, sentinel: Option<&str>) -> ResponseClass {
        classify(self.status, self.problem.as_ref(), sentinel)
    }
}

/// How a reconciler must react to a partner answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx
    Success,
    /// The partner refused the request; retrying unchanged will not help.
    /// Carries the partner's detail text.
    PermanentRejection(String),
    /// Logged and retried later
    TransientProblem,
    /// Anything else
    Unclassified,
}

/// Classifies a partner answer.
///
/// `sentinel` is the detail text that turns a 500 into a permanent
/// rejection. The partner currently reports some missing dependencies as 500
/// instead of 400; drop the sentinel once it answers correctly.
#[must_use]
pub fn classify(
    status: u16,
    problem: Option<&ProblemDetails>,
    sentinel: Option<&str>,
) -> ResponseClass {
    let detail = problem.and_then(|p| p.detail.as_deref());
    match status {
        200..=299 => ResponseClass::Success,
        400 => ResponseClass::PermanentRejection(
            detail.unwrap_or("request rejected by partner").to_string(),
        ),
        500 if sentinel.is_some() && detail == sentinel => {
            ResponseClass::PermanentRejection(detail.unwrap_or_default().to_string())
        }
        s if TRANSIENT_STATUSES.contains(&s) => ResponseClass::TransientProblem,
        _ => ResponseClass::Unclassified,
    }
}

/// Whether a delete call confirmed removal. A 404 counts: the partner no
/// longer holds the resource.
#[must_use]
pub fn deletion_confirmed(status: u16) -> bool {
    (200..300).contains(&status) || status == 404
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(detail: &str) -> ProblemDetails {
        ProblemDetails::new(0, detail)
    }

    #[test]
    fn test_2xx_is_success() {
        for status in [200, 201, 202, 204, 299] {
            assert_eq!(classify(status, None, None), ResponseClass::Success);
        }
    }

    #[test]
    fn test_400_carries_problem_detail() {
        assert_eq!(
            classify(400, Some(&problem("zone unknown")), None),
            ResponseClass::PermanentRejection("zone unknown".to_string())
        );
        assert!(matches!(classify(400, None, None), ResponseClass::PermanentRejection(_)));
    }

    #[test]
    fn test_retryable_codes_are_transient() {
        for status in [401, 404, 409, 422, 503, 520] {
            assert_eq!(
                classify(status, Some(&problem("anything")), Some("file not found")),
                ResponseClass::TransientProblem,
                "status {status}"
            );
        }
    }

    #[test]
    fn test_500_sentinel_only_matches_exactly() {
        assert_eq!(
            classify(500, Some(&problem("file not found")), Some("file not found")),
            ResponseClass::PermanentRejection("file not found".to_string())
        );
        assert_eq!(
            classify(500, Some(&problem("artefact not found")), Some("file not found")),
            ResponseClass::TransientProblem
        );
        assert_eq!(
            classify(500, Some(&problem("file not found")), None),
            ResponseClass::TransientProblem
        );
        assert_eq!(classify(500, None, Some("file not found")), ResponseClass::TransientProblem);
    }

    #[test]
    fn test_other_codes_are_unclassified() {
        for status in [100, 301, 403, 418, 502] {
            assert_eq!(classify(status, None, None), ResponseClass::Unclassified, "status {status}");
        }
    }

    #[test]
    fn test_deletion_accepts_not_found() {
        assert!(deletion_confirmed(200));
        assert!(deletion_confirmed(204));
        assert!(deletion_confirmed(404));
        assert!(!deletion_confirmed(409));
        assert!(!deletion_confirmed(500));
    }
}
