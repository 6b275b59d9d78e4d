use crate::MbError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, MbError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MbError::NonFinite { what, value: v })
    }
}

/// Accept `v > 0`. NaN is rejected.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, MbError> {
    if v > 0.0 {
        Ok(v)
    } else {
        Err(MbError::IllegalValue {
            what,
            value: v,
            rule: "> 0",
        })
    }
}

/// Accept `v >= 0`. NaN is rejected.
pub fn ensure_non_negative(v: Real, what: &'static str) -> Result<Real, MbError> {
    if v >= 0.0 {
        Ok(v)
    } else {
        Err(MbError::IllegalValue {
            what,
            value: v,
            rule: ">= 0",
        })
    }
}

/// Accept a count of at least one.
pub fn ensure_count(n: usize, what: &'static str) -> Result<usize, MbError> {
    if n >= 1 {
        Ok(n)
    } else {
        Err(MbError::IllegalValue {
            what,
            value: n as Real,
            rule: ">= 1",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn positivity_checks() {
        assert_eq!(ensure_positive(2.0, "relaxation time"), Ok(2.0));
        assert!(ensure_positive(0.0, "relaxation time").is_err());
        assert!(ensure_positive(Real::NAN, "relaxation time").is_err());

        assert_eq!(ensure_non_negative(0.0, "damping"), Ok(0.0));
        let err = ensure_non_negative(-1.5, "damping").unwrap_err();
        assert_eq!(err.to_string(), "Illegal damping -1.5: must be >= 0");
    }

    #[test]
    fn count_check() {
        assert_eq!(ensure_count(3, "number of chains"), Ok(3));
        let err = ensure_count(0, "number of chains").unwrap_err();
        assert!(err.to_string().contains("number of chains"));
    }
}
