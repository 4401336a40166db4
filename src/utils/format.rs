//! Number formatting that matches the output of C/C++ tools.

/// Significant digits used by `%g` when no precision is given
const GENERAL_PRECISION: i32 = 6;

/// Format a float the way C's `%g` (and a default `std::ostream`) does.
///
/// Six significant digits, trailing zeros removed, scientific notation when
/// the exponent is below -4 or at least 6.
///
/// # Examples
///
/// ```
/// use map_refine::utils::format::format_general;
///
/// assert_eq!(format_general(0.125), "0.125");
/// assert_eq!(format_general(1.0 / 3.0), "0.333333");
/// assert_eq!(format_general(0.0), "0");
/// assert_eq!(format_general(0.00005), "5e-05");
/// ```
#[must_use]
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    #[allow(clippy::cast_sign_loss)] // Precision is a small positive constant
    let scientific = format!("{:.*e}", (GENERAL_PRECISION - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= GENERAL_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        #[allow(clippy::cast_sign_loss)] // exponent < GENERAL_PRECISION here
        let decimals = (GENERAL_PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

/// Strip trailing zeros (and a dangling decimal point) from a fixed-point string
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
