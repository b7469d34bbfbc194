//! Display formatting for prices and timestamps in notifications.
//!
//! ```text
//! format_usd(61000.0, 0)      -> "$61,000"
//! format_usd(19650.015, 2)    -> "$19,650.02"
//! format_long_date(t)         -> "Sunday, December 17th 2017, 12:00:00 pm"
//! ```

use chrono::{DateTime, Datelike, TimeZone};
use rust_decimal::{Decimal, RoundingStrategy};

/// Format `value` as US dollars with thousands separators and `decimals`
/// fractional digits, e.g. `$1,234.50`. Ties round away from zero.
pub fn format_usd(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }

    let fixed = round_half_away(value.abs(), decimals);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + fixed.len() / 3 + 2);
    // `-0` after rounding prints without a sign.
    if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push('$');
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `value` rounded to `decimals` places, as fixed-point text.
///
/// Rounds the shortest decimal form of the float, so `19650.015` goes up to
/// `19650.02` even though its binary value sits just below the midpoint.
/// Values outside `Decimal`'s range fall back to std formatting.
fn round_half_away(value: f64, decimals: usize) -> String {
    match value.to_string().parse::<Decimal>() {
        Ok(d) => {
            let places = u32::try_from(decimals).unwrap_or(u32::MAX);
            let rounded = d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.decimals$}")
        }
        Err(_) => format!("{value:.decimals$}"),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// English ordinal suffix for a day of month (`1st`, `2nd`, `11th`, `23rd`).
pub fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Long human date: weekday, month, ordinal day, year and 12-hour time with a
/// lowercase meridiem.
pub fn format_long_date<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let day = time.day();
    format!(
        "{}, {} {}{} {}, {}",
        time.format("%A"),
        time.format("%B"),
        day,
        ordinal_suffix(day),
        time.format("%Y"),
        time.format("%-I:%M:%S %P"),
    )
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;

    #[test]
    fn usd_whole_dollars() {
        assert_eq!(format_usd(61000.0, 0), "$61,000");
        assert_eq!(format_usd(999.0, 0), "$999");
        assert_eq!(format_usd(1_234_567.0, 0), "$1,234,567");
        assert_eq!(format_usd(0.0, 0), "$0");
    }

    #[test]
    fn usd_rounds_to_precision() {
        assert_eq!(format_usd(19650.4, 0), "$19,650");
        assert_eq!(format_usd(999.6, 0), "$1,000");
        assert_eq!(format_usd(19650.01, 2), "$19,650.01");
        assert_eq!(format_usd(50000.0, 2), "$50,000.00");
    }

    #[test]
    fn usd_ties_round_up() {
        assert_eq!(format_usd(60000.5, 0), "$60,001");
        assert_eq!(format_usd(61000.5, 0), "$61,001");
        assert_eq!(format_usd(0.5, 0), "$1");
        assert_eq!(format_usd(19650.015, 2), "$19,650.02");
        assert_eq!(format_usd(1.005, 2), "$1.01");
        assert_eq!(format_usd(-2.5, 0), "-$3");
    }

    #[test]
    fn usd_out_of_decimal_range_still_formats() {
        assert_eq!(format_usd(1e30, 0), "$1,000,000,000,000,000,019,884,624,838,656");
    }

    #[test]
    fn usd_negative_and_non_finite() {
        assert_eq!(format_usd(-1234.5, 2), "-$1,234.50");
        assert_eq!(format_usd(-0.001, 2), "$0.00");
        assert_eq!(format_usd(f64::NAN, 0), "$NaN");
    }

    #[test]
    fn ordinals() {
        let got: Vec<_> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 31]
            .iter()
            .map(|&d| format!("{d}{}", ordinal_suffix(d)))
            .collect();
        assert_eq!(
            got,
            ["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "23rd", "31st"]
        );
    }

    #[test]
    fn long_date_in_utc() {
        let t = Utc.with_ymd_and_hms(2017, 12, 17, 12, 0, 0).unwrap();
        assert_eq!(format_long_date(&t), "Sunday, December 17th 2017, 12:00:00 pm");

        let t = Utc.with_ymd_and_hms(2021, 3, 1, 0, 5, 9).unwrap();
        assert_eq!(format_long_date(&t), "Monday, March 1st 2021, 12:05:09 am");
    }

    #[test]
    fn long_date_follows_offset() {
        let t = Utc.with_ymd_and_hms(2017, 12, 17, 2, 0, 0).unwrap();
        let ny = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            format_long_date(&t.with_timezone(&ny)),
            "Saturday, December 16th 2017, 9:00:00 pm"
        );
    }
}
