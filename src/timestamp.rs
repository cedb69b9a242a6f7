//! MS-DOS timestamp handling.
//!
//! ZIP headers store modification times in the MS-DOS format: two 16-bit
//! words holding a local calendar date and time with 2-second resolution,
//! covering 1980-01-01 through 2107-12-31. This crate always writes and
//! interprets them as UTC.
//!
//! | Word | Bits | Field |
//! |------|------|-------|
//! | time | 15-11 | hour |
//! | time | 10-5 | minute |
//! | time | 4-0 | second / 2 |
//! | date | 15-9 | year - 1980 |
//! | date | 8-5 | month |
//! | date | 4-0 | day |

use std::time::{Duration, SystemTime, UNIX_EPOCH};

const SECONDS_PER_DAY: i64 = 86_400;

/// A timestamp in MS-DOS date/time format.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, SystemTime};
/// use zipvault::DosDateTime;
///
/// // 2020-01-01T00:00:00Z
/// let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_577_836_800);
/// let dos = DosDateTime::from_system_time(t);
/// assert_eq!(dos.to_system_time(), Some(t));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    /// Packed time word.
    pub time: u16,
    /// Packed date word.
    pub date: u16,
}

impl DosDateTime {
    /// The earliest representable instant, 1980-01-01 00:00:00.
    pub const MIN: Self = Self {
        time: 0,
        date: (1 << 5) | 1,
    };

    /// Creates a timestamp from raw header words.
    pub const fn new(time: u16, date: u16) -> Self {
        Self { time, date }
    }

    /// Converts a system time, clamping to the representable range.
    ///
    /// Odd seconds are rounded down.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(_) => return Self::MIN,
        };
        let days = secs.div_euclid(SECONDS_PER_DAY);
        let rem = secs.rem_euclid(SECONDS_PER_DAY);
        let (year, month, day) = civil_from_days(days);

        if year < 1980 {
            return Self::MIN;
        }
        if year > 2107 {
            return Self::new(
                (23 << 11) | (59 << 5) | 29,
                (127 << 9) | (12 << 5) | 31,
            );
        }

        let hour = (rem / 3600) as u16;
        let minute = ((rem % 3600) / 60) as u16;
        let second = (rem % 60) as u16;
        Self {
            time: (hour << 11) | (minute << 5) | (second / 2),
            date: (((year - 1980) as u16) << 9) | ((month as u16) << 5) | day as u16,
        }
    }

    /// Converts back to a system time.
    ///
    /// Returns `None` if the packed fields are out of range.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let year = 1980 + i64::from(self.date >> 9);
        let month = u32::from((self.date >> 5) & 0x0F);
        let day = u32::from(self.date & 0x1F);
        let hour = i64::from(self.time >> 11);
        let minute = i64::from((self.time >> 5) & 0x3F);
        let second = i64::from(self.time & 0x1F) * 2;

        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }

        let days = days_from_civil(year, month, day);
        let secs = days * SECONDS_PER_DAY + hour * 3600 + minute * 60 + second;
        Some(UNIX_EPOCH + Duration::from_secs(u64::try_from(secs).ok()?))
    }
}

impl Default for DosDateTime {
    fn default() -> Self {
        Self::MIN
    }
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let m = i64::from(month);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
