use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

/// Anything that resolves to a single calendar date.
///
/// Strings are parsed as `YYYY-MM-DD`, the format the API and the day store
/// use for addressing dates.
pub trait AnyDate {
    fn get_date(self) -> Option<NaiveDate>;
}

impl AnyDate for NaiveDate {
    fn get_date(self) -> Option<NaiveDate> {
        Some(self)
    }
}

impl AnyDate for NaiveDateTime {
    fn get_date(self) -> Option<NaiveDate> {
        Some(self.date())
    }
}

impl<Tz: TimeZone> AnyDate for DateTime<Tz> {
    fn get_date(self) -> Option<NaiveDate> {
        Some(self.date_naive())
    }
}

impl AnyDate for &str {
    fn get_date(self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.trim(), "%Y-%m-%d").ok()
    }
}

impl AnyDate for String {
    fn get_date(self) -> Option<NaiveDate> {
        self.as_str().get_date()
    }
}

impl AnyDate for &String {
    fn get_date(self) -> Option<NaiveDate> {
        self.as_str().get_date()
    }
}
