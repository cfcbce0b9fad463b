//! Aggregate registration statistics for the admin dashboard.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use super::registration::{AttendanceDay, Registration};

/// Number of registrations sharing an affiliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffiliationCount {
    pub affiliation: String,
    pub count: i64,
}

/// Attendance count per event day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayCounts {
    pub day1: i64,
    pub day2: i64,
    pub day3: i64,
    pub day4: i64,
    pub day5: i64,
}

impl DayCounts {
    pub fn get(&self, day: AttendanceDay) -> i64 {
        match day {
            AttendanceDay::Day1 => self.day1,
            AttendanceDay::Day2 => self.day2,
            AttendanceDay::Day3 => self.day3,
            AttendanceDay::Day4 => self.day4,
            AttendanceDay::Day5 => self.day5,
        }
    }

    fn increment(&mut self, day: AttendanceDay) {
        match day {
            AttendanceDay::Day1 => self.day1 += 1,
            AttendanceDay::Day2 => self.day2 += 1,
            AttendanceDay::Day3 => self.day3 += 1,
            AttendanceDay::Day4 => self.day4 += 1,
            AttendanceDay::Day5 => self.day5 += 1,
        }
    }
}

/// Registration statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStats {
    pub total: i64,
    /// Registrations created on the current UTC date.
    pub today: i64,
    /// Registrations whose confirmation was delivered.
    pub emails_sent: i64,
    /// Sorted by count descending, then affiliation ascending.
    pub by_affiliation: Vec<AffiliationCount>,
    pub by_day: DayCounts,
}

impl RegistrationStats {
    /// Computes statistics over an in-memory set of registrations.
    pub fn from_registrations(registrations: &[Registration], today: NaiveDate) -> Self {
        let mut stats = Self {
            total: registrations.len() as i64,
            ..Default::default()
        };
        let mut affiliations: HashMap<&str, i64> = HashMap::new();

        for registration in registrations {
            if registration.created_at.date_naive() == today {
                stats.today += 1;
            }
            if registration.email_sent {
                stats.emails_sent += 1;
            }
            *affiliations.entry(&registration.affiliation).or_default() += 1;
            for day in registration.days.days() {
                stats.by_day.increment(day);
            }
        }

        stats.by_affiliation = affiliations
            .into_iter()
            .map(|(affiliation, count)| AffiliationCount {
                affiliation: affiliation.to_string(),
                count,
            })
            .collect();
        sort_affiliations(&mut stats.by_affiliation);
        stats
    }
}

/// Orders affiliation counts by count descending, then name ascending.
pub fn sort_affiliations(counts: &mut [AffiliationCount]) {
    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.affiliation.cmp(&b.affiliation))
    });
}
