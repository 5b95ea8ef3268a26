//! Spanish 2.0TD tariff band classification
//!
//! Pure time-of-day classification of an instant into the three tariff
//! periods (valle / llano / punta). Weekends are valle at every hour. The
//! upstream API only uses whole hours for its ranges; each documented range
//! is taken to start at the full hour and end at minute 59 of its last hour,
//! so e.g. the valle period runs to 07:59 and llano starts at 08:00.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};

/// Tariff period an hour of the day falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffBand {
    /// Off-peak (valle)
    Valley,

    /// Mid-tier (llano)
    Plain,

    /// Peak (punta)
    Peak,

    /// Safety fallback; the band tables are exhaustive, so this should not
    /// occur in practice
    Unclassified,
}

impl TariffBand {
    /// Display label for the band
    pub fn label(self) -> &'static str {
        match self {
            Self::Valley => "valle",
            Self::Plain => "llano",
            Self::Peak => "punta",
            Self::Unclassified => "",
        }
    }
}

/// Inclusive minute-of-day windows per band, in precedence order
const VALLEY_WINDOWS: [(u32, u32); 1] = [(0, 7 * 60 + 59)];
const PLAIN_WINDOWS: [(u32, u32); 3] = [
    (8 * 60, 9 * 60 + 59),
    (14 * 60, 17 * 60 + 59),
    (22 * 60, 23 * 60 + 59),
];
const PEAK_WINDOWS: [(u32, u32); 2] = [(10 * 60, 13 * 60 + 59), (18 * 60, 21 * 60 + 59)];

/// Classify an instant into its tariff band.
///
/// Saturdays and Sundays are [`TariffBand::Valley`] at every hour; weekdays
/// are classified by the closed time-of-day windows above.
pub fn classify(instant: DateTime<FixedOffset>) -> TariffBand {
    if matches!(instant.weekday(), Weekday::Sat | Weekday::Sun) {
        return TariffBand::Valley;
    }

    let minute_of_day = instant.hour() * 60 + instant.minute();
    let bands = [
        (TariffBand::Valley, VALLEY_WINDOWS.as_slice()),
        (TariffBand::Plain, PLAIN_WINDOWS.as_slice()),
        (TariffBand::Peak, PEAK_WINDOWS.as_slice()),
    ];
    for (band, windows) in bands {
        if windows
            .iter()
            .any(|&(start, end)| (start..=end).contains(&minute_of_day))
        {
            return band;
        }
    }

    TariffBand::Unclassified
}
