//! # Obsid Interval Extractor
//!
//! Single forward scan over the commanded-state stream that cuts it into
//! obsid intervals.
//!
//! An interval opens at the first power marker (`WSPOW00000` or
//! `WSVIDALLDN`), latches the first start-science command (`XTZ0000005` or
//! `XCZ0000005`) and closes at the next stop-science command (`AA00000000`).
//! Only closes that saw a start-science produce an [`ObsidInterval`].
//!
//! Records with a maneuver obsid `[38001, 60000)` are skipped before any
//! transition is considered.

use crate::focal_plane;
use crate::{CommandedState, Instrument, ObsidInterval};

// =============================================================================
// STATE
// =============================================================================

/// Latched start of science inside an open interval.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScienceStart {
    tstart: f64,
    instrument: Instrument,
}

/// An interval that has seen its power marker but not yet its stop of science.
#[derive(Debug, Clone, PartialEq)]
struct OpenInterval {
    datestart: String,
    tstart: f64,
    science: Option<ScienceStart>,
}

/// State machine for obsid interval extraction.
///
/// The two latches are `started` (an [`OpenInterval`] exists) and the
/// optional start-science time inside it. Both reset only when an interval
/// closes.
#[derive(Debug, Clone, Default)]
pub struct ObsidIntervalExtractor {
    open: Option<OpenInterval>,
}

impl ObsidIntervalExtractor {
    /// Create an extractor with no open interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a power marker has been seen since the last close.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// The latched start-science time of the open interval, if any.
    #[must_use]
    pub fn science_start(&self) -> Option<f64> {
        self.open
            .as_ref()
            .and_then(|open| open.science)
            .map(|science| science.tstart)
    }

    /// Apply one record. Returns the interval closed by this record, if any.
    pub fn feed(&mut self, state: &CommandedState) -> Option<ObsidInterval> {
        if state.obsid.is_maneuver() {
            return None;
        }

        let command = &state.power_cmd;
        if command.is_power_marker() {
            // A second power marker inside an open interval does not restart it.
            if self.open.is_none() {
                self.open = Some(OpenInterval {
                    datestart: state.datestart.clone(),
                    tstart: state.tstart,
                    science: None,
                });
            }
            None
        } else if command.is_science_start() {
            if let Some(open) = self.open.as_mut() {
                if open.science.is_none() {
                    open.science = Some(ScienceStart {
                        tstart: state.tstart,
                        instrument: focal_plane::classify(state.simpos),
                    });
                }
            }
            None
        } else if command.is_science_stop() {
            let open = self.open.take()?;
            let science = open.science?;
            Some(ObsidInterval {
                obsid: state.obsid,
                datestart: open.datestart,
                datestop: state.datestop.clone(),
                tstart: open.tstart,
                tstop: state.tstop,
                start_science: science.tstart,
                instrument: science.instrument,
                catalog: None,
            })
        } else {
            None
        }
    }

    /// End the scan.
    ///
    /// An interval still open at the end of the stream is discarded. Its
    /// `datestart` is returned so the caller can report it.
    pub fn finish(self) -> Option<String> {
        self.open.map(|open| open.datestart)
    }

    /// Run a full scan and return the intervals in emission order.
    #[must_use]
    pub fn extract(states: &[CommandedState]) -> Vec<ObsidInterval> {
        Self::extract_with_tail(states).0
    }

    /// Run a full scan. Also returns the `datestart` of an interval left open
    /// at the end of the stream, as [`finish`](Self::finish) does.
    #[must_use]
    pub fn extract_with_tail(states: &[CommandedState]) -> (Vec<ObsidInterval>, Option<String>) {
        let mut extractor = Self::new();
        let intervals = states
            .iter()
            .filter_map(|state| extractor.feed(state))
            .collect();
        (intervals, extractor.finish())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Obsid, PowerCommand};

    const ACIS_S: i64 = 75_624;
    const HRC_S: i64 = -99_616;

    fn state(obsid: u32, cmd: &str, simpos: i64, t: f64) -> CommandedState {
        CommandedState {
            obsid: Obsid(obsid),
            power_cmd: PowerCommand::from(cmd),
            simpos,
            datestart: format!("start@{t}"),
            datestop: format!("stop@{t}"),
            tstart: t,
            tstop: t,
        }
    }

    #[test]
    fn power_marker_opens_interval() {
        let mut extractor = ObsidIntervalExtractor::new();
        assert!(!extractor.is_open());
        assert_eq!(extractor.feed(&state(100, "WSPOW00000", ACIS_S, 0.0)), None);
        assert!(extractor.is_open());
        assert_eq!(extractor.science_start(), None);
    }

    #[test]
    fn wsvidalldn_also_opens_interval() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(100, "WSVIDALLDN", ACIS_S, 0.0));
        assert!(extractor.is_open());
    }

    #[test]
    fn science_start_without_open_interval_is_ignored() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(100, "XTZ0000005", ACIS_S, 5.0));
        assert!(!extractor.is_open());
        assert_eq!(extractor.science_start(), None);
    }

    #[test]
    fn first_science_start_wins() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(100, "WSPOW00000", ACIS_S, 0.0));
        extractor.feed(&state(100, "XTZ0000005", ACIS_S, 5.0));
        extractor.feed(&state(100, "XCZ0000005", HRC_S, 7.0));
        assert_eq!(extractor.science_start(), Some(5.0));

        let closed = extractor.feed(&state(100, "AA00000000", HRC_S, 20.0));
        let Some(interval) = closed else {
            unreachable!("stop of science after start must close the interval");
        };
        assert_eq!(interval.start_science, 5.0);
        assert_eq!(interval.instrument, Instrument::AcisS);
    }

    #[test]
    fn close_emits_latched_start_and_closing_stop() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(100, "WSPOW00000", ACIS_S, 0.0));
        extractor.feed(&state(100, "XTZ0000005", ACIS_S, 5.0));
        let closed = extractor.feed(&state(101, "AA00000000", ACIS_S, 20.0));

        assert_eq!(
            closed,
            Some(ObsidInterval {
                obsid: Obsid(101),
                datestart: "start@0".to_string(),
                datestop: "stop@20".to_string(),
                tstart: 0.0,
                tstop: 20.0,
                start_science: 5.0,
                instrument: Instrument::AcisS,
                catalog: None,
            })
        );
        assert!(!extractor.is_open());
        assert_eq!(extractor.science_start(), None);
    }

    #[test]
    fn close_without_science_emits_nothing_but_resets() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(100, "WSPOW00000", ACIS_S, 0.0));
        assert_eq!(extractor.feed(&state(100, "AA00000000", ACIS_S, 20.0)), None);
        assert!(!extractor.is_open());
    }

    #[test]
    fn stop_without_open_interval_is_ignored() {
        let mut extractor = ObsidIntervalExtractor::new();
        assert_eq!(extractor.feed(&state(100, "AA00000000", ACIS_S, 20.0)), None);
        assert!(!extractor.is_open());
    }

    #[test]
    fn reentrant_power_marker_keeps_first_start() {
        let states = [
            state(100, "WSPOW00000", ACIS_S, 0.0),
            state(100, "XTZ0000005", ACIS_S, 5.0),
            state(200, "WSPOW00000", ACIS_S, 50.0),
            state(200, "AA00000000", ACIS_S, 60.0),
        ];
        let intervals = ObsidIntervalExtractor::extract(&states);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].tstart, 0.0);
        assert_eq!(intervals[0].obsid, Obsid(200));
    }

    #[test]
    fn maneuver_records_change_nothing() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(45_000, "WSPOW00000", ACIS_S, 0.0));
        assert!(!extractor.is_open());

        extractor.feed(&state(100, "WSPOW00000", ACIS_S, 1.0));
        extractor.feed(&state(100, "XTZ0000005", ACIS_S, 5.0));
        assert_eq!(extractor.feed(&state(45_000, "AA00000000", ACIS_S, 9.0)), None);
        assert!(extractor.is_open());
        assert_eq!(extractor.science_start(), Some(5.0));
    }

    #[test]
    fn other_commands_change_nothing() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(100, "WSPOW00000", ACIS_S, 0.0));
        extractor.feed(&state(100, "WSPOW0002A", ACIS_S, 2.0));
        extractor.feed(&state(100, "XTZ0000005", ACIS_S, 5.0));
        extractor.feed(&state(100, "XCZ0000005", ACIS_S, 6.0));
        assert!(extractor.is_open());
        assert_eq!(extractor.science_start(), Some(5.0));
    }

    #[test]
    fn unterminated_interval_is_discarded() {
        let mut extractor = ObsidIntervalExtractor::new();
        extractor.feed(&state(100, "WSPOW00000", ACIS_S, 0.0));
        extractor.feed(&state(100, "XTZ0000005", ACIS_S, 5.0));
        assert_eq!(extractor.finish(), Some("start@0".to_string()));

        let states = [
            state(100, "WSPOW00000", ACIS_S, 0.0),
            state(100, "XTZ0000005", ACIS_S, 5.0),
        ];
        assert!(ObsidIntervalExtractor::extract(&states).is_empty());
    }

    #[test]
    fn extract_with_tail_reports_the_open_interval() {
        let states = [
            state(100, "WSPOW00000", ACIS_S, 0.0),
            state(100, "XTZ0000005", ACIS_S, 5.0),
            state(100, "AA00000000", ACIS_S, 20.0),
            state(101, "WSVIDALLDN", ACIS_S, 30.0),
        ];
        let (intervals, tail) = ObsidIntervalExtractor::extract_with_tail(&states);
        assert_eq!(intervals.len(), 1);
        assert_eq!(tail, Some("start@30".to_string()));

        let (_, tail) = ObsidIntervalExtractor::extract_with_tail(&states[..3]);
        assert_eq!(tail, None);
    }

    #[test]
    fn instrument_is_fixed_at_science_start() {
        let states = [
            state(60_005, "WSPOW00000", 0, 0.0),
            state(60_005, "XCZ0000005", HRC_S, 5.0),
            state(60_005, "AA00000000", ACIS_S, 20.0),
        ];
        let intervals = ObsidIntervalExtractor::extract(&states);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].instrument, Instrument::HrcS);
    }
}
