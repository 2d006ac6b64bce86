//! Drives spectra through isolation resolution and filter matching into
//! per-group accumulators, then hands the groups to a sink.

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::errors::{ChromextractError, Result};
use crate::models::aggregators::GroupPointsAggregator;
use crate::models::aggregators::group_points::ChromatogramPoint;
use crate::models::extraction::extract_transitions;
use crate::models::filter_matcher::FilterMatcher;
use crate::models::isolation::{isolation_windows, IsolationWindowFilter, IsolationWindowResolver};
use crate::models::request::{AcquisitionMethod, ChromatogramGroup, ChromatogramRequest, Transition};
use crate::models::spectrum::Spectrum;
use crate::traits::aggregator::Aggregator;
use crate::traits::chromatogram_sink::ChromatogramSink;
use crate::utils::tolerance_ranges::within_optional_bounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GeneratorState {
    #[default]
    Idle,
    Streaming,
    Finalizing,
    Done,
    /// A spectrum or the sink failed; accumulated points were discarded.
    Failed,
}

impl GeneratorState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub spectra_seen: usize,
    pub skipped_empty: usize,
    pub skipped_missing_time: usize,
    pub skipped_out_of_window: usize,
    pub ms1_spectra: usize,
    pub msn_spectra: usize,
    pub msn_unmatched: usize,
    pub points_accumulated: usize,
    pub groups_written: usize,
    /// Point count of each written group, in request order.
    pub points_per_group: Vec<usize>,
    pub final_state: GeneratorState,
}

#[derive(Debug)]
struct GroupProcessor {
    transitions: Vec<Transition>,
    aggregator: GroupPointsAggregator,
}

impl GroupProcessor {
    fn new(group_index: usize, group: &ChromatogramGroup, mz_match_tolerance: f64) -> Self {
        // A group without transitions gets a single precursor trace.
        let transitions = if group.transitions.is_empty() {
            vec![Transition {
                product_mz: group.precursor_mz,
                mz_window: mz_match_tolerance * 2.0,
            }]
        } else {
            group.transitions.clone()
        };
        let aggregator = GroupPointsAggregator::new(group_index, transitions.len());
        Self {
            transitions,
            aggregator,
        }
    }

    fn accepts(group: &ChromatogramGroup, spectrum: &Spectrum, retention_time: f64) -> bool {
        if !within_optional_bounds(retention_time, group.min_time, group.max_time) {
            return false;
        }
        match (group.drift_time, group.drift_time_window, spectrum.drift_time) {
            (Some(center), Some(window), Some(drift_time)) => {
                (drift_time - center).abs() <= window / 2.0
            }
            _ => true,
        }
    }

    /// Returns true if a point was added.
    fn process_spectrum(
        &mut self,
        group: &ChromatogramGroup,
        spectrum: &Spectrum,
        retention_time: f64,
    ) -> bool {
        if !Self::accepts(group, spectrum, retention_time) {
            return false;
        }
        let extracted =
            extract_transitions(spectrum, &self.transitions, group.extractor, group.mass_errors);
        self.aggregator.add(ChromatogramPoint {
            retention_time,
            scan_index: spectrum.index,
            values: extracted.values,
            mass_errors: extracted.mass_errors,
        });
        true
    }
}

#[derive(Debug)]
pub struct ChromatogramGenerator {
    request: ChromatogramRequest,
    resolver: IsolationWindowResolver,
    matcher: FilterMatcher,
    processors: Vec<GroupProcessor>,
    state: GeneratorState,
    summary: GenerationSummary,
}

impl ChromatogramGenerator {
    /// Validates the request and builds the sorted group list.
    pub fn new(request: ChromatogramRequest) -> Result<Self> {
        let scheme = request.validate()?;
        let resolver = IsolationWindowResolver::new(scheme, request.mz_match_tolerance);
        let matcher =
            FilterMatcher::new(request.chromatogram_groups.iter().map(|g| g.precursor_mz));
        let processors = request
            .chromatogram_groups
            .iter()
            .enumerate()
            .map(|(i, group)| GroupProcessor::new(i, group, request.mz_match_tolerance))
            .collect();
        info!(
            "Generator ready: {} groups, {:?} acquisition, isolation {:?}",
            matcher.len(),
            request.acquisition_method,
            resolver.scheme()
        );
        Ok(Self {
            request,
            resolver,
            matcher,
            processors,
            state: GeneratorState::Idle,
            summary: GenerationSummary::default(),
        })
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    pub fn summary(&self) -> &GenerationSummary {
        &self.summary
    }

    pub fn request(&self) -> &ChromatogramRequest {
        &self.request
    }

    /// Inclusive `[min_time, max_time]` check against the request window.
    pub fn contains_time(&self, retention_time: f64) -> bool {
        within_optional_bounds(retention_time, self.request.min_time, self.request.max_time)
    }

    /// Group indices an MS/MS isolation window contributes to, ascending by m/z.
    pub fn find_groups_for_isolation_window(
        &self,
        window: IsolationWindowFilter,
    ) -> Result<Vec<usize>> {
        let Some(isolation_mz) = window.isolation_mz else {
            return Ok(Vec::new());
        };
        let groups = match self.request.acquisition_method {
            AcquisitionMethod::None => Vec::new(),
            AcquisitionMethod::Dia => {
                let resolved = self.resolver.resolve_dia(window)?;
                match (resolved.isolation_mz, resolved.isolation_width) {
                    (Some(center), Some(width)) => self.matcher.match_dia(center, width),
                    _ => Vec::new(),
                }
            }
            AcquisitionMethod::Targeted => self
                .matcher
                .match_targeted(isolation_mz, self.request.mz_match_tolerance),
        };
        Ok(groups)
    }

    /// Groups an MS/MS spectrum contributes to, each listed once.
    pub fn matching_groups(&self, spectrum: &Spectrum) -> Result<Vec<usize>> {
        let mut groups = Vec::new();
        for window in isolation_windows(&spectrum.precursors) {
            groups.extend(self.find_groups_for_isolation_window(window)?);
        }
        groups.sort_unstable();
        groups.dedup();
        Ok(groups)
    }

    pub fn process_spectrum(&mut self, spectrum: &Spectrum) -> Result<()> {
        match self.state {
            GeneratorState::Idle => {
                debug!("Generator streaming");
                self.state = GeneratorState::Streaming;
            }
            GeneratorState::Streaming => {}
            other => {
                return Err(ChromextractError::InvalidState {
                    expected: "idle or streaming",
                    found: other.name(),
                })
            }
        }

        self.dispatch(spectrum).inspect_err(|_| self.fail())
    }

    fn dispatch(&mut self, spectrum: &Spectrum) -> Result<()> {
        self.summary.spectra_seen += 1;
        if spectrum.is_empty() {
            debug!("Skipping spectrum {}: no peaks", spectrum.index);
            self.summary.skipped_empty += 1;
            return Ok(());
        }
        let Some(retention_time) = spectrum.retention_time else {
            debug!("Skipping spectrum {}: no retention time", spectrum.index);
            self.summary.skipped_missing_time += 1;
            return Ok(());
        };
        if !self.contains_time(retention_time) {
            debug!(
                "Skipping spectrum {}: retention time {} outside window",
                spectrum.index,
                retention_time
            );
            self.summary.skipped_out_of_window += 1;
            return Ok(());
        }

        let targets: Vec<usize> = if spectrum.ms_level == 1 {
            self.summary.ms1_spectra += 1;
            (0..self.processors.len()).collect()
        } else {
            self.summary.msn_spectra += 1;
            let groups = self.matching_groups(spectrum)?;
            if groups.is_empty() {
                self.summary.msn_unmatched += 1;
            }
            groups
        };
        trace!(
            "Spectrum {} (ms{}) routed to {} groups",
            spectrum.index,
            spectrum.ms_level,
            targets.len()
        );

        for idx in targets {
            let group = &self.request.chromatogram_groups[idx];
            if self.processors[idx].process_spectrum(group, spectrum, retention_time) {
                self.summary.points_accumulated += 1;
            }
        }
        Ok(())
    }

    fn fail(&mut self) {
        warn!(
            "Chromatogram generation failed after {} spectra, discarding accumulated points",
            self.summary.spectra_seen
        );
        self.state = GeneratorState::Failed;
        self.summary.final_state = self.state;
        self.processors.clear();
    }

    /// Hands every group to `sink` in request order.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn finish<S: ChromatogramSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<GenerationSummary> {
        match self.state {
            GeneratorState::Idle | GeneratorState::Streaming => {}
            other => {
                return Err(ChromextractError::InvalidState {
                    expected: "idle or streaming",
                    found: other.name(),
                })
            }
        }
        self.state = GeneratorState::Finalizing;

        if let Err(e) = self.write_groups(sink) {
            self.fail();
            return Err(e);
        }

        self.state = GeneratorState::Done;
        self.summary.final_state = self.state;
        info!("Chromatogram generation done: {:?}", self.summary);
        Ok(self.summary.clone())
    }

    fn write_groups<S: ChromatogramSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let processors = std::mem::take(&mut self.processors);
        for (group, processor) in self.request.chromatogram_groups.iter().zip(processors) {
            let num_points = processor.aggregator.len();
            sink.write_group(group, processor.aggregator.finalize())?;
            self.summary.groups_written += 1;
            self.summary.points_per_group.push(num_points);
        }
        sink.finish()
    }

    /// Processes a whole spectrum stream and finishes into `sink`.
    ///
    /// Any error, from the stream or from processing, aborts the request.
    #[tracing::instrument(level = "info", skip_all)]
    pub fn generate<I, S>(&mut self, spectra: I, sink: &mut S) -> Result<GenerationSummary>
    where
        I: IntoIterator<Item = Result<Spectrum>>,
        S: ChromatogramSink + ?Sized,
    {
        for spectrum in spectra {
            let spectrum = match spectrum {
                Ok(spectrum) => spectrum,
                Err(e) => {
                    self.fail();
                    return Err(e);
                }
            };
            self.process_spectrum(&spectrum)?;
        }
        self.finish(sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RequestError;
    use crate::io::chromatogram_writer::MemoryChromatogramSink;
    use crate::models::request::{ChromExtractor, IsolationScheme, IsolationWindow};
    use crate::models::spectrum::Precursor;

    fn dia_request(precursor_filter: f64) -> ChromatogramRequest {
        let mut request = ChromatogramRequest::new(0.01, AcquisitionMethod::Dia);
        request.isolation_scheme = Some(IsolationScheme {
            precursor_filter: Some(precursor_filter),
            ..Default::default()
        });
        request
            .chromatogram_groups
            .push(ChromatogramGroup::new(500.0).with_transition(500.1, 0.02));
        request
    }

    fn ms1(index: usize, rt: f64) -> Spectrum {
        Spectrum::new(index, 1, Some(rt), vec![500.1], vec![1000.0]).unwrap()
    }

    fn ms2(index: usize, rt: f64, target: f64, width: f64) -> Spectrum {
        Spectrum::new(index, 2, Some(rt), vec![500.1], vec![1000.0])
            .unwrap()
            .with_precursors(vec![Precursor::new(target, width / 2.0, width / 2.0)])
    }

    #[test]
    fn test_end_to_end_ms1_and_ms2() {
        let mut generator = ChromatogramGenerator::new(dia_request(0.5)).unwrap();
        assert_eq!(generator.state(), GeneratorState::Idle);
        let mut sink = MemoryChromatogramSink::default();
        let summary = generator
            .generate(
                vec![Ok(ms1(0, 10.0)), Ok(ms2(1, 10.0, 500.1, 1.0))],
                &mut sink,
            )
            .unwrap();
        assert_eq!(generator.state(), GeneratorState::Done);
        assert_eq!(summary.ms1_spectra, 1);
        assert_eq!(summary.msn_spectra, 1);
        assert_eq!(summary.points_accumulated, 2);
        assert_eq!(summary.points_per_group, vec![2]);
        assert_eq!(summary.final_state, GeneratorState::Done);

        let (group, points) = &sink.groups[0];
        assert_eq!(group.precursor_mz, 500.0);
        assert_eq!(points.len(), 2);
        assert_eq!(points.scan_indices(), vec![0.0, 1.0]);
        assert_eq!(points.intensities(0), vec![1000.0, 1000.0]);
    }

    #[test]
    fn test_min_time_skips_everything() {
        let mut request = dia_request(0.5);
        request.min_time = Some(10.5);
        let mut generator = ChromatogramGenerator::new(request).unwrap();
        let mut sink = MemoryChromatogramSink::default();
        let summary = generator
            .generate(
                vec![Ok(ms1(0, 10.0)), Ok(ms2(1, 10.0, 500.1, 1.0))],
                &mut sink,
            )
            .unwrap();
        assert_eq!(summary.skipped_out_of_window, 2);
        assert_eq!(summary.points_accumulated, 0);
        assert!(sink.groups[0].1.is_empty());
    }

    #[test]
    fn test_time_window_is_inclusive() {
        let mut request = dia_request(0.5);
        request.min_time = Some(10.0);
        request.max_time = Some(10.0);
        let generator = ChromatogramGenerator::new(request).unwrap();
        assert!(generator.contains_time(10.0));
        assert!(!generator.contains_time(10.01));
        assert!(!generator.contains_time(9.99));
    }

    #[test]
    fn test_skip_conditions_are_not_errors() {
        let mut generator = ChromatogramGenerator::new(dia_request(0.5)).unwrap();
        let empty = Spectrum::new(0, 1, Some(1.0), vec![], vec![]).unwrap();
        let no_time = Spectrum::new(1, 1, None, vec![500.1], vec![1.0]).unwrap();
        generator.process_spectrum(&empty).unwrap();
        generator.process_spectrum(&no_time).unwrap();
        assert_eq!(generator.summary().skipped_empty, 1);
        assert_eq!(generator.summary().skipped_missing_time, 1);
        assert_eq!(generator.summary().points_accumulated, 0);
        assert_eq!(generator.state(), GeneratorState::Streaming);
    }

    #[test]
    fn test_ms2_outside_isolation_window_is_unmatched() {
        let mut generator = ChromatogramGenerator::new(dia_request(0.5)).unwrap();
        generator.process_spectrum(&ms2(0, 1.0, 501.0, 1.0)).unwrap();
        assert_eq!(generator.summary().msn_unmatched, 1);
        assert_eq!(generator.summary().points_accumulated, 0);
    }

    #[test]
    fn test_ms2_without_precursor_contributes_nothing() {
        let mut generator = ChromatogramGenerator::new(dia_request(0.5)).unwrap();
        let spectrum = Spectrum::new(0, 2, Some(1.0), vec![500.1], vec![1.0]).unwrap();
        assert!(generator.matching_groups(&spectrum).unwrap().is_empty());
        generator.process_spectrum(&spectrum).unwrap();
        assert_eq!(generator.summary().msn_unmatched, 1);
    }

    #[test]
    fn test_targeted_routes_to_closest_groups() {
        let mut request = ChromatogramRequest::new(0.0002, AcquisitionMethod::Targeted);
        for mz in [500.00015, 500.00005, 500.00008, 600.0] {
            request.chromatogram_groups.push(ChromatogramGroup::new(mz));
        }
        let generator = ChromatogramGenerator::new(request).unwrap();
        let groups = generator
            .find_groups_for_isolation_window(IsolationWindowFilter::new(Some(500.0), None))
            .unwrap();
        assert_eq!(groups, vec![1, 2]);
    }

    #[test]
    fn test_targeted_ignores_scheme_windows() {
        let mut request = ChromatogramRequest::new(0.01, AcquisitionMethod::Targeted);
        request.isolation_scheme = Some(IsolationScheme {
            isolation_windows: vec![
                IsolationWindow::new(400.0, 425.0, None),
                IsolationWindow::new(425.0, 450.0, None),
            ],
            ..Default::default()
        });
        for mz in [450.0, 500.002, 550.0] {
            request.chromatogram_groups.push(ChromatogramGroup::new(mz));
        }
        let generator = ChromatogramGenerator::new(request).unwrap();
        let spectrum = ms2(0, 1.0, 500.0, 1.0);
        assert_eq!(generator.matching_groups(&spectrum).unwrap(), vec![1]);
    }

    #[test]
    fn test_nan_isolation_target_matches_no_group() {
        let mut request = dia_request(2.0);
        request.chromatogram_groups = [300.0, 500.0, 900.0]
            .into_iter()
            .map(ChromatogramGroup::new)
            .collect();
        let mut generator = ChromatogramGenerator::new(request).unwrap();
        let spectrum = ms2(0, 1.0, f64::NAN, 1.0);
        assert!(generator.matching_groups(&spectrum).unwrap().is_empty());
        generator.process_spectrum(&spectrum).unwrap();
        assert_eq!(generator.summary().msn_unmatched, 1);
        assert_eq!(generator.summary().points_accumulated, 0);
    }

    #[test]
    fn test_acquisition_none_ignores_msn() {
        let mut request = dia_request(0.5);
        request.acquisition_method = AcquisitionMethod::None;
        let generator = ChromatogramGenerator::new(request).unwrap();
        assert!(generator
            .matching_groups(&ms2(0, 1.0, 500.0, 1.0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_scheme_is_fatal_and_discards_points() {
        let mut request = ChromatogramRequest::new(0.01, AcquisitionMethod::Dia);
        request.chromatogram_groups.push(ChromatogramGroup::new(500.0));
        let mut generator = ChromatogramGenerator::new(request).unwrap();
        generator.process_spectrum(&ms1(0, 1.0)).unwrap();

        let no_width = Spectrum::new(1, 2, Some(1.0), vec![500.1], vec![1.0])
            .unwrap()
            .with_precursors(vec![Precursor {
                isolation_mz: Some(500.0),
                lower_offset: None,
                upper_offset: None,
            }]);
        let err = generator.process_spectrum(&no_width).unwrap_err();
        assert!(matches!(
            err,
            ChromextractError::Request(RequestError::MissingIsolationScheme { .. })
        ));
        assert_eq!(generator.state(), GeneratorState::Failed);

        let mut sink = MemoryChromatogramSink::default();
        assert!(generator.finish(&mut sink).is_err());
        assert!(sink.groups.is_empty());
        assert!(generator.process_spectrum(&ms1(2, 1.0)).is_err());
    }

    #[test]
    fn test_ambiguous_windows_fail_the_request() {
        let mut request = ChromatogramRequest::new(0.01, AcquisitionMethod::Dia);
        request.isolation_scheme = Some(IsolationScheme {
            isolation_windows: vec![
                IsolationWindow::new(490.0, 510.0, None),
                IsolationWindow::new(495.0, 505.0, None),
            ],
            ..Default::default()
        });
        request.chromatogram_groups.push(ChromatogramGroup::new(500.0));
        let mut generator = ChromatogramGenerator::new(request).unwrap();
        let err = generator
            .process_spectrum(&ms2(0, 1.0, 500.0, 1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            ChromextractError::Request(RequestError::AmbiguousIsolationWindow { .. })
        ));
    }

    #[test]
    fn test_stream_error_is_propagated() {
        let mut generator = ChromatogramGenerator::new(dia_request(0.5)).unwrap();
        let mut sink = MemoryChromatogramSink::default();
        let stream = vec![
            Ok(ms1(0, 1.0)),
            Err(ChromextractError::custom("bad line")),
            Ok(ms1(2, 1.0)),
        ];
        assert!(generator.generate(stream, &mut sink).is_err());
        assert_eq!(generator.state(), GeneratorState::Failed);
        assert!(sink.groups.is_empty());
    }

    #[test]
    fn test_finish_twice_is_rejected() {
        let mut generator = ChromatogramGenerator::new(dia_request(0.5)).unwrap();
        let mut sink = MemoryChromatogramSink::default();
        generator.finish(&mut sink).unwrap();
        let err = generator.finish(&mut sink).unwrap_err();
        assert!(matches!(
            err,
            ChromextractError::InvalidState { found: "done", .. }
        ));
    }

    #[test]
    fn test_group_filters_and_precursor_trace() {
        let mut request = ChromatogramRequest::new(0.01, AcquisitionMethod::Dia);
        let mut late = ChromatogramGroup::new(500.1);
        late.min_time = Some(5.0);
        late.extractor = ChromExtractor::BasePeak;
        let mut drift = ChromatogramGroup::new(500.1);
        drift.drift_time = Some(20.0);
        drift.drift_time_window = Some(2.0);
        request.chromatogram_groups.push(late);
        request.chromatogram_groups.push(drift);

        let mut generator = ChromatogramGenerator::new(request).unwrap();
        generator.process_spectrum(&ms1(0, 1.0).with_drift_time(Some(20.5))).unwrap();
        generator.process_spectrum(&ms1(1, 6.0).with_drift_time(Some(25.0))).unwrap();

        let mut sink = MemoryChromatogramSink::default();
        generator.finish(&mut sink).unwrap();
        // The late group only sees the second spectrum, the drift group only the first.
        assert_eq!(sink.groups[0].1.scan_indices(), vec![1.0]);
        assert_eq!(sink.groups[1].1.scan_indices(), vec![0.0]);
        // No transitions: one precursor trace at 500.1 +/- 0.01.
        assert_eq!(sink.groups[1].1.intensities(0), vec![1000.0]);
    }
}
