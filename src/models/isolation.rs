//! Turns instrument-reported isolation windows into the effective
//! center/width used to match filter groups.

use tracing::trace;

use crate::errors::RequestError;
use crate::models::request::{IsolationWindow, ResolvedIsolationScheme};
use crate::models::spectrum::Precursor;

/// Isolation center and full width. Either part may be unknown.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IsolationWindowFilter {
    pub isolation_mz: Option<f64>,
    pub isolation_width: Option<f64>,
}

impl IsolationWindowFilter {
    pub fn new(isolation_mz: Option<f64>, isolation_width: Option<f64>) -> Self {
        Self {
            isolation_mz,
            isolation_width,
        }
    }

    pub fn unconstrained() -> Self {
        Self::default()
    }
}

impl From<&Precursor> for IsolationWindowFilter {
    /// A non-finite target leaves the window empty.
    fn from(precursor: &Precursor) -> Self {
        Self::new(
            precursor.isolation_mz.filter(|mz| mz.is_finite()),
            precursor.isolation_width(),
        )
    }
}

/// One filter per declared precursor, or a single unconstrained filter
/// when the spectrum declares none.
pub fn isolation_windows(precursors: &[Precursor]) -> Vec<IsolationWindowFilter> {
    if precursors.is_empty() {
        return vec![IsolationWindowFilter::unconstrained()];
    }
    precursors.iter().map(IsolationWindowFilter::from).collect()
}

#[derive(Debug, Clone)]
pub struct IsolationWindowResolver {
    scheme: ResolvedIsolationScheme,
    mz_match_tolerance: f64,
}

impl IsolationWindowResolver {
    pub fn new(scheme: ResolvedIsolationScheme, mz_match_tolerance: f64) -> Self {
        Self {
            scheme,
            mz_match_tolerance,
        }
    }

    pub fn scheme(&self) -> &ResolvedIsolationScheme {
        &self.scheme
    }

    /// Effective DIA window for an instrument-reported one.
    ///
    /// A result without a width means the spectrum matches no group.
    pub fn resolve_dia(
        &self,
        reported: IsolationWindowFilter,
    ) -> Result<IsolationWindowFilter, RequestError> {
        let Some(isolation_mz) = reported.isolation_mz else {
            return Ok(IsolationWindowFilter::unconstrained());
        };

        let resolved = match &self.scheme {
            ResolvedIsolationScheme::PrecursorFilter {
                filter,
                right_filter,
            } => {
                let mut width = filter + right_filter.unwrap_or(0.0);
                // Never wider than what the instrument isolated.
                if let Some(reported_width) = reported.isolation_width {
                    if reported_width < width {
                        width = reported_width;
                    }
                }
                let center = match right_filter {
                    Some(right) => isolation_mz + right - width / 2.0,
                    None => isolation_mz,
                };
                IsolationWindowFilter::new(Some(center), Some(width))
            }
            ResolvedIsolationScheme::Windows {
                windows,
                has_targets,
            } => match self.find_scheme_window(windows, *has_targets, isolation_mz)? {
                Some(window) => {
                    let width = window.end - window.start;
                    IsolationWindowFilter::new(Some(window.start + width / 2.0), Some(width))
                }
                None => IsolationWindowFilter::unconstrained(),
            },
            ResolvedIsolationScheme::InstrumentOnly => match reported.isolation_width {
                Some(width) => IsolationWindowFilter::new(Some(isolation_mz), Some(width)),
                None => return Err(RequestError::MissingIsolationScheme { isolation_mz }),
            },
        };
        trace!(
            "Resolved isolation {:?} to {:?} using {:?}",
            reported,
            resolved,
            self.scheme
        );
        Ok(resolved)
    }

    fn find_scheme_window<'a>(
        &self,
        windows: &'a [IsolationWindow],
        has_targets: bool,
        isolation_mz: f64,
    ) -> Result<Option<&'a IsolationWindow>, RequestError> {
        let mut found: Option<&IsolationWindow> = None;
        for (window_index, window) in windows.iter().enumerate() {
            let matches = if has_targets {
                let target = window
                    .target
                    .ok_or(RequestError::MissingTargetValue { window_index })?;
                (isolation_mz - target).abs() <= self.mz_match_tolerance
                    && window.contains(isolation_mz)
            } else {
                window.contains(isolation_mz)
            };
            if !matches {
                continue;
            }
            if let Some(previous) = found {
                return Err(RequestError::AmbiguousIsolationWindow {
                    target: isolation_mz,
                    first_window: (previous.start, previous.end),
                    second_window: (window.start, window.end),
                });
            }
            found = Some(window);
        }
        Ok(found)
    }
}
