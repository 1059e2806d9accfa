// Brightness engine
// Reads, normalizes and writes the backlight property of every RandR output

use crate::backend::{Atom, Connect, DisplayBackend, OutputPropertyInfo};
use crate::outputs::{OutputEnumerator, OutputRef};
use crate::property::{PropertyId, PropertyResolver};
use crate::session::{Session, SessionState};
use crate::{Error, Result};
use serde::Serialize;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pause after each write so the driver can apply the value.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_micros(200);

/// Declared bounds of an output's backlight property. Always `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PropertyRange {
    pub min: i32,
    pub max: i32,
}

impl PropertyRange {
    pub fn new(min: i32, max: i32) -> Option<Self> {
        (min < max).then_some(Self { min, max })
    }

    /// Accept only a bounded range described by exactly two values.
    pub fn from_info(info: &OutputPropertyInfo) -> Option<Self> {
        match info.valid_values.as_slice() {
            [min, max] if info.range => Self::new(*min, *max),
            _ => None,
        }
    }

    fn span(&self) -> f64 {
        self.max as f64 - self.min as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BrightnessReading {
    pub raw: i32,
    pub range: PropertyRange,
}

impl BrightnessReading {
    pub fn percentage(&self) -> f64 {
        percentage_of(self)
    }
}

/// `(raw - min) * 100 / (max - min)`, clamped into `[0, 100]`.
pub fn percentage_of(reading: &BrightnessReading) -> f64 {
    let range = reading.range;
    let offset = reading.raw as f64 - range.min as f64;
    (offset * 100.0 / range.span()).clamp(0.0, 100.0)
}

/// Inverse of `percentage_of`: `min + pct * (max - min) / 100`.
///
/// Rounds half away from zero, then clamps into `[min, max]`. NaN maps to `min`.
pub fn raw_for_percentage(range: PropertyRange, percentage: f64) -> i32 {
    if percentage.is_nan() {
        return range.min;
    }
    let raw = range.min as f64 + percentage * range.span() / 100.0;
    raw.round().clamp(range.min as f64, range.max as f64) as i32
}

/// A readable backlight on one output, and the property it was found under.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputBacklight {
    pub target: OutputRef,
    pub property: PropertyId,
    #[serde(skip)]
    pub atom: Atom,
    pub reading: BrightnessReading,
}

/// Read one output's backlight, trying `property` first and the legacy name second.
///
/// Fails with `PropertyUnavailable` when neither name yields a 32-bit integer
/// scalar, or when the value has no bounded two-value range.
pub fn read_output<B: DisplayBackend>(
    session: &mut Session<B>,
    target: OutputRef,
    property: PropertyId,
) -> Result<OutputBacklight> {
    session.require(SessionState::PropertyResolved, "read output")?;
    let resolved = PropertyResolver::resolve(session)?;
    let output = target.output;

    let mut attempts = vec![property];
    if property != PropertyId::LegacyStyle {
        attempts.push(PropertyId::LegacyStyle);
    }

    let mut found = None;
    for id in attempts {
        let Some(atom) = resolved.atom(id) else {
            continue;
        };
        match session.backend().get_output_property(output, atom) {
            Ok(reply) => match reply.as_integer_scalar() {
                Some(raw) => {
                    found = Some((id, atom, raw));
                    break;
                }
                None => debug!(
                    "Output {:#x}: {:?} is not a 32-bit integer (type {}, format {}, {} item(s))",
                    output, id, reply.type_, reply.format, reply.num_items
                ),
            },
            Err(e) if !e.is_fatal() => {
                debug!("Output {:#x}: reading {:?} failed: {}", output, id, e)
            }
            Err(e) => return Err(e),
        }
    }

    let (property, atom, raw) = found.ok_or_else(|| {
        Error::property_unavailable(output, "no 32-bit integer backlight value")
    })?;

    let info = session.backend().query_output_property(output, atom)?;
    let range = PropertyRange::from_info(&info).ok_or_else(|| {
        Error::property_unavailable(
            output,
            format!("range is not a bounded pair: {:?}", info.valid_values),
        )
    })?;

    Ok(OutputBacklight {
        target,
        property,
        atom,
        reading: BrightnessReading { raw, range },
    })
}

/// Write `percentage` to an output through the property it was read with.
///
/// Flushes and waits `settle_delay` before returning the raw value written.
pub fn apply_percentage<B: DisplayBackend>(
    session: &mut Session<B>,
    backlight: &OutputBacklight,
    percentage: f64,
    settle_delay: Duration,
) -> Result<i32> {
    session.require(SessionState::PropertyResolved, "write output")?;
    let raw = raw_for_percentage(backlight.reading.range, percentage);
    let output = backlight.target.output;

    session
        .backend()
        .change_output_property(output, backlight.atom, raw)?;
    session.backend().flush()?;
    if !settle_delay.is_zero() {
        thread::sleep(settle_delay);
    }

    debug!(
        "Output {:#x}: wrote {} via {:?} ({:.1}%)",
        output, raw, backlight.property, percentage
    );
    Ok(raw)
}

/// Last percentage computed by a full pass over all outputs.
///
/// The last output visited wins; values are not averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateBrightness {
    last: Option<f64>,
}

impl AggregateBrightness {
    pub fn get(&self) -> Option<f64> {
        self.last
    }

    fn record(&mut self, percentage: f64) {
        self.last = Some(percentage);
    }
}

/// What a probe pass found on one output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputReport {
    pub target: OutputRef,
    pub name: Option<String>,
    pub backlight: Option<OutputBacklight>,
    pub percentage: Option<f64>,
    pub skipped: Option<String>,
}

/// Entry point for control cycles. Every call opens its own session.
pub struct BrightnessEngine<C: Connect> {
    connector: C,
    settle_delay: Duration,
    aggregate: AggregateBrightness,
}

impl<C: Connect> BrightnessEngine<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            settle_delay: DEFAULT_SETTLE_DELAY,
            aggregate: AggregateBrightness::default(),
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Percentage from the most recent get or set pass.
    pub fn last_brightness(&self) -> Option<f64> {
        self.aggregate.get()
    }

    /// Open, check capability and resolve the session-wide property.
    fn begin_cycle(&self) -> Result<(Session<C::Backend>, PropertyId)> {
        let mut session = Session::open(&self.connector)?;
        session.check_capability()?;
        let resolved = PropertyResolver::require(&mut session)?;
        Ok((session, resolved.preferred()))
    }

    /// Brightness of the last output, in enumeration order, that has a usable backlight.
    ///
    /// Fails with `NoBacklightProperty` when no output has one.
    pub fn get_session_brightness(&mut self) -> Result<f64> {
        let (mut session, property) = self.begin_cycle()?;
        let mut walk = OutputEnumerator::walk(&mut session)?;
        let mut latest = None;

        while let Some(target) = walk.next_output(&mut session)? {
            match read_output(&mut session, target, property) {
                Ok(backlight) => latest = Some(backlight.reading.percentage()),
                Err(e) if !e.is_fatal() => debug!("Skipping: {}", e),
                Err(e) => return Err(e),
            }
        }
        session.close()?;

        let percentage = latest.ok_or(Error::NoBacklightProperty)?;
        self.aggregate.record(percentage);
        info!("Session brightness {:.1}%", percentage);
        Ok(percentage)
    }

    /// Apply `percentage` to every output with a usable backlight.
    ///
    /// Returns the number of outputs written. Fails with `NoBacklightProperty`
    /// when nothing could be written.
    pub fn set_session_brightness(&mut self, percentage: f64) -> Result<usize> {
        if !percentage.is_finite() {
            return Err(Error::InvalidBrightness(format!(
                "{} is not a finite percentage",
                percentage
            )));
        }

        let (mut session, property) = self.begin_cycle()?;
        let mut walk = OutputEnumerator::walk(&mut session)?;
        let mut written = 0;
        let mut latest = None;

        while let Some(target) = walk.next_output(&mut session)? {
            let backlight = match read_output(&mut session, target, property) {
                Ok(backlight) => backlight,
                Err(e) if !e.is_fatal() => {
                    debug!("Skipping: {}", e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match apply_percentage(&mut session, &backlight, percentage, self.settle_delay) {
                Ok(raw) => {
                    written += 1;
                    let applied = BrightnessReading {
                        raw,
                        range: backlight.reading.range,
                    };
                    latest = Some(applied.percentage());
                }
                Err(e) if !e.is_fatal() => warn!("Write skipped: {}", e),
                Err(e) => return Err(e),
            }
        }
        session.close()?;

        let percentage = latest.ok_or(Error::NoBacklightProperty)?;
        self.aggregate.record(percentage);
        info!("Set {} output(s) to {:.1}%", written, percentage);
        Ok(written)
    }

    /// Report every enumerated output, including the ones a get pass would skip.
    pub fn probe(&mut self) -> Result<Vec<OutputReport>> {
        let (mut session, property) = self.begin_cycle()?;
        let mut walk = OutputEnumerator::walk(&mut session)?;
        let mut reports = Vec::new();

        while let Some(target) = walk.next_output(&mut session)? {
            let name = OutputEnumerator::output_name(&mut session, target.output);
            let report = match read_output(&mut session, target, property) {
                Ok(backlight) => OutputReport {
                    target,
                    name,
                    percentage: Some(backlight.reading.percentage()),
                    backlight: Some(backlight),
                    skipped: None,
                },
                Err(e) if !e.is_fatal() => OutputReport {
                    target,
                    name,
                    backlight: None,
                    percentage: None,
                    skipped: Some(e.to_string()),
                },
                Err(e) => return Err(e),
            };
            reports.push(report);
        }
        session.close()?;

        if let Some(percentage) = reports.iter().rev().find_map(|r| r.percentage) {
            self.aggregate.record(percentage);
        }
        Ok(reports)
    }
}
