use super::{StreamToRelationOperator, Tick, WindowReport, WindowStats};
use crate::content::{Content, ContentFactory};
use crate::error::{ConfigError, Result};
use crate::naming::validate_name;
use crate::report::{Report, ReportContext, ReportGrain, ReportStrategy};
use crate::time::TimeInstant;
use crate::window_instance::{WindowInstance, WindowState};
use std::collections::BTreeMap;
use std::sync::Arc;

struct Slot<I, W, R> {
    state: WindowState,
    content: Box<dyn Content<I, W, R>>,
    last_report: Option<TimeInstant>,
}

/// CSPARQL Window implementation
///
/// Time-based hopping window: instances are `[origin + k*slide, origin +
/// k*slide + width)`. With `slide == width` the window tumbles, with
/// `slide < width` instances overlap.
pub struct CSPARQLWindow<I, W, R> {
    name: Arc<str>,
    width: i64,
    slide: i64,
    origin: i64,
    time: TimeInstant,
    active_windows: BTreeMap<WindowInstance, Slot<I, W, R>>,
    factory: Arc<dyn ContentFactory<I, W, R>>,
    report: Report,
    grain: ReportGrain,
    tick: Tick,
    last_mid_report: Option<TimeInstant>,
    stats: WindowStats,
}

impl<I, W, R> CSPARQLWindow<I, W, R>
where
    I: Clone + 'static,
    W: 'static,
    R: Clone + Send + 'static,
{
    pub fn new(
        name: impl Into<String>,
        width: i64,
        slide: i64,
        factory: Arc<dyn ContentFactory<I, W, R>>,
        report: Report,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        if width <= 0 {
            return Err(ConfigError::InvalidWidth {
                window: name,
                width,
            }
            .into());
        }
        if slide <= 0 {
            return Err(ConfigError::InvalidSlide {
                window: name,
                slide,
            }
            .into());
        }
        report.validate()?;

        Ok(Self {
            name: Arc::from(name),
            width,
            slide,
            origin: 0,
            time: TimeInstant::MIN,
            active_windows: BTreeMap::new(),
            factory,
            report,
            grain: ReportGrain::default(),
            tick: Tick::default(),
            last_mid_report: None,
            stats: WindowStats::default(),
        })
    }

    /// A window whose instances do not overlap.
    pub fn tumbling(
        name: impl Into<String>,
        width: i64,
        factory: Arc<dyn ContentFactory<I, W, R>>,
        report: Report,
    ) -> Result<Self> {
        Self::new(name, width, width, factory, report)
    }

    pub fn with_grain(mut self, grain: ReportGrain) -> Self {
        self.grain = grain;
        self
    }

    pub fn with_tick(mut self, tick: Tick) -> Self {
        self.tick = tick;
        self
    }

    /// Aligns instance boundaries to `origin` instead of 0.
    pub fn with_origin(mut self, origin: impl Into<TimeInstant>) -> Self {
        self.origin = origin.into().value();
        self
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn slide(&self) -> i64 {
        self.slide
    }

    /// Latest time this window has seen.
    pub fn time(&self) -> TimeInstant {
        self.time
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn active_window_count(&self) -> usize {
        self.active_windows.len()
    }

    /// Size of the content of `instance`, if it is live.
    pub fn content_size(&self, instance: &WindowInstance) -> Option<usize> {
        self.active_windows
            .get(instance)
            .map(|slot| slot.content.size())
    }

    pub fn state_of(&self, instance: &WindowInstance) -> Option<WindowState> {
        self.active_windows.get(instance).map(|slot| slot.state)
    }

    /// Opens every instance containing `t` that is not open yet.
    fn scope(&mut self, t: TimeInstant) {
        let relative = t.value().saturating_sub(self.origin);
        let last = relative.div_euclid(self.slide);
        let first = relative
            .saturating_sub(self.width)
            .div_euclid(self.slide)
            .saturating_add(1);

        for k in first..=last {
            let open = self.origin.saturating_add(k.saturating_mul(self.slide));
            let instance = WindowInstance::new(open, open.saturating_add(self.width));
            if instance.is_closed_at(self.time) {
                continue;
            }
            self.active_windows.entry(instance).or_insert_with(|| {
                log::debug!("Window {} opening {}", self.name, instance);
                Slot {
                    state: WindowState::Opening,
                    content: self.factory.create(),
                    last_report: None,
                }
            });
        }
    }

    /// Adds `element` to every live instance containing `t`. Returns whether
    /// any instance took it, and the instances whose content changed.
    fn route(&mut self, element: &I, t: TimeInstant) -> (bool, Vec<WindowInstance>) {
        let mut changed = Vec::new();
        let mut routed = false;
        for (instance, slot) in self.active_windows.iter_mut() {
            if !instance.contains(t) || !slot.state.accepts_elements() {
                continue;
            }
            let before = slot.content.size();
            slot.content.add(element.clone());
            slot.state = WindowState::Active;
            routed = true;
            log::trace!(
                "Window {} {} now has {} elements",
                self.name,
                instance,
                slot.content.size()
            );
            if slot.content.size() != before {
                changed.push(*instance);
            }
        }
        if routed {
            self.stats.elements_routed += 1;
        }
        (routed, changed)
    }

    /// Opens the instances `t` belongs to that have not closed yet and routes
    /// the element into them. `None` when every such instance is already
    /// closed: the element is late and dropped.
    fn accept(&mut self, element: &I, t: TimeInstant) -> Option<Vec<WindowInstance>> {
        self.scope(t);
        let (routed, changed) = self.route(element, t);
        if !routed {
            self.stats.late_drops += 1;
            log::warn!(
                "Window {} dropping late element at {} (time is {})",
                self.name,
                t,
                self.time
            );
            return None;
        }
        Some(changed)
    }

    /// Closes, reports and evicts every instance whose close boundary is at or
    /// before `now`.
    fn close_until(&mut self, now: TimeInstant) -> Vec<WindowReport<R>> {
        let mut closing: Vec<WindowInstance> = self
            .active_windows
            .keys()
            .filter(|instance| instance.is_closed_at(now))
            .copied()
            .collect();
        closing.sort_by_key(|instance| instance.close);

        let mut reports = Vec::new();
        for instance in closing {
            let Some(mut slot) = self.active_windows.remove(&instance) else {
                continue;
            };
            slot.state = WindowState::Closed;
            if self.report.reports_on_close() {
                log::debug!(
                    "Window {} {} triggers on close with {} elements",
                    self.name,
                    instance,
                    slot.content.size()
                );
                reports.push(WindowReport {
                    window: Arc::clone(&self.name),
                    instance,
                    relation: slot.content.coalesce(),
                    timestamp: instance.close,
                    trigger: ReportStrategy::OnWindowClose,
                });
            }
            slot.state = WindowState::Evicted;
            self.stats.instances_evicted += 1;
            log::debug!("Window {} evicting {}", self.name, instance);
        }
        reports
    }

    fn fire_mid_lifetime(
        &mut self,
        now: TimeInstant,
        element_arrived: bool,
        changed: &[WindowInstance],
    ) -> Vec<WindowReport<R>> {
        if self.tick == Tick::TimeDriven && self.last_mid_report.is_some_and(|last| last >= now) {
            return Vec::new();
        }

        let mut reports = Vec::new();
        for (instance, slot) in self.active_windows.iter_mut() {
            let ctx = ReportContext {
                instance,
                size: slot.content.size(),
                changed: changed.contains(instance),
                element_arrived,
                now,
                last_report: slot.last_report,
            };
            if let Some(trigger) = self.report.fire_mid_lifetime(&ctx) {
                slot.last_report = Some(now);
                reports.push(WindowReport {
                    window: Arc::clone(&self.name),
                    instance: *instance,
                    relation: slot.content.coalesce(),
                    timestamp: now,
                    trigger,
                });
            }
        }
        if !reports.is_empty() {
            self.last_mid_report = Some(now);
        }
        reports
    }

    fn apply_grain(&mut self, mut reports: Vec<WindowReport<R>>) -> Vec<WindowReport<R>> {
        reports.sort_by_key(|report| (report.timestamp, report.instance.close));
        if self.grain == ReportGrain::Single && reports.len() > 1 {
            if let Some(latest) = reports
                .iter()
                .enumerate()
                .max_by_key(|(_, report)| report.instance.close)
                .map(|(i, _)| i)
            {
                reports = vec![reports.swap_remove(latest)];
            }
        }
        self.stats.reports_emitted += reports.len() as u64;
        reports
    }
}

impl<I, W, R> StreamToRelationOperator<I, R> for CSPARQLWindow<I, W, R>
where
    I: Clone + 'static,
    W: 'static,
    R: Clone + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&mut self, element: &I, timestamp: TimeInstant) -> Vec<WindowReport<R>> {
        if timestamp < self.time {
            let Some(changed) = self.accept(element, timestamp) else {
                return Vec::new();
            };
            let now = self.time;
            let reports = self.fire_mid_lifetime(now, true, &changed);
            return self.apply_grain(reports);
        }

        let changed = self.accept(element, timestamp).unwrap_or_default();
        self.time = timestamp;

        let mut reports = self.close_until(timestamp);
        reports.extend(self.fire_mid_lifetime(timestamp, true, &changed));
        self.apply_grain(reports)
    }

    fn insert(&mut self, element: &I, timestamp: TimeInstant, now: TimeInstant) -> Vec<WindowReport<R>> {
        let mut reports = self.advance(now);
        let Some(changed) = self.accept(element, timestamp) else {
            return reports;
        };
        let now = self.time;
        let mid = self.fire_mid_lifetime(now, true, &changed);
        reports.extend(self.apply_grain(mid));
        reports
    }

    fn advance(&mut self, now: TimeInstant) -> Vec<WindowReport<R>> {
        if now <= self.time {
            return Vec::new();
        }
        self.time = now;
        let mut reports = self.close_until(now);
        reports.extend(self.fire_mid_lifetime(now, false, &[]));
        self.apply_grain(reports)
    }

    fn materialize(&self, t: TimeInstant) -> R {
        self.active_windows
            .iter()
            .filter(|(instance, _)| instance.contains(t))
            .min_by_key(|(instance, _)| instance.close)
            .map(|(_, slot)| slot.content.coalesce())
            .unwrap_or_else(|| self.factory.create_empty().coalesce())
    }

    fn active_window_ranges(&self) -> Vec<(TimeInstant, TimeInstant)> {
        self.active_windows
            .keys()
            .map(|instance| (instance.open, instance.close))
            .collect()
    }

    fn stats(&self) -> WindowStats {
        WindowStats {
            active_instances: self.active_windows.len(),
            ..self.stats
        }
    }
}
