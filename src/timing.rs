//! Gate-delay scheduling of visual signal changes.
//!
//! The propagation engine settles a circuit instantly; this module spreads the resulting wire changes out over time so that a renderer can
//! play them back. Time is in milliseconds and is owned by the caller, who drives [`PropagationScheduler::process_events`] from its own
//! clock at whatever resolution it likes.

use slotmap::SecondaryMap;

use crate::simulation::{Circuit, GateKey, GateKind, LogicValue, PinKey, SettleReport, WireKey};

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum DelayMode {
    #[default]
    Instant,
    /// The same delay for every gate kind.
    Smooth,
    /// Delays proportional to typical propagation delays of real gates.
    Realistic,
}

impl DelayMode {
    pub fn name(self) -> &'static str {
        match self {
            DelayMode::Instant => "instant",
            DelayMode::Smooth => "smooth",
            DelayMode::Realistic => "realistic",
        }
    }

    pub fn parse(name: &str) -> Option<DelayMode> {
        [DelayMode::Instant, DelayMode::Smooth, DelayMode::Realistic].into_iter().find(|m| m.name() == name.to_ascii_lowercase())
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TimingConfig {
    pub mode: DelayMode,
    /// Delay in milliseconds used for every gate in smooth mode.
    pub smooth_mode_delay: f64,
    /// Multiplier taking nanoseconds of real gate delay to nanoseconds of playback.
    pub realistic_scale_factor: f64,
    speed: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { mode: DelayMode::default(), smooth_mode_delay: 300.0, realistic_scale_factor: 50_000_000.0, speed: 1.0 }
    }
}

impl TimingConfig {
    pub fn new(mode: DelayMode, smooth_mode_delay: f64, realistic_scale_factor: f64, speed: f64) -> Self {
        Self { mode, smooth_mode_delay, realistic_scale_factor, speed: clamp_speed(speed) }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Sets the playback speed multiplier, clamped to `MIN_SPEED..=MAX_SPEED`.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = clamp_speed(speed);
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.set_speed(speed);
        self
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        1.0
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

/// Typical propagation delay of a gate kind in nanoseconds.
pub fn typical_delay_nanoseconds(kind: GateKind) -> f64 {
    match kind {
        GateKind::Not => 8.0,
        GateKind::Buffer => 10.0,
        GateKind::Nand | GateKind::Nor => 12.0,
        GateKind::And | GateKind::Or => 15.0,
        GateKind::Xor | GateKind::Xnor => 22.0,
    }
}

/// Milliseconds a change takes to pass through a gate of the given kind.
pub fn calculate_delay(kind: GateKind, mode: DelayMode, config: &TimingConfig) -> f64 {
    match mode {
        DelayMode::Instant => 0.0,
        DelayMode::Smooth => config.smooth_mode_delay * config.speed,
        DelayMode::Realistic => (typical_delay_nanoseconds(kind) * config.realistic_scale_factor / 1_000_000.0) * config.speed,
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, PartialOrd, Ord)]
pub struct EventId(u64);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EventTarget {
    Wire(WireKey),
    Pin(PinKey),
}

#[derive(Clone, PartialEq, Debug)]
pub struct PropagationEvent {
    id: EventId,
    pub target: EventTarget,
    pub level: LogicValue,
    pub previous: LogicValue,
    pub scheduled_time: f64,
    pub animation_duration: f64,
    pub source_gate: Option<GateKey>,
    pub gate_kind: Option<GateKind>,
    completed: bool,
}

impl PropagationEvent {
    pub fn new(target: EventTarget, previous: LogicValue, level: LogicValue, scheduled_time: f64) -> Self {
        Self { id: EventId(0), target, level, previous, scheduled_time, animation_duration: 0.0, source_gate: None, gate_kind: None, completed: false }
    }

    pub fn with_source(mut self, gate: GateKey, kind: GateKind) -> Self {
        self.source_gate = Some(gate);
        self.gate_kind = Some(kind);
        self
    }

    pub fn with_animation_duration(mut self, duration: f64) -> Self {
        self.animation_duration = duration;
        self
    }

    /// Assigned by the scheduler when the event is scheduled.
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Pending events in delivery order, plus everything already delivered.
#[derive(Clone, Debug, Default)]
pub struct PropagationScheduler {
    pending: Vec<PropagationEvent>,
    history: Vec<PropagationEvent>,
    current_time: f64,
    next_id: u64,
}

impl PropagationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an event and returns its id.
    ///
    /// An event whose time is at or before the latest processed time (or is not a finite number) is immediately due: the next
    /// [`PropagationScheduler::process_events`] call delivers it.
    pub fn schedule_event(&mut self, mut event: PropagationEvent) -> EventId {
        if !event.scheduled_time.is_finite() {
            event.scheduled_time = self.current_time;
        }
        event.id = EventId(self.next_id);
        event.completed = false;
        self.next_id += 1;

        // after every event with an equal or earlier time so that ties keep insertion order
        let at = self.pending.partition_point(|e| e.scheduled_time <= event.scheduled_time);
        let id = event.id;
        tracing::trace!(id = id.0, time = event.scheduled_time, "scheduled propagation event");
        self.pending.insert(at, event);
        id
    }

    /// Removes and returns every pending event due at `current_time`, earliest first.
    ///
    /// Delivered events move to the history and are never returned again. Calling with a time earlier than a previous call still delivers
    /// events already in the past, but nothing is delivered twice.
    pub fn process_events(&mut self, current_time: f64) -> Vec<PropagationEvent> {
        if current_time > self.current_time {
            self.current_time = current_time;
        }
        let due_count = self.pending.partition_point(|e| e.scheduled_time <= self.current_time);
        let due: Vec<PropagationEvent> = self
            .pending
            .drain(..due_count)
            .map(|mut e| {
                e.completed = true;
                e
            })
            .collect();

        if !due.is_empty() {
            tracing::trace!(count = due.len(), time = self.current_time, "delivering propagation events");
        }
        self.history.extend(due.iter().cloned());
        due
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops every pending event and the history.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.history.clear();
        self.current_time = 0.0;
    }

    pub fn pending(&self) -> &[PropagationEvent] {
        &self.pending
    }
    pub fn history(&self) -> &[PropagationEvent] {
        &self.history
    }
    pub fn current_time(&self) -> f64 {
        self.current_time
    }
}

/// Turns the wire changes of a settle into events, delayed by the gates they passed through. Returns how many events were scheduled.
///
/// A wire driven by a gate arrives at that gate's delay plus the latest arrival among the changed wires feeding the gate; wires driven only
/// by sources change at `now`. Each input pin the wire feeds gets its own event at the same time, from the pin's level before the settle;
/// pins that ended where they started get none. Instant mode schedules nothing since there is nothing to play back.
pub fn schedule_settle(scheduler: &mut PropagationScheduler, circuit: &Circuit, report: &SettleReport, now: f64, config: &TimingConfig) -> usize {
    if config.mode == DelayMode::Instant {
        return 0;
    }

    let mut changes = report.changed_wires.clone();
    changes.sort_by_key(|c| c.pass);
    let changed: SecondaryMap<WireKey, Option<GateKey>> = changes.iter().map(|c| (c.wire, c.source_gate)).collect();

    let mut arrival = Arrival { circuit, config, now, changed: &changed, times: SecondaryMap::new() };
    let mut scheduled = 0;
    for change in &changes {
        let time = arrival.time(change.wire);
        let source = change.source_gate.and_then(|gk| circuit.gate(gk).map(|g| (gk, g.kind())));
        let duration = source.map_or(0.0, |(_, kind)| calculate_delay(kind, config.mode, config));

        let mut event = PropagationEvent::new(EventTarget::Wire(change.wire), change.previous, change.level, time).with_animation_duration(duration);
        if let Some((gk, kind)) = source {
            event = event.with_source(gk, kind);
        }
        scheduler.schedule_event(event);
        scheduled += 1;

        let Some(wire) = circuit.wire(change.wire) else { continue };
        for pin in wire.destinations() {
            let Some(pin_change) = report.changed_pin(*pin) else { continue };
            let mut event = PropagationEvent::new(EventTarget::Pin(*pin), pin_change.previous, pin_change.level, time).with_animation_duration(duration);
            if let Some((gk, kind)) = source {
                event = event.with_source(gk, kind);
            }
            scheduler.schedule_event(event);
            scheduled += 1;
        }
    }

    tracing::debug!(scheduled, mode = config.mode.name(), "scheduled settle playback");
    scheduled
}

/// Arrival times of changed wires, filled in on demand.
struct Arrival<'a> {
    circuit: &'a Circuit,
    config: &'a TimingConfig,
    now: f64,
    changed: &'a SecondaryMap<WireKey, Option<GateKey>>,
    times: SecondaryMap<WireKey, f64>,
}

impl Arrival<'_> {
    fn time(&mut self, wire: WireKey) -> f64 {
        if let Some(time) = self.times.get(wire) {
            return *time;
        }
        // a wire on a feedback loop counts as arriving at `now` while its own time is being worked out
        self.times.insert(wire, self.now);

        let gate = self.changed.get(wire).copied().flatten().and_then(|gk| self.circuit.gate(gk));
        let time = match gate {
            Some(gate) => {
                let feeding: Vec<WireKey> =
                    gate.inputs().iter().filter_map(|p| self.circuit.incoming_wire(*p)).filter(|wk| self.changed.contains_key(*wk)).collect();
                let now = self.now;
                let latest_input = feeding.into_iter().map(|wk| self.time(wk)).fold(now, f64::max);
                latest_input + calculate_delay(gate.kind(), self.config.mode, self.config)
            }
            None => self.now,
        };
        self.times.insert(wire, time);
        time
    }
}
