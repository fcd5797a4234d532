//! Control registry - static binding of wire identities to controls
//!
//! Built once at startup from the [`SurfaceLayout`]. Each strip exists in two
//! banks that share the same wire identities; which one a message refers to
//! is decided at dispatch time from the strip's Rec toggle. The same holds
//! for the four transport buttons banked by Cycle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SurfaceLayout;
use crate::midi::{WireMessage, LED_OFF_VALUE, LED_ON_VALUE};

/// Number of channel strips on the surface
pub const STRIP_COUNT: usize = 8;

/// Banks per shift axis (Rec per strip, Cycle for transport)
pub const BANK_COUNT: usize = 2;

/// Mixer channels addressed by the strips across both banks
pub const MIXER_CHANNELS: usize = STRIP_COUNT * BANK_COUNT;

/// Mixer (MIDI) channel driven by `strip` in `bank`
pub const fn mixer_channel(strip: u8, bank: u8) -> u8 {
    bank * STRIP_COUNT as u8 + strip
}

/// Identity of a physical control: status and first data byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId {
    pub status: u8,
    pub data1: u8,
}

impl ControlId {
    pub const fn new(status: u8, data1: u8) -> Self {
        Self { status, data1 }
    }

    pub fn matches(&self, status: u8, data1: u8) -> bool {
        self.status == status && self.data1 == data1
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.status, self.data1)
    }
}

/// Handler bound to a toggle button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    Solo { strip: u8, bank: u8 },
    Mute { strip: u8, bank: u8 },
    /// Per-strip bank shift
    Rec { strip: u8 },
    /// Transport bank shift
    Cycle,
}

/// Handler bound to a momentary button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentaryAction {
    Play,
    Stop,
    Record,
    Set,
    MarkerLeft,
    MarkerRight,
    Tap,
    TrackLeft { bank: u8 },
    TrackRight { bank: u8 },
    Rewind { bank: u8 },
    Forward { bank: u8 },
}

/// What a control is and which handler it drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Slider { strip: u8, bank: u8 },
    Knob { strip: u8, bank: u8 },
    Toggle(ToggleAction),
    Momentary(MomentaryAction),
}

impl ControlKind {
    pub fn is_button(&self) -> bool {
        matches!(self, ControlKind::Toggle(_) | ControlKind::Momentary(_))
    }
}

/// One logical control
#[derive(Debug)]
pub struct ControlDescriptor {
    pub label: String,
    pub id: ControlId,
    pub kind: ControlKind,
    /// Toggle state; unused by other kinds
    state: AtomicBool,
}

impl ControlDescriptor {
    pub fn new(label: impl Into<String>, id: ControlId, kind: ControlKind) -> Self {
        Self {
            label: label.into(),
            id,
            kind,
            state: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> bool {
        self.state.load(Ordering::Acquire)
    }

    /// Store a toggle state, returning the previous one
    pub fn set_state(&self, on: bool) -> bool {
        self.state.swap(on, Ordering::AcqRel)
    }

    /// Bank selected by this control when used as a shift key
    pub fn bank(&self) -> usize {
        self.state() as usize
    }

    /// LED message for the given state; `None` for sliders and knobs
    pub fn led_message(&self, on: bool) -> Option<WireMessage> {
        if !self.kind.is_button() {
            return None;
        }
        let value = if on { LED_ON_VALUE } else { LED_OFF_VALUE };
        Some(WireMessage::new(self.id.status, self.id.data1, value))
    }
}

/// Continuous controls and channel buttons of one strip in one bank
#[derive(Debug)]
pub struct StripBank {
    pub slider: ControlDescriptor,
    pub knob: ControlDescriptor,
    pub solo: ControlDescriptor,
    pub mute: ControlDescriptor,
}

/// One channel strip
#[derive(Debug)]
pub struct Strip {
    /// Bank shift for this strip; lives outside the banks it selects
    pub rec: ControlDescriptor,
    pub banks: [StripBank; BANK_COUNT],
}

impl Strip {
    /// Bank currently selected by Rec
    pub fn active_bank(&self) -> &StripBank {
        &self.banks[self.rec.bank()]
    }
}

/// Transport buttons whose meaning follows Cycle
#[derive(Debug)]
pub struct TransportBank {
    pub track_left: ControlDescriptor,
    pub track_right: ControlDescriptor,
    pub rewind: ControlDescriptor,
    pub forward: ControlDescriptor,
}

/// Every control on the surface
#[derive(Debug)]
pub struct Registry {
    pub play: ControlDescriptor,
    pub stop: ControlDescriptor,
    pub record: ControlDescriptor,
    pub set: ControlDescriptor,
    pub marker_left: ControlDescriptor,
    pub marker_right: ControlDescriptor,
    pub cycle: ControlDescriptor,
    pub tap: Option<ControlDescriptor>,
    pub transport: [TransportBank; BANK_COUNT],
    pub strips: [Strip; STRIP_COUNT],
}

impl Registry {
    /// Build the full control table; deterministic for a given layout
    pub fn build(layout: &SurfaceLayout) -> Self {
        let id = |data1: u8| ControlId::new(layout.status, data1);
        let momentary = |label: &str, data1: u8, action: MomentaryAction| {
            ControlDescriptor::new(label, id(data1), ControlKind::Momentary(action))
        };

        let transport = std::array::from_fn(|b| {
            let bank = b as u8;
            TransportBank {
                track_left: momentary(
                    &format!("TrackLeft/{}", bank),
                    layout.track_left,
                    MomentaryAction::TrackLeft { bank },
                ),
                track_right: momentary(
                    &format!("TrackRight/{}", bank),
                    layout.track_right,
                    MomentaryAction::TrackRight { bank },
                ),
                rewind: momentary(
                    &format!("Rewind/{}", bank),
                    layout.rewind,
                    MomentaryAction::Rewind { bank },
                ),
                forward: momentary(
                    &format!("Forward/{}", bank),
                    layout.forward,
                    MomentaryAction::Forward { bank },
                ),
            }
        });

        let strips = std::array::from_fn(|s| {
            let strip = s as u8;
            let banks = std::array::from_fn(|b| {
                let bank = b as u8;
                let label = |name: &str| format!("{} {}/{}", name, strip + 1, bank);
                StripBank {
                    slider: ControlDescriptor::new(
                        label("Slider"),
                        id(layout.slider_base.wrapping_add(strip)),
                        ControlKind::Slider { strip, bank },
                    ),
                    knob: ControlDescriptor::new(
                        label("Knob"),
                        id(layout.knob_base.wrapping_add(strip)),
                        ControlKind::Knob { strip, bank },
                    ),
                    solo: ControlDescriptor::new(
                        label("Solo"),
                        id(layout.solo_base.wrapping_add(strip)),
                        ControlKind::Toggle(ToggleAction::Solo { strip, bank }),
                    ),
                    mute: ControlDescriptor::new(
                        label("Mute"),
                        id(layout.mute_base.wrapping_add(strip)),
                        ControlKind::Toggle(ToggleAction::Mute { strip, bank }),
                    ),
                }
            });
            Strip {
                rec: ControlDescriptor::new(
                    format!("Rec {}", strip + 1),
                    id(layout.rec_base.wrapping_add(strip)),
                    ControlKind::Toggle(ToggleAction::Rec { strip }),
                ),
                banks,
            }
        });

        Self {
            play: momentary("Play", layout.play, MomentaryAction::Play),
            stop: momentary("Stop", layout.stop, MomentaryAction::Stop),
            record: momentary("Record", layout.record, MomentaryAction::Record),
            set: momentary("Set", layout.set, MomentaryAction::Set),
            marker_left: momentary("MarkerLeft", layout.marker_left, MomentaryAction::MarkerLeft),
            marker_right: momentary("MarkerRight", layout.marker_right, MomentaryAction::MarkerRight),
            cycle: ControlDescriptor::new(
                "Cycle",
                id(layout.cycle),
                ControlKind::Toggle(ToggleAction::Cycle),
            ),
            tap: layout
                .tap_pad
                .map(|data1| momentary("Tap", data1, MomentaryAction::Tap)),
            transport,
            strips,
        }
    }

    /// Unbanked buttons in dispatch priority order
    pub fn singletons(&self) -> impl Iterator<Item = &ControlDescriptor> {
        [
            &self.play,
            &self.stop,
            &self.record,
            &self.set,
            &self.marker_left,
            &self.marker_right,
            &self.cycle,
        ]
        .into_iter()
        .chain(self.tap.as_ref())
    }

    /// Transport bank currently selected by Cycle
    pub fn active_transport(&self) -> &TransportBank {
        &self.transport[self.cycle.bank()]
    }

    pub fn strip(&self, strip: u8) -> Option<&Strip> {
        self.strips.get(strip as usize)
    }

    /// Solo button driving a mixer channel
    pub fn solo_for_channel(&self, channel: usize) -> Option<&ControlDescriptor> {
        let strip = self.strips.get(channel % STRIP_COUNT)?;
        Some(&strip.banks.get(channel / STRIP_COUNT)?.solo)
    }

    /// Every descriptor, banked ones included
    pub fn iter(&self) -> impl Iterator<Item = &ControlDescriptor> {
        let transport = self.transport.iter().flat_map(|bank| {
            [&bank.track_left, &bank.track_right, &bank.rewind, &bank.forward]
        });
        let strips = self.strips.iter().flat_map(|strip| {
            std::iter::once(&strip.rec).chain(strip.banks.iter().flat_map(|bank| {
                [&bank.slider, &bank.knob, &bank.solo, &bank.mute]
            }))
        });
        self.singletons().chain(transport).chain(strips)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
