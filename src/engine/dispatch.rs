//! Dispatch router: wire message to control, first match wins
//!
//! Identity is `(status, data1)`; the payload never takes part. Lookup order:
//! 1. unbanked buttons (Play, Stop, Record, Set, MarkerLeft, MarkerRight,
//!    Cycle, then the optional tap pad)
//! 2. transport buttons in the bank selected by Cycle
//! 3. per strip: slider, knob, solo, mute in the bank selected by the strip's
//!    Rec, then Rec itself (which is never banked)

use tracing::{debug, trace};

use crate::midi::WireMessage;
use crate::registry::{ControlDescriptor, ControlKind, Registry};

/// Find the control a message refers to under the current shift state
pub fn resolve(registry: &Registry, status: u8, data1: u8) -> Option<&ControlDescriptor> {
    if let Some(found) = registry
        .singletons()
        .find(|descriptor| descriptor.id.matches(status, data1))
    {
        return Some(found);
    }

    let transport = registry.active_transport();
    if let Some(found) = [
        &transport.track_left,
        &transport.track_right,
        &transport.rewind,
        &transport.forward,
    ]
    .into_iter()
    .find(|descriptor| descriptor.id.matches(status, data1))
    {
        return Some(found);
    }

    registry.strips.iter().find_map(|strip| {
        let bank = strip.active_bank();
        [&bank.slider, &bank.knob, &bank.solo, &bank.mute, &strip.rec]
            .into_iter()
            .find(|descriptor| descriptor.id.matches(status, data1))
    })
}

impl super::Engine {
    /// Hardware input entry point
    ///
    /// Unknown identities are dropped silently.
    pub fn dispatch(&self, status: u8, data1: u8, data2: u8) {
        let Some(descriptor) = resolve(&self.registry, status, data1) else {
            trace!("No control for {}", WireMessage::new(status, data1, data2));
            return;
        };
        debug!("{} <- {}", descriptor.label, data2);

        match descriptor.kind {
            ControlKind::Slider { strip, bank } => {
                self.on_slider(crate::registry::mixer_channel(strip, bank) as usize, data2)
            }
            ControlKind::Knob { strip, bank } => {
                self.on_knob(crate::registry::mixer_channel(strip, bank) as usize, data2)
            }
            ControlKind::Toggle(action) => self.on_toggle(descriptor, action, data2),
            ControlKind::Momentary(action) => self.on_momentary(action, data2),
        }
    }

    /// Dispatch a raw message; anything shorter than three bytes is ignored
    pub fn dispatch_bytes(&self, data: &[u8]) {
        if let Some(message) = WireMessage::from_bytes(data) {
            self.dispatch(message.status, message.data1, message.data2);
        }
    }
}
