use crate::{
    control::{ControlId, ControlRegistry, Notification},
    error::Result,
};

/*
Parameter Change Channel
========================

UI edits travel one way: from the control thread into the engine's next
processing block.

  UI thread                         audio thread
  ---------                         ------------
  ParamSender::send(name, v)  ──→   ParamReceiver::drain(|change| ...)
     │                                    │
     ├─ clamp + store in the cell         ├─ skip if generation unchanged
     ├─ mark the control dirty            ├─ take each dirty flag (id order)
     └─ bump the registry generation      └─ report the value current NOW

There is no queue of edits. Each control carries a single dirty flag and the
value cell itself, so several edits between two blocks collapse into one
change carrying the last value written. The UI is not realtime; losing
intermediate slider positions is fine.

Nothing on the audio side allocates or waits:
  - an idle block costs one atomic load (the generation counter)
  - a busy block costs one atomic swap per control

Silent writes (Notification::Silent) store the value but never reach the
receiver. The engine still reads the new base value on its next block; it just
doesn't rerun anything that depends on "this control changed".
*/

/// A committed edit as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamChange {
    pub id: ControlId,
    pub value: f32,
}

/// Control-thread end of the channel.
pub struct ParamSender {
    registry: ControlRegistry,
}

/// Audio-thread end of the channel.
pub struct ParamReceiver {
    registry: ControlRegistry,
    seen_generation: u64,
}

/// Create the two ends of a parameter change channel over `registry`.
pub fn channel(registry: &ControlRegistry) -> (ParamSender, ParamReceiver) {
    (
        ParamSender {
            registry: registry.clone(),
        },
        ParamReceiver {
            registry: registry.clone(),
            seen_generation: registry.generation(),
        },
    )
}

impl ParamSender {
    /// Forward a UI edit. Returns the clamped value that was stored.
    pub fn send(&mut self, name: &str, value: f32, notification: Notification) -> Result<f32> {
        self.registry.set(name, value, notification)
    }

    pub fn send_id(&mut self, id: ControlId, value: f32, notification: Notification) -> f32 {
        self.registry.set_by_id(id, value, notification)
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }
}

impl ParamReceiver {
    /// Hand every control changed since the last drain to `apply`, in id order.
    ///
    /// Returns the number of changes delivered.
    pub fn drain(&mut self, mut apply: impl FnMut(ParamChange)) -> usize {
        let generation = self.registry.generation();
        if generation == self.seen_generation {
            return 0;
        }
        // Record the generation before taking flags: a write racing with the
        // scan bumps it again and is picked up next block.
        self.seen_generation = generation;

        let mut delivered = 0;
        for (id, control) in self.registry.iter() {
            if control.take_dirty() {
                apply(ParamChange {
                    id,
                    value: control.value(),
                });
                delivered += 1;
            }
        }
        delivered
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }
}
