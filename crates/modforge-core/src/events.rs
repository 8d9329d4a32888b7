use std::collections::{HashMap, VecDeque};

use glam::Vec3;

/// Notifications raised by the editor and the game session.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Selection changed. `None` means the selection was cleared.
    ObjectSelected { name: Option<String> },
    ObjectTransformed { name: String, position: Vec3 },
    LevelLoaded { id: String, objects: usize },
    LevelSaved { id: String, path: String },
    /// A vehicle tagged `player` took control.
    VehiclePossessed { name: String },
    ObjectDestroyed { name: String },
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::ObjectSelected { .. } => "object_selected",
            Event::ObjectTransformed { .. } => "object_transformed",
            Event::LevelLoaded { .. } => "level_loaded",
            Event::LevelSaved { .. } => "level_saved",
            Event::VehiclePossessed { .. } => "vehicle_possessed",
            Event::ObjectDestroyed { .. } => "object_destroyed",
        }
    }
}

/// An event stamped with the bus clock when it was emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub event: Event,
    pub timestamp: f64,
}

type Listener = Box<dyn Fn(&Event) + Send + Sync>;

/// Event bus with deferred delivery and a ring buffer of recent events.
pub struct EventBus {
    /// Listeners keyed by event type. Each listener gets an ID.
    listeners: HashMap<&'static str, Vec<(u64, Listener)>>,
    next_listener_id: u64,
    log: VecDeque<LoggedEvent>,
    log_capacity: usize,
    total_time: f64,
    pending: Vec<LoggedEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBus {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            listeners: HashMap::new(),
            next_listener_id: 0,
            log: VecDeque::with_capacity(log_capacity),
            log_capacity,
            total_time: 0.0,
            pending: Vec::new(),
        }
    }

    /// Queue an event for the next flush.
    pub fn emit(&mut self, event: Event) {
        tracing::debug!("event {}: {:?}", event.event_type(), event);
        self.pending.push(LoggedEvent {
            event,
            timestamp: self.total_time,
        });
    }

    /// Register a listener for an event type. Returns a listener ID for removal.
    pub fn listen<F>(&mut self, event_type: &'static str, callback: F) -> u64
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners
            .entry(event_type)
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    pub fn remove_listener(&mut self, listener_id: u64) {
        for listeners in self.listeners.values_mut() {
            listeners.retain(|(id, _)| *id != listener_id);
        }
    }

    /// Deliver pending events to listeners and the log. Returns what was delivered.
    pub fn flush(&mut self) -> Vec<Event> {
        let pending: Vec<LoggedEvent> = self.pending.drain(..).collect();
        let mut delivered = Vec::with_capacity(pending.len());

        for logged in pending {
            if let Some(listeners) = self.listeners.get(logged.event.event_type()) {
                for (_, callback) in listeners {
                    callback(&logged.event);
                }
            }

            if self.log_capacity > 0 {
                if self.log.len() >= self.log_capacity {
                    self.log.pop_front();
                }
                self.log.push_back(logged.clone());
            }
            delivered.push(logged.event);
        }

        delivered
    }

    /// Advance the clock used to stamp events.
    pub fn advance(&mut self, dt: f64) {
        self.total_time += dt;
    }

    pub fn get_log(&self) -> &VecDeque<LoggedEvent> {
        &self.log
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_emit_and_flush() {
        let mut bus = EventBus::new(100);
        let received = Arc::new(Mutex::new(Vec::new()));

        let recv_clone = received.clone();
        bus.listen("level_loaded", move |event| {
            recv_clone.lock().unwrap().push(event.clone());
        });

        bus.emit(Event::LevelLoaded {
            id: "arena".to_string(),
            objects: 3,
        });
        bus.emit(Event::ObjectSelected { name: None });
        assert_eq!(bus.pending_count(), 2);
        let delivered = bus.flush();

        assert_eq!(delivered.len(), 2);
        let events = received.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            Event::LevelLoaded {
                id: "arena".to_string(),
                objects: 3
            }
        );
    }

    #[test]
    fn test_ring_buffer_capacity() {
        let mut bus = EventBus::new(3);
        for i in 0..5 {
            bus.advance(1.0);
            bus.emit(Event::ObjectDestroyed {
                name: format!("n{}", i),
            });
        }
        bus.flush();

        assert_eq!(bus.get_log().len(), 3);
        // Oldest dropped.
        assert_eq!(
            bus.get_log()[0].event,
            Event::ObjectDestroyed {
                name: "n2".to_string()
            }
        );
        assert_eq!(bus.get_log()[0].timestamp, 3.0);
    }

    #[test]
    fn test_remove_listener() {
        let mut bus = EventBus::new(100);
        let received = Arc::new(Mutex::new(0));

        let recv_clone = received.clone();
        let id = bus.listen("vehicle_possessed", move |_| {
            *recv_clone.lock().unwrap() += 1;
        });

        let event = Event::VehiclePossessed {
            name: "buggy".to_string(),
        };
        bus.emit(event.clone());
        bus.flush();
        assert_eq!(*received.lock().unwrap(), 1);

        bus.remove_listener(id);
        bus.emit(event);
        bus.flush();
        assert_eq!(*received.lock().unwrap(), 1);
    }
}
