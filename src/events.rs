use std::fmt;

/// Notifications fanned out by the catalog after a mutation has landed, so
/// subscribers always observe post-mutation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEvent {
    CommodityAdded { id: i64 },
    CommodityRemoved { id: i64 },
    ImageAdded { id: i64 },
    ImageRemoved { id: i64 },
    PositionChanged { id: i64, position: i64 },
    FileUpdated { image_id: i64 },
}

impl CatalogEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogEvent::CommodityAdded { .. } => "commodity_added",
            CatalogEvent::CommodityRemoved { .. } => "commodity_removed",
            CatalogEvent::ImageAdded { .. } => "image_added",
            CatalogEvent::ImageRemoved { .. } => "image_removed",
            CatalogEvent::PositionChanged { .. } => "position_changed",
            CatalogEvent::FileUpdated { .. } => "file_updated",
        }
    }
}

impl fmt::Display for CatalogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogEvent::CommodityAdded { id }
            | CatalogEvent::CommodityRemoved { id }
            | CatalogEvent::ImageAdded { id }
            | CatalogEvent::ImageRemoved { id } => write!(f, "{} id={}", self.kind(), id),
            CatalogEvent::PositionChanged { id, position } => {
                write!(f, "{} id={} position={}", self.kind(), id, position)
            }
            CatalogEvent::FileUpdated { image_id } => {
                write!(f, "{} image={}", self.kind(), image_id)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

type Callback = Box<dyn FnMut(&CatalogEvent)>;

/// Explicit subscription registry. Subscribers fire in registration order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<(SubscriberId, Callback)>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&CatalogEvent) + 'static) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    pub fn emit(&mut self, event: &CatalogEvent) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
