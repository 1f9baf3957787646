pub mod room;
pub mod source;

pub use room::{
    aggregate, most_disregarded, most_touched, overwiped_hotspots, AggregateKind, RankedCell,
    RoomAggregate, RoomQuery,
};
pub use source::{MemoryGridSource, SessionGridSource, StoredGrid};
