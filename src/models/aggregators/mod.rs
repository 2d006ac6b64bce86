pub mod group_points;

pub use group_points::ChromatogramGroupPoints;
pub use group_points::ChromatogramPoint;
pub use group_points::GroupPointsAggregator;
