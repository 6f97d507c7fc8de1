pub mod engagement;
pub mod statistic;

pub use engagement::Entity as EngagementEntity;
pub use statistic::Entity as StatisticEntity;
