pub mod category;
pub mod event;
pub mod event_archive;
pub mod like;
pub mod notification_log;
pub mod notification_log_archive;
pub mod order;
pub mod product;
pub mod product_category;
pub mod product_stats_daily;
pub mod product_variant;
pub mod review;
pub mod store;
pub mod store_stats_daily;

pub use category::Entity as CategoryEntity;
pub use event::Entity as EventEntity;
pub use event_archive::Entity as EventArchiveEntity;
pub use like::Entity as LikeEntity;
pub use notification_log::Entity as NotificationLogEntity;
pub use notification_log_archive::Entity as NotificationLogArchiveEntity;
pub use order::Entity as OrderEntity;
pub use product::Entity as ProductEntity;
pub use product_category::Entity as ProductCategoryEntity;
pub use product_stats_daily::Entity as ProductStatsDailyEntity;
pub use product_variant::Entity as ProductVariantEntity;
pub use review::Entity as ReviewEntity;
pub use store::Entity as StoreEntity;
pub use store_stats_daily::Entity as StoreStatsDailyEntity;
