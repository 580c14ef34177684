pub mod audit_logs;
pub mod competition_attempts;
pub mod custom_designs;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod site_events;
pub mod user_profiles;
pub mod users;
pub mod winning_codes;

pub use audit_logs::Entity as AuditLogs;
pub use competition_attempts::Entity as CompetitionAttempts;
pub use custom_designs::Entity as CustomDesigns;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use site_events::Entity as SiteEvents;
pub use user_profiles::Entity as UserProfiles;
pub use users::Entity as Users;
pub use winning_codes::Entity as WinningCodes;
