pub mod add_controller;
pub mod list_collections_controller;
pub mod read_controller;
pub mod remove_controller;
pub mod stats_controller;

pub use add_controller::AddController;
pub use list_collections_controller::ListCollectionsController;
pub use read_controller::ReadController;
pub use remove_controller::RemoveController;
pub use stats_controller::StatsController;
