mod list;
mod resources;
mod stats;

pub use list::{ListView, Resource, SortSpec, ViewOutcome, PAGE_SIZES};
pub use stats::StatisticsView;

use crate::models::{AdminUser, Pharmacy};

pub type UsersView = ListView<AdminUser>;
pub type PharmaciesView = ListView<Pharmacy>;
