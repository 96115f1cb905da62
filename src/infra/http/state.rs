use std::sync::Arc;

use crate::application::dashboard::DashboardService;
use crate::application::projects::ProjectService;
use crate::application::repos::StoreHealth;
use crate::application::tasks::TaskService;

#[derive(Clone)]
pub struct HttpState {
    pub tasks: Arc<TaskService>,
    pub projects: Arc<ProjectService>,
    pub dashboard: Arc<DashboardService>,
    pub health: Arc<dyn StoreHealth>,
}
