// Application state for HTTP handlers
use crate::application::auth_service::AuthService;
use crate::application::controller::ControllerHandle;

#[derive(Clone)]
pub struct AppState {
    pub controller: ControllerHandle,
    pub auth: AuthService,
}
