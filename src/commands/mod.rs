mod export;
mod notes;
mod reports;
mod session;
mod settings;

use fosika_desktop::{error::AppError, permissions::PermissionGate};

pub use export::{__cmd__export_reports, export_reports};
pub use notes::{__cmd__list_notes, __cmd__save_note, list_notes, save_note};
pub use reports::{
    __cmd__change_report_status, __cmd__close_view, __cmd__delete_report, __cmd__edit_report,
    __cmd__get_report, __cmd__load_reports, __cmd__query_reports, __cmd__update_list_view,
    change_report_status, close_view, delete_report, edit_report, get_report, load_reports,
    query_reports, update_list_view,
};
pub use session::{
    __cmd__check_route, __cmd__load_permissions, __cmd__reload_permissions, __cmd__sign_in,
    __cmd__sign_out, __cmd__unread_notifications, check_route, load_permissions,
    reload_permissions, sign_in, sign_out, unread_notifications,
};
pub use settings::{__cmd__load_theme, __cmd__save_theme, load_theme, save_theme};

/// Rejects the call unless the current role holds one of `tokens`.
pub(crate) fn require_any(gate: &PermissionGate, tokens: &[&str]) -> Result<(), AppError> {
    if gate.has_any_permission(tokens) {
        Ok(())
    } else {
        Err(AppError::Message("Accès refusé.".into()))
    }
}
