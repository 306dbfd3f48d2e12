use serde::Serialize;
use uuid::Uuid;

use crate::api::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Navigation the UI must perform alongside the notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    SignIn,
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
    pub action: Option<NoticeAction>,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            action: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    /// Error notice for a failed API call, prefixed with what was attempted.
    pub fn from_api_error(context: &str, err: &ApiError) -> Self {
        let detail = match err {
            ApiError::Transport(_) => "serveur injoignable, vérifiez votre connexion".to_string(),
            ApiError::SessionExpired => "votre session a expiré, veuillez vous reconnecter".to_string(),
            ApiError::Unauthorized(message) => message.clone(),
            ApiError::VerificationRequired => "une vérification supplémentaire est requise".to_string(),
            ApiError::NotFound(_) => "ressource introuvable".to_string(),
            ApiError::Status { message, .. } | ApiError::Rejected(message) => message.clone(),
            ApiError::Decode(_) => "réponse inattendue du serveur".to_string(),
        };
        let mut notice = Self::error(format!("{context} : {detail}"));
        notice.action = match err {
            ApiError::SessionExpired => Some(NoticeAction::SignIn),
            ApiError::VerificationRequired => Some(NoticeAction::Verify),
            _ => None,
        };
        notice
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_map_to_actions() {
        let expired = Notice::from_api_error("Échec de la suppression", &ApiError::SessionExpired);
        assert!(expired.is_error());
        assert_eq!(expired.action, Some(NoticeAction::SignIn));
        assert!(expired.message.starts_with("Échec de la suppression : "));

        let rejected = Notice::from_api_error(
            "Échec de la mise à jour du statut",
            &ApiError::Rejected("Statut invalide".into()),
        );
        assert_eq!(rejected.message, "Échec de la mise à jour du statut : Statut invalide");
        assert_eq!(rejected.action, None);

        assert_ne!(Notice::info("a").id, Notice::info("a").id);
    }
}
