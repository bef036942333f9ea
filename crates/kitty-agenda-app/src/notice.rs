//! Transient status notices shown after user actions.

use std::time::{Duration, Instant};

/// Default lifetime of a notice before the shell hides it.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(5);

/// Notice texts.
pub mod text {
    /// Shown after signing out.
    pub const SIGNED_OUT: &str =
        "Cerraste sesión. ¡Vuelve pronto para seguir organizando con Hello Kitty!";
    /// Shown after a sign-up that still needs email confirmation.
    pub const CONFIRM_EMAIL: &str =
        "Te enviamos un correo para confirmar tu cuenta. Confírmala y vuelve a iniciar sesión.";
    /// Fallback when the auth service gives no usable message.
    pub const AUTH_FALLBACK: &str = "Ocurrio un error";
    /// Blank title on create or edit.
    pub const TITLE_REQUIRED: &str =
        "Necesitamos un título para que Hello Kitty recuerde la tarea. Agrega uno dulce y breve.";
    /// Task created.
    pub const CREATED: &str = "Tarea guardada con glitter. ¡Hello Kitty aplaude tu organización!";
    /// Create failed in the store.
    pub const CREATE_FAILED: &str =
        "No pudimos guardar la tarea. Revisa tu conexión y vuelve a intentarlo.";
    /// Create or edit failed for a reason the client did not anticipate.
    pub const UNEXPECTED: &str =
        "Ocurrió un error inesperado al guardar la tarea. Intenta nuevamente en unos segundos.";
    /// Task marked completed.
    pub const COMPLETED: &str =
        "¡Listo! Marcaste la tarea como completada. Hello Kitty celebra contigo. 🎉";
    /// Task marked active again.
    pub const REACTIVATED: &str =
        "Tarea reactivada. ¡Vamos a darle seguimiento con brillo y constancia!";
    /// Task edited.
    pub const UPDATED: &str = "Actualizaste los detalles con cariño. Los cambios quedaron guardados.";
    /// Edit submitted without changes.
    pub const NO_CHANGES: &str = "No hubo cambios que guardar. La tarea sigue igual de linda.";
    /// Update or toggle failed in the store.
    pub const UPDATE_FAILED: &str =
        "No pudimos actualizar la tarea. Revisa tu conexión y vuelve a intentarlo.";
    /// Task deleted.
    pub const DELETED: &str = "Eliminaste la tarea. Si fue un error, siempre puedes crearla de nuevo con un nuevo toque kawaii.";
    /// Delete failed in the store.
    pub const DELETE_FAILED: &str =
        "No pudimos eliminar la tarea. Revisa tu conexión y vuelve a intentarlo.";
    /// Initial load or refresh failed.
    pub const LOAD_FAILED: &str =
        "No pudimos cargar tus tareas. Revisa tu conexión y vuelve a intentarlo.";
    /// Action attempted without a session.
    pub const SIGN_IN_REQUIRED: &str = "Inicia sesión para organizar tus tareas con Hello Kitty.";
    /// The referenced task is gone.
    pub const TASK_MISSING: &str = "No encontramos esa tarea. Quizás ya fue eliminada.";
}

/// Visual tone of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Something worked.
    Success,
    /// Something failed.
    Error,
    /// Neutral information.
    Info,
}

/// A dismissable message with its creation time.
#[derive(Debug, Clone)]
pub struct StatusNotice {
    tone: Tone,
    text: String,
    created_at: Instant,
}

impl StatusNotice {
    /// Build a notice created now.
    pub fn new(tone: Tone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
            created_at: Instant::now(),
        }
    }

    /// Success notice.
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(Tone::Success, text)
    }

    /// Error notice.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Tone::Error, text)
    }

    /// Informational notice.
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Tone::Info, text)
    }

    /// Tone of the notice.
    #[must_use]
    pub const fn tone(&self) -> Tone {
        self.tone
    }

    /// Notice text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the notice has outlived `ttl`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_notice_is_not_expired() {
        let notice = StatusNotice::success(text::CREATED);
        assert_eq!(notice.tone(), Tone::Success);
        assert!(!notice.is_expired(DEFAULT_NOTICE_TTL));
        assert!(notice.is_expired(Duration::ZERO));
    }
}
