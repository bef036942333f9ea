//! Plain-text rendering of the agenda for the interactive shell.

use std::borrow::Cow;
use std::fmt::Write as _;

use kitty_agenda_app::{AppState, AppView, Phase, StatusNotice, Tone};
use kitty_agenda_core::{
    AgendaView, ProgressTone, Severity, StatusFilter, TaskCard, TaskId, greeting_name,
};
use unicode_segmentation::UnicodeSegmentation;

const TITLE_WIDTH: usize = 48;
const DESCRIPTION_WIDTH: usize = 60;
const BAR_WIDTH: usize = 20;

/// Rendered screen plus the ids behind its numbered rows.
#[derive(Debug, Default)]
pub struct Screen {
    pub text: String,
    pub numbered: Vec<TaskId>,
}

pub fn render(state: &AppState, view: &AgendaView<'_>) -> Screen {
    let mut screen = Screen::default();
    let out = &mut screen.text;
    out.push_str("\n🎀 Mi Agenda Kawaii 🎀\n");

    match state.phase() {
        Phase::Unauthenticated => {
            out.push_str(
                "Inicia sesión con `signin <email> <contraseña>` o crea tu cuenta con `signup`.\n",
            );
        }
        Phase::LoadingTasks => out.push_str("Cargando tus tareas...\n"),
        Phase::Ready => {
            let email = state.session().map_or("", |session| session.email.as_str());
            let _ = writeln!(out, "¡Hola, {}! 💕", greeting_name(email));
            match state.view() {
                AppView::Dashboard => render_dashboard(&mut screen, view),
                AppView::List => render_list(&mut screen, state, view),
            }
        }
    }

    if let Some(notice) = state.notice() {
        let _ = writeln!(screen.text, "\n{}", notice_line(notice));
    }
    screen
}

fn render_dashboard(screen: &mut Screen, view: &AgendaView<'_>) {
    let stats = &view.stats;
    let out = &mut screen.text;
    let _ = writeln!(
        out,
        "Total {} · Activas {} · Completadas {} · Urgentes {}",
        stats.total, stats.active, stats.completed, stats.urgent
    );
    let _ = writeln!(
        out,
        "{} {}%",
        progress_bar(stats.completion_rate, view.tone),
        stats.completion_rate
    );
    let _ = writeln!(out, "{}", view.tier.message());

    out.push_str("\n⏰ Urgentes\n");
    if view.urgent_preview.is_empty() {
        out.push_str("  Nada urgente. ¡Respira y disfruta! 🌸\n");
    }
    for card in &view.urgent_preview {
        let _ = writeln!(out, "   • {}", card_line(card));
    }

    screen.text.push_str("\n📝 Próximas\n");
    if view.upcoming.is_empty() {
        screen.text.push_str("  No hay tareas activas.\n");
    }
    push_numbered(screen, &view.upcoming);
}

fn render_list(screen: &mut Screen, state: &AppState, view: &AgendaView<'_>) {
    let selected = state.query().filter;
    let bar: Vec<String> = view
        .filter_counts
        .iter()
        .map(|(filter, count)| filter_chip(*filter, *count, *filter == selected))
        .collect();
    let _ = writeln!(screen.text, "{}", bar.join("  "));

    let search = state.query().search.trim();
    if !search.is_empty() {
        let _ = writeln!(screen.text, "🔍 \"{search}\"");
    }

    if view.visible.is_empty() {
        screen
            .text
            .push_str("  No encontramos tareas con estos filtros. ¡Crea una nueva! ✨\n");
    }
    push_numbered(screen, &view.visible);
}

fn push_numbered(screen: &mut Screen, cards: &[TaskCard<'_>]) {
    for card in cards {
        screen.numbered.push(card.task.id);
        let _ = writeln!(
            screen.text,
            "{:>3}. {}",
            screen.numbered.len(),
            card_line(card)
        );
        if let Some(description) = card.task.description.as_deref() {
            let _ = writeln!(
                screen.text,
                "       {}",
                truncate_with_ellipsis(description, DESCRIPTION_WIDTH)
            );
        }
    }
}

fn filter_chip(filter: StatusFilter, count: usize, selected: bool) -> String {
    if selected {
        format!("[{} ({count})]", filter.label())
    } else {
        format!(" {} ({count}) ", filter.label())
    }
}

fn card_line(card: &TaskCard<'_>) -> String {
    let task = card.task;
    let check = if task.completed { "[x]" } else { "[ ]" };
    format!(
        "{check} {} · {} · {}{} ({})",
        truncate_with_ellipsis(&task.title, TITLE_WIDTH),
        task.priority.label(),
        severity_marker(card.due.severity()),
        card.due.label(),
        task.id.short()
    )
}

const fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "‼ ",
        Severity::Warning => "! ",
        Severity::Attention => "? ",
        Severity::Calm => "",
    }
}

fn progress_bar(rate: u8, tone: ProgressTone) -> String {
    let filled = usize::from(rate) * BAR_WIDTH / 100;
    let fill = match tone {
        ProgressTone::Complete => "♥",
        ProgressTone::Strong => "█",
        ProgressTone::Building => "▓",
    };
    format!("[{}{}]", fill.repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn notice_line(notice: &StatusNotice) -> String {
    let icon = match notice.tone() {
        Tone::Success => "✔",
        Tone::Error => "✖",
        Tone::Info => "ℹ",
    };
    format!("{icon} {}", notice.text())
}

fn truncate_with_ellipsis(input: &str, max_graphemes: usize) -> Cow<'_, str> {
    const ELLIPSIS: &str = "...";
    const ELLIPSIS_GRAPHEMES: usize = 3;

    if max_graphemes == 0 {
        return Cow::Owned(String::new());
    }

    let grapheme_count = input.graphemes(true).count();
    if grapheme_count <= max_graphemes {
        return Cow::Borrowed(input);
    }

    if max_graphemes <= ELLIPSIS_GRAPHEMES {
        return Cow::Owned(input.graphemes(true).take(max_graphemes).collect());
    }

    let keep = max_graphemes - ELLIPSIS_GRAPHEMES;
    let mut truncated: String = input.graphemes(true).take(keep).collect();
    truncated.push_str(ELLIPSIS);
    Cow::Owned(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitty_agenda_app::Session;
    use kitty_agenda_core::{Priority, Task, TaskQuery, UserId, derive_view};
    use time::macros::{date, datetime};

    fn task(owner: UserId, title: &str, completed: bool) -> Task {
        Task {
            id: TaskId::new(),
            owner,
            title: title.into(),
            description: Some("con moño rosa".into()),
            priority: Priority::High,
            due_date: Some(date!(2025 - 03 - 01)),
            completed,
            created_at: datetime!(2025-03-01 09:00 UTC),
            updated_at: datetime!(2025-03-01 09:00 UTC),
        }
    }

    fn ready_state() -> AppState {
        let owner = UserId::new();
        let mut state = AppState::new();
        state.begin_session(Session {
            user_id: owner,
            email: "kitty@sanrio.jp".into(),
        });
        state.finish_loading(
            owner,
            vec![task(owner, "Regalo para Mimmy", false), task(owner, "Hornear", true)],
        );
        state
    }

    #[test]
    fn truncates_by_grapheme() {
        assert_eq!(truncate_with_ellipsis("moño", 4), "moño");
        assert_eq!(truncate_with_ellipsis("🎀🎀🎀🎀🎀", 4), "🎀...");
        assert_eq!(truncate_with_ellipsis("abcdef", 2), "ab");
        assert_eq!(truncate_with_ellipsis("abc", 0), "");
    }

    #[test]
    fn signed_out_screen_prompts_for_login() {
        let state = AppState::new();
        let view = derive_view(&[], &TaskQuery::default(), date!(2025 - 03 - 01));
        let screen = render(&state, &view);
        assert!(screen.text.contains("signin"));
        assert!(screen.numbered.is_empty());
    }

    #[test]
    fn dashboard_numbers_upcoming_tasks() {
        let mut state = ready_state();
        state.notify(StatusNotice::success("¡Listo!"));
        let view = state.view_model(date!(2025 - 03 - 01));
        let screen = render(&state, &view);

        assert!(screen.text.contains("¡Hola, kitty!"));
        assert!(screen.text.contains("Completadas 1"));
        assert!(screen.text.contains("50%"));
        assert!(screen.text.contains("Vence hoy"));
        assert!(screen.text.contains("✔ ¡Listo!"));
        assert_eq!(screen.numbered.len(), 1);
        assert_eq!(Some(&screen.numbered[0]), state.tasks().first().map(|t| &t.id));
    }

    #[test]
    fn list_marks_selected_filter_and_numbers_visible() {
        let mut state = ready_state();
        state.set_view(AppView::List);
        state.set_filter(StatusFilter::Completed);
        let view = state.view_model(date!(2025 - 03 - 01));
        let screen = render(&state, &view);

        assert!(screen.text.contains("[Completadas (1)]"));
        assert!(screen.text.contains(" Todas (2) "));
        assert!(screen.text.contains("[x] Hornear"));
        assert!(screen.text.contains("Vence hoy"));
        assert_eq!(screen.numbered.len(), 1);
    }

    #[test]
    fn progress_bar_scales_with_rate() {
        assert_eq!(progress_bar(0, ProgressTone::Building), format!("[{}]", "░".repeat(20)));
        assert_eq!(progress_bar(100, ProgressTone::Complete), format!("[{}]", "♥".repeat(20)));
        assert!(progress_bar(50, ProgressTone::Building).starts_with(&format!("[{}", "▓".repeat(10))));
    }
}
